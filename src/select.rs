//! Field-spec parsing for `select(...)`.
//!
//! A spec is a comma-separated list of `*`, plain column names, and embedded
//! relations written `name(columns)`, optionally aliased as
//! `alias:name(columns)`. The embedded row is attached under the alias (or
//! the related table's name) and projected to the inner column list. A bare
//! token naming a table related to the queried one also requests the embed,
//! so `"*, cars"` and `"*, cars(*)"` behave alike.
//!
//! Embeds naming a table with no declared relationship are ignored.

use crate::{
    schema::{self, Relationship},
    store::Row,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    star: bool,
    columns: Vec<String>,
    embeds: Vec<Embed>,
}

/// One `alias:name(inner)` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub alias: Option<String>,
    pub table: String,
    pub inner: Selection,
}

impl Embed {
    /// Key the embedded row is attached under.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// A relation to expand on read, resolved against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub relationship: &'static Relationship,
    pub key: String,
    pub selection: Selection,
}

impl Default for Selection {
    fn default() -> Self {
        Self::all()
    }
}

impl Selection {
    pub fn all() -> Self {
        Self {
            star: true,
            columns: Vec::new(),
            embeds: Vec::new(),
        }
    }

    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec.is_empty() {
            return Self::all();
        }

        let mut selection = Self {
            star: false,
            columns: Vec::new(),
            embeds: Vec::new(),
        };

        for token in split_top_level(spec) {
            if token == "*" {
                selection.star = true;
            } else if let Some(open) = token.find('(') {
                if let Some(embed) = parse_embed(&token[..open], &token[open + 1..]) {
                    selection.embeds.push(embed);
                }
            } else if !token.is_empty() {
                selection.columns.push(token.to_string());
            }
        }

        selection
    }

    pub fn is_all(&self) -> bool {
        self.star && self.embeds.is_empty() && self.columns.is_empty()
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    /// Relations to expand when reading `table`, one per attach key.
    pub fn joins(&self, table: &str) -> Vec<Join> {
        let mut out: Vec<Join> = Vec::new();

        for embed in &self.embeds {
            let target = schema::canonical_table(&embed.table);
            let Some(rel) = schema::relationship(table, &target) else {
                continue;
            };
            if !out.iter().any(|j| j.key == embed.key()) {
                out.push(Join {
                    relationship: rel,
                    key: embed.key().to_string(),
                    selection: embed.inner.clone(),
                });
            }
        }

        for column in &self.columns {
            let target = schema::canonical_table(column);
            if let Some(rel) = schema::relationship(table, &target) {
                if !out.iter().any(|j| j.key == rel.referenced) {
                    out.push(Join {
                        relationship: rel,
                        key: rel.referenced.to_string(),
                        selection: Selection::all(),
                    });
                }
            }
        }

        out
    }

    /// Keeps only the requested columns plus expanded relation keys.
    /// Rows pass through untouched when `*` was selected.
    pub fn project(&self, table: &str, row: Row) -> Row {
        if self.star {
            return row;
        }

        let keep = |key: &str| {
            self.columns.iter().any(|c| c == key)
                || self.embeds.iter().any(|e| e.key() == key)
                || (schema::is_related(table, key)
                    && self.columns.iter().any(|c| schema::canonical_table(c) == key))
        };

        row.into_iter().filter(|(key, _)| keep(key)).collect()
    }
}

/// `head` is `name` or `alias:name`; `rest` is everything after the `(`.
fn parse_embed(head: &str, rest: &str) -> Option<Embed> {
    let (alias, table) = match head.split_once(':') {
        Some((alias, table)) => (Some(alias.trim()), table.trim()),
        None => (None, head.trim()),
    };
    if table.is_empty() {
        return None;
    }

    let inner = match rest.rfind(')') {
        Some(close) => &rest[..close],
        None => rest,
    };

    Some(Embed {
        alias: alias.filter(|a| !a.is_empty()).map(String::from),
        table: table.to_string(),
        inner: Selection::parse(inner),
    })
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(spec: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in spec.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(spec[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(spec[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_star_and_embed() {
        let sel = Selection::parse("*, cars(*)");
        assert!(sel.star);
        assert_eq!(sel.embeds().len(), 1);
        assert!(sel.embeds()[0].inner.is_all());

        let joins = sel.joins("orders");
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].relationship.column, "car_id");
        assert_eq!(joins[0].key, "cars");
    }

    #[test]
    fn test_alias_and_nested_columns() {
        let sel = Selection::parse("id, car:cars(id, title), status");
        assert_eq!(sel.columns, vec!["id", "status"]);

        let embed = &sel.embeds()[0];
        assert_eq!(embed.alias.as_deref(), Some("car"));
        assert_eq!(embed.table, "cars");
        assert_eq!(embed.key(), "car");
        assert_eq!(embed.inner, Selection::parse("id, title"));

        let joins = sel.joins("orders");
        assert_eq!(joins[0].key, "car");
    }

    #[test]
    fn test_bare_related_table_requests_join() {
        let sel = Selection::parse("*, cars");
        assert_eq!(sel.joins("wishlist").len(), 1);
        assert!(sel.joins("profiles").is_empty());
    }

    #[test]
    fn test_unrelated_embed_is_ignored() {
        let sel = Selection::parse("*, profiles(*)");
        assert!(sel.joins("orders").is_empty());
    }

    #[test]
    fn test_projection_keeps_listed_columns() {
        let sel = Selection::parse("id, title");
        let projected = sel.project("cars", row(json!({ "id": "1", "title": "Audi A4", "price": 10 })));
        assert_eq!(projected.len(), 2);
        assert!(projected.get("price").is_none());
    }

    #[test]
    fn test_projection_keeps_alias_key() {
        let sel = Selection::parse("id, car:cars(title)");
        let projected = sel.project(
            "orders",
            row(json!({ "id": "1", "car_id": "2", "car": { "title": "BMW X5 2021" } })),
        );
        assert_eq!(projected.len(), 2);
        assert!(projected.contains_key("car"));
    }

    #[test]
    fn test_empty_spec_selects_everything() {
        assert!(Selection::parse("   ").is_all());
        assert!(Selection::parse("*").is_all());
        assert!(Selection::parse("cars()").embeds()[0].inner.is_all());
    }
}
