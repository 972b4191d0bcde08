//! Row predicates and the total order used by `order(...)`.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::{error::Error, store::Row};

// ==================== Equality ====================

#[derive(Debug, Clone, PartialEq)]
pub struct EqFilter {
    pub field: String,
    pub value: Value,
}

impl EqFilter {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Rows missing the field never match.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.field)
            .is_some_and(|v| values_equal(v, &self.value))
    }
}

/// Strict equality, except that numbers compare by value (`2020 == 2020.0`)
/// at any depth.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, l)| y.get(k).is_some_and(|r| values_equal(l, r)))
        }
        _ => a == b,
    }
}

// ==================== Pattern (ILIKE) ====================

#[derive(Debug, Clone)]
pub struct Pattern {
    pub field: String,
    pub raw: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(field: impl Into<String>, pattern: impl Into<String>) -> Result<Self, Error> {
        let raw = pattern.into();
        let source = like_to_regex(&raw);
        tracing::trace!(pattern = %raw, regex = %source, "compiled ilike pattern");
        let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Self {
            field: field.into(),
            raw,
            regex,
        })
    }

    /// Absent and non-string fields never match.
    pub fn matches(&self, row: &Row) -> bool {
        match row.get(&self.field) {
            Some(Value::String(s)) => self.regex.is_match(s),
            _ => false,
        }
    }
}

/// `%` is any run of characters, `_` any single character, `\` escapes the
/// next character. Anchors are dropped on the side a leading or trailing `%`
/// already leaves open.
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    if !pattern.starts_with('%') {
        out.push('^');
    }

    let mut chars = pattern.chars().peekable();
    let mut leading = true;
    let mut trailing_wildcard = false;
    while let Some(ch) = chars.next() {
        let at_start = std::mem::replace(&mut leading, false);
        trailing_wildcard = false;
        match ch {
            '%' => {
                while chars.peek() == Some(&'%') {
                    chars.next();
                }
                if chars.peek().is_none() {
                    trailing_wildcard = true;
                } else if !at_start {
                    out.push_str(".*");
                }
            }
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(r"\\"),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    if !trailing_wildcard {
        out.push('$');
    }
    out
}

// ==================== OR search ====================

/// Multi-field substring search built from a `field.op.value,...` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyOf {
    pub raw: String,
    literals: Vec<String>,
}

impl AnyOf {
    pub fn parse(expression: &str) -> Self {
        let literals = expression
            .split(',')
            .map(clause_literal)
            .filter(|l| !l.is_empty())
            .collect();
        Self {
            raw: expression.to_string(),
            literals,
        }
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// With no usable literal the search rejects nothing.
    pub fn is_noop(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn matches<S: AsRef<str>>(&self, row: &Row, fields: &[S]) -> bool {
        if self.is_noop() {
            return true;
        }
        fields.iter().any(|field| match row.get(field.as_ref()) {
            Some(Value::String(s)) => {
                let haystack = s.to_lowercase();
                self.literals.iter().any(|l| haystack.contains(l.as_str()))
            }
            _ => false,
        })
    }
}

/// `title.ilike.%camry%` -> `camry`; a clause without dots is its own literal.
fn clause_literal(clause: &str) -> String {
    let clause = clause.trim();
    let value = match clause.splitn(3, '.').collect::<Vec<_>>().as_slice() {
        [_, _, value] => *value,
        _ => clause,
    };
    value
        .chars()
        .filter(|c| !matches!(c, '%' | '*' | '"'))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

// ==================== Ordering ====================

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: type rank first, then value.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = cmp_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Sort key comparison for one field. Missing and null values go last in
/// both directions.
pub fn compare_field(a: &Row, b: &Row, field: &str, ascending: bool) -> Ordering {
    let a = a.get(field).filter(|v| !v.is_null());
    let b = b.get(field).filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = cmp_values(a, b);
            if ascending { ord } else { ord.reverse() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_eq_excludes_missing_field() {
        let filter = EqFilter::new("status", "available");
        assert!(filter.matches(&row(json!({ "status": "available" }))));
        assert!(!filter.matches(&row(json!({ "status": "sold" }))));
        assert!(!filter.matches(&row(json!({ "title": "x" }))));
    }

    #[test]
    fn test_eq_numbers_by_value() {
        let filter = EqFilter::new("year", 2020);
        assert!(filter.matches(&row(json!({ "year": 2020.0 }))));
        assert!(!filter.matches(&row(json!({ "year": "2020" }))));
    }

    #[test]
    fn test_values_equal_recurses() {
        assert!(values_equal(&json!([2020, "a"]), &json!([2020.0, "a"])));
        assert!(values_equal(&json!({ "n": [1] }), &json!({ "n": [1.0] })));
        assert!(!values_equal(&json!([1, 2]), &json!([1])));
        assert!(!values_equal(&json!({ "n": 1 }), &json!({ "m": 1 })));
    }

    #[test]
    fn test_like_to_regex_anchoring() {
        assert_eq!(like_to_regex("%toy%"), "toy");
        assert_eq!(like_to_regex("toy%"), "^toy");
        assert_eq!(like_to_regex("%ota"), "ota$");
        assert_eq!(like_to_regex("toyota"), "^toyota$");
        assert_eq!(like_to_regex("t%a"), "^t.*a$");
        assert_eq!(like_to_regex("%"), "");
        assert_eq!(like_to_regex("%%"), "");
    }

    #[test]
    fn test_like_escapes_regex_metacharacters() {
        let pattern = Pattern::compile("model", "%c+.class%").unwrap();
        assert!(pattern.matches(&row(json!({ "model": "C+.Class" }))));
        assert!(!pattern.matches(&row(json!({ "model": "CC-Class" }))));
    }

    #[test]
    fn test_like_is_case_insensitive() {
        let pattern = Pattern::compile("make", "%toy%").unwrap();
        assert!(pattern.matches(&row(json!({ "make": "Toyota" }))));
        assert!(pattern.matches(&row(json!({ "make": "TOYOTA" }))));
        assert!(!pattern.matches(&row(json!({ "make": "Ford" }))));
    }

    #[test]
    fn test_like_non_string_never_matches() {
        let pattern = Pattern::compile("year", "%20%").unwrap();
        assert!(!pattern.matches(&row(json!({ "year": 2020 }))));
        assert!(!pattern.matches(&row(json!({ "make": "x" }))));
    }

    #[test]
    fn test_like_underscore_and_escape() {
        let pattern = Pattern::compile("vin", "RAA_23A").unwrap();
        assert!(pattern.matches(&row(json!({ "vin": "raa123a" }))));
        let literal = Pattern::compile("title", r"100\%").unwrap();
        assert!(literal.matches(&row(json!({ "title": "100%" }))));
        assert!(!literal.matches(&row(json!({ "title": "1000" }))));
    }

    #[test]
    fn test_any_of_strips_decoration() {
        let search = AnyOf::parse("title.ilike.%Camry%,make.ilike.%Camry%,model.ilike.%Camry%");
        assert_eq!(search.literals(), &["camry", "camry", "camry"]);
        let fields = ["title", "make", "model"];
        assert!(search.matches(&row(json!({ "model": "Camry" })), &fields));
        assert!(!search.matches(&row(json!({ "model": "X5" })), &fields));
    }

    #[test]
    fn test_any_of_empty_literal_is_noop() {
        let search = AnyOf::parse("title.ilike.%%,make.ilike.%%");
        assert!(search.is_noop());
        assert!(search.matches(&row(json!({ "title": "anything" })), &["title"]));

        let mixed = AnyOf::parse("title.ilike.%%,make.ilike.%bmw%");
        assert_eq!(mixed.literals(), &["bmw"]);
        assert!(!mixed.matches(&row(json!({ "make": "Audi" })), &["make"]));
    }

    #[test]
    fn test_nulls_last_both_directions() {
        let a = row(json!({ "price": null }));
        let b = row(json!({ "price": 5 }));
        assert_eq!(compare_field(&a, &b, "price", true), Ordering::Greater);
        assert_eq!(compare_field(&a, &b, "price", false), Ordering::Greater);
        assert_eq!(compare_field(&a, &row(json!({})), "price", true), Ordering::Equal);
    }

    #[test]
    fn test_mixed_types_rank() {
        assert_eq!(cmp_values(&json!(true), &json!(1)), Ordering::Less);
        assert_eq!(cmp_values(&json!(99), &json!("1")), Ordering::Less);
        assert_eq!(cmp_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(cmp_values(&json!(2.5), &json!(2)), Ordering::Greater);
    }
}
