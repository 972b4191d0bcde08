use serde_json::Value;

use crate::{
    predicate::values_equal,
    select::Join,
    store::{Row, Tables},
};

/// Attaches each referenced row under the join's key, projected to the
/// embed's column list, or `null` when the reference dangles. Rows without
/// the foreign-key field are left as they are. Runs over the already
/// filtered and limited rows only.
pub(crate) fn expand(tables: &Tables, rows: &mut [Row], joins: &[Join]) {
    for join in joins {
        let rel = join.relationship;
        let target = tables.get(rel.referenced);

        for row in rows.iter_mut() {
            let Some(fk) = row.get(rel.column).cloned() else {
                continue;
            };

            let found = if fk.is_null() {
                None
            } else {
                target.and_then(|t| {
                    t.rows()
                        .iter()
                        .find(|r| {
                            r.get(rel.referenced_column)
                                .is_some_and(|v| values_equal(v, &fk))
                        })
                        .cloned()
                })
            };

            row.insert(
                join.key.clone(),
                found
                    .map(|r| Value::Object(join.selection.project(rel.referenced, r)))
                    .unwrap_or(Value::Null),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{select::Selection, store::Table};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn tables() -> Tables {
        let mut cars = Table::new();
        cars.push(row(json!({ "id": "1", "title": "Toyota Camry 2020", "price": 15000000 })))
            .unwrap();
        let mut tables = Tables::new();
        tables.insert("cars".to_string(), cars);
        tables
    }

    fn joins(spec: &str) -> Vec<Join> {
        Selection::parse(spec).joins("orders")
    }

    #[test]
    fn test_attaches_referenced_row() {
        let mut rows = vec![row(json!({ "id": "o1", "car_id": "1" }))];
        expand(&tables(), &mut rows, &joins("*, cars(*)"));
        assert_eq!(rows[0]["cars"]["title"], "Toyota Camry 2020");
        assert_eq!(rows[0]["cars"]["price"], 15000000);
    }

    #[test]
    fn test_alias_and_inner_columns() {
        let mut rows = vec![row(json!({ "id": "o1", "car_id": "1" }))];
        expand(&tables(), &mut rows, &joins("id, car:cars(title)"));
        assert!(rows[0].get("cars").is_none());
        assert_eq!(rows[0]["car"], json!({ "title": "Toyota Camry 2020" }));
    }

    #[test]
    fn test_dangling_reference_is_null() {
        let mut rows = vec![row(json!({ "id": "o1", "car_id": "404" }))];
        expand(&tables(), &mut rows, &joins("*, cars(*)"));
        assert_eq!(rows[0]["cars"], Value::Null);
    }

    #[test]
    fn test_row_without_foreign_key_untouched() {
        let mut rows = vec![row(json!({ "id": "o1" }))];
        expand(&tables(), &mut rows, &joins("*, cars(*)"));
        assert!(rows[0].get("cars").is_none());
    }
}
