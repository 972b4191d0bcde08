use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;

use crate::{
    Autolot,
    error::Error,
    predicate::{AnyOf, EqFilter},
    resolve,
    response::Response,
    schema,
    select::Selection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikeFilter {
    pub field: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Accumulated intent of one request. Building it never touches the store.
///
/// Equality and pattern filters are single slots: setting one again
/// replaces the previous value.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub table: String,
    pub selection: Selection,
    pub eq: Option<EqFilter>,
    pub like: Option<LikeFilter>,
    pub any_of: Option<AnyOf>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
    pub single: bool,
    pub insert: Option<Result<Value, Error>>,
    pub update: Option<Result<Value, Error>>,
    pub delete: bool,
}

impl QueryState {
    pub fn new(table: &str) -> Self {
        Self {
            table: schema::canonical_table(table),
            selection: Selection::all(),
            eq: None,
            like: None,
            any_of: None,
            order: None,
            limit: None,
            single: false,
            insert: None,
            update: None,
            delete: false,
        }
    }

    /// Insert wins over update, update over delete.
    pub fn operation(&self) -> Operation {
        if self.insert.is_some() {
            Operation::Insert
        } else if self.update.is_some() {
            Operation::Update
        } else if self.delete {
            Operation::Delete
        } else {
            Operation::Read
        }
    }
}

fn to_payload(payload: impl Serialize) -> Result<Value, Error> {
    serde_json::to_value(payload).map_err(|e| Error::Serialize(e.to_string()))
}

/// Fluent request against one table, resolved by `.await`.
///
/// ```rust,ignore
/// let resp = engine
///     .from("cars")
///     .select("*")
///     .eq("status", "available")
///     .order("price", false)
///     .limit(10)
///     .await;
/// ```
pub struct QueryBuilder<'a> {
    lot: &'a Autolot,
    state: QueryState,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(lot: &'a Autolot, table: &str) -> Self {
        Self {
            lot,
            state: QueryState::new(table),
        }
    }

    /// Fields and embedded relations to return, e.g. `"*, cars(*)"`.
    pub fn select(mut self, spec: &str) -> Self {
        self.state.selection = Selection::parse(spec);
        self
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.state.eq = Some(EqFilter::new(field, value));
        self
    }

    /// Case-insensitive LIKE; `%` matches any run of characters.
    pub fn ilike(mut self, field: &str, pattern: &str) -> Self {
        self.state.like = Some(LikeFilter {
            field: field.to_string(),
            pattern: pattern.to_string(),
        });
        self
    }

    /// Search expression such as `title.ilike.%bmw%,make.ilike.%bmw%`.
    pub fn or(mut self, expression: &str) -> Self {
        self.state.any_of = Some(AnyOf::parse(expression));
        self
    }

    pub fn order(mut self, field: &str, ascending: bool) -> Self {
        self.state.order = Some(OrderBy {
            field: field.to_string(),
            ascending,
        });
        self
    }

    pub fn order_asc(self, field: &str) -> Self {
        self.order(field, true)
    }

    pub fn order_desc(self, field: &str) -> Self {
        self.order(field, false)
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.state.limit = Some(n);
        self
    }

    /// Return a bare row instead of a sequence.
    pub fn single(mut self) -> Self {
        self.state.single = true;
        self
    }

    /// One object, or an array of objects for a bulk insert.
    pub fn insert(mut self, payload: impl Serialize) -> Self {
        self.state.insert = Some(to_payload(payload));
        self
    }

    pub fn update(mut self, payload: impl Serialize) -> Self {
        self.state.update = Some(to_payload(payload));
        self
    }

    pub fn delete(mut self) -> Self {
        self.state.delete = true;
        self
    }

    /// Runs the request. Same as awaiting the builder.
    pub async fn resolve(self) -> Response {
        resolve::resolve(self.lot, self.state).await
    }
}

impl<'a> IntoFuture for QueryBuilder<'a> {
    type Output = Response;
    type IntoFuture = Pin<Box<dyn Future<Output = Response> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_are_last_write_wins() {
        let mut state = QueryState::new("cars");
        state.eq = Some(EqFilter::new("status", "available"));
        state.eq = Some(EqFilter::new("make", "BMW"));
        assert_eq!(state.eq.unwrap().field, "make");
    }

    #[test]
    fn test_operation_precedence() {
        let mut state = QueryState::new("cars");
        assert_eq!(state.operation(), Operation::Read);
        state.delete = true;
        assert_eq!(state.operation(), Operation::Delete);
        state.update = Some(Ok(json!({ "status": "sold" })));
        assert_eq!(state.operation(), Operation::Update);
        state.insert = Some(Ok(json!({ "title": "x" })));
        assert_eq!(state.operation(), Operation::Insert);
    }

    #[test]
    fn test_vehicles_alias_targets_cars() {
        assert_eq!(QueryState::new("vehicles").table, "cars");
    }
}
