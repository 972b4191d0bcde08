//! Executes an accumulated [`QueryState`] against the table store.
//!
//! One resolution takes the store lock once and runs insert, update, delete
//! or read to completion under it, so resolutions never interleave. Change
//! events are published before the lock is released, so subscribers see
//! them in commit order. Every failure is returned through the response
//! envelope.

use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    Autolot,
    error::Error,
    join,
    predicate::{Pattern, compare_field},
    query::{Operation, QueryState},
    realtime::{ChangeEvent, ChangeKind},
    response::Response,
    schema::TableName,
    store::{Row, Tables, row_id},
};

struct Outcome {
    response: Response,
    events: Vec<ChangeEvent>,
}

impl Outcome {
    fn quiet(response: Response) -> Self {
        Self {
            response,
            events: Vec::new(),
        }
    }
}

pub(crate) async fn resolve(lot: &Autolot, state: QueryState) -> Response {
    if let Some(delay) = lot.config.latency() {
        tokio::time::sleep(delay).await;
    }

    let op = state.operation();
    let table = state.table.clone();
    let start = Instant::now();

    let result = execute(lot, state);

    histogram!("autolot.resolve.duration_ms",
        "table" => table.clone(),
        "op" => op.as_str()
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(response) => {
            debug!(
                table = %table,
                op = op.as_str(),
                count = ?response.count,
                empty = response.is_empty(),
                "resolved"
            );
            response
        }
        Err(err) => {
            warn!(table = %table, op = op.as_str(), error = %err, "resolution failed");
            counter!("autolot.resolve.errors",
                "table" => table.clone(),
                "code" => err.code()
            )
            .increment(1);
            Response::failure(err.info().with_details(format!("{} {}", op.as_str(), table)))
        }
    }
}

fn execute(lot: &Autolot, state: QueryState) -> Result<Response, Error> {
    let mut tables = lot.store.lock()?;

    let outcome = match state.operation() {
        Operation::Insert => insert(&mut tables, &state),
        Operation::Update => update(&mut tables, &state),
        Operation::Delete => delete(&mut tables, &state),
        Operation::Read => read(&tables, &state, &lot.config.search_fields).map(Outcome::quiet),
    }?;

    lot.realtime.publish(outcome.events);
    drop(tables);
    Ok(outcome.response)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}

fn payload(slot: &Option<Result<Value, Error>>) -> Result<&Value, Error> {
    match slot {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => Err(err.clone()),
        None => Err(Error::InvalidPayload("missing payload".to_string())),
    }
}

/// Mutation results: one row unwrapped, several as a sequence (or the first
/// when `single()` was asked for), none as null.
fn shape_written(state: &QueryState, rows: Vec<Row>, bulk: bool) -> Response {
    let mut rows: Vec<Row> = rows
        .into_iter()
        .map(|r| state.selection.project(&state.table, r))
        .collect();

    if state.single || (!bulk && rows.len() == 1) {
        return match rows.drain(..).next() {
            Some(row) => Response::row(row),
            None => Response::empty(),
        };
    }
    if rows.is_empty() && !bulk {
        return Response::empty();
    }
    Response::affected(rows)
}

// ==================== Insert ====================

fn insert(tables: &mut Tables, state: &QueryState) -> Result<Outcome, Error> {
    let value = payload(&state.insert)?;
    let (incoming, bulk) = match value {
        Value::Object(row) => (vec![row.clone()], false),
        Value::Array(items) => {
            let rows = items
                .iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row.clone()),
                    _ => Err(Error::InvalidPayload(
                        "bulk insert items must be objects".to_string(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            (rows, true)
        }
        _ => {
            return Err(Error::InvalidPayload(
                "insert payload must be an object or array of objects".to_string(),
            ));
        }
    };

    let table = tables
        .get_mut(&state.table)
        .ok_or_else(|| Error::UnknownTable(state.table.clone()))?;

    let stamp = now();
    let mut prepared: Vec<Row> = Vec::with_capacity(incoming.len());
    for mut row in incoming {
        match row.get("id") {
            None | Some(Value::Null) => {
                row.insert("id".to_string(), Value::String(new_id()));
            }
            Some(Value::String(_)) => {}
            Some(_) => return Err(Error::InvalidPayload("id must be a string".to_string())),
        }
        if row.get("created_at").is_none_or(Value::is_null) {
            row.insert("created_at".to_string(), Value::String(stamp.clone()));
        }

        let id = row_id(&row).unwrap_or_default();
        if table.contains_id(id) || prepared.iter().any(|p| row_id(p) == Some(id)) {
            return Err(Error::Conflict(format!(
                "duplicate key: {}.id = {}",
                state.table, id
            )));
        }
        prepared.push(row);
    }

    for row in &prepared {
        table.push(row.clone())?;
    }

    let events = prepared
        .iter()
        .map(|r| ChangeEvent::new(&state.table, ChangeKind::Insert, r.clone()))
        .collect();

    Ok(Outcome {
        response: shape_written(state, prepared, bulk),
        events,
    })
}

// ==================== Update ====================

fn update(tables: &mut Tables, state: &QueryState) -> Result<Outcome, Error> {
    let patch = match payload(&state.update)? {
        Value::Object(patch) => patch,
        _ => {
            return Err(Error::InvalidPayload(
                "update payload must be an object".to_string(),
            ));
        }
    };

    let table = tables
        .get_mut(&state.table)
        .ok_or_else(|| Error::UnknownTable(state.table.clone()))?;

    // Without an equality filter nothing matches.
    let Some(filter) = state.eq.as_ref() else {
        return Ok(Outcome::quiet(Response::empty()));
    };

    if let Some(new_id) = patch.get("id") {
        let new_id = new_id
            .as_str()
            .ok_or_else(|| Error::InvalidPayload("id must be a string".to_string()))?;
        let matched = table.rows().iter().filter(|r| filter.matches(r)).count();
        let taken = table
            .rows()
            .iter()
            .any(|r| !filter.matches(r) && row_id(r) == Some(new_id));
        if taken || matched > 1 {
            return Err(Error::Conflict(format!(
                "duplicate key: {}.id = {}",
                state.table, new_id
            )));
        }
    }

    let stamp_updated = TableName::parse(&state.table).is_some() && !patch.contains_key("updated_at");
    let stamp = now();

    let mut updated = Vec::new();
    for row in table.iter_mut() {
        if !filter.matches(row) {
            continue;
        }
        for (key, value) in patch {
            row.insert(key.clone(), value.clone());
        }
        if stamp_updated {
            row.insert("updated_at".to_string(), Value::String(stamp.clone()));
        }
        updated.push(row.clone());
    }

    let events = updated
        .iter()
        .map(|r| ChangeEvent::new(&state.table, ChangeKind::Update, r.clone()))
        .collect();

    Ok(Outcome {
        response: shape_written(state, updated, false),
        events,
    })
}

// ==================== Delete ====================

fn delete(tables: &mut Tables, state: &QueryState) -> Result<Outcome, Error> {
    let table = tables
        .get_mut(&state.table)
        .ok_or_else(|| Error::UnknownTable(state.table.clone()))?;

    let Some(filter) = state.eq.as_ref() else {
        return Ok(Outcome::quiet(Response::empty()));
    };

    let removed = table.remove_where(|r| filter.matches(r));
    if removed.is_empty() {
        return Ok(Outcome::quiet(Response::empty()));
    }

    let events = removed
        .into_iter()
        .map(|r| ChangeEvent::new(&state.table, ChangeKind::Delete, r))
        .collect();

    Ok(Outcome {
        response: Response::row(Row::new()),
        events,
    })
}

// ==================== Read ====================

fn read(tables: &Tables, state: &QueryState, search_fields: &[String]) -> Result<Response, Error> {
    let pattern = state
        .like
        .as_ref()
        .map(|l| Pattern::compile(&l.field, &l.pattern))
        .transpose()?;
    let joins = state.selection.joins(&state.table);

    let mut rows: Vec<Row> = match tables.get(&state.table) {
        Some(table) => table
            .rows()
            .iter()
            .filter(|r| state.eq.as_ref().is_none_or(|f| f.matches(r)))
            .filter(|r| pattern.as_ref().is_none_or(|p| p.matches(r)))
            .filter(|r| {
                state
                    .any_of
                    .as_ref()
                    .is_none_or(|s| s.matches(r, search_fields))
            })
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    if let Some(order) = &state.order {
        rows.sort_by(|a, b| compare_field(a, b, &order.field, order.ascending));
    }

    if let Some(limit) = state.limit {
        rows.truncate(limit);
    }

    join::expand(tables, &mut rows, &joins);

    let mut rows: Vec<Row> = rows
        .into_iter()
        .map(|r| state.selection.project(&state.table, r))
        .collect();

    if state.single || rows.len() == 1 {
        return Ok(match rows.drain(..).next() {
            Some(row) => Response::row(row),
            None => Response::empty(),
        });
    }

    Ok(Response::rows(rows))
}
