use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::{Error, ErrorInfo},
    store::Row,
};

/// Payload of a successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Data {
    Row(Row),
    Rows(Vec<Row>),
}

/// The `{ data, error, count? }` envelope every resolution produces.
/// A non-null `error` is authoritative regardless of `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub data: Option<Data>,
    pub error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Response {
    pub fn row(row: Row) -> Self {
        Self {
            data: Some(Data::Row(row)),
            error: None,
            count: None,
        }
    }

    /// Multi-row read; `count` mirrors the sequence length.
    pub fn rows(rows: Vec<Row>) -> Self {
        let count = rows.len();
        Self {
            data: Some(Data::Rows(rows)),
            error: None,
            count: Some(count),
        }
    }

    /// Multi-row mutation result, which carries no `count`.
    pub fn affected(rows: Vec<Row>) -> Self {
        Self {
            data: Some(Data::Rows(rows)),
            error: None,
            count: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
            count: None,
        }
    }

    pub fn failure(err: impl Into<ErrorInfo>) -> Self {
        Self {
            data: None,
            error: Some(err.into()),
            count: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// The bare row, when the data was unwrapped to one.
    pub fn as_row(&self) -> Option<&Row> {
        match &self.data {
            Some(Data::Row(row)) => Some(row),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match &self.data {
            Some(Data::Rows(rows)) => Some(rows),
            _ => None,
        }
    }

    /// Rows regardless of shape: a bare row becomes a one-element list.
    pub fn into_rows(self) -> Vec<Row> {
        match self.data {
            Some(Data::Row(row)) => vec![row],
            Some(Data::Rows(rows)) => rows,
            None => Vec::new(),
        }
    }

    pub fn into_result(self) -> Result<Option<Data>, ErrorInfo> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }

    /// Decodes a bare-row response into `T`. `Ok(None)` when data is null.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Option<T>, Error> {
        if let Some(err) = self.error {
            return Err(Error::Deserialize(err.message));
        }
        match self.data {
            None => Ok(None),
            Some(Data::Row(row)) => serde_json::from_value(Value::Object(row))
                .map(Some)
                .map_err(|e| Error::Deserialize(e.to_string())),
            Some(Data::Rows(_)) => Err(Error::Deserialize(
                "expected a single row, found a sequence".to_string(),
            )),
        }
    }

    /// Decodes every row into `T`, accepting either data shape.
    pub fn decode_rows<T: DeserializeOwned>(self) -> Result<Vec<T>, Error> {
        if let Some(err) = self.error {
            return Err(Error::Deserialize(err.message));
        }
        self.into_rows()
            .into_iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row))
                    .map_err(|e| Error::Deserialize(e.to_string()))
            })
            .collect()
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
    fn test_wire_shape_multi_row() {
        let resp = Response::rows(vec![row(json!({ "id": "1" })), row(json!({ "id": "2" }))]);
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            wire,
            json!({ "data": [{ "id": "1" }, { "id": "2" }], "error": null, "count": 2 })
        );
    }

    #[test]
    fn test_wire_shape_single_row_has_no_count() {
        let wire = serde_json::to_value(Response::row(row(json!({ "id": "1" })))).unwrap();
        assert_eq!(wire, json!({ "data": { "id": "1" }, "error": null }));
    }

    #[test]
    fn test_wire_shape_failure() {
        let wire = serde_json::to_value(Response::failure(Error::Poisoned)).unwrap();
        assert_eq!(wire["data"], Value::Null);
        assert_eq!(wire["error"]["code"], "internal");
    }

    #[test]
    fn test_into_result_splits_on_error() {
        let ok = Response::row(row(json!({ "id": "1" }))).into_result().unwrap();
        assert_eq!(ok, Some(Data::Row(row(json!({ "id": "1" })))));
        assert_eq!(Response::empty().into_result(), Ok(None));

        let err = Response::failure(Error::Conflict("duplicate".to_string()).info().with_details("insert cars"))
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, "conflict");
        assert_eq!(err.details.as_deref(), Some("insert cars"));
    }

    #[test]
    fn test_decode_rejects_sequence() {
        let resp = Response::rows(vec![row(json!({ "id": "1" }))]);
        assert!(resp.decode::<serde_json::Map<String, Value>>().is_err());
    }
}
