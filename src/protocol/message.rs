//! Request, response and record types
//!
//! Requests arrive as loosely-typed JSON objects; [`Request::from_value`] pulls
//! out the protocol fields and keeps everything else as record payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::constants::{FIELD_ACTION, FIELD_ID, FIELD_UUID, RECORD_KEY};

/// A stored record: a JSON object with a mandatory `id` key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create a record holding only its key
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_fields(id, Map::new())
    }

    /// Create a record from caller fields, forcing `id` to the given key
    pub fn from_fields(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.insert(RECORD_KEY.to_string(), Value::String(id.into()));
        Self(fields)
    }

    /// Wrap a JSON value, if it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The record key, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(RECORD_KEY).and_then(Value::as_str)
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// All fields, including `id`
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Request action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Get,
    Set,
    List,
    Subscribe,
    /// Anything else; answered with "Unknown ACTION"
    Unknown(String),
}

impl Action {
    /// Parse an action name (case-sensitive)
    pub fn parse(name: &str) -> Self {
        match name {
            "get" => Action::Get,
            "set" => Action::Set,
            "list" => Action::List,
            "subscribe" => Action::Subscribe,
            other => Action::Unknown(other.to_string()),
        }
    }

    /// Wire name of the action
    pub fn as_str(&self) -> &str {
        match self {
            Action::Get => "get",
            Action::Set => "set",
            Action::List => "list",
            Action::Subscribe => "subscribe",
            Action::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Missing UUID or ACTION")]
    MissingUuidOrAction,
}

/// A validated client request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Client identity
    pub uuid: String,
    /// Requested action
    pub action: Action,
    /// Record key for `get` / `set`
    pub id: Option<String>,
    /// Remaining fields, merged into the record on `set`
    pub fields: Map<String, Value>,
}

impl Request {
    /// Build a request (client side)
    pub fn new(uuid: impl Into<String>, action: Action) -> Self {
        Self {
            uuid: uuid.into(),
            action,
            id: None,
            fields: Map::new(),
        }
    }

    /// Set the record key
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a payload field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Validate a decoded frame
    ///
    /// `UUID` and `ACTION` must be non-empty strings. A non-string `ID` is
    /// treated as absent.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Object(mut fields) = value else {
            return Err(RequestError::MissingUuidOrAction);
        };

        let uuid = take_string(&mut fields, FIELD_UUID);
        let action = take_string(&mut fields, FIELD_ACTION);
        let (Some(uuid), Some(action)) = (uuid, action) else {
            return Err(RequestError::MissingUuidOrAction);
        };

        let id = take_string(&mut fields, FIELD_ID);

        Ok(Self {
            uuid,
            action: Action::parse(&action),
            id,
            fields,
        })
    }

    /// Encode as the wire object
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(FIELD_UUID.to_string(), Value::String(self.uuid.clone()));
        map.insert(
            FIELD_ACTION.to_string(),
            Value::String(self.action.as_str().to_string()),
        );
        if let Some(ref id) = self.id {
            map.insert(FIELD_ID.to_string(), Value::String(id.clone()));
        }
        Value::Object(map)
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Response to a one-shot request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    #[serde(rename = "OK")]
    Success { data: Value },
    #[serde(rename = "Error")]
    Failure { message: String },
}

impl Response {
    /// `OK` carrying one record
    pub fn record(record: Record) -> Self {
        Response::Success {
            data: record.into_value(),
        }
    }

    /// `OK` carrying a sequence of records
    pub fn records(records: Vec<Record>) -> Self {
        Response::Success {
            data: Value::Array(records.into_iter().map(Record::into_value).collect()),
        }
    }

    /// `Error` with a message
    pub fn error(message: impl Into<String>) -> Self {
        Response::Failure {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Response::Success { data } => Some(data),
            Response::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Response::Success { .. } => None,
            Response::Failure { message } => Some(message),
        }
    }
}
