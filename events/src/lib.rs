//! Shared event model and protobuf codec for the board channel.
//!
//! This crate owns the wire representation of everything that crosses a
//! board channel: the event-name vocabulary, the `Event` envelope, and the
//! binary codec. Payloads stay flexible (`serde_json::Value`) while the
//! envelope encodes over protobuf for compact transport.

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error returned by [`decode_event`] and [`EventName::parse`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireEvent`.
    #[error("failed to decode protobuf event: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The event name on the wire is not part of the board vocabulary.
    #[error("unknown event name: {0}")]
    Name(String),
}

/// Every event name that may appear on a board channel.
///
/// The vocabulary is closed: `board:fetch`, `card:move`, and `list:move`
/// are client-to-server requests, everything else is server-to-client
/// state. Names use the `"scope:verb"` convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventName {
    /// Request the full board snapshot.
    #[serde(rename = "board:fetch")]
    BoardFetch,
    /// Full board snapshot (lists, cards, users).
    #[serde(rename = "board:state")]
    BoardState,
    #[serde(rename = "list:created")]
    ListCreated,
    #[serde(rename = "list:updated")]
    ListUpdated,
    #[serde(rename = "list:deleted")]
    ListDeleted,
    /// Request to persist a list reposition.
    #[serde(rename = "list:move")]
    ListMove,
    #[serde(rename = "card:created")]
    CardCreated,
    #[serde(rename = "card:updated")]
    CardUpdated,
    #[serde(rename = "card:deleted")]
    CardDeleted,
    /// Request to persist a card reposition (possibly across lists).
    #[serde(rename = "card:move")]
    CardMove,
    /// Connected-user set changed.
    #[serde(rename = "presence:changed")]
    PresenceChanged,
}

impl EventName {
    /// Wire string for this event name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BoardFetch => "board:fetch",
            Self::BoardState => "board:state",
            Self::ListCreated => "list:created",
            Self::ListUpdated => "list:updated",
            Self::ListDeleted => "list:deleted",
            Self::ListMove => "list:move",
            Self::CardCreated => "card:created",
            Self::CardUpdated => "card:updated",
            Self::CardDeleted => "card:deleted",
            Self::CardMove => "card:move",
            Self::PresenceChanged => "presence:changed",
        }
    }

    /// Parse a wire string back into an event name.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Name`] for strings outside the vocabulary.
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        match name {
            "board:fetch" => Ok(Self::BoardFetch),
            "board:state" => Ok(Self::BoardState),
            "list:created" => Ok(Self::ListCreated),
            "list:updated" => Ok(Self::ListUpdated),
            "list:deleted" => Ok(Self::ListDeleted),
            "list:move" => Ok(Self::ListMove),
            "card:created" => Ok(Self::CardCreated),
            "card:updated" => Ok(Self::CardUpdated),
            "card:deleted" => Ok(Self::CardDeleted),
            "card:move" => Ok(Self::CardMove),
            "presence:changed" => Ok(Self::PresenceChanged),
            _ => Err(CodecError::Name(name.to_owned())),
        }
    }
}

/// A single message on the board channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event (UUID string).
    pub id: String,
    /// Milliseconds since the Unix epoch when the event was created.
    pub ts: i64,
    /// Board context for this event, if any (UUID string).
    pub board_id: Option<String>,
    /// Sender identifier (user ID or system label).
    pub from: Option<String>,
    /// Namespaced event name, e.g. `card:updated`.
    pub name: EventName,
    /// Arbitrary JSON payload.
    pub payload: Value,
}

/// Encode an event into protobuf bytes.
#[must_use]
pub fn encode_event(event: &Event) -> Vec<u8> {
    let wire = WireEvent {
        id: event.id.clone(),
        ts: event.ts,
        board_id: event.board_id.clone(),
        from: event.from.clone(),
        name: event.name.as_str().to_owned(),
        payload: Some(json_to_proto(&event.payload)),
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a growable Vec cannot hit BufferTooSmall.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into an event.
///
/// A missing payload decodes as an empty JSON object.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::Name`] for names outside the vocabulary.
pub fn decode_event(bytes: &[u8]) -> Result<Event, CodecError> {
    let wire = WireEvent::decode(bytes)?;

    Ok(Event {
        id: wire.id,
        ts: wire.ts,
        board_id: wire.board_id,
        from: wire.from,
        name: EventName::parse(&wire.name)?,
        payload: wire
            .payload
            .map_or(Value::Object(Map::new()), |v| proto_to_json(&v)),
    })
}

fn json_to_proto(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(v) => Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto).collect(),
        }),
        Value::Object(v) => Kind::StructValue(prost_types::Struct {
            fields: v.iter().map(|(k, v)| (k.clone(), json_to_proto(v))).collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        Kind::NullValue(_) => Value::Null,
        Kind::BoolValue(v) => Value::Bool(*v),
        // Non-finite numbers have no JSON form; they decode as null.
        Kind::NumberValue(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Kind::StringValue(v) => Value::String(v.clone()),
        Kind::ListValue(v) => Value::Array(v.values.iter().map(proto_to_json).collect()),
        Kind::StructValue(v) => {
            Value::Object(v.fields.iter().map(|(k, v)| (k.clone(), proto_to_json(v))).collect())
        }
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireEvent {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(int64, tag = "2")]
    ts: i64,
    #[prost(string, optional, tag = "3")]
    board_id: Option<String>,
    #[prost(string, optional, tag = "4")]
    from: Option<String>,
    #[prost(string, tag = "5")]
    name: String,
    #[prost(message, optional, tag = "6")]
    payload: Option<prost_types::Value>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
