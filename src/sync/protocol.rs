// Protocol - Message types for chain synchronization
//
// Wire format: one JSON object per line, `{"type": <int>, "data": [...]}`
// - 0 QUERY_LATEST: ask for the peer's latest block
// - 1 QUERY_ALL: ask for the peer's whole chain
// - 2 RESPONSE_CHAIN: one block (latest) or the full chain
//
// RESPONSE_CHAIN carries no marker telling the two cases apart; the
// receiver decides by comparing against its own ledger.

use crate::ledger::Block;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Message has no type discriminator")]
    MissingType,

    #[error("Unknown message type: {0}")]
    UnknownType(i64),

    #[error("Chain response without data")]
    MissingData,

    #[error("Malformed chain data: {0}")]
    MalformedData(String),
}

/// Discriminator values on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    QueryLatest = 0,
    QueryAll = 1,
    ResponseChain = 2,
}

impl MessageType {
    /// Integer code used on the wire
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for MessageType {
    type Error = ProtocolError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::QueryLatest),
            1 => Ok(Self::QueryAll),
            2 => Ok(Self::ResponseChain),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// A protocol message exchanged between peers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub enum Message {
    QueryLatest,
    QueryAll,
    ResponseChain(Vec<Block>),
}

impl Message {
    /// Announcement carrying only the latest block
    pub fn response_latest(latest: Block) -> Self {
        Message::ResponseChain(vec![latest])
    }

    /// Response carrying the full chain
    pub fn response_chain(blocks: &[Block]) -> Self {
        Message::ResponseChain(blocks.to_vec())
    }

    /// Get the message type
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::QueryLatest => MessageType::QueryLatest,
            Message::QueryAll => MessageType::QueryAll,
            Message::ResponseChain(_) => MessageType::ResponseChain,
        }
    }

    /// Encode as a single JSON line (without the trailing newline)
    pub fn to_json(&self) -> String {
        serde_json::to_string(&WireMessage::from(self.clone())).unwrap_or_default()
    }

    /// Decode one JSON frame
    pub fn from_json(frame: &str) -> Result<Self, ProtocolError> {
        let wire: WireMessage =
            serde_json::from_str(frame).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Message::try_from(wire)
    }
}

/// Raw shape of a frame before the discriminator is checked
#[derive(Clone, Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type", default)]
    kind: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl TryFrom<WireMessage> for Message {
    type Error = ProtocolError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let kind = wire.kind.ok_or(ProtocolError::MissingType)?;
        match MessageType::try_from(kind)? {
            MessageType::QueryLatest => Ok(Message::QueryLatest),
            MessageType::QueryAll => Ok(Message::QueryAll),
            MessageType::ResponseChain => {
                let data = wire.data.ok_or(ProtocolError::MissingData)?;
                let blocks: Vec<Block> = serde_json::from_value(data)
                    .map_err(|e| ProtocolError::MalformedData(e.to_string()))?;
                Ok(Message::ResponseChain(blocks))
            }
        }
    }
}

impl From<Message> for WireMessage {
    fn from(msg: Message) -> Self {
        let kind = Some(msg.message_type().code());
        match msg {
            Message::QueryLatest | Message::QueryAll => Self { kind, data: None },
            Message::ResponseChain(blocks) => Self {
                kind,
                data: serde_json::to_value(blocks).ok(),
            },
        }
    }
}
