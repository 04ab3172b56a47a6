//! Wire format: one JSON object per text frame, discriminated by `type`.

use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, DecodeError};
use crate::state::{AttackMap, Creep, PlayerState};

// --- IDS & COORDINATES ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TowerId(pub u32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CreepId(pub u32);

/// Logical grid cell, column then row.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub fn new(x: u32, y: u32) -> Cell {
        Cell { x, y }
    }
}

// --- OUTBOUND ---

/// What an armed tower click asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TowerIntent {
    Build(usize),
    Demolish,
}

/// Sent as `towerID`: the tower type index, or `"delete_tower"`.
impl Serialize for TowerIntent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TowerIntent::Build(index) => serializer.serialize_u64(*index as u64),
            TowerIntent::Demolish => serializer.serialize_str("delete_tower"),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerOrder {
    pub x: u32,
    pub y: u32,
    #[serde(rename = "towerID")]
    pub tower: TowerIntent,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreepEncoding {
    /// `{"creepID": k}`
    #[default]
    Structured,
    /// `"type:k"`
    Legacy,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CreepOrder {
    Structured {
        #[serde(rename = "creepID")]
        creep_id: usize,
    },
    Legacy(String),
}

impl CreepOrder {
    pub fn encode(kind: usize, encoding: CreepEncoding) -> CreepOrder {
        match encoding {
            CreepEncoding::Structured => CreepOrder::Structured { creep_id: kind },
            CreepEncoding::Legacy => CreepOrder::Legacy(format!("type:{}", kind)),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum OutboundRequest {
    #[serde(rename = "chat")]
    Chat { id: PlayerId, msg: String },
    #[serde(rename = "towerRequest")]
    TowerRequest { id: PlayerId, msg: TowerOrder },
    #[serde(rename = "creepRequest")]
    CreepRequest { id: PlayerId, msg: CreepOrder },
}

impl OutboundRequest {
    pub fn chat(id: PlayerId, text: impl Into<String>) -> OutboundRequest {
        OutboundRequest::Chat { id, msg: text.into() }
    }

    pub fn tower(id: PlayerId, cell: Cell, tower: TowerIntent) -> OutboundRequest {
        OutboundRequest::TowerRequest {
            id,
            msg: TowerOrder { x: cell.x, y: cell.y, tower },
        }
    }

    pub fn creep(id: PlayerId, kind: usize, encoding: CreepEncoding) -> OutboundRequest {
        OutboundRequest::CreepRequest {
            id,
            msg: CreepOrder::encode(kind, encoding),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundRequest::Chat { .. } => "chat",
            OutboundRequest::TowerRequest { .. } => "towerRequest",
            OutboundRequest::CreepRequest { .. } => "creepRequest",
        }
    }

    pub fn to_frame(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(ClientError::Encode)
    }
}

// --- INBOUND ---

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub id: PlayerId,
    pub msg: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TowerSnapshot {
    pub id: TowerId,
    pub x: u32,
    pub y: u32,
    #[serde(default, rename = "towerID")]
    pub kind: Option<u32>,
}

impl TowerSnapshot {
    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }
}

/// Server verdict on a `towerRequest`. Legacy servers send the flags as
/// `"true"`/`"false"` strings.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TowerAck {
    #[serde(default, deserialize_with = "loose_bool")]
    pub tower_accepted: bool,
    #[serde(default)]
    pub tower: Option<TowerSnapshot>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub tower_deleted: bool,
    #[serde(default)]
    pub x: Option<u32>,
    #[serde(default)]
    pub y: Option<u32>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, rename = "player_id")]
    pub player_id: Option<PlayerId>,
}

impl TowerAck {
    /// Cell of a confirmed demolition.
    pub fn deleted_cell(&self) -> Option<Cell> {
        match (self.tower_deleted, self.x, self.y) {
            (true, Some(x), Some(y)) => Some(Cell::new(x, y)),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CreepAck {
    #[serde(default, deserialize_with = "loose_bool")]
    pub accepted: bool,
    #[serde(default, rename = "creepID")]
    pub creep_id: Option<usize>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Authoritative push. Each present field replaces its holder; absent or
/// `null` fields leave the holder as it was.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StateUpdate {
    #[serde(default, rename = "playerState")]
    pub player_state: Option<PlayerState>,
    #[serde(default, alias = "creepLoc")]
    pub creeps: Option<Vec<Creep>>,
    #[serde(default, alias = "attacksMade")]
    pub attacks: Option<AttackMap>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Chat(ChatLine),
    TowerAck(TowerAck),
    CreepAck(CreepAck),
    StateUpdate(StateUpdate),
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Chat(_) => "chat",
            InboundMessage::TowerAck(_) => "towerRequestAck",
            InboundMessage::CreepAck(_) => "creepRequestAck",
            InboundMessage::StateUpdate(_) => "gameUpdate",
        }
    }
}

/// Parses one text frame. The `type` field is read first, then the same
/// object is decoded as that type's payload.
pub fn decode_frame(raw: &str) -> Result<InboundMessage, DecodeError> {
    let mut value: Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;
    let kind = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
        _ => return Err(DecodeError::NotAnObject),
    };

    match kind.as_str() {
        "chat" => payload(value, kind).map(InboundMessage::Chat),
        "towerRequestAck" | "tower_update" => payload(value, kind).map(InboundMessage::TowerAck),
        "creepRequestAck" => payload(value, kind).map(InboundMessage::CreepAck),
        "gameUpdate" | "stateUpdate" => {
            if let Value::Object(map) = &mut value {
                for (key, alias) in [("creeps", "creepLoc"), ("attacks", "attacksMade")] {
                    if map.contains_key(key) {
                        map.remove(alias);
                    }
                }
            }
            payload(value, kind).map(InboundMessage::StateUpdate)
        }
        _ => Err(DecodeError::UnknownType(kind)),
    }
}

fn payload<T: DeserializeOwned>(value: Value, kind: String) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::BadPayload { kind, source })
}

fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Flag(bool),
        Text(String),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Flag(flag) => flag,
        Loose::Text(text) => text.eq_ignore_ascii_case("true"),
    })
}
