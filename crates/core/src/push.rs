//! Server-to-client change notifications.
//!
//! Wire shape: `{"type": "NEW_MOUSE", "data": {...}, "meta": {...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::MouseId;
use crate::mouse::Mouse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMeta {
    pub timestamp: DateTime<Utc>,
}

impl PushMeta {
    pub fn now() -> Self {
        Self { timestamp: Utc::now() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRef {
    pub id: MouseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushMessage {
    NewMouse {
        data: Mouse,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<PushMeta>,
    },
    UpdatedMouse {
        data: Mouse,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<PushMeta>,
    },
    DeletedMouse {
        data: DeletedRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<PushMeta>,
    },
    /// Full snapshot; always the first message on a new connection.
    InitialData {
        data: Vec<Mouse>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<PushMeta>,
    },
}

impl PushMessage {
    pub fn new_mouse(mouse: Mouse) -> Self {
        PushMessage::NewMouse { data: mouse, meta: Some(PushMeta::now()) }
    }

    pub fn updated_mouse(mouse: Mouse) -> Self {
        PushMessage::UpdatedMouse { data: mouse, meta: Some(PushMeta::now()) }
    }

    pub fn deleted_mouse(id: MouseId) -> Self {
        PushMessage::DeletedMouse { data: DeletedRef { id }, meta: Some(PushMeta::now()) }
    }

    pub fn initial_data(mice: Vec<Mouse>) -> Self {
        PushMessage::InitialData { data: mice, meta: Some(PushMeta::now()) }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PushMessage::NewMouse { .. } => "NEW_MOUSE",
            PushMessage::UpdatedMouse { .. } => "UPDATED_MOUSE",
            PushMessage::DeletedMouse { .. } => "DELETED_MOUSE",
            PushMessage::InitialData { .. } => "INITIAL_DATA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mouse::NewMouse;

    #[test]
    fn messages_carry_screaming_type_tags() {
        let mouse = NewMouse::new("Zowie EC2", 69.99).into_mouse(MouseId::new(3));
        let json = serde_json::to_value(PushMessage::new_mouse(mouse)).unwrap();
        assert_eq!(json["type"], "NEW_MOUSE");
        assert_eq!(json["data"]["name"], "Zowie EC2");
        assert!(json["meta"]["timestamp"].is_string());

        let json = serde_json::to_value(PushMessage::deleted_mouse(MouseId::new(3))).unwrap();
        assert_eq!(json["type"], "DELETED_MOUSE");
        assert_eq!(json["data"]["id"], 3);
    }

    #[test]
    fn meta_is_optional_on_the_wire() {
        let raw = r#"{"type":"INITIAL_DATA","data":[]}"#;
        let msg: PushMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg, PushMessage::InitialData { data: vec![], meta: None });
        assert_eq!(msg.kind(), "INITIAL_DATA");
    }
}
