//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Server-assigned identifier of a mouse.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MouseId(i64);

/// Server-assigned identifier of a category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(MouseId, "MouseId");
impl_int_newtype!(CategoryId, "CategoryId");

/// Prefix of client-generated placeholder ids.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Identity of a catalog entity as seen by a client.
///
/// Entities created while offline carry a `Temp` id until the server confirms
/// them and assigns a canonical `Server` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Server(MouseId),
    Temp(String),
}

impl EntityId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, EntityId::Temp(_))
    }

    pub fn server_id(&self) -> Option<MouseId> {
        match self {
            EntityId::Server(id) => Some(*id),
            EntityId::Temp(_) => None,
        }
    }
}

impl From<MouseId> for EntityId {
    fn from(value: MouseId) -> Self {
        EntityId::Server(value)
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EntityId::Server(id) => core::fmt::Display::fmt(id, f),
            EntityId::Temp(raw) => f.write_str(raw),
        }
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(TEMP_ID_PREFIX) {
            return Ok(EntityId::Temp(s.to_string()));
        }
        s.parse::<MouseId>().map(EntityId::Server)
    }
}

/// Generates `temp_<unix millis>` ids, unique within one process.
///
/// Two ids requested in the same millisecond get a `_<n>` suffix.
#[derive(Debug, Default)]
pub struct TempIdGenerator {
    last: Mutex<(i64, u32)>,
}

impl TempIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> EntityId {
        let now = Utc::now().timestamp_millis();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if last.0 == now {
            last.1 += 1;
            EntityId::Temp(format!("{TEMP_ID_PREFIX}{now}_{}", last.1))
        } else {
            *last = (now, 0);
            EntityId::Temp(format!("{TEMP_ID_PREFIX}{now}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn entity_id_serializes_untagged() {
        let server = EntityId::Server(MouseId::new(7));
        let temp = EntityId::Temp("temp_1700000000000".into());

        assert_eq!(serde_json::to_string(&server).unwrap(), "7");
        assert_eq!(serde_json::to_string(&temp).unwrap(), "\"temp_1700000000000\"");

        let back: EntityId = serde_json::from_str("7").unwrap();
        assert_eq!(back, server);
        let back: EntityId = serde_json::from_str("\"temp_1700000000000\"").unwrap();
        assert_eq!(back, temp);
    }

    #[test]
    fn entity_id_parses_from_path_segments() {
        assert_eq!("42".parse::<EntityId>().unwrap(), EntityId::Server(MouseId::new(42)));
        assert!("temp_1".parse::<EntityId>().unwrap().is_temporary());
        assert!("abc".parse::<EntityId>().is_err());
    }

    #[test]
    fn temp_ids_are_unique_and_prefixed() {
        let generator = TempIdGenerator::new();
        let ids: HashSet<String> = (0..200).map(|_| generator.next_id().to_string()).collect();
        assert_eq!(ids.len(), 200);
        assert!(ids.iter().all(|id| id.starts_with(TEMP_ID_PREFIX)));
    }
}
