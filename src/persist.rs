//! Tagged-versioned persistence envelope. Each persisted type declares a
//! numeric type-tag and an integer version; upgrade functions migrate old
//! payloads forward.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub type_tag: u16,
    pub version: u16,
    pub payload: T,
}

impl<T: Serialize> Versioned<T> {
    pub fn new(type_tag: u16, version: u16, payload: T) -> Self {
        Versioned {
            type_tag,
            version,
            payload,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::bad_input(e.to_string()))
    }
}

pub const TIMESTAMP_DATA_TYPE_TAG: u16 = 1;
pub const TIMESTAMP_DATA_CURRENT_VERSION: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampKind {
    Archived,
    ModifiedFile,
    ModifiedAggregate,
    ModifiedDomain,
    Imported,
    Deleted,
    PreviouslyImported,
    LastViewed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimestampLocation {
    ServiceId(String),
    Domain(String),
    Tag(String),
    None,
}

/// Used by the rule engine's search semantics only; not read by the visual
/// engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampData {
    pub kind: TimestampKind,
    pub location: TimestampLocation,
    pub timestamp_ms: Option<i64>,
}

impl TimestampData {
    /// Location-presence rules are fixed by kind: a service identifier for
    /// imported/deleted/previously-imported, a domain string for
    /// modified-domain, a tag for last-viewed, absent for the rest.
    pub fn location_is_valid(&self) -> bool {
        use TimestampKind::*;
        use TimestampLocation as Loc;
        match (self.kind, &self.location) {
            (Imported | Deleted | PreviouslyImported, Loc::ServiceId(_)) => true,
            (ModifiedDomain, Loc::Domain(_)) => true,
            (LastViewed, Loc::Tag(_)) => true,
            (Archived | ModifiedFile | ModifiedAggregate, Loc::None) => true,
            _ => false,
        }
    }
}

/// Deserialized payload shape for version 1, where timestamps were stored
/// in whole seconds.
#[derive(Debug, Clone, Deserialize)]
struct TimestampDataV1 {
    kind: TimestampKind,
    location: TimestampLocation,
    timestamp_s: Option<i64>,
}

/// v1 -> v2: multiply whole-second timestamps by 1000 to get milliseconds.
pub fn migrate_timestamp_data_v1_to_v2(v1: TimestampDataV1) -> TimestampData {
    TimestampData {
        kind: v1.kind,
        location: v1.location,
        timestamp_ms: v1.timestamp_s.map(|s| s * 1000),
    }
}

/// Load a persisted `TimestampData` envelope, migrating from v1 if needed.
pub fn load_timestamp_data(versioned: Versioned<serde_json::Value>) -> Result<TimestampData> {
    match versioned.version {
        1 => {
            let v1: TimestampDataV1 = serde_json::from_value(versioned.payload)
                .map_err(|e| Error::bad_input(e.to_string()))?;
            Ok(migrate_timestamp_data_v1_to_v2(v1))
        }
        2 => serde_json::from_value(versioned.payload).map_err(|e| Error::bad_input(e.to_string())),
        other => Err(Error::bad_input(format!(
            "unsupported TimestampData version {other}"
        ))),
    }
}
