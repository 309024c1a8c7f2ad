use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CertificateType {
    Production,
    Consumption,
    #[serde(other)]
    Other,
}

/// Ledger-assigned identity of a certificate: the registry it lives in and its stream id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedStreamId {
    pub registry: String,
    pub stream_id: String,
}

impl FederatedStreamId {
    pub fn new(registry: &str, stream_id: &str) -> Self {
        Self {
            registry: registry.to_string(),
            stream_id: stream_id.to_string(),
        }
    }
}

impl fmt::Display for FederatedStreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.stream_id)
    }
}

/// Certificates only match inside the same grid area and the exact same interval.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub grid_area: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}..{})",
            self.grid_area,
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub federated_id: FederatedStreamId,
    pub grid_area: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub certificate_type: CertificateType,
    pub quantity: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Certificate {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            grid_area: self.grid_area.clone(),
            start: self.start,
            end: self.end,
        }
    }

    pub fn is_available(&self) -> bool {
        self.quantity > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_id: String,
    pub enrolled_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(subject_id: &str, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            enrolled_at,
        }
    }
}
