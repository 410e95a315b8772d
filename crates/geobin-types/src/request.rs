//! Request records stored per bin, and bin metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Geo;

/// One inbound webhook as stored in a bin.
///
/// Created once when the payload arrives and never modified afterwards.
/// The discovered points belong to the record and have no lifecycle of
/// their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeobinRequest {
    /// Arrival time in Unix seconds (UTC).
    #[ts(type = "number")]
    pub timestamp: i64,

    /// Request headers; repeated headers are joined with `", "`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Raw request body (lossily decoded as UTF-8).
    #[serde(default)]
    pub body: String,

    /// Geographic points discovered in the body; absent when none were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub geo: Option<Vec<Geo>>,
}

impl GeobinRequest {
    /// The discovered points, empty when there are none.
    pub fn points(&self) -> &[Geo] {
        self.geo.as_deref().unwrap_or_default()
    }
}

/// Response body for a newly created bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BinCreated {
    /// The bin name, used in every bin URL.
    pub id: String,

    /// Expiration time in Unix seconds (UTC).
    #[ts(type = "number")]
    pub expires: i64,
}
