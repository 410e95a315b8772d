//! Turning a raw webhook body into a stored request record.

use std::collections::BTreeMap;

use geobin_types::GeobinRequest;
use serde_json::Value;
use tracing::debug;

use crate::engine::Detector;

impl Detector {
    /// Decode `body` and build the request record for it.
    ///
    /// Object and array payloads are searched for geo data. Any other
    /// payload (a JSON scalar, or bytes that are not JSON at all) is still
    /// recorded, just without points.
    pub async fn inspect(
        &self,
        timestamp: i64,
        headers: BTreeMap<String, String>,
        body: &[u8],
    ) -> GeobinRequest {
        let geo = match serde_json::from_slice::<Value>(body) {
            Ok(document @ (Value::Object(_) | Value::Array(_))) => self.detect(document).await,
            Ok(_) => {
                debug!("payload is a JSON scalar, skipping geo detection");
                Vec::new()
            }
            Err(e) => {
                debug!(error = %e, "payload is not JSON, skipping geo detection");
                Vec::new()
            }
        };

        GeobinRequest {
            timestamp,
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
            geo: (!geo.is_empty()).then_some(geo),
        }
    }
}
