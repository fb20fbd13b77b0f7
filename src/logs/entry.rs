use serde::Serialize;
use serde_json::{Map, Value};

///
/// One normalized log record waiting to be shipped.
///
/// Serialized as a single JSON line. `meta` is left out entirely when there is
/// no metadata, it is never sent as `{}`.
///
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PendingEntry {
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}
