use serde_json::{Map, Value};

use crate::config::Config;
use crate::logs::entry::PendingEntry;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum EnrichError {
    #[error("log fields must be a JSON object, got {0}")]
    FieldsNotAnObject(&'static str),
}

/// Turns a raw log call into a [`PendingEntry`].
///
/// Applies the configured label and merges the static metadata under the
/// fields of the call. Never performs I/O.
#[derive(Clone, Debug, Default)]
pub struct Enricher {
    label: Option<String>,
    meta: Map<String, Value>,
    silent: bool,
}

impl Enricher {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Enricher {
            label: config.label.clone(),
            meta: config.meta.clone(),
            silent: config.silent,
        }
    }

    /// Returns `Ok(None)` when the shipper is silent: the call is acknowledged
    /// but nothing is queued.
    pub fn enrich(
        &self,
        level: &str,
        message: &str,
        fields: Option<Value>,
    ) -> Result<Option<PendingEntry>, EnrichError> {
        if self.silent {
            return Ok(None);
        }

        let fields = match fields {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(fields)) => fields,
            Some(other) => return Err(EnrichError::FieldsNotAnObject(kind_of(&other))),
        };

        let message = match &self.label {
            Some(label) if !label.is_empty() => format!("[{label}] {message}"),
            _ => message.to_string(),
        };

        // Call fields win over static metadata
        let mut meta = self.meta.clone();
        meta.extend(fields);

        Ok(Some(PendingEntry {
            level: level.to_string(),
            message,
            meta: if meta.is_empty() { None } else { Some(meta) },
        }))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
