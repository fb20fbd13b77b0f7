use serde::Deserialize;
use serde_json::Value;

use crate::config::Severity;

/// One log call read from a line of input.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LogLine {
    #[serde(default = "default_level")]
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub meta: Option<Value>,
}

fn default_level() -> String {
    Severity::Info.to_string()
}

/// Reads `{"level"?, "message", "meta"?}` objects; anything else is taken as
/// the message of an `info` call. Blank lines yield nothing.
#[must_use]
pub fn parse_line(line: &str) -> Option<LogLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    if line.trim_start().starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<LogLine>(line) {
            return Some(parsed);
        }
    }

    Some(LogLine {
        level: default_level(),
        message: line.to_string(),
        meta: None,
    })
}
