use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Serialize a command result as JSON, indented unless `compact`.
pub fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    rendered.map_err(|e| format!("Failed to serialize result: {}", e))
}

/// Print `json` on stdout, or write it to `path` without a trailing newline.
pub fn write_output(json: &str, path: Option<&str>) -> Result<(), String> {
    let Some(path) = path else {
        return writeln!(std::io::stdout().lock(), "{}", json)
            .map_err(|e| format!("Failed to write to stdout: {}", e));
    };
    std::fs::write(Path::new(path), json)
        .map_err(|e| format!("Failed to write '{}': {}", path, e))
}

/// Serialize `value` and send it wherever `path` says.
pub fn emit<T: Serialize>(value: &T, compact: bool, path: Option<&str>) -> Result<(), String> {
    write_output(&to_json(value, compact)?, path)
}
