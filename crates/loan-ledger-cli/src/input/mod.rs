pub mod file;
pub mod stdin;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Load the JSON payload for a command: `--input` file first, then piped stdin.
pub fn read_payload(path: Option<&str>) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(file::read_json_value(p)?)),
        None => stdin::read_stdin(),
    }
}

/// Same as [`read_payload`] but fails when nothing was supplied.
pub fn require_payload(
    path: Option<&str>,
    what: &str,
) -> Result<Value, Box<dyn std::error::Error>> {
    read_payload(path)?.ok_or_else(|| {
        format!("{what} input required: pass --input <file> or pipe JSON on stdin").into()
    })
}

/// Fill in `today` when the payload does not carry one, then deserialise.
pub fn with_today<T: DeserializeOwned>(
    mut value: Value,
    today: NaiveDate,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Value::Object(map) = &mut value {
        map.entry("today")
            .or_insert_with(|| Value::String(today.format("%Y-%m-%d").to_string()));
    }
    Ok(serde_json::from_value(value)?)
}
