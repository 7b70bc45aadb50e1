//! Record encoding.
//!
//! An [`Encoder`] turns a [`LogEvent`] into the bytes handed to a sink. The
//! default [`JsonEncoder`] writes one JSON object per line:
//!
//! ```text
//! {"level":"WARN","ts":"2024.05.01 13:37:00","caller":"src/main.rs:12","msg":"disk low","free_mb":12}
//! ```

use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::LogEvent;

/// Timestamp layout written into every record.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Key holding the capitalized severity.
pub const LEVEL_KEY: &str = "level";
/// Key holding the formatted timestamp.
pub const TIME_KEY: &str = "ts";
/// Key holding the call site.
pub const CALLER_KEY: &str = "caller";
/// Key holding the message.
pub const MESSAGE_KEY: &str = "msg";

const RESERVED_KEYS: [&str; 4] = [LEVEL_KEY, TIME_KEY, CALLER_KEY, MESSAGE_KEY];

/// Serializes events into sink-ready bytes.
pub trait Encoder: Send + Sync {
    /// Encodes one event as a complete record, including any terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be serialized.
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>>;
}

/// Line-delimited JSON encoder.
///
/// Core keys come first in a fixed order, followed by the event's fields in
/// call order. A field whose key collides with a core key is written as
/// `fields.<key>` so the core keys stay unambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    /// Creates a new JSON encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, event: &LogEvent) -> Result<Vec<u8>> {
        let mut record = Map::with_capacity(RESERVED_KEYS.len() + event.fields.len());
        record.insert(LEVEL_KEY.to_string(), Value::from(event.severity.as_str()));
        record.insert(
            TIME_KEY.to_string(),
            Value::from(event.timestamp.format(TIMESTAMP_FORMAT).to_string()),
        );
        record.insert(CALLER_KEY.to_string(), Value::from(event.caller.to_string()));
        record.insert(MESSAGE_KEY.to_string(), Value::from(event.message.as_str()));

        for field in &event.fields {
            let key = if RESERVED_KEYS.contains(&field.key.as_str()) {
                format!("fields.{}", field.key)
            } else {
                field.key.clone()
            };
            record.insert(key, field.value.clone());
        }

        let mut bytes = serde_json::to_vec(&Value::Object(record))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Caller, KeyValues, Severity};
    use chrono::{Local, TimeZone};
    use serde_json::json;

    fn make_event() -> LogEvent {
        let mut event = LogEvent::new(
            Severity::Warn,
            Caller {
                file: "crates/app/src/main.rs",
                line: 12,
            },
            "disk low",
        );
        event.timestamp = Local
            .with_ymd_and_hms(2024, 5, 1, 13, 37, 0)
            .single()
            .expect("unambiguous local time");
        event
    }

    fn decode(bytes: &[u8]) -> Map<String, Value> {
        let line = std::str::from_utf8(bytes).expect("utf8");
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        match serde_json::from_str::<Value>(line).expect("valid json") {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn encodes_core_keys_in_order() {
        let bytes = JsonEncoder::new().encode(&make_event()).expect("encode");
        let record = decode(&bytes);

        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["level", "ts", "caller", "msg"]);
        assert_eq!(record["level"], json!("WARN"));
        assert_eq!(record["ts"], json!("2024.05.01 13:37:00"));
        assert_eq!(record["caller"], json!("src/main.rs:12"));
        assert_eq!(record["msg"], json!("disk low"));
    }

    #[test]
    fn encodes_fields_after_core_keys() {
        let event = make_event().with_fields(
            KeyValues::new()
                .with("free_mb", 12)
                .with("mount", "/var"),
        );
        let record = decode(&JsonEncoder::new().encode(&event).expect("encode"));

        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["level", "ts", "caller", "msg", "free_mb", "mount"]);
        assert_eq!(record["free_mb"], json!(12));
    }

    #[test]
    fn colliding_field_keys_are_prefixed() {
        let event = make_event().with_fields(KeyValues::new().with("msg", "shadow"));
        let record = decode(&JsonEncoder::new().encode(&event).expect("encode"));

        assert_eq!(record["msg"], json!("disk low"));
        assert_eq!(record["fields.msg"], json!("shadow"));
    }

    #[test]
    fn message_with_newline_stays_on_one_line() {
        let mut event = make_event();
        event.message = "first\nsecond".to_string();
        let record = decode(&JsonEncoder::new().encode(&event).expect("encode"));
        assert_eq!(record["msg"], json!("first\nsecond"));
    }
}
