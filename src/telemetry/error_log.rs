//! JSON formatter for the error log.
//!
//! Unlike `fmt::layer().json()`, fields that carry serialized JSON (the
//! normalized `errors` list) are written back as nested JSON values, so
//! each error log line can be queried without a second decode.

use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{fmt::MakeWriter, layer::Context, Layer};

use crate::timestamp;

/// Event fields whose text is JSON and is embedded as-is
pub const JSON_FIELDS: &[&str] = &["errors"];

const MESSAGE: &str = "message";

/// Writes one JSON object per event to `W`
pub struct ErrorLogLayer<W> {
    writer: W,
}

impl<W> ErrorLogLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn serialize(&self, event: &Event<'_>) -> Result<Vec<u8>, serde_json::Error> {
        let metadata = event.metadata();
        let mut fields = JsonFields::default();
        fields
            .map
            .insert("timestamp".to_string(), Value::from(timestamp::timestamp()));
        fields
            .map
            .insert("level".to_string(), Value::from(metadata.level().as_str()));
        fields
            .map
            .insert("target".to_string(), Value::from(metadata.target()));
        event.record(&mut fields);

        let mut buffer = serde_json::to_vec(&fields.map)?;
        buffer.push(b'\n');
        Ok(buffer)
    }

    /// Single `write_all` so concurrent events never interleave
    fn flush(&self, buffer: &[u8]) -> std::io::Result<()> {
        self.writer.make_writer().write_all(buffer)
    }
}

impl<W> fmt::Debug for ErrorLogLayer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorLogLayer").finish_non_exhaustive()
    }
}

impl<S, W> Layer<S> for ErrorLogLayer<W>
where
    S: Subscriber,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if let Ok(buffer) = self.serialize(event) {
            let _ = self.flush(&buffer);
        }
    }
}

#[derive(Default)]
struct JsonFields {
    map: Map<String, Value>,
}

impl JsonFields {
    fn insert_text(&mut self, field: &Field, text: String) {
        let value = if JSON_FIELDS.contains(&field.name()) {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };
        self.map.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFields {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.map.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.map.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.map.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        // `%value` fields arrive here too, already in Display form
        let text = format!("{:?}", value);
        if field.name() == MESSAGE {
            self.map.insert(MESSAGE.to_string(), Value::String(text));
        } else {
            self.insert_text(field, text);
        }
    }
}
