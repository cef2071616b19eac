/*!
Payload sources (ingress layer).

This module defines the `PayloadSource` trait and orchestration helpers
(`build_sources_from_config`, `spawn_all_sources`). Concrete implementations
live in their own files:

- `file.rs`         -> `FileSource`  (poll a single drop file)
- `stdin_source.rs` -> `StdinSource` (newline-delimited JSON from standard input)

Each source is responsible for:
- Parsing raw input into `serde_json::Value` and normalizing it with
  [`normalize_payload`]
- Pushing payloads via `Sender<Value>` while respecting backpressure (`send().await`)
- Logging errors and continuing (never panicking inside tasks)
- Ending cleanly when the channel closes

The binary drains the channel one payload at a time, so requests reach the
device strictly in sequence.
*/

use serde_json::{Map, Value};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, warn};

use crate::config::{Config, SourceConfig};

pub mod file;
pub mod stdin_source;

pub use file::FileSource;
pub use stdin_source::StdinSource;

/// Trait implemented by all payload sources.
///
/// A source spawns an asynchronous task that produces perform-actions payloads
/// and sends them into the provided channel.
pub trait PayloadSource: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Start the source in the background.
    fn start(&self, sender: Sender<Value>) -> JoinHandle<()>;
}

/// Bring an ingested JSON document into the `{"actions": [...]}` shape.
///
/// A bare array is taken as the `actions` list itself. Anything else that has
/// no `actions` array is dropped with a warning.
pub fn normalize_payload(value: Value, origin: &str) -> Option<Value> {
    match value {
        Value::Array(actions) => {
            let mut payload = Map::new();
            payload.insert("actions".into(), Value::Array(actions));
            Some(Value::Object(payload))
        }
        Value::Object(obj) if obj.get("actions").is_some_and(Value::is_array) => {
            Some(Value::Object(obj))
        }
        other => {
            warn!(
                target: "actionforge::sources",
                %origin, kind = json_kind(&other),
                "Ignoring payload without an 'actions' array"
            );
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Construct all configured sources, in config order.
pub fn build_sources_from_config(cfg: &Config) -> Vec<Box<dyn PayloadSource>> {
    cfg.sources
        .iter()
        .map(|sc| -> Box<dyn PayloadSource> {
            match sc {
                SourceConfig::File {
                    path,
                    poll_ms,
                    delete_on_success,
                } => Box::new(FileSource::new(path.clone(), *poll_ms, *delete_on_success)),
                SourceConfig::Stdin => Box::new(StdinSource::new()),
            }
        })
        .collect()
}

/// Spawn every source, returning their `JoinHandle`s.
pub fn spawn_all_sources(
    sources: &[Box<dyn PayloadSource>],
    sender: Sender<Value>,
) -> Vec<JoinHandle<()>> {
    sources
        .iter()
        .map(|src| {
            info!(
                target: "actionforge::sources",
                source = %src.name(),
                "Starting source task"
            );
            src.start(sender.clone())
        })
        .collect()
}
