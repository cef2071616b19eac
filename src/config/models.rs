use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use crate::actions::Rect;

/// Root configuration for Actionforge.
///
/// Deserialized from a JSON configuration file. It describes:
/// - where perform-actions payloads come from (`sources`)
/// - the element registry used for element-relative pointer origins (`elements`)
/// - how compiled timelines are replayed (`dispatch`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct Config {
    /// Payload input sources (file, stdin).
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Known element handles and their on-screen bounds.
    /// Example: `{ "submit": { "x": 10, "y": 20, "width": 80, "height": 24 } }`
    #[serde(default)]
    pub elements: ElementMap,

    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Element handle -> bounds.
pub type ElementMap = BTreeMap<String, Rect>;

/// Payload source configuration.
/// Use `type` to select a variant:
/// - "file": poll a single drop file
/// - "stdin": read newline-delimited JSON from standard input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Poll a single file for perform-actions payloads.
    File {
        /// Absolute or relative path to the file.
        path: String,
        /// Poll interval in milliseconds (default: 100).
        #[serde(default)]
        poll_ms: Option<u64>,
        /// Delete the file after a successful read/parse (default: false).
        #[serde(default)]
        delete_on_success: Option<bool>,
    },

    /// Read payloads from standard input (one JSON document per line).
    Stdin,
}

/// Replay settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Sleep between ticks so that replay follows the requested timing
    /// (default: true). Disable to replay as fast as possible.
    #[serde(default = "default_pacing")]
    pub pacing: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pacing: default_pacing(),
        }
    }
}

fn default_pacing() -> bool {
    true
}

/// Logging level enumeration.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
