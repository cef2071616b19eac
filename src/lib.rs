#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Actionforge compiles W3C WebDriver actions into time-ordered synthetic input
//! events and replays them on the local desktop through Enigo.
//!
//! Modules:
//! - `actions`: the compiler core (validation, tokenization, dispatch).
//! - `config`: Configuration models, loader, and schema helpers.
//! - `executor`: Enigo-backed input injection and the request runtime.
//! - `sources`: Payload sources (file, stdin).
//!
//! Use `actionforge::prelude::*` to bring commonly used items into scope quickly.

/// Public module: the W3C actions compiler.
pub mod actions;
/// Public module: configuration (models, loader, schema helpers).
pub mod config;
/// Public module: input injection and runtime.
pub mod executor;
/// Public module: payload sources (file, stdin).
pub mod sources;

use config::LogLevel;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Initialize tracing (logging) with a reasonable default.
/// - Honors the `RUST_LOG` environment variable if it names a level.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LogLevel>().ok())
        .unwrap_or(LogLevel::Info);
    init_tracing_with_level(level);
}

/// Initialize tracing at an explicit level, ignoring `RUST_LOG`.
pub fn init_tracing_with_level(level: LogLevel) {
    use tracing_subscriber::fmt;

    // Ignore the error if the global subscriber was already set.
    let _ = fmt()
        .with_max_level(tracing::Level::from(level))
        .try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use actionforge::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Compiler entry points
    pub use crate::actions::{
        ActionsError, DispatchOutcome, ElementBoundsResolver, InputEvent, InputInjector,
        KnownElements, Rect, Timeline, compile, perform_actions,
    };

    // External crates (namespaced) if callers want direct access
    pub use crate as actionforge;
    pub use enigo;

    // Frequently used internal modules
    pub use crate::{actions, config, executor, sources};
}
