#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for Actionforge.

This module wires together:
- `actions`: the Enigo-backed input injector (mouse, keyboard, modifiers)
- `runtime`: payload handling on top of the actions compiler

Typical usage:
- Construct a `Runtime` with a loaded `Config`.
- Call `Runtime::run_event` with an incoming perform-actions payload.

Example:
```no_run
use actionforge::config::Config;
use actionforge::executor::Runtime;
use serde_json::json;

let cfg: Config = Default::default();
let mut rt = Runtime::new(cfg, true); // dry-run mode
let payload = json!({"actions": [{
    "type": "key", "id": "kbd",
    "actions": [{"type": "keyDown", "value": "a"}, {"type": "keyUp", "value": "a"}]
}]});
let outcome = rt.run_event(&payload)?;
assert!(outcome.succeeded());
# Ok::<(), anyhow::Error>(())
```

Public re-exports:
- `ActionExecutor`: injects input events (respecting dry-run).
- `Runtime`: compiles and replays payloads.
*/

pub mod actions;
pub mod runtime;

// Re-exports for convenient access from `actionforge::executor::*`
pub use actions::ActionExecutor;
pub use runtime::Runtime;
