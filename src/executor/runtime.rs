use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{info, trace, warn};

use crate::actions::{DispatchOutcome, KnownElements, Rect};
use crate::config::Config;
use crate::executor::actions::ActionExecutor;

/// Runtime is responsible for:
/// - owning the per-session element registry
/// - compiling incoming perform-actions payloads
/// - replaying them through the low-level ActionExecutor
pub struct Runtime {
    config: Config,
    executor: ActionExecutor,
    elements: KnownElements,
}

impl Runtime {
    /// Create a new runtime with the given config and dry-run mode.
    /// The element registry is preloaded from `config.elements`.
    pub fn new(config: Config, dry_run: bool) -> Self {
        let elements = config
            .elements
            .iter()
            .map(|(handle, rect)| (handle.clone(), *rect))
            .collect();
        Self {
            config,
            executor: ActionExecutor::new(dry_run),
            elements,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn elements(&self) -> &KnownElements {
        &self.elements
    }

    /// Register (or move) an element for later element-relative origins.
    pub fn register_element(&mut self, handle: impl Into<String>, bounds: Rect) -> Option<Rect> {
        self.elements.insert(handle, bounds)
    }

    /// Enable or disable dry-run mode at runtime.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.executor.set_dry_run(dry_run);
    }

    /// Is dry-run currently enabled?
    pub fn is_dry_run(&self) -> bool {
        self.executor.is_dry_run()
    }

    /// Handle a perform-actions payload: `{"actions": [...]}`.
    pub fn run_event(&mut self, event: &Value) -> Result<DispatchOutcome> {
        let actions = event
            .get("actions")
            .filter(|v| v.is_array())
            .ok_or_else(|| anyhow!("Payload is missing array field 'actions'"))?;
        self.perform_actions(actions)
    }

    /// Compile and replay a raw `actions` array.
    ///
    /// Compile errors reject the payload before any input is sent. Injection
    /// failures are reported through the returned outcome.
    pub fn perform_actions(&mut self, actions: &Value) -> Result<DispatchOutcome> {
        let sources = actions.as_array().map_or(0, Vec::len);
        info!(target: "actionforge::runtime", sources, "Performing actions");

        let outcome = crate::actions::perform_actions(
            actions,
            &self.elements,
            &mut self.executor,
            self.config.dispatch.pacing,
        )
        .context("Failed to compile actions")?;

        // Modifiers must not outlive the request that pressed them.
        if let Err(err) = self.executor.release_modifiers() {
            warn!(target: "actionforge::runtime", error = %err, "Failed to release modifier keys");
        }

        if outcome.succeeded() {
            info!(
                target: "actionforge::runtime",
                injected = outcome.injected,
                "Actions performed"
            );
        } else {
            warn!(
                target: "actionforge::runtime",
                injected = outcome.injected,
                failed = outcome.failed,
                partial = outcome.is_partial_failure(),
                "Some input events could not be injected"
            );
        }
        trace!(target: "actionforge::runtime", ?outcome, "Dispatch outcome");
        Ok(outcome)
    }
}
