/*!
W3C actions compiler.

A perform-actions request runs through three stages:
- `preprocessor`: parse the raw JSON `actions` array and validate it
- `tokenizer`: compile the sources into a tick-ordered [`Timeline`]
- `dispatcher`: replay the timeline through an [`InputInjector`]

Parse and compile errors reject the whole request before anything reaches the
device. Injection failures during replay are counted, not raised.

Example:
```no_run
use actionforge::actions::{self, InputEvent, InputInjector, KnownElements};
use serde_json::json;

struct Log;
impl InputInjector for Log {
    fn inject(&mut self, event: &InputEvent) -> bool {
        println!("{event:?}");
        true
    }
}

let payload = json!([{
    "type": "key", "id": "keyboard",
    "actions": [{"type": "keyDown", "value": "a"}, {"type": "keyUp", "value": "a"}]
}]);
let outcome = actions::perform_actions(&payload, &KnownElements::new(), &mut Log, true)?;
assert!(outcome.succeeded());
# Ok::<(), actionforge::actions::ActionsError>(())
```
*/

pub mod dispatcher;
pub mod elements;
pub mod error;
pub mod keys;
pub mod model;
pub mod preprocessor;
pub mod timeline;
pub mod tokenizer;

use serde_json::Value;
use tracing::debug;

pub use dispatcher::{
    DispatchOutcome, Dispatcher, InputEvent, InputInjector, KeyEvent, MotionAction, MotionEvent,
};
pub use elements::{ElementBoundsResolver, KnownElements, Rect};
pub use error::{ActionsError, ErrorCategory, Result};
pub use keys::{KeyStroke, NamedKey};
pub use model::{
    ActionItem, ActionSource, MAX_TIMELINE_MS, PointerType, QUANTUM_MS, SourceKind,
};
pub use timeline::{EventDescriptor, Tick, Timeline, ToolType};
pub use tokenizer::align_duration;

/// Validate and tokenize a raw `actions` array without dispatching it.
pub fn compile<R>(actions: &Value, resolver: &R) -> Result<Timeline>
where
    R: ElementBoundsResolver + ?Sized,
{
    let sources = preprocessor::preprocess(actions)?;
    tokenizer::tokenize(&sources, resolver)
}

/// Compile `actions` and replay it through `injector`.
///
/// With `pacing` off the ticks are replayed without waiting between them.
pub fn perform_actions<R, I>(
    actions: &Value,
    resolver: &R,
    injector: &mut I,
    pacing: bool,
) -> Result<DispatchOutcome>
where
    R: ElementBoundsResolver + ?Sized,
    I: InputInjector + ?Sized,
{
    let timeline = compile(actions, resolver)?;
    debug!(
        target: "actionforge::actions",
        ticks = timeline.len(),
        events = timeline.event_count(),
        pacing,
        "Dispatching compiled actions"
    );
    Ok(Dispatcher::new(injector).with_pacing(pacing).dispatch(&timeline))
}
