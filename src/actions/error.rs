use thiserror::Error;

/// Class of an actions compilation failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Structural,
    Temporal,
    Referential,
    Sequencing,
}

/// Failure while validating or compiling an actions payload.
///
/// Every variant is reported to the caller as an actions parse error; the whole
/// payload is rejected and nothing is dispatched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionsError {
    #[error("Actions payload must be a JSON array of action sources")]
    NotAnArray,

    #[error("All actions must have the {key} key set (action #{index})")]
    MissingSourceField { index: usize, key: &'static str },

    #[error("The action id '{0}' has one or more duplicates")]
    DuplicateId(String),

    #[error("Only {allowed:?} values are supported for {key} key. '{value}' is passed instead for action '{id}'")]
    UnsupportedValue {
        id: String,
        key: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("pointerType parameter is only supported for action type 'pointer' in '{0}' action")]
    PointerTypeOnNonPointer(String),

    #[error("It is only allowed to use one pointer type simultaneously. And you have {0:?}")]
    MixedPointerTypes(Vec<String>),

    #[error("Only {allowed:?} item type values are supported for action type '{kind}'. '{item_type}' is passed instead for action '{id}'")]
    UnsupportedItemType {
        id: String,
        kind: &'static str,
        item_type: String,
        allowed: &'static [&'static str],
    },

    #[error("Missing {key} key for action item #{index} ({item_type}) of action with id '{id}'")]
    MissingItemField {
        id: String,
        index: usize,
        item_type: &'static str,
        key: &'static str,
    },

    #[error("Invalid {key} value for action item #{index} of action with id '{id}': {reason}")]
    InvalidItemField {
        id: String,
        index: usize,
        key: &'static str,
        reason: String,
    },

    #[error("duration key cannot be negative for action item #{index} ({item_type}) of action with id '{id}'")]
    NegativeDuration {
        id: String,
        index: usize,
        item_type: &'static str,
    },

    #[error("An unknown element '{element}' is set for action item #{index} of action '{id}'")]
    UnknownElement {
        id: String,
        index: usize,
        element: String,
    },

    #[error("The element with id '{element}' has zero width/height in the action item #{index} of action '{id}'")]
    ZeroSizeElement {
        id: String,
        index: usize,
        element: String,
    },

    #[error("Action item #{index} ({item_type}) of action '{id}' would end the timeline after {limit_ms}ms")]
    TimelineTooLong {
        id: String,
        index: usize,
        item_type: &'static str,
        limit_ms: u64,
    },

    #[error("Action item #{index} of action '{id}' should be preceded with at least one item with coordinates")]
    MissingStartPosition { id: String, index: usize },

    #[error("You cannot perform two or more '{item_type}' actions without a pause between them at {tick}ms in '{id}' chain")]
    SimultaneousActions {
        id: String,
        item_type: &'static str,
        tick: u64,
    },

    #[error("You cannot perform 'pointerUp' action without performing 'pointerDown' first at {tick}ms in '{id}' chain")]
    UpWithoutDown { id: String, tick: u64 },

    #[error("No more than one simultaneous pointer is supported for pointerType {0}")]
    TooManyPointers(&'static str),
}

impl ActionsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NegativeDuration { .. } | Self::TimelineTooLong { .. } => {
                ErrorCategory::Temporal
            }
            Self::UnknownElement { .. } | Self::ZeroSizeElement { .. } => {
                ErrorCategory::Referential
            }
            Self::MissingStartPosition { .. }
            | Self::SimultaneousActions { .. }
            | Self::UpWithoutDown { .. } => ErrorCategory::Sequencing,
            _ => ErrorCategory::Structural,
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionsError>;
