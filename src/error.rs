use thiserror::Error;

use crate::WidgetId;

/// Errors raised by the reconciler.
///
/// Structural errors (unbalanced scopes, unknown widget types, missing arguments) mean the declared tree is wrong, and are returned to the code that declared it.
/// Soft data issues, like a scalar passed where an argument list was expected, are coerced instead.
#[derive(Error, Debug)]
pub enum UiError {
    #[error("unknown widget type \"{0}\"")]
    UnknownWidget(String),

    #[error("widget class \"{0}\" is already registered")]
    DuplicateClass(&'static str),

    #[error("widget class \"{class}\" is missing the \"{field}\" function")]
    MissingClassField { class: &'static str, field: &'static str },

    #[error("widget classes can't be registered after the Ui has started")]
    RegistryClosed,

    #[error("{widget} is missing required argument \"{argument}\"")]
    MissingArgument { widget: &'static str, argument: &'static str },

    #[error("{widget} has no event \"{event}\"")]
    UnknownEvent { widget: &'static str, event: String },

    #[error("{id} was already declared as a {existing} in this cycle, can't declare it again as a {requested}")]
    IdCollision {
        id: WidgetId,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("too many calls to end()")]
    TooManyEnds,

    #[error("too few calls to end(): {open} scopes still open")]
    TooFewEnds { open: usize },

    #[error("too many calls to pop_config()")]
    TooManyConfigPops,

    #[error("push_config() and pop_config() are unbalanced: {open} layers still pushed")]
    UnbalancedConfig { open: usize },

    #[error("the Ui was already started")]
    AlreadyStarted,

    #[error("a cycle is already running")]
    CycleInProgress,

    #[error("the Ui wasn't started")]
    NotStarted,

    #[error("the Ui was shut down")]
    ShutDown,

    #[error("the host parent instance was destroyed")]
    HostUnavailable,

    #[error("{} frame callback(s) failed", .0.len())]
    Callbacks(Vec<CallbackFailure>),
}

/// A failure of a single connected frame callback.
#[derive(Error, Debug)]
pub enum CallbackFailure {
    #[error("frame callback returned an error: {0:#}")]
    Error(#[from] anyhow::Error),

    #[error("frame callback panicked: {0}")]
    Panic(String),

    #[error("frame callback left the tree unbalanced: {0}")]
    Structure(UiError),
}

impl CallbackFailure {
    /// Returns the reconciler error behind this failure, if there was one.
    pub fn ui_error(&self) -> Option<&UiError> {
        match self {
            CallbackFailure::Error(e) => e.downcast_ref::<UiError>(),
            CallbackFailure::Structure(e) => Some(e),
            CallbackFailure::Panic(_) => None,
        }
    }
}

/// An internal invariant was violated. These should be unreachable.
pub(crate) fn invariant_violation(what: &str, id: &WidgetId) {
    log::error!("kasane: internal error: {what} ({id})");
    debug_assert!(false, "kasane: internal error: {what} ({id})");
}
