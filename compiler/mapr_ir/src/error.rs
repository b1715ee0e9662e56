//! Error types for planning and executing mappings.
//!
//! Type names inside errors are pre-formatted strings: errors outlive the pool
//! borrow that produced them and must be printable on their own.
//!
//! Constructor helpers on `MapError` are the single place message shapes are
//! decided.

use crate::{MapKind, TypeTuple};

/// Result of a mapping operation.
pub type MapResult<T> = Result<T, MapError>;

/// Any failure raised while configuring, planning or executing a mapping.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    AsyncUsage(#[from] AsyncUsageError),

    /// A user-supplied hook, resolver or factory failed.
    #[error("hook failed: {0}")]
    Hook(String),
}

/// Ambiguous or missing binding, or conflicting directives.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("configuration error for {pair}{}: {message}", member_suffix(.member.as_deref()))]
pub struct ConfigurationError {
    /// Rendered type pair, e.g. `Order -> OrderDto`.
    pub pair: String,
    /// Offending destination member, if any.
    pub member: Option<String>,
    pub message: String,
}

/// A primitive or enum value could not be converted.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert {value} from {from} to {to}: {reason}")]
pub struct ConversionError {
    pub from: String,
    pub to: String,
    pub value: String,
    pub reason: String,
}

/// A rule failed to emit while a plan was being built.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("failed to compile {kind} transform {pair}: {message}")]
pub struct CompilationError {
    pub pair: String,
    pub tuple: TypeTuple,
    pub kind: MapKind,
    pub message: String,
    #[source]
    pub cause: Option<Box<MapError>>,
}

/// An asynchronous hook ran without a pending-task list.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
    "async hook for {pair} invoked through the synchronous entry point; use `map_async` instead"
)]
pub struct AsyncUsageError {
    pub pair: String,
}

/// Depth limit truncation. Recorded on the mapping context, never returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("recursion limit {max_depth} reached for {pair}; value truncated")]
pub struct RecursionLimitReached {
    pub pair: String,
    pub tuple: TypeTuple,
    pub max_depth: u32,
}

fn member_suffix(member: Option<&str>) -> String {
    member.map(|m| format!(" (member `{m}`)")).unwrap_or_default()
}

impl MapError {
    pub fn configuration(pair: impl Into<String>, message: impl Into<String>) -> Self {
        MapError::Configuration(ConfigurationError {
            pair: pair.into(),
            member: None,
            message: message.into(),
        })
    }

    pub fn member_configuration(
        pair: impl Into<String>,
        member: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MapError::Configuration(ConfigurationError {
            pair: pair.into(),
            member: Some(member.into()),
            message: message.into(),
        })
    }

    pub fn conversion(
        from: impl Into<String>,
        to: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MapError::Conversion(ConversionError {
            from: from.into(),
            to: to.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }

    /// Wrap `cause` with the transform being compiled.
    ///
    /// Already-wrapped compilation errors are kept as they are so the
    /// innermost failing pair is reported.
    pub fn compilation(
        pair: impl Into<String>,
        tuple: TypeTuple,
        kind: MapKind,
        cause: MapError,
    ) -> Self {
        if matches!(cause, MapError::Compilation(_)) {
            return cause;
        }
        MapError::Compilation(CompilationError {
            pair: pair.into(),
            tuple,
            kind,
            message: cause.to_string(),
            cause: Some(Box::new(cause)),
        })
    }

    pub fn compilation_message(
        pair: impl Into<String>,
        tuple: TypeTuple,
        kind: MapKind,
        message: impl Into<String>,
    ) -> Self {
        MapError::Compilation(CompilationError {
            pair: pair.into(),
            tuple,
            kind,
            message: message.into(),
            cause: None,
        })
    }

    pub fn async_usage(pair: impl Into<String>) -> Self {
        MapError::AsyncUsage(AsyncUsageError { pair: pair.into() })
    }

    pub fn hook(message: impl Into<String>) -> Self {
        MapError::Hook(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, MapError::Configuration(_))
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, MapError::Conversion(_))
    }

    pub fn is_compilation(&self) -> bool {
        matches!(self, MapError::Compilation(_))
    }

    pub fn is_async_usage(&self) -> bool {
        matches!(self, MapError::AsyncUsage(_))
    }
}
