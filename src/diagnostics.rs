//! Unified, `miette`-based diagnostics for sweepgen.
//!
//! Every failure the generator can report is a [`SweepError`]. Errors carry an
//! [`ErrorContext`] so that problems located inside a test name or a sweep file
//! can point at the offending text.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(InvalidParameter, "bad name '{}'", name)` for message-only errors.
//! - `err_ctx!(MalformedTestName, "no segment", src, span)` when a source and span
//!   are available, optionally followed by a help message.

use std::{fmt, sync::Arc};

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

pub type SourceArc = Arc<NamedSource<String>>;

/// Byte range inside a diagnostic source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Type-safe classification of [`SweepError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Parameter name is not a valid identifier
    InvalidParameter,
    /// Same parameter named twice
    DuplicateParameter,
    /// Value count does not match parameter count
    ArityMismatch,
    /// Test name cannot be decoded against a parameter list
    MalformedTestName,
    /// Two test cases encode to the same name
    DuplicateTest,
    /// Sweep description is invalid
    Sweep,
    /// Configuration file is invalid
    Config,
    /// Filesystem failure
    Io,
    /// Checked file differs from the fresh rendering
    Stale,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidParameter => "parameter",
            ErrorType::DuplicateParameter => "duplicate_parameter",
            ErrorType::ArityMismatch => "arity",
            ErrorType::MalformedTestName => "test_name",
            ErrorType::DuplicateTest => "duplicate_test",
            ErrorType::Sweep => "sweep",
            ErrorType::Config => "config",
            ErrorType::Io => "io",
            ErrorType::Stale => "stale",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional source, span and help attached to an error.
#[derive(Debug, Default)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
            ..Self::default()
        }
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }
}

/// Unified error type for every sweepgen failure mode.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Duplicate parameter: {message}")]
    DuplicateParameter {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Arity mismatch: {message}")]
    ArityMismatch {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Malformed test name: {message}")]
    MalformedTestName {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Duplicate test: {message}")]
    DuplicateTest {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Sweep error: {message}")]
    Sweep {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Config error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Stale file: {message}")]
    Stale {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl SweepError {
    fn parts(&self) -> (&str, &ErrorContext) {
        match self {
            SweepError::InvalidParameter { message, ctx, .. }
            | SweepError::DuplicateParameter { message, ctx, .. }
            | SweepError::ArityMismatch { message, ctx, .. }
            | SweepError::MalformedTestName { message, ctx, .. }
            | SweepError::DuplicateTest { message, ctx, .. }
            | SweepError::Sweep { message, ctx, .. }
            | SweepError::Config { message, ctx, .. }
            | SweepError::Io { message, ctx, .. }
            | SweepError::Stale { message, ctx, .. } => (message.as_str(), ctx),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            SweepError::InvalidParameter { .. } => ErrorType::InvalidParameter,
            SweepError::DuplicateParameter { .. } => ErrorType::DuplicateParameter,
            SweepError::ArityMismatch { .. } => ErrorType::ArityMismatch,
            SweepError::MalformedTestName { .. } => ErrorType::MalformedTestName,
            SweepError::DuplicateTest { .. } => ErrorType::DuplicateTest,
            SweepError::Sweep { .. } => ErrorType::Sweep,
            SweepError::Config { .. } => ErrorType::Config,
            SweepError::Io { .. } => ErrorType::Io,
            SweepError::Stale { .. } => ErrorType::Stale,
        }
    }

    pub fn message(&self) -> &str {
        self.parts().0
    }

    /// Attaches an underlying error as the `source()` of this error.
    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let slot = match &mut self {
            SweepError::InvalidParameter { source, .. }
            | SweepError::DuplicateParameter { source, .. }
            | SweepError::ArityMismatch { source, .. }
            | SweepError::MalformedTestName { source, .. }
            | SweepError::DuplicateTest { source, .. }
            | SweepError::Sweep { source, .. }
            | SweepError::Config { source, .. }
            | SweepError::Io { source, .. }
            | SweepError::Stale { source, .. } => source,
        };
        *slot = Some(Box::new(err));
        self
    }
}

impl Diagnostic for SweepError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("sweepgen::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.parts()
            .1
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.parts()
            .1
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (message, ctx) = self.parts();
        // A span without a source has nothing to point into.
        let text = ctx.source.as_ref()?.inner();
        let span = ctx.span?;
        // End-of-input errors point at the last character.
        let last = text.char_indices().next_back().map_or(0, |(i, _)| i);
        let start = span.start.min(last);
        let end = span.end.max(span.start + 1).min(text.len());
        let label = LabeledSpan::new(Some(message.to_string()), start, end.saturating_sub(start));
        Some(Box::new(std::iter::once(label)))
    }
}

/// Wraps text in a named diagnostic source.
pub fn to_error_source(name: impl AsRef<str>, text: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), text.as_ref().to_string()))
}

/// Converts a 1-based line/column location into a byte offset of `text`.
pub fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

/// Constructs a [`SweepError`] variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr) => {
        $crate::SweepError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    ($variant:ident, $fmt:expr, $($arg:expr),+ $(,)?) => {
        $crate::SweepError::$variant {
            message: format!($fmt, $($arg),+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a [`SweepError`] variant with a source, a span and optional help.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::SweepError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone(&$src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
            },
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::SweepError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone(&$src),
                $span,
            ),
            source: None,
        }
    };
}

/// Constructs a [`SweepError`] variant with a message and a help line.
#[macro_export]
macro_rules! err_help {
    ($variant:ident, $msg:expr, $help:expr) => {
        $crate::SweepError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_help($help),
            source: None,
        }
    };
}
