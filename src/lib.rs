pub use crate::diagnostics::{ErrorContext, ErrorType, SweepError};

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod makefile;
pub mod naming;
pub mod sweep;
