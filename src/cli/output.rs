//! Handles all user-facing output for the CLI.
//!
//! Generated text goes to stdout untouched so it can be redirected into a
//! file; diagnostics, diffs and status lines go to stderr.

use std::io::{self, Write};

use difference::{Changeset, Difference};
use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::SweepError;

/// Writes generated text to stdout exactly as rendered.
pub fn print_text(text: &str) -> Result<(), SweepError> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| crate::err_msg!(Io, "failed to write to stdout").with_source(e))
}

/// Renders an error as a `miette` report on stderr.
pub fn print_error(error: SweepError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}

/// Prints a green status line on stderr.
pub fn print_status(message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = writeln!(stderr, "{message}");
    let _ = stderr.reset();
}

/// Prints a line diff from `old` to `new` on stderr; returns the number of changed hunks.
pub fn print_diff(old: &str, new: &str) -> usize {
    let changeset = Changeset::new(old, new, "\n");
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let mut changed = 0;
    for diff in &changeset.diffs {
        let (color, marker, text) = match diff {
            Difference::Same(x) => (None, ' ', x),
            Difference::Add(x) => (Some(Color::Green), '+', x),
            Difference::Rem(x) => (Some(Color::Red), '-', x),
        };
        if color.is_some() {
            changed += 1;
        }
        let _ = stderr.set_color(ColorSpec::new().set_fg(color));
        for line in text.split('\n') {
            let _ = writeln!(stderr, "{marker}{line}");
        }
    }
    let _ = stderr.reset();
    changed
}
