//! The sweepgen Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions. Every command renders its complete output
//! before writing anything, so a failure leaves stdout empty.

use std::fs;
use std::path::Path;
use std::process;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{BenchmarkMakefileArgs, Command, LayoutArgs, SweepgenArgs};
use crate::makefile::{MakefileGenerator, TestSource};
use crate::naming::{extract, is_round_trip_safe, ParameterList, TestCase};
use crate::sweep::{SweepSpec, TestsStyle};
use crate::{err_help, err_msg, SweepError};

pub mod args;
pub mod output;

/// Installs the stderr `tracing` subscriber; `RUST_LOG` overrides the `warn` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The main entry point for the `sweepgen` binary.
pub fn run() {
    let args = SweepgenArgs::parse();

    let result = match args.command {
        Command::Makefile {
            params,
            sweep,
            check,
            layout,
        } => handle_makefile(&params, sweep.as_deref(), check.as_deref(), &layout),
        Command::Tests {
            sweep,
            literal,
            json,
        } => handle_tests(&sweep, literal, json),
        Command::Name { assignments } => handle_name(&assignments),
        Command::Extract { test_name, param } => handle_extract(&test_name, &param),
    };

    exit_on_error(result);
}

/// The main entry point for the `benchmark-makefile-gen` binary.
pub fn run_benchmark_makefile_gen() {
    let args = BenchmarkMakefileArgs::parse();
    exit_on_error(handle_makefile(&args.params, None, None, &LayoutArgs::default()));
}

fn exit_on_error(result: Result<(), SweepError>) {
    if let Err(e) = result {
        output::print_error(e);
        process::exit(1);
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_makefile(
    params: &[String],
    sweep: Option<&Path>,
    check: Option<&Path>,
    layout: &LayoutArgs,
) -> Result<(), SweepError> {
    let config = layout.resolve()?;
    let text = match sweep {
        Some(path) => {
            let expansion = SweepSpec::load(path)?.expand()?;
            info!(sweep = %path.display(), tests = expansion.cases.len(), "inlining sweep tests");
            MakefileGenerator::new(&expansion.params, &config)
                .render(TestSource::Inline(&expansion.cases))?
        }
        None => {
            let params = ParameterList::new(params.iter().cloned())?;
            MakefileGenerator::new(&params, &config).render(TestSource::Include)?
        }
    };

    match check {
        Some(path) => check_file(path, &text),
        None => output::print_text(&text),
    }
}

fn check_file(path: &Path, expected: &str) -> Result<(), SweepError> {
    let existing = fs::read_to_string(path)
        .map_err(|e| err_msg!(Io, "failed to read '{}'", path.display()).with_source(e))?;
    if existing == expected {
        output::print_status(&format!("{} is up to date", path.display()));
        return Ok(());
    }
    let hunks = output::print_diff(&existing, expected);
    Err(err_help!(
        Stale,
        format!("{} differs from the generated Makefile ({hunks} changed hunks)", path.display()),
        "regenerate it by running the same command without --check and redirecting stdout"
    ))
}

fn handle_tests(sweep: &Path, literal: bool, json: bool) -> Result<(), SweepError> {
    let expansion = SweepSpec::load(sweep)?.expand()?;
    let text = if json {
        let mut text = expansion.to_json()?;
        text.push('\n');
        text
    } else if literal {
        expansion.render_tests_mk(TestsStyle::Literal)
    } else {
        expansion.render_tests_mk(TestsStyle::Call)
    };
    output::print_text(&text)
}

fn handle_name(assignments: &[String]) -> Result<(), SweepError> {
    let pairs = assignments
        .iter()
        .map(|assignment| {
            assignment.split_once('=').ok_or_else(|| {
                err_help!(
                    InvalidParameter,
                    format!("'{assignment}' is not a PARAM=VALUE assignment"),
                    "write each parameter as name=value, for example n=32"
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    for (param, value) in &pairs {
        if !is_round_trip_safe(value) {
            warn!(%param, value, "value will not survive name decoding");
        }
    }
    let case = TestCase::from_pairs(pairs)?;
    output::print_text(&format!("{}\n", case.name()))
}

fn handle_extract(test_name: &str, param: &str) -> Result<(), SweepError> {
    match extract(test_name, param) {
        Some(value) => output::print_text(&format!("{value}\n")),
        None => Err(err_msg!(
            MalformedTestName,
            "'{}' has no '{}_' segment",
            test_name,
            param
        )),
    }
}
