//! Defines the command-line arguments and subcommands for sweepgen.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::GeneratorConfig;
use crate::SweepError;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "sweepgen",
    version,
    about = "Generates Makefiles and test lists for benchmark parameter sweeps."
)]
pub struct SweepgenArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the sweep Makefile for the given parameters.
    Makefile {
        /// Parameter names, in test-name order.
        #[arg(conflicts_with = "sweep")]
        params: Vec<String>,
        /// Take parameters from a sweep file and list its tests inline.
        #[arg(long, value_name = "FILE")]
        sweep: Option<PathBuf>,
        /// Compare against an existing file instead of printing; fails when it differs.
        #[arg(long, value_name = "FILE")]
        check: Option<PathBuf>,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Print the tests.mk list for a sweep file.
    Tests {
        /// The sweep description (YAML, or JSON for `.json` files).
        #[arg(required = true)]
        sweep: PathBuf,
        /// Write literal test names instead of `$(call test-name,...)`.
        #[arg(long)]
        literal: bool,
        /// Print the expanded sweep as JSON.
        #[arg(long, conflicts_with = "literal")]
        json: bool,
    },
    /// Print the test name for `param=value` assignments, in the given order.
    Name {
        #[arg(required = true, value_name = "PARAM=VALUE")]
        assignments: Vec<String>,
    },
    /// Print the value of one parameter recovered from a test name.
    Extract {
        #[arg(required = true)]
        test_name: String,
        #[arg(required = true)]
        param: String,
    },
}

/// File locations used by the generated Makefile.
#[derive(Debug, Default, Args)]
pub struct LayoutArgs {
    /// YAML file with generator settings; flags below override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Scaffold copied into each test directory as `app_path.mk`.
    #[arg(long, value_name = "FILE")]
    pub app_path: Option<String>,
    /// Scaffold copied into each test directory as `Makefile`.
    #[arg(long, value_name = "FILE")]
    pub template: Option<String>,
    /// Directory holding the scaffolds, relative to where Make runs.
    #[arg(long, value_name = "DIR")]
    pub scaffold_dir: Option<PathBuf>,
    /// File included to populate `TESTS`.
    #[arg(long, value_name = "FILE")]
    pub tests_file: Option<String>,
    /// Make variable set to the repository root.
    #[arg(long, value_name = "NAME", conflicts_with = "no_root_var")]
    pub root_var: Option<String>,
    /// Omit the repository-root variable.
    #[arg(long)]
    pub no_root_var: bool,
}

impl LayoutArgs {
    /// Config file (or defaults) with flag overrides applied.
    pub fn resolve(&self) -> Result<GeneratorConfig, SweepError> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(app_path) = &self.app_path {
            config.app_path = app_path.clone();
        }
        if let Some(template) = &self.template {
            config.template = template.clone();
        }
        if let Some(dir) = &self.scaffold_dir {
            config.scaffold_dir = dir.clone();
        }
        if let Some(tests_file) = &self.tests_file {
            config.tests_file = tests_file.clone();
        }
        if let Some(var) = &self.root_var {
            config.root_var = Some(var.clone());
        }
        if self.no_root_var {
            config.root_var = None;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Arguments of the single-purpose `benchmark-makefile-gen` binary.
#[derive(Debug, Parser)]
#[command(
    name = "benchmark-makefile-gen",
    version,
    about = "Prints the sweep Makefile for the given parameter names."
)]
pub struct BenchmarkMakefileArgs {
    /// Parameter names, in test-name order.
    pub params: Vec<String>,
}
