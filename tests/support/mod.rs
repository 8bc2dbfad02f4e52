//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use sweepgen::config::GeneratorConfig;
use sweepgen::naming::ParameterList;

/// A fresh, empty directory unique to this test process and `name`.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sweepgen-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn params(names: &[&str]) -> ParameterList {
    ParameterList::new(names.iter().copied()).unwrap()
}

pub fn default_config() -> GeneratorConfig {
    GeneratorConfig::default()
}

/// Lines of `text` that start with `prefix`.
pub fn lines_with<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
    text.lines().filter(|line| line.starts_with(prefix)).collect()
}
