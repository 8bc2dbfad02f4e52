//! Generator configuration.
//!
//! Every location the generated Makefile refers to is explicit here instead of
//! being read from the invoking shell. A configuration file is YAML:
//!
//! ```yaml
//! app_path: app_path.mk
//! template: template.mk
//! scaffold_dir: ../common
//! tests_file: tests.mk
//! root_var: REPLICANT_PATH   # null disables the line
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::diagnostics::{to_error_source, Span};
use crate::{err_ctx, err_msg, SweepError};

/// Name of the Make variable holding the repository root.
pub const DEFAULT_ROOT_VAR: &str = "REPLICANT_PATH";

/// File and variable names used when rendering the Makefile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Scaffold copied into every test directory as `app_path.mk`.
    pub app_path: String,
    /// Scaffold copied into every test directory as `Makefile`.
    pub template: String,
    /// Directory holding both scaffolds, relative to where Make runs.
    pub scaffold_dir: PathBuf,
    /// File included to populate `TESTS`.
    pub tests_file: String,
    /// Make variable set from `git rev-parse --show-toplevel`.
    pub root_var: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            app_path: "app_path.mk".to_string(),
            template: "template.mk".to_string(),
            scaffold_dir: PathBuf::from("."),
            tests_file: "tests.mk".to_string(),
            root_var: Some(DEFAULT_ROOT_VAR.to_string()),
        }
    }
}

impl GeneratorConfig {
    /// Reads a YAML configuration file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let text = fs::read_to_string(path).map_err(|e| {
            err_msg!(Io, "failed to read config '{}'", path.display()).with_source(e)
        })?;
        let config = Self::from_yaml(&path.display().to_string(), &text)?;
        debug!(path = %path.display(), ?config, "loaded generator config");
        Ok(config)
    }

    /// Parses YAML text; `origin` names the source in diagnostics.
    pub fn from_yaml(origin: &str, text: &str) -> Result<Self, SweepError> {
        // An empty document means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).map_err(|e| {
            let src = to_error_source(origin, text);
            let at = e
                .location()
                .map(|loc| loc.index())
                .unwrap_or(0);
            err_ctx!(Config, e.to_string(), src, Span::new(at, at))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects names Make would split or misread; run after every override.
    pub(crate) fn validate(&self) -> Result<(), SweepError> {
        for (field, value) in [
            ("app_path", &self.app_path),
            ("template", &self.template),
            ("tests_file", &self.tests_file),
        ] {
            if value.trim().is_empty() {
                return Err(err_msg!(Config, "'{}' cannot be empty", field));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(err_msg!(
                    Config,
                    "'{}' = '{}' contains whitespace, which Make cannot quote",
                    field,
                    value
                ));
            }
        }
        let scaffold_dir = self.scaffold_dir.display().to_string();
        if scaffold_dir.chars().any(char::is_whitespace) {
            return Err(err_msg!(
                Config,
                "'scaffold_dir' = '{}' contains whitespace, which Make cannot quote",
                scaffold_dir
            ));
        }
        if let Some(var) = &self.root_var {
            if var.is_empty() || var.chars().any(|c| c.is_whitespace() || "=:#$()".contains(c)) {
                return Err(err_msg!(Config, "'{}' is not a valid Make variable name", var));
            }
        }
        Ok(())
    }

    /// Path of the `app_path.mk` scaffold as written in prerequisites.
    pub fn app_path_source(&self) -> String {
        self.scaffold_path(&self.app_path)
    }

    /// Path of the template scaffold as written in prerequisites.
    pub fn template_source(&self) -> String {
        self.scaffold_path(&self.template)
    }

    fn scaffold_path(&self, file: &str) -> String {
        if self.scaffold_dir.as_os_str().is_empty() || self.scaffold_dir == Path::new(".") {
            file.to_string()
        } else {
            self.scaffold_dir.join(file).display().to_string()
        }
    }
}
