//! Renders the sweep Makefile.
//!
//! The output declares, for every test directory in `TESTS`:
//!
//! - `<dir>/parameters.mk`: `test-name = <dir>` followed by one
//!   `<param> = <value>` line per parameter, where each value is recovered
//!   from the directory name by the `get-<param>` macro. The directory name is
//!   the single source of truth.
//! - `<dir>/app_path.mk` and `<dir>/Makefile`, copied from the scaffolds.
//!
//! plus the aggregate phony targets `generate`, `profile`, `exec` and `purge`.
//! Rendering is pure; nothing touches the filesystem until Make runs the
//! output.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::naming::{ParameterList, TestCase, JOINER, SEPARATOR};
use crate::{err_help, err_msg, SweepError};

/// Per-test file holding the decoded parameter values.
pub const PARAMETERS_FILE: &str = "parameters.mk";
/// Name given to the copied app-path scaffold.
pub const APP_PATH_FILE: &str = "app_path.mk";
/// Name given to the copied template scaffold.
pub const MAKEFILE_FILE: &str = "Makefile";

/// Characters that change meaning inside a Make target or `$(call ...)` argument.
const MAKE_SPECIAL: &[char] = &['$', '#', '(', ')', ',', ':', ';', '%', '=', '\\', '"', '\''];

/// Returns the first character of `value` that Make would not take literally.
pub fn find_make_special(value: &str) -> Option<char> {
    value
        .chars()
        .find(|c| c.is_whitespace() || MAKE_SPECIAL.contains(c))
}

/// Where the generated Makefile gets its `TESTS` list from.
#[derive(Debug, Clone, Copy)]
pub enum TestSource<'a> {
    /// `include` the configured tests file.
    Include,
    /// One `TESTS += <name>` line per case.
    Inline(&'a [TestCase]),
}

/// Renders Makefile text for one parameter list.
#[derive(Debug, Clone, Copy)]
pub struct MakefileGenerator<'a> {
    params: &'a ParameterList,
    config: &'a GeneratorConfig,
}

impl<'a> MakefileGenerator<'a> {
    pub fn new(params: &'a ParameterList, config: &'a GeneratorConfig) -> Self {
        Self { params, config }
    }

    /// `test-name = p1_$(1)__p2_$(2)...`
    pub fn test_name_macro(&self) -> String {
        let body = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{p}{JOINER}$({})", i + 1))
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        if body.is_empty() {
            "test-name =".to_string()
        } else {
            format!("test-name = {body}")
        }
    }

    /// One `get-<param>` macro per parameter, in parameter order.
    pub fn getter_macros(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|p| {
                format!(
                    "get-{p} = $(lastword $(subst {JOINER}, ,$(filter {p}{JOINER}%,$(subst {SEPARATOR}, ,$(1)))))"
                )
            })
            .collect()
    }

    /// Renders the complete Makefile.
    ///
    /// Inline cases must use exactly this generator's parameters, in order,
    /// and must not repeat a test name.
    pub fn render(&self, tests: TestSource<'_>) -> Result<String, SweepError> {
        let tests_block = match tests {
            TestSource::Include => format!("TESTS =\ninclude {}\n", self.config.tests_file),
            TestSource::Inline(cases) => self.inline_tests(cases)?,
        };

        let mut out = String::new();
        if let Some(var) = &self.config.root_var {
            out.push_str(&format!("{var} = $(shell git rev-parse --show-toplevel)\n\n"));
        }
        out.push_str(".PHONY: all\nall: generate\n\n");

        out.push_str("# call to generate a test name\n");
        out.push_str(&self.test_name_macro());
        out.push_str("\n\n");

        out.push_str("# call to get parameter from test name\n");
        for getter in self.getter_macros() {
            out.push_str(&getter);
            out.push('\n');
        }
        out.push('\n');

        out.push_str("# defines tests\n");
        out.push_str(&tests_block);
        out.push_str("\nTESTS_DIRS = $(TESTS)\n\n");

        out.push_str(&self.parameters_rule());
        out.push('\n');
        out.push_str(&copy_rule(APP_PATH_FILE, &self.config.app_path_source()));
        out.push('\n');
        out.push_str(&copy_rule(MAKEFILE_FILE, &self.config.template_source()));
        out.push('\n');

        for file in [APP_PATH_FILE, PARAMETERS_FILE, MAKEFILE_FILE] {
            out.push_str(&format!("$(TESTS_DIRS): %: %/{file}\n"));
        }
        out.push('\n');

        out.push_str(".PHONY: generate\ngenerate: $(TESTS_DIRS)\n\n");
        for (suffix, log) in [("profile", "profile.log"), ("exec", "exec.log")] {
            out.push_str(&format!(
                "$(addsuffix .{suffix},$(TESTS)): %.{suffix}: %\n\t$(MAKE) -C $< {log}\n\n"
            ));
        }
        out.push_str(".PHONY: profile exec purge\n");
        out.push_str("profile: $(addsuffix .profile,$(TESTS))\n");
        out.push_str("exec: $(addsuffix .exec,$(TESTS))\n");
        out.push_str("purge:\n\trm -rf $(TESTS_DIRS)\n");

        debug!(
            parameters = self.params.len(),
            bytes = out.len(),
            "rendered sweep makefile"
        );
        Ok(out)
    }

    fn parameters_rule(&self) -> String {
        let mut rule = format!(
            "$(addsuffix /{PARAMETERS_FILE},$(TESTS_DIRS)): %/{PARAMETERS_FILE}:\n\
             \t@echo Creating $@\n\
             \t@mkdir -p $(dir $@)\n\
             \t@touch $@\n\
             \t@echo test-name = $* >> $@\n"
        );
        for p in self.params {
            rule.push_str(&format!("\t@echo {p} = $(call get-{p},$*) >> $@\n"));
        }
        rule
    }

    fn inline_tests(&self, cases: &[TestCase]) -> Result<String, SweepError> {
        let expected = self.params.names();
        let mut seen = HashSet::with_capacity(cases.len());
        let mut block = String::from("TESTS =\n");
        for case in cases {
            let names: Vec<&str> = case.parameters().map(|p| p.as_str()).collect();
            if names != expected {
                return Err(err_msg!(
                    ArityMismatch,
                    "test '{}' binds [{}] but the Makefile is generated for [{}]",
                    case,
                    names.join(", "),
                    expected.join(", ")
                ));
            }
            for (param, value) in case.entries() {
                if value.contains(SEPARATOR) {
                    return Err(err_help!(
                        InvalidParameter,
                        format!("value '{value}' of '{param}' contains the separator '{SEPARATOR}'"),
                        "two different cases could encode to the same test name"
                    ));
                }
                if let Some(c) = find_make_special(value) {
                    return Err(err_help!(
                        InvalidParameter,
                        format!("value '{value}' of '{param}' contains '{c}'"),
                        "test names become Make targets and directory names"
                    ));
                }
            }
            for (param, value) in case.lossy_values() {
                warn!(test = %case, %param, value, "value will not survive name decoding");
            }
            let name = case.name();
            if !seen.insert(name.clone()) {
                return Err(err_msg!(DuplicateTest, "'{}' is declared twice", name));
            }
            block.push_str(&format!("TESTS += {name}\n"));
        }
        Ok(block)
    }
}

fn copy_rule(target: &str, scaffold: &str) -> String {
    format!(
        "$(addsuffix /{target},$(TESTS_DIRS)): %/{target}: {scaffold}\n\
         \t@echo Creating $@\n\
         \t@mkdir -p $(dir $@)\n\
         \t@cp $< $@\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;

    fn params(names: &[&str]) -> ParameterList {
        ParameterList::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn test_name_macro_is_positional() {
        let p = params(&["n", "tgx", "impl"]);
        let config = GeneratorConfig::default();
        let gen = MakefileGenerator::new(&p, &config);
        assert_eq!(gen.test_name_macro(), "test-name = n_$(1)__tgx_$(2)__impl_$(3)");
    }

    #[test]
    fn getters_follow_make_extraction() {
        let p = params(&["impl"]);
        let config = GeneratorConfig::default();
        let gen = MakefileGenerator::new(&p, &config);
        assert_eq!(
            gen.getter_macros(),
            vec!["get-impl = $(lastword $(subst _, ,$(filter impl_%,$(subst __, ,$(1)))))"]
        );
    }

    #[test]
    fn empty_parameter_list_has_no_getters() {
        let p = params(&[]);
        let config = GeneratorConfig::default();
        let text = MakefileGenerator::new(&p, &config)
            .render(TestSource::Include)
            .unwrap();
        assert!(text.contains("test-name =\n"));
        assert!(!text.contains("get-"));
    }

    #[test]
    fn include_mode_uses_configured_files() {
        let p = params(&["n"]);
        let config = GeneratorConfig {
            tests_file: "cases.mk".to_string(),
            scaffold_dir: "../common".into(),
            root_var: None,
            ..GeneratorConfig::default()
        };
        let text = MakefileGenerator::new(&p, &config)
            .render(TestSource::Include)
            .unwrap();
        assert!(text.starts_with(".PHONY: all\n"));
        assert!(text.contains("include cases.mk\n"));
        assert!(text.contains("%/app_path.mk: ../common/app_path.mk\n"));
        assert!(text.contains("%/Makefile: ../common/template.mk\n"));
    }

    #[test]
    fn parameters_rule_records_every_parameter() {
        let p = params(&["n", "impl"]);
        let config = GeneratorConfig::default();
        let text = MakefileGenerator::new(&p, &config)
            .render(TestSource::Include)
            .unwrap();
        assert!(text.contains("\t@echo test-name = $* >> $@\n\t@echo n = $(call get-n,$*) >> $@\n\t@echo impl = $(call get-impl,$*) >> $@\n"));
    }

    #[test]
    fn inline_rejects_duplicates_and_foreign_cases() {
        let p = params(&["n"]);
        let config = GeneratorConfig::default();
        let gen = MakefileGenerator::new(&p, &config);

        let case = TestCase::from_values(&p, ["32"]).unwrap();
        let err = gen
            .render(TestSource::Inline(&[case.clone(), case]))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::DuplicateTest);

        let other = TestCase::from_pairs([("m", "1")]).unwrap();
        let err = gen.render(TestSource::Inline(&[other])).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ArityMismatch);
    }

    #[test]
    fn inline_rejects_make_special_values() {
        let p = params(&["flags"]);
        let config = GeneratorConfig::default();
        let case = TestCase::from_values(&p, ["a,b"]).unwrap();
        let err = MakefileGenerator::new(&p, &config)
            .render(TestSource::Inline(&[case]))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidParameter);
    }

    #[test]
    fn inline_rejects_separator_in_values() {
        let p = params(&["n", "impl"]);
        let config = GeneratorConfig::default();
        let case = TestCase::from_values(&p, ["a__b", "SERIAL"]).unwrap();
        let err = MakefileGenerator::new(&p, &config)
            .render(TestSource::Inline(&[case]))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidParameter);
        assert!(err.message().contains("separator"));
    }

    #[test]
    fn special_characters_are_found() {
        assert_eq!(find_make_special("32"), None);
        assert_eq!(find_make_special("a b"), Some(' '));
        assert_eq!(find_make_special("$(x)"), Some('$'));
    }
}
