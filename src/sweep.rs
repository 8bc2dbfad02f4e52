//! Sweep descriptions and their expansion into test cases.
//!
//! A sweep lists axes; the test cases are the Cartesian product of the axes
//! with the first axis outermost. An axis binds either one parameter or a
//! coupled tuple of parameters that vary together:
//!
//! ```yaml
//! parameters: [n, tgx, tgy, impl]
//! axes:
//!   - parameter: impl
//!     values: [SERIAL, APPLRTS, CELLO]
//!   - parameter: n
//!     values: [32, 256]
//!   - parameters: [tgx, tgy]
//!     values: [[1, 1], [2, 2], [4, 4], [8, 8], [16, 8]]
//! ```
//!
//! `parameters` fixes the order of segments in test names; without it the
//! order of first appearance in `axes` is used.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diagnostics::{offset_of, to_error_source, Span};
use crate::makefile::find_make_special;
use crate::naming::{is_round_trip_safe, ParameterList, TestCase, SEPARATOR};
use crate::{err_ctx, err_help, err_msg, SweepError};

/// Largest magnitude below which every integral `f64` is exact.
const EXACT_FLOAT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// A scalar parameter value as written in a sweep file.
///
/// Unquoted numbers are normalized (`2.50` becomes `2.5`, `1.0` stays
/// `1.0`); quote a value to keep its spelling verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// The text this value contributes to a test name.
    ///
    /// Floats are rejected when they are not finite or too large to be
    /// exact, which is what an integer literal beyond `u64` parses to.
    pub fn render(&self) -> Result<String, SweepError> {
        match self {
            Scalar::Bool(b) => Ok(b.to_string()),
            Scalar::UInt(u) => Ok(u.to_string()),
            Scalar::Int(i) => Ok(i.to_string()),
            Scalar::Float(x) if !x.is_finite() || x.abs() >= EXACT_FLOAT_LIMIT => Err(err_help!(
                Sweep,
                format!("value {x:?} cannot be represented exactly"),
                "quote the value in the sweep file to keep its spelling"
            )),
            // `Debug` keeps the fractional part of integral floats (`1.0`).
            Scalar::Float(x) => Ok(format!("{x:?}")),
            Scalar::Str(s) => Ok(s.clone()),
        }
    }
}

/// Axis varying a single parameter.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleAxis {
    pub parameter: String,
    pub values: Vec<Scalar>,
}

/// Axis varying several parameters in lockstep.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoupledAxis {
    pub parameters: Vec<String>,
    pub values: Vec<Vec<Scalar>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Axis {
    Single(SingleAxis),
    Coupled(CoupledAxis),
}

impl Axis {
    fn parameters(&self) -> Vec<&str> {
        match self {
            Axis::Single(axis) => vec![axis.parameter.as_str()],
            Axis::Coupled(axis) => axis.parameters.iter().map(String::as_str).collect(),
        }
    }

    fn rows(&self) -> Result<Vec<Vec<String>>, SweepError> {
        match self {
            Axis::Single(axis) => axis
                .values
                .iter()
                .map(|v| v.render().map(|text| vec![text]))
                .collect(),
            Axis::Coupled(axis) => axis
                .values
                .iter()
                .map(|row| row.iter().map(Scalar::render).collect())
                .collect(),
        }
    }
}

/// Input format of a sweep file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepFormat {
    Yaml,
    Json,
}

impl SweepFormat {
    /// JSON for `.json` files, YAML otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SweepFormat::Json,
            _ => SweepFormat::Yaml,
        }
    }
}

/// A parsed sweep description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSpec {
    #[serde(default)]
    pub parameters: Option<Vec<String>>,
    pub axes: Vec<Axis>,
}

impl SweepSpec {
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let text = fs::read_to_string(path).map_err(|e| {
            err_msg!(Io, "failed to read sweep '{}'", path.display()).with_source(e)
        })?;
        Self::parse(&path.display().to_string(), &text, SweepFormat::from_path(path))
    }

    /// Parses `text`; `origin` names the source in diagnostics.
    pub fn parse(origin: &str, text: &str, format: SweepFormat) -> Result<Self, SweepError> {
        let src = to_error_source(origin, text);
        match format {
            SweepFormat::Yaml => serde_yaml::from_str(text).map_err(|e| {
                let at = e.location().map(|loc| loc.index()).unwrap_or(0);
                err_ctx!(Sweep, e.to_string(), src, Span::new(at, at))
            }),
            SweepFormat::Json => serde_json::from_str(text).map_err(|e| {
                let at = offset_of(text, e.line(), e.column());
                err_ctx!(Sweep, e.to_string(), src, Span::new(at, at))
            }),
        }
    }

    /// Expands the sweep into its ordered list of test cases.
    pub fn expand(&self) -> Result<Expansion, SweepError> {
        if self.axes.is_empty() {
            return Err(err_msg!(Sweep, "a sweep needs at least one axis"));
        }

        let mut bound: Vec<&str> = Vec::new();
        for (index, axis) in self.axes.iter().enumerate() {
            for name in axis.parameters() {
                if bound.contains(&name) {
                    return Err(err_msg!(
                        Sweep,
                        "axis {} binds '{}', which an earlier axis already binds",
                        index,
                        name
                    ));
                }
                bound.push(name);
            }
        }

        let params = match &self.parameters {
            Some(order) => {
                let params = ParameterList::new(order.iter().cloned())?;
                if let Some(missing) = params.iter().find(|p| !bound.contains(&p.as_str())) {
                    return Err(err_msg!(Sweep, "parameter '{}' is not bound by any axis", missing));
                }
                if let Some(extra) = bound.iter().find(|name| !params.contains(name)) {
                    return Err(err_help!(
                        Sweep,
                        format!("axis parameter '{extra}' is missing from 'parameters'"),
                        "list every swept parameter in 'parameters', or drop the list to use axis order"
                    ));
                }
                params
            }
            None => ParameterList::new(bound.iter().copied())?,
        };

        // Each partial case holds one slot per parameter.
        let mut partials: Vec<Vec<Option<String>>> = vec![vec![None; params.len()]];
        for (index, axis) in self.axes.iter().enumerate() {
            let slots: Vec<usize> = axis
                .parameters()
                .iter()
                .filter_map(|name| params.position(name))
                .collect();
            let rows = axis.rows()?;
            if rows.is_empty() {
                return Err(err_msg!(Sweep, "axis {} has no values", index));
            }
            for row in &rows {
                check_row(index, &slots, row)?;
            }
            let (slots, rows) = (&slots, &rows);
            partials = partials
                .iter()
                .flat_map(|partial| {
                    rows.iter().map(move |row| {
                        let mut next = partial.clone();
                        for (slot, value) in slots.iter().zip(row) {
                            next[*slot] = Some(value.clone());
                        }
                        next
                    })
                })
                .collect();
        }

        let mut seen = HashSet::new();
        let mut cases = Vec::with_capacity(partials.len());
        for partial in partials {
            let values: Vec<String> = partial.into_iter().flatten().collect();
            let case = TestCase::from_values(&params, values)?;
            if !seen.insert(case.name()) {
                return Err(err_msg!(
                    DuplicateTest,
                    "'{}' is produced more than once; an axis repeats a value",
                    case
                ));
            }
            cases.push(case);
        }

        debug!(
            parameters = params.len(),
            axes = self.axes.len(),
            tests = cases.len(),
            "expanded sweep"
        );
        Ok(Expansion { params, cases })
    }
}

fn check_row(axis: usize, slots: &[usize], row: &[String]) -> Result<(), SweepError> {
    if row.len() != slots.len() {
        return Err(err_msg!(
            ArityMismatch,
            "axis {} binds {} parameters but a row has {} values",
            axis,
            slots.len(),
            row.len()
        ));
    }
    for value in row {
        if value.is_empty() {
            return Err(err_msg!(Sweep, "axis {} has an empty value", axis));
        }
        if value.contains(SEPARATOR) {
            return Err(err_help!(
                Sweep,
                format!("value '{value}' on axis {axis} contains the separator '{SEPARATOR}'"),
                "two different cases could encode to the same test name"
            ));
        }
        if let Some(c) = find_make_special(value) {
            return Err(err_help!(
                Sweep,
                format!("value '{value}' on axis {axis} contains '{c}'"),
                "values become Make targets, directory names and $(call ...) arguments"
            ));
        }
        if !is_round_trip_safe(value) {
            warn!(axis, value = %value, "value contains '_' and will not survive name decoding");
        }
    }
    Ok(())
}

/// How `tests.mk` spells each test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestsStyle {
    /// `TESTS += $(call test-name,32,4,4,SERIAL)`
    Call,
    /// `TESTS += n_32__tgx_4__tgy_4__impl_SERIAL`
    Literal,
}

/// The parameters and ordered test cases of an expanded sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub params: ParameterList,
    pub cases: Vec<TestCase>,
}

#[derive(Serialize)]
struct JsonTest<'a> {
    name: String,
    values: Vec<&'a str>,
}

#[derive(Serialize)]
struct JsonSweep<'a> {
    parameters: Vec<&'a str>,
    tests: Vec<JsonTest<'a>>,
}

impl Expansion {
    /// Renders the `tests.mk` consumed by the generated Makefile.
    pub fn render_tests_mk(&self, style: TestsStyle) -> String {
        self.cases
            .iter()
            .map(|case| match style {
                TestsStyle::Call => format!(
                    "TESTS += $(call test-name,{})\n",
                    case.values().collect::<Vec<_>>().join(",")
                ),
                TestsStyle::Literal => format!("TESTS += {}\n", case.name()),
            })
            .collect()
    }

    /// Pretty JSON: `{"parameters": [...], "tests": [{"name", "values"}]}`.
    pub fn to_json(&self) -> Result<String, SweepError> {
        let doc = JsonSweep {
            parameters: self.params.names(),
            tests: self
                .cases
                .iter()
                .map(|case| JsonTest {
                    name: case.name(),
                    values: case.values().collect(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&doc)
            .map_err(|e| err_msg!(Sweep, "failed to serialize sweep").with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::extract;
    use crate::ErrorType;

    const MATMUL: &str = "\
parameters: [n, tgx, tgy, impl]
axes:
  - parameter: impl
    values: [SERIAL, APPLRTS, CELLO]
  - parameter: n
    values: [32, 256]
  - parameters: [tgx, tgy]
    values: [[1, 1], [2, 2], [4, 4], [8, 8], [16, 8]]
";

    fn expand(text: &str) -> Result<Expansion, SweepError> {
        SweepSpec::parse("sweep.yaml", text, SweepFormat::Yaml)?.expand()
    }

    #[test]
    fn expands_product_outermost_first() {
        let expansion = expand(MATMUL).unwrap();
        assert_eq!(expansion.cases.len(), 3 * 2 * 5);
        assert_eq!(expansion.cases[0].name(), "n_32__tgx_1__tgy_1__impl_SERIAL");
        assert_eq!(expansion.cases[1].name(), "n_32__tgx_2__tgy_2__impl_SERIAL");
        assert_eq!(expansion.cases[5].name(), "n_256__tgx_1__tgy_1__impl_SERIAL");
        assert_eq!(expansion.cases[29].name(), "n_256__tgx_16__tgy_8__impl_CELLO");
    }

    #[test]
    fn every_name_decodes_back() {
        let expansion = expand(MATMUL).unwrap();
        for case in &expansion.cases {
            let name = case.name();
            for (param, value) in case.entries() {
                assert_eq!(extract(&name, param.as_str()).as_deref(), Some(value.as_str()));
            }
        }
    }

    #[test]
    fn call_style_matches_positional_macro() {
        let expansion = expand(MATMUL).unwrap();
        let text = expansion.render_tests_mk(TestsStyle::Call);
        assert_eq!(text.lines().count(), 30);
        assert_eq!(
            text.lines().next(),
            Some("TESTS += $(call test-name,32,1,1,SERIAL)")
        );
        let literal = expansion.render_tests_mk(TestsStyle::Literal);
        assert_eq!(
            literal.lines().last(),
            Some("TESTS += n_256__tgx_16__tgy_8__impl_CELLO")
        );
    }

    #[test]
    fn order_defaults_to_axis_appearance() {
        let expansion = expand("axes:\n  - parameter: impl\n    values: [A]\n  - parameter: n\n    values: [1, 2]\n").unwrap();
        assert_eq!(expansion.params.names(), vec!["impl", "n"]);
        assert_eq!(expansion.cases[1].name(), "impl_A__n_2");
    }

    #[test]
    fn json_sweeps_are_accepted() {
        let spec = SweepSpec::parse(
            "sweep.json",
            r#"{"axes": [{"parameter": "n", "values": [32, 1.5, true]}]}"#,
            SweepFormat::Json,
        )
        .unwrap();
        let names: Vec<_> = spec.expand().unwrap().cases.iter().map(TestCase::name).collect();
        assert_eq!(names, vec!["n_32", "n_1.5", "n_true"]);
    }

    #[test]
    fn numbers_keep_their_value() {
        let expansion = expand("axes:\n  - parameter: n\n    values: [1.0, 2.50, -3, 18446744073709551615, '2.50']\n").unwrap();
        let names: Vec<_> = expansion.cases.iter().map(TestCase::name).collect();
        assert_eq!(
            names,
            vec!["n_1.0", "n_2.5", "n_-3", "n_18446744073709551615", "n_2.50"]
        );
    }

    #[test]
    fn inexact_numbers_are_rejected() {
        let huge = "axes:\n  - parameter: n\n    values: [18446744073709551616]\n";
        assert_eq!(expand(huge).unwrap_err().error_type(), ErrorType::Sweep);

        let infinite = "axes:\n  - parameter: n\n    values: [.inf]\n";
        assert_eq!(expand(infinite).unwrap_err().error_type(), ErrorType::Sweep);
    }

    #[test]
    fn binding_errors() {
        let twice = "axes:\n  - parameter: n\n    values: [1]\n  - parameter: n\n    values: [2]\n";
        assert_eq!(expand(twice).unwrap_err().error_type(), ErrorType::Sweep);

        let unbound = "parameters: [n, m]\naxes:\n  - parameter: n\n    values: [1]\n";
        assert_eq!(expand(unbound).unwrap_err().error_type(), ErrorType::Sweep);

        let unlisted = "parameters: [n]\naxes:\n  - parameter: n\n    values: [1]\n  - parameter: m\n    values: [2]\n";
        assert_eq!(expand(unlisted).unwrap_err().error_type(), ErrorType::Sweep);
    }

    #[test]
    fn value_errors() {
        let arity = "axes:\n  - parameters: [x, y]\n    values: [[1, 2], [3]]\n";
        assert_eq!(expand(arity).unwrap_err().error_type(), ErrorType::ArityMismatch);

        let empty = "axes:\n  - parameter: n\n    values: []\n";
        assert_eq!(expand(empty).unwrap_err().error_type(), ErrorType::Sweep);

        let separator = "axes:\n  - parameter: n\n    values: [a__b]\n";
        assert_eq!(expand(separator).unwrap_err().error_type(), ErrorType::Sweep);

        let special = "axes:\n  - parameter: n\n    values: ['a,b']\n";
        assert_eq!(expand(special).unwrap_err().error_type(), ErrorType::Sweep);

        let repeated = "axes:\n  - parameter: n\n    values: [1, 1]\n";
        assert_eq!(expand(repeated).unwrap_err().error_type(), ErrorType::DuplicateTest);
    }

    #[test]
    fn parse_errors_point_into_source() {
        let err = SweepSpec::parse("s.yaml", "axes: [\n", SweepFormat::Yaml).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Sweep);
        let err = SweepSpec::parse("s.json", "{\"axes\": 3}", SweepFormat::Json).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Sweep);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SweepFormat::from_path(Path::new("a.JSON")), SweepFormat::Json);
        assert_eq!(SweepFormat::from_path(Path::new("a.yml")), SweepFormat::Yaml);
        assert_eq!(SweepFormat::from_path(Path::new("sweep")), SweepFormat::Yaml);
    }
}
