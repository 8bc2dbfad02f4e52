//! Parameters, test cases, and the flat test-name encoding.
//!
//! A test case is kept as an ordered mapping from parameter to value and is
//! flattened into a test name only where Make needs one:
//!
//! ```text
//! n_32__impl_SERIAL
//! ^ ^^  ^^^^ ^^^^^^
//! | |   |    value
//! | |   parameter
//! | value
//! parameter        (segments joined by SEPARATOR)
//! ```
//!
//! The encoding is lossy when a value contains `_`: [`extract`] returns the
//! token after the last underscore of a segment, exactly as the generated
//! `get-<param>` Make macro does.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{to_error_source, Span};
use crate::{err_ctx, err_help, err_msg, SweepError};

/// Joins parameter segments inside a test name.
pub const SEPARATOR: &str = "__";

/// Joins a parameter name to its value inside one segment.
pub const JOINER: &str = "_";

static PARAMETER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(_[A-Za-z0-9-]+)*$").unwrap());

/// A validated parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter(String);

impl Parameter {
    /// Validates `name` as a Make-safe identifier that cannot contain the separator.
    pub fn new(name: impl Into<String>) -> Result<Self, SweepError> {
        let name = name.into();
        if name.is_empty() {
            return Err(err_msg!(InvalidParameter, "parameter names cannot be empty"));
        }
        if name.contains(SEPARATOR) {
            return Err(err_help!(
                InvalidParameter,
                format!("'{name}' contains the separator '{SEPARATOR}'"),
                "test names are split on '__', so a parameter name containing it cannot be recovered"
            ));
        }
        if !PARAMETER_RE.is_match(&name) {
            return Err(err_help!(
                InvalidParameter,
                format!("'{name}' is not a valid parameter name"),
                "use letters, digits and '-', optionally joined by single underscores, starting with a letter"
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `<name>_` prefix that marks this parameter's segment.
    fn segment_prefix(&self) -> String {
        format!("{}{JOINER}", self.0)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Parameter {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered list of distinct parameters.
///
/// Besides duplicates, the list rejects pairs where one name is a
/// `<other>_` prefix of another (`n` and `n_x`): the `get-n` Make macro would
/// match both segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterList {
    params: Vec<Parameter>,
}

impl ParameterList {
    pub fn new<I, S>(names: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params = names
            .into_iter()
            .map(Parameter::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_parameters(params)
    }

    pub fn from_parameters(params: Vec<Parameter>) -> Result<Self, SweepError> {
        for (i, a) in params.iter().enumerate() {
            for b in &params[i + 1..] {
                if a == b {
                    return Err(err_msg!(
                        DuplicateParameter,
                        "'{}' appears more than once",
                        a
                    ));
                }
                if b.as_str().starts_with(&a.segment_prefix())
                    || a.as_str().starts_with(&b.segment_prefix())
                {
                    return Err(err_help!(
                        InvalidParameter,
                        format!("'{a}' and '{b}' are ambiguous"),
                        "one parameter name followed by '_' is a prefix of the other, so value extraction would match both"
                    ));
                }
            }
        }
        Ok(Self { params })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(Parameter::as_str).collect()
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Builds the flat test name for positional `values` in parameter order.
///
/// Values are not checked: callers wanting a reversible name should keep
/// values free of `_` (see [`is_round_trip_safe`]).
pub fn construct<S: AsRef<str>>(params: &ParameterList, values: &[S]) -> Result<String, SweepError> {
    if values.len() != params.len() {
        return Err(err_msg!(
            ArityMismatch,
            "expected {} values for [{}], got {}",
            params.len(),
            params.names().join(", "),
            values.len()
        ));
    }
    Ok(params
        .iter()
        .zip(values)
        .map(|(p, v)| format!("{p}{JOINER}{}", v.as_ref()))
        .collect::<Vec<_>>()
        .join(SEPARATOR))
}

/// Recovers the value of `param` from a test name.
///
/// Follows `$(lastword $(subst _, ,$(filter <param>_%,$(subst __, ,$(1)))))`:
/// whitespace-separated words, the matching segments, then the last
/// underscore-separated token.
pub fn extract(test_name: &str, param: &str) -> Option<String> {
    let prefix = format!("{param}{JOINER}");
    let spaced = test_name.replace(SEPARATOR, " ");
    let matched = spaced
        .split_whitespace()
        .filter(|word| word.starts_with(&prefix))
        .collect::<Vec<_>>()
        .join(" ");
    matched
        .replace(JOINER, " ")
        .split_whitespace()
        .last()
        .map(str::to_string)
}

/// True when a value survives `extract(construct(..))` unchanged.
pub fn is_round_trip_safe(value: &str) -> bool {
    !value.is_empty() && !value.contains(JOINER) && !value.chars().any(char::is_whitespace)
}

/// One concrete combination of parameter values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    entries: Vec<(Parameter, String)>,
}

impl TestCase {
    /// Pairs `values` positionally with `params`.
    pub fn from_values<I, S>(params: &ParameterList, values: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != params.len() {
            return Err(err_msg!(
                ArityMismatch,
                "expected {} values for [{}], got {}",
                params.len(),
                params.names().join(", "),
                values.len()
            ));
        }
        Ok(Self {
            entries: params.iter().cloned().zip(values).collect(),
        })
    }

    /// Builds a case from `(name, value)` pairs; the pair order fixes the parameter order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        let params = ParameterList::new(names)?;
        Self::from_values(&params, values)
    }

    /// Decodes a test name against `params`.
    ///
    /// Fails when a parameter has no segment or when the decoded values do not
    /// rebuild the same name (a value contained `_`).
    pub fn decode(params: &ParameterList, test_name: &str) -> Result<Self, SweepError> {
        let src = to_error_source("test name", test_name);
        let mut values = Vec::with_capacity(params.len());
        for param in params {
            match extract(test_name, param.as_str()) {
                Some(value) => values.push(value),
                None => {
                    return Err(err_ctx!(
                        MalformedTestName,
                        format!("no '{}' segment", param.segment_prefix()),
                        src,
                        Span::new(0, test_name.len()),
                        format!("expected segments for [{}]", params.names().join(", "))
                    ))
                }
            }
        }
        let case = Self::from_values(params, values)?;
        let rebuilt = case.name();
        if rebuilt != test_name {
            let at = rebuilt
                .bytes()
                .zip(test_name.bytes())
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| rebuilt.len().min(test_name.len()));
            return Err(err_ctx!(
                MalformedTestName,
                format!("decodes to '{rebuilt}', which is a different name"),
                src,
                Span::new(at, test_name.len()),
                "values containing '_' cannot be recovered from a test name"
            ));
        }
        Ok(case)
    }

    /// The flat test name of this case.
    pub fn name(&self) -> String {
        self.entries
            .iter()
            .map(|(p, v)| format!("{p}{JOINER}{v}"))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    pub fn get(&self, param: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_str() == param)
            .map(|(_, v)| v.as_str())
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter().map(|(p, _)| p)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(Parameter, String)] {
        &self.entries
    }

    /// Values that [`extract`] would not give back unchanged.
    pub fn lossy_values(&self) -> Vec<(&Parameter, &str)> {
        self.entries
            .iter()
            .filter(|(_, v)| !is_round_trip_safe(v))
            .map(|(p, v)| (p, v.as_str()))
            .collect()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;

    fn params(names: &[&str]) -> ParameterList {
        ParameterList::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn constructs_documented_example() {
        let p = params(&["n", "impl"]);
        assert_eq!(construct(&p, &["32", "SERIAL"]).unwrap(), "n_32__impl_SERIAL");
    }

    #[test]
    fn extracts_documented_example() {
        assert_eq!(extract("n_32__impl_SERIAL", "impl").as_deref(), Some("SERIAL"));
        assert_eq!(extract("n_32__impl_SERIAL", "n").as_deref(), Some("32"));
        assert_eq!(extract("n_32__impl_SERIAL", "tgx"), None);
    }

    #[test]
    fn empty_parameter_list_builds_empty_name() {
        let p = params(&[]);
        let empty: [&str; 0] = [];
        assert_eq!(construct(&p, &empty).unwrap(), "");
    }

    #[test]
    fn arity_is_checked() {
        let p = params(&["n", "impl"]);
        let err = construct(&p, &["32"]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ArityMismatch);
    }

    #[test]
    fn underscore_values_are_lossy() {
        let p = params(&["impl"]);
        let name = construct(&p, &["work_stealing"]).unwrap();
        assert_eq!(extract(&name, "impl").as_deref(), Some("stealing"));
        assert!(!is_round_trip_safe("work_stealing"));
    }

    #[test]
    fn empty_value_matches_make_behavior() {
        // `n_` becomes the single word `n` after `$(subst _, ,...)`.
        assert_eq!(extract("n_", "n").as_deref(), Some("n"));
    }

    #[test]
    fn parameter_names_are_validated() {
        assert!(Parameter::new("appl-impl").is_ok());
        assert!(Parameter::new("tg_x").is_ok());
        for bad in ["", "a__b", "_a", "a_", "9n", "a b", "a,b", "$(x)"] {
            let err = Parameter::new(bad).unwrap_err();
            assert_eq!(err.error_type(), ErrorType::InvalidParameter, "{bad}");
        }
    }

    #[test]
    fn duplicates_and_prefix_collisions_are_rejected() {
        let err = ParameterList::new(["n", "impl", "n"]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::DuplicateParameter);

        let err = ParameterList::new(["n", "n_x"]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidParameter);

        assert!(ParameterList::new(["n", "nx"]).is_ok());
    }

    #[test]
    fn decode_inverts_name() {
        let p = params(&["n", "tgx", "tgy", "impl"]);
        let case = TestCase::from_values(&p, ["32", "4", "4", "CELLO"]).unwrap();
        let decoded = TestCase::decode(&p, &case.name()).unwrap();
        assert_eq!(decoded, case);
        assert_eq!(decoded.get("tgy"), Some("4"));
    }

    #[test]
    fn decode_rejects_missing_and_lossy_segments() {
        let p = params(&["n", "impl"]);
        let err = TestCase::decode(&p, "n_32").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedTestName);

        let err = TestCase::decode(&p, "n_32__impl_a_b").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedTestName);
    }

    #[test]
    fn pairs_fix_parameter_order() {
        let case = TestCase::from_pairs([("impl", "SERIAL"), ("n", "32")]).unwrap();
        assert_eq!(case.name(), "impl_SERIAL__n_32");
        assert!(case.lossy_values().is_empty());
    }
}
