//! Scenario Files
//!
//! A scenario declares setups and then a sequence of calls:
//!
//! ```toml
//! [config]
//! name = "payments"
//!
//! [[setup]]
//! method = "Charge"
//! params = ["str", "int"]
//! result = "bool"
//! matchers = ["any", { range = [1, 500] }]
//! returns = true
//! times = { min = 1, max = 2 }
//!
//! [[call]]
//! method = "Charge"
//! args = ["alice", 120]
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use understudy::{
    CallBound, CallSignature, Fault, Matcher, SetupError, SubstituteConfig, Value, ValueKind,
};

/// Scenario errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("setup {index} ({method}): unknown matcher `{keyword}`")]
    UnknownMatcher {
        index: usize,
        method: String,
        keyword: String,
    },

    #[error("setup {index} ({method}): {source}")]
    Setup {
        index: usize,
        method: String,
        #[source]
        source: SetupError,
    },
}

/// A parsed scenario.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Substitute configuration; absent keys take defaults.
    pub config: SubstituteConfig,

    /// Setups, registered in order.
    #[serde(rename = "setup")]
    pub setups: Vec<SetupSpec>,

    /// Calls, dispatched in order after all setups are registered.
    #[serde(rename = "call")]
    pub calls: Vec<CallSpec>,
}

impl Scenario {
    /// Parses a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// One `[[setup]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupSpec {
    pub method: String,

    #[serde(default)]
    pub params: Vec<ValueKind>,

    /// Declared return kind.
    #[serde(default)]
    pub result: ValueKind,

    /// One matcher per parameter; omitted means `any` for every parameter.
    #[serde(default)]
    pub matchers: Option<Vec<MatcherSpec>>,

    #[serde(default)]
    pub returns: Option<Value>,

    #[serde(default)]
    pub throws: Option<Fault>,

    #[serde(default)]
    pub times: Option<TimesSpec>,
}

impl SetupSpec {
    /// The call signature this setup declares.
    pub fn signature(&self) -> CallSignature {
        CallSignature::new(self.method.clone(), self.params.clone(), self.result)
    }

    /// Builds the matcher list, defaulting to `any` per parameter.
    pub fn build_matchers(&self, index: usize) -> Result<Vec<Matcher>, ScenarioError> {
        match &self.matchers {
            None => Ok(vec![Matcher::any(); self.params.len()]),
            Some(specs) => specs
                .iter()
                .map(|spec| spec.build(index, &self.method))
                .collect(),
        }
    }

    /// Builds the call bound, if one was declared.
    pub fn build_bound(&self, index: usize) -> Result<Option<CallBound>, ScenarioError> {
        let Some(times) = self.times else {
            return Ok(None);
        };
        let bound = match times.max {
            Some(max) => CallBound::between(times.min, max).map_err(|source| ScenarioError::Setup {
                index,
                method: self.method.clone(),
                source,
            })?,
            None => CallBound::at_least(times.min),
        };
        Ok(Some(bound))
    }
}

/// A matcher as written in a scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MatcherSpec {
    /// A bare keyword; only `"any"` is recognized.
    Keyword(String),
    /// A single-key table such as `{ equal = 3 }`.
    Rule(MatcherRule),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherRule {
    Equal(Value),
    Range((Value, Value)),
    OneOf(Vec<Value>),
}

impl MatcherSpec {
    fn build(&self, index: usize, method: &str) -> Result<Matcher, ScenarioError> {
        match self {
            MatcherSpec::Keyword(k) if k == "any" => Ok(Matcher::any()),
            MatcherSpec::Keyword(k) => Err(ScenarioError::UnknownMatcher {
                index,
                method: method.to_string(),
                keyword: k.clone(),
            }),
            MatcherSpec::Rule(MatcherRule::Equal(v)) => Ok(Matcher::Equal(v.clone())),
            MatcherSpec::Rule(MatcherRule::Range((low, high))) => Ok(Matcher::Range {
                low: low.clone(),
                high: high.clone(),
            }),
            MatcherSpec::Rule(MatcherRule::OneOf(values)) => Ok(Matcher::OneOf(values.clone())),
        }
    }
}

/// Call-count bound as written in a scenario file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimesSpec {
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: Option<u32>,
}

/// One `[[call]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CallSpec {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_scenario() {
        let scenario = Scenario::from_toml_str(
            r#"
            [config]
            name = "payments"
            unmatched = "loose"

            [[setup]]
            method = "Charge"
            params = ["str", "int"]
            result = "bool"
            matchers = ["any", { range = [1, 500] }]
            returns = true
            times = { min = 1, max = 2 }

            [[setup]]
            method = "Charge"
            params = ["str", "int"]
            result = "bool"
            matchers = [{ one_of = ["mallory", "eve"] }, "any"]
            throws = { kind = "Declined", message = "blocked account" }

            [[call]]
            method = "Charge"
            args = ["alice", 120]
            "#,
        )
        .unwrap();

        assert_eq!(scenario.config.name, "payments");
        assert_eq!(scenario.setups.len(), 2);
        assert_eq!(scenario.calls[0].args, vec![Value::from("alice"), Value::from(120)]);

        let matchers = scenario.setups[0].build_matchers(0).unwrap();
        assert_eq!(matchers, vec![Matcher::any(), Matcher::range(1, 500)]);
        assert_eq!(
            scenario.setups[0].build_bound(0).unwrap(),
            Some(CallBound::between(1, 2).unwrap())
        );
        assert_eq!(
            scenario.setups[1].throws,
            Some(Fault::new("Declined", "blocked account"))
        );
    }

    #[test]
    fn test_missing_matchers_default_to_any() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[setup]]
            method = "Put"
            params = ["str", "any"]
            "#,
        )
        .unwrap();
        let matchers = scenario.setups[0].build_matchers(0).unwrap();
        assert_eq!(matchers, vec![Matcher::any(), Matcher::any()]);
    }

    #[test]
    fn test_unknown_keyword() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[setup]]
            method = "Put"
            params = ["str"]
            matchers = ["anything"]
            "#,
        )
        .unwrap();
        let err = scenario.setups[0].build_matchers(0).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownMatcher { ref keyword, .. } if keyword == "anything"));
    }

    #[test]
    fn test_inverted_times_rejected() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[setup]]
            method = "Put"
            times = { min = 3, max = 1 }
            "#,
        )
        .unwrap();
        assert!(matches!(
            scenario.setups[0].build_bound(0),
            Err(ScenarioError::Setup { source: SetupError::InvalidCallBound { .. }, .. })
        ));
    }
}
