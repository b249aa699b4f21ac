//! Understudy Replay
//!
//! Drives a [`Substitute`] from a declarative TOML scenario and reports
//! what every call produced.
//!
//! # Algorithm Overview
//!
//! 1. Register every `[[setup]]` in file order, attaching its result
//!    producer and call bound.
//! 2. Build the method table: each method name maps to its distinct
//!    declared signatures, in declaration order.
//! 3. Dispatch every `[[call]]` in file order, using the first signature
//!    of its method whose parameters admit the arguments. Calls to
//!    undeclared methods use a signature derived from their argument kinds.
//! 4. Run whole-substitute verification and collect unexercised setups.

pub mod scenario;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use understudy::{CallSignature, Substitute, SubstituteConfig, Value, ValueKind};

pub use scenario::{CallSpec, MatcherSpec, Scenario, ScenarioError, SetupSpec};

/// What a single call produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Value(Value),
    Error(String),
}

/// One replayed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallReport {
    /// Invocation-log sequence number; `None` if the call was rejected
    /// before it was logged.
    pub sequence: Option<u64>,
    pub method: String,
    pub outcome: Outcome,
}

/// End-of-run verification summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub calls: usize,
    pub setups: usize,
    /// Human-readable verification failures; empty when verification passed.
    pub failures: Vec<String>,
    /// Setups no call resolved to, by id.
    pub never_exercised: Vec<String>,
}

impl Summary {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The full result of replaying a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub calls: Vec<CallReport>,
    pub summary: Summary,
}

impl Report {
    /// Renders one JSON line per call followed by the summary line.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for call in &self.calls {
            out.push_str(&serde_json::to_string(call)?);
            out.push('\n');
        }
        out.push_str(&serde_json::to_string(&self.summary)?);
        out.push('\n');
        Ok(out)
    }
}

/// Replays a scenario with its own `[config]`.
pub fn run(scenario: &Scenario) -> Result<Report, ScenarioError> {
    run_with_config(scenario, scenario.config.clone())
}

/// Replays a scenario with an explicit substitute configuration.
pub fn run_with_config(
    scenario: &Scenario,
    config: SubstituteConfig,
) -> Result<Report, ScenarioError> {
    let sub = Substitute::new(config);
    let methods = register_setups(&sub, &scenario.setups)?;
    info!(
        "{}: replaying {} setup(s), {} call(s)",
        sub.name(),
        scenario.setups.len(),
        scenario.calls.len()
    );

    let calls = scenario
        .calls
        .iter()
        .map(|call| {
            let signature = select_signature(&methods, call);
            let before = sub.invocation_count();
            let outcome = match sub.call(&signature, call.args.clone()) {
                Ok(value) => Outcome::Value(value),
                Err(err) => Outcome::Error(err.to_string()),
            };
            let sequence = (sub.invocation_count() > before).then_some(before as u64);
            debug!(
                "{}: replayed {} (sequence {:?}): {:?}",
                sub.name(),
                signature,
                sequence,
                outcome
            );
            CallReport {
                sequence,
                method: call.method.clone(),
                outcome,
            }
        })
        .collect();

    let failures = match sub.verify_all() {
        Ok(()) => Vec::new(),
        Err(err) => err.failures.iter().map(|f| f.to_string()).collect(),
    };
    let never_exercised = sub
        .never_exercised()
        .iter()
        .map(|h| h.id().to_string())
        .collect();

    Ok(Report {
        calls,
        summary: Summary {
            calls: scenario.calls.len(),
            setups: scenario.setups.len(),
            failures,
            never_exercised,
        },
    })
}

/// Declared signatures per method name, in declaration order.
type MethodTable = IndexMap<String, Vec<CallSignature>>;

fn register_setups(sub: &Substitute, setups: &[SetupSpec]) -> Result<MethodTable, ScenarioError> {
    let mut methods: MethodTable = IndexMap::new();

    for (index, spec) in setups.iter().enumerate() {
        let setup_err = |source| ScenarioError::Setup {
            index,
            method: spec.method.clone(),
            source,
        };

        let signature = spec.signature();
        let matchers = spec.build_matchers(index)?;
        let bound = spec.build_bound(index)?;

        let handle = sub.setup(signature.clone(), matchers).map_err(setup_err)?;
        if let Some(value) = &spec.returns {
            sub.returns(handle, value.clone()).map_err(setup_err)?;
        }
        if let Some(fault) = &spec.throws {
            sub.throws(handle, fault.clone()).map_err(setup_err)?;
        }
        if let Some(bound) = bound {
            sub.times(handle, bound).map_err(setup_err)?;
        }

        let overloads = methods.entry(spec.method.clone()).or_default();
        if !overloads.contains(&signature) {
            overloads.push(signature);
        }
    }

    Ok(methods)
}

/// Picks the declared overload whose parameters admit the call's
/// arguments, falling back to the first overload so the mismatch is
/// reported by dispatch.
fn select_signature(methods: &MethodTable, call: &CallSpec) -> CallSignature {
    let Some(overloads) = methods.get(&call.method) else {
        return loose_signature(call);
    };
    overloads
        .iter()
        .find(|sig| sig.arity() == call.args.len() && sig.first_nonconforming(&call.args).is_none())
        .or_else(|| overloads.first())
        .cloned()
        .unwrap_or_else(|| loose_signature(call))
}

/// Signature for a call with no declaring setup.
fn loose_signature(call: &CallSpec) -> CallSignature {
    let params = call.args.iter().map(Value::kind).collect();
    CallSignature::new(call.method.clone(), params, ValueKind::Any)
}
