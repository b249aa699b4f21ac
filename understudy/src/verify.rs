//! Verification queries over a substitute's recorded state.
//!
//! Verification never mutates anything: it reads setup counters and the
//! invocation log and reports every failure it finds at once.

use crate::error::{VerificationError, VerificationFailure};
use crate::invocation::InvocationLog;
use crate::matcher::{match_all, Matcher};
use crate::registry::SetupRegistry;
use crate::setup::{CallBound, SetupId};
use crate::signature::CallSignature;

/// Read-only verification context.
pub struct Verifier<'a> {
    registry: &'a SetupRegistry,
    log: &'a InvocationLog,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a SetupRegistry, log: &'a InvocationLog) -> Self {
        Self { registry, log }
    }

    /// Checks one setup's counter against its bound.
    ///
    /// A setup without a bound always passes. Overridden setups are checked
    /// like any other.
    pub fn verify(&self, id: SetupId) -> Result<(), VerificationError> {
        let failures: Vec<_> = self.setup_failure(id).into_iter().collect();
        into_result(failures)
    }

    /// Checks every bounded setup.
    pub fn verify_all(&self) -> Result<(), VerificationError> {
        let failures = self
            .registry
            .entries()
            .iter()
            .filter_map(|s| self.setup_failure(s.id()))
            .collect();
        into_result(failures)
    }

    /// Counts logged calls of `signature` accepted by `matchers` and checks
    /// the count against `bound`.
    pub fn verify_called(
        &self,
        signature: &CallSignature,
        matchers: &[Matcher],
        bound: CallBound,
    ) -> Result<(), VerificationError> {
        if matchers.len() != signature.arity() {
            return into_result(vec![VerificationFailure::MatcherArity {
                signature: signature.clone(),
                matchers: matchers.len(),
            }]);
        }

        let mut matching = 0;
        for invocation in self.log.of(signature) {
            match match_all(matchers, &invocation.arguments) {
                Ok(true) => matching += 1,
                Ok(false) => {}
                Err(fault) => {
                    return into_result(vec![VerificationFailure::MatcherFault {
                        signature: signature.clone(),
                        sequence: invocation.sequence,
                        position: fault.position,
                        fault: fault.fault,
                    }]);
                }
            }
        }

        if bound.is_satisfied_by(matching) {
            Ok(())
        } else {
            into_result(vec![VerificationFailure::CallCount {
                signature: signature.clone(),
                bound,
                matching,
            }])
        }
    }

    /// Fails if any logged call went unmatched.
    pub fn verify_no_other_calls(&self) -> Result<(), VerificationError> {
        let sequences: Vec<_> = self
            .log
            .entries()
            .iter()
            .filter(|i| i.matched_setup.is_none())
            .map(|i| i.sequence)
            .collect();
        if sequences.is_empty() {
            Ok(())
        } else {
            into_result(vec![VerificationFailure::UnexpectedCalls { sequences }])
        }
    }

    /// Setups that no call has reached yet.
    pub fn never_exercised(&self) -> Vec<SetupId> {
        self.registry
            .entries()
            .iter()
            .filter(|s| s.times_called() == 0)
            .map(|s| s.id())
            .collect()
    }

    fn setup_failure(&self, id: SetupId) -> Option<VerificationFailure> {
        let Some(setup) = self.registry.get(id) else {
            return Some(VerificationFailure::UnknownSetup { setup: id });
        };
        let bound = setup.bound()?;
        if bound.is_satisfied_by(setup.times_called()) {
            return None;
        }
        Some(VerificationFailure::SetupCallCount {
            setup: id,
            signature: setup.signature().clone(),
            bound,
            times_called: setup.times_called(),
        })
    }
}

fn into_result(failures: Vec<VerificationFailure>) -> Result<(), VerificationError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(VerificationError { failures })
    }
}
