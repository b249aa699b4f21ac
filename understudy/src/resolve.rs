//! Setup resolution.
//!
//! Selects which setup answers an incoming call.
//!
//! # Algorithm Overview
//!
//! 1. **Collect candidates**: active setups whose signature is identical
//!    to the call's
//! 2. **Filter applicable**: keep setups whose matchers all accept the
//!    corresponding arguments
//! 3. **Select newest**: the most recently registered applicable setup wins
//!
//! Candidates are walked newest first, so step 3 falls out of stopping at
//! the first applicable setup. Older candidates are never evaluated once a
//! newer one applies, which also means a faulting predicate on a shadowed
//! setup cannot affect the call.
//!
//! Resolution only reads the registry. The same registry state and call
//! always yield the same answer.

use tracing::trace;

use crate::error::DispatchError;
use crate::invocation::Invocation;
use crate::matcher::{match_all, MatcherFault};
use crate::registry::SetupRegistry;
use crate::setup::{Setup, SetupId};
use crate::signature::CallSignature;
use crate::value::Value;

/// Result of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A setup was selected.
    Resolved(SetupId),
    /// No active setup accepts the call.
    NoMatch(NoMatch),
}

impl Resolution {
    /// Returns the selected setup, if any.
    pub fn setup(&self) -> Option<SetupId> {
        match self {
            Resolution::Resolved(id) => Some(*id),
            Resolution::NoMatch(_) => None,
        }
    }
}

/// Details of a failed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatch {
    /// Active setups with the call's signature that were tried.
    pub candidates: usize,
}

/// Resolution context over one registry.
pub struct MatchEngine<'a> {
    registry: &'a SetupRegistry,
}

impl<'a> MatchEngine<'a> {
    /// Create a new match engine.
    pub fn new(registry: &'a SetupRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a recorded invocation.
    pub fn resolve(&self, invocation: &Invocation) -> Result<Resolution, DispatchError> {
        self.resolve_call(&invocation.signature, &invocation.arguments)
    }

    /// Resolve a call given its signature and arguments.
    ///
    /// A faulting predicate aborts resolution immediately with
    /// [`DispatchError::MatcherEvaluation`].
    pub fn resolve_call(
        &self,
        signature: &CallSignature,
        arguments: &[Value],
    ) -> Result<Resolution, DispatchError> {
        let mut considered = 0;
        for setup in self.registry.candidates(signature) {
            considered += 1;
            if self.is_applicable(setup, arguments)? {
                trace!("{} resolved to setup {}", signature, setup);
                return Ok(Resolution::Resolved(setup.id()));
            }
        }

        trace!("{} matched none of {} candidate(s)", signature, considered);
        Ok(Resolution::NoMatch(NoMatch {
            candidates: considered,
        }))
    }

    /// Check if a setup accepts the given arguments.
    ///
    /// The signature is assumed to agree already; argument count mismatches
    /// are rejected before resolution.
    pub fn is_applicable(&self, setup: &Setup, arguments: &[Value]) -> Result<bool, DispatchError> {
        match_all(setup.matchers(), arguments).map_err(|MatcherFault { position, fault }| {
            DispatchError::MatcherEvaluation {
                setup: setup.id(),
                position,
                fault,
            }
        })
    }
}
