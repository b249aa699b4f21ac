//! Error types for registration, dispatch, verification and configuration.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::setup::{CallBound, SetupId};
use crate::signature::CallSignature;
use crate::value::{Fault, Value, ValueKind};

/// Errors raised while declaring a setup or attaching behavior to it.
///
/// A rejected mutation leaves the setup exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("setup for `{signature}` has {matchers} matcher(s) but the signature takes {arity} argument(s)")]
    ArityMismatch {
        signature: CallSignature,
        matchers: usize,
        arity: usize,
    },

    #[error("callback takes {callback} argument(s) but setup {setup} for `{signature}` supplies only {arity}")]
    CallbackArity {
        setup: SetupId,
        signature: CallSignature,
        callback: usize,
        arity: usize,
    },

    #[error("setup {setup} already has a {existing} producer; cannot attach a {attempted} producer")]
    ConflictingResultProducer {
        setup: SetupId,
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("no setup {0}")]
    UnknownSetup(SetupId),

    #[error("setup handle {setup} belongs to substitute {owner}, not {substitute}")]
    ForeignHandle {
        setup: SetupId,
        owner: u64,
        substitute: u64,
    },

    #[error("invalid call bound: min {min} exceeds max {max}")]
    InvalidCallBound { min: u32, max: u32 },
}

/// Errors surfaced to the caller of an intercepted method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("`{signature}` called with {found} argument(s), expected {expected}")]
    ArityMismatch {
        signature: CallSignature,
        expected: usize,
        found: usize,
    },

    #[error("`{signature}` argument {position} is {found}, expected {expected}")]
    ArgumentKind {
        signature: CallSignature,
        position: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("no setup matches call #{sequence} {}({}) ({candidates} candidate(s) considered)", .signature.name(), DisplayArgs(.arguments))]
    UnmatchedCall {
        sequence: u64,
        signature: CallSignature,
        arguments: Vec<Value>,
        candidates: usize,
    },

    #[error("setup {setup} for `{signature}` expected to be called {bound}, but was called again after {times_called} call(s)")]
    CallCountExceeded {
        setup: SetupId,
        signature: CallSignature,
        bound: CallBound,
        times_called: u32,
    },

    #[error("matcher for argument {position} of setup {setup} faulted: {fault}")]
    MatcherEvaluation {
        setup: SetupId,
        position: usize,
        #[source]
        fault: Fault,
    },

    #[error("callback {index} of setup {setup} faulted: {fault}")]
    Callback {
        setup: SetupId,
        index: usize,
        #[source]
        fault: Fault,
    },

    /// The matched setup's throw producer fired.
    #[error("{0}")]
    Raised(Fault),
}

impl DispatchError {
    /// Returns the raised fault if this is a throw outcome.
    pub fn raised(&self) -> Option<&Fault> {
        match self {
            DispatchError::Raised(fault) => Some(fault),
            _ => None,
        }
    }
}

/// One failed verification check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// A setup's call counter is outside its bound.
    SetupCallCount {
        setup: SetupId,
        signature: CallSignature,
        bound: CallBound,
        times_called: u32,
    },
    /// The number of logged calls matching an expression is outside the bound.
    CallCount {
        signature: CallSignature,
        bound: CallBound,
        matching: u32,
    },
    /// The matcher list given to a call-count check has the wrong length.
    MatcherArity {
        signature: CallSignature,
        matchers: usize,
    },
    /// A matcher faulted while scanning the invocation log.
    MatcherFault {
        signature: CallSignature,
        sequence: u64,
        position: usize,
        fault: Fault,
    },
    /// Logged calls that no setup matched.
    UnexpectedCalls { sequences: Vec<u64> },
    /// The handle does not name a setup on this substitute.
    UnknownSetup { setup: SetupId },
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::SetupCallCount {
                setup,
                signature,
                bound,
                times_called,
            } => write!(
                f,
                "setup {} for `{}` expected to be called {}, but was called {} time(s)",
                setup, signature, bound, times_called
            ),
            VerificationFailure::CallCount {
                signature,
                bound,
                matching,
            } => write!(
                f,
                "expected `{}` to be called {}, but found {} matching call(s)",
                signature, bound, matching
            ),
            VerificationFailure::MatcherArity { signature, matchers } => write!(
                f,
                "`{}` takes {} argument(s) but {} matcher(s) were given",
                signature,
                signature.arity(),
                matchers
            ),
            VerificationFailure::MatcherFault {
                signature,
                sequence,
                position,
                fault,
            } => write!(
                f,
                "matcher for argument {} faulted on call #{} of `{}`: {}",
                position, sequence, signature, fault
            ),
            VerificationFailure::UnknownSetup { setup } => {
                write!(f, "no setup {} on this substitute", setup)
            }
            VerificationFailure::UnexpectedCalls { sequences } => {
                write!(f, "unexpected call(s) with no matching setup:")?;
                for seq in sequences {
                    write!(f, " #{}", seq)?;
                }
                Ok(())
            }
        }
    }
}

/// All failures found by one verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct VerificationError {
    pub failures: Vec<VerificationFailure>,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verification failed ({} failure(s)):", self.failures.len())?;
        for failure in &self.failures {
            writeln!(f, "  - {}", failure)?;
        }
        Ok(())
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Formats an argument list as `a, b, c`.
struct DisplayArgs<'a>(&'a [Value]);

impl fmt::Display for DisplayArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}
