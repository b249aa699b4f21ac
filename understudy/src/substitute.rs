//! Substitutes: the shared, lock-guarded owner of one registry and log.
//!
//! A [`Substitute`] is what generated proxies call into and what a fluent
//! builder registers setups on. Every operation takes the substitute's
//! single lock for its whole duration, so registration, dispatch and
//! sequence assignment are serialized per substitute.
//!
//! Callbacks, factories and predicates run with the lock held and must not
//! call back into the same substitute.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::{SubstituteConfig, UnmatchedPolicy};
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, SetupError, VerificationError, VerificationFailure};
use crate::invocation::{Invocation, InvocationLog};
use crate::matcher::Matcher;
use crate::registry::SetupRegistry;
use crate::setup::{CallBound, Callback, ResultProducer, Setup, SetupId, SetupState};
use crate::signature::CallSignature;
use crate::value::{Args, Fault, Value};
use crate::verify::Verifier;

static NEXT_SUBSTITUTE_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a setup on a specific substitute.
///
/// A handle is bound to the substitute that issued it and to the
/// generation of its registry; [`Substitute::reset`] starts a new
/// generation, after which older handles are unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetupHandle {
    substitute: u64,
    generation: u64,
    setup: SetupId,
}

impl SetupHandle {
    /// The setup's index in its registry.
    pub fn id(&self) -> SetupId {
        self.setup
    }
}

struct State {
    registry: SetupRegistry,
    log: InvocationLog,
    generation: u64,
}

struct Inner {
    id: u64,
    config: SubstituteConfig,
    state: Mutex<State>,
}

/// A stand-in object's engine state. Clones share the same state.
#[derive(Clone)]
pub struct Substitute {
    inner: Arc<Inner>,
}

impl Substitute {
    /// Creates a substitute with the given configuration.
    pub fn new(config: SubstituteConfig) -> Self {
        let id = NEXT_SUBSTITUTE_ID.fetch_add(1, Ordering::Relaxed);
        debug!("created substitute {} ({})", config.name, id);
        Self {
            inner: Arc::new(Inner {
                id,
                config,
                state: Mutex::new(State {
                    registry: SetupRegistry::new(),
                    log: InvocationLog::new(),
                    generation: 0,
                }),
            }),
        }
    }

    /// Creates a substitute with default configuration and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(SubstituteConfig::named(name))
    }

    /// Unique identity of this substitute within the process.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &SubstituteConfig {
        &self.inner.config
    }

    // ---- Builder side ----------------------------------------------------

    /// Registers a setup for calls of `signature` whose arguments satisfy
    /// `matchers`, one matcher per parameter.
    pub fn setup(
        &self,
        signature: CallSignature,
        matchers: Vec<Matcher>,
    ) -> Result<SetupHandle, SetupError> {
        let mut state = self.inner.state.lock();
        let setup = state.registry.register(signature, matchers)?;
        Ok(SetupHandle {
            substitute: self.inner.id,
            generation: state.generation,
            setup,
        })
    }

    /// Appends a callback to a setup.
    pub fn callback(&self, handle: SetupHandle, callback: Callback) -> Result<(), SetupError> {
        self.with_setup(handle, |setup| setup.add_callback(callback))
    }

    /// Makes a setup return a fixed value.
    pub fn returns(&self, handle: SetupHandle, value: impl Into<Value>) -> Result<(), SetupError> {
        let producer = ResultProducer::Value(value.into());
        self.with_setup(handle, |setup| setup.set_return(producer))
    }

    /// Makes a setup return a value computed from the call's arguments.
    pub fn returns_with<F>(&self, handle: SetupHandle, factory: F) -> Result<(), SetupError>
    where
        F: Fn(Args<'_>) -> Value + Send + Sync + 'static,
    {
        let producer = ResultProducer::ValueWith(Arc::new(factory));
        self.with_setup(handle, |setup| setup.set_return(producer))
    }

    /// Makes a setup raise a fixed fault.
    pub fn throws(&self, handle: SetupHandle, fault: Fault) -> Result<(), SetupError> {
        let producer = ResultProducer::Fault(fault);
        self.with_setup(handle, |setup| setup.set_throw(producer))
    }

    /// Makes a setup raise a fault computed from the call's arguments.
    pub fn throws_with<F>(&self, handle: SetupHandle, factory: F) -> Result<(), SetupError>
    where
        F: Fn(Args<'_>) -> Fault + Send + Sync + 'static,
    {
        let producer = ResultProducer::FaultWith(Arc::new(factory));
        self.with_setup(handle, |setup| setup.set_throw(producer))
    }

    /// Constrains how many times a setup may be called.
    pub fn times(&self, handle: SetupHandle, bound: CallBound) -> Result<(), SetupError> {
        self.with_setup(handle, |setup| {
            setup.set_bound(bound);
            Ok(())
        })
    }

    fn with_setup<R>(
        &self,
        handle: SetupHandle,
        f: impl FnOnce(&mut Setup) -> Result<R, SetupError>,
    ) -> Result<R, SetupError> {
        if handle.substitute != self.inner.id {
            return Err(SetupError::ForeignHandle {
                setup: handle.setup,
                owner: handle.substitute,
                substitute: self.inner.id,
            });
        }
        let mut state = self.inner.state.lock();
        if handle.generation != state.generation {
            return Err(SetupError::UnknownSetup(handle.setup));
        }
        f(state.registry.get_mut(handle.setup)?)
    }

    // ---- Proxy side ------------------------------------------------------

    /// Dispatches a call and reports unmatched calls as errors regardless
    /// of the configured policy.
    pub fn intercept(
        &self,
        signature: &CallSignature,
        arguments: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        Dispatcher::new(&mut state.registry, &mut state.log, &self.inner.config)
            .intercept(signature, arguments)
    }

    /// Dispatches a call, applying the configured unmatched-call policy.
    ///
    /// Under [`UnmatchedPolicy::Loose`] an unmatched call returns the
    /// default value of the signature's return kind; the call stays in the
    /// log without a matched setup.
    pub fn call(
        &self,
        signature: &CallSignature,
        arguments: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        match self.intercept(signature, arguments) {
            Err(DispatchError::UnmatchedCall { .. })
                if self.inner.config.unmatched == UnmatchedPolicy::Loose =>
            {
                Ok(signature.returns().default_value())
            }
            outcome => outcome,
        }
    }

    // ---- Verification side -----------------------------------------------

    /// All recorded invocations in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.inner.state.lock().log.entries().to_vec()
    }

    /// Number of recorded invocations; also the next sequence number.
    pub fn invocation_count(&self) -> usize {
        self.inner.state.lock().log.len()
    }

    /// Recorded invocations of one signature.
    pub fn invocations_of(&self, signature: &CallSignature) -> Vec<Invocation> {
        self.inner.state.lock().log.of(signature).cloned().collect()
    }

    /// Current state of one setup.
    pub fn setup_state(&self, handle: SetupHandle) -> Result<SetupState, SetupError> {
        self.with_setup(handle, |setup| Ok(setup.state()))
    }

    /// Current state of every setup, in registration order.
    pub fn setups(&self) -> Vec<SetupState> {
        let state = self.inner.state.lock();
        state.registry.entries().iter().map(Setup::state).collect()
    }

    /// Checks one setup's call count against its bound.
    pub fn verify(&self, handle: SetupHandle) -> Result<(), VerificationError> {
        let state = self.inner.state.lock();
        if handle.substitute != self.inner.id || handle.generation != state.generation {
            return Err(VerificationError {
                failures: vec![VerificationFailure::UnknownSetup {
                    setup: handle.setup,
                }],
            });
        }
        Verifier::new(&state.registry, &state.log).verify(handle.setup)
    }

    /// Checks every bounded setup.
    pub fn verify_all(&self) -> Result<(), VerificationError> {
        self.verify_with(|v| v.verify_all())
    }

    /// Checks how many recorded calls match an expression.
    pub fn verify_called(
        &self,
        signature: &CallSignature,
        matchers: &[Matcher],
        bound: CallBound,
    ) -> Result<(), VerificationError> {
        self.verify_with(|v| v.verify_called(signature, matchers, bound))
    }

    /// Fails if any recorded call went unmatched.
    pub fn verify_no_other_calls(&self) -> Result<(), VerificationError> {
        self.verify_with(|v| v.verify_no_other_calls())
    }

    /// Handles of setups that no call has reached.
    pub fn never_exercised(&self) -> Vec<SetupHandle> {
        let state = self.inner.state.lock();
        Verifier::new(&state.registry, &state.log)
            .never_exercised()
            .into_iter()
            .map(|setup| SetupHandle {
                substitute: self.inner.id,
                generation: state.generation,
                setup,
            })
            .collect()
    }

    fn verify_with<R>(&self, f: impl FnOnce(&Verifier<'_>) -> R) -> R {
        let state = self.inner.state.lock();
        f(&Verifier::new(&state.registry, &state.log))
    }

    /// Forgets all setups and recorded calls and starts a new handle
    /// generation. Outstanding handles become unknown, even after new
    /// setups reuse their indices.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        debug!(
            "resetting substitute {} ({} setup(s), {} call(s))",
            self.inner.config.name,
            state.registry.len(),
            state.log.len()
        );
        state.registry.clear();
        state.log.clear();
        state.generation += 1;
    }
}

impl Default for Substitute {
    fn default() -> Self {
        Self::new(SubstituteConfig::default())
    }
}

impl std::fmt::Debug for Substitute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Substitute")
            .field("id", &self.inner.id)
            .field("name", &self.inner.config.name)
            .finish_non_exhaustive()
    }
}
