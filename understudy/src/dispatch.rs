//! Call dispatch.
//!
//! The [`Dispatcher`] carries one intercepted call through the engine:
//!
//! 1. Validate the arguments and append the call to the invocation log
//! 2. Resolve the call against the registry
//! 3. Enforce the matched setup's call bound and count the call
//! 4. Run callbacks in attachment order
//! 5. Compute the outcome from the result producer
//!
//! Call bounds are enforced eagerly: the call that would take a setup past
//! its maximum fails with [`DispatchError::CallCountExceeded`] and is not
//! counted, so the setup's counter never exceeds its maximum.

use tracing::{debug, trace, warn};

use crate::config::SubstituteConfig;
use crate::error::DispatchError;
use crate::invocation::InvocationLog;
use crate::registry::SetupRegistry;
use crate::resolve::{MatchEngine, Resolution};
use crate::signature::CallSignature;
use crate::value::Value;

/// Dispatch context over one substitute's state.
pub struct Dispatcher<'a> {
    registry: &'a mut SetupRegistry,
    log: &'a mut InvocationLog,
    config: &'a SubstituteConfig,
}

impl<'a> Dispatcher<'a> {
    /// Create a new dispatcher.
    pub fn new(
        registry: &'a mut SetupRegistry,
        log: &'a mut InvocationLog,
        config: &'a SubstituteConfig,
    ) -> Self {
        Self {
            registry,
            log,
            config,
        }
    }

    /// Dispatch one call and return its outcome.
    ///
    /// Calls with the wrong number or kinds of arguments are rejected
    /// before they reach the log.
    pub fn intercept(
        &mut self,
        signature: &CallSignature,
        arguments: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        if arguments.len() != signature.arity() {
            return Err(DispatchError::ArityMismatch {
                signature: signature.clone(),
                expected: signature.arity(),
                found: arguments.len(),
            });
        }
        if let Some(position) = signature.first_nonconforming(&arguments) {
            return Err(DispatchError::ArgumentKind {
                signature: signature.clone(),
                position,
                expected: signature.params()[position],
                found: arguments[position].kind(),
            });
        }

        let sequence = self.log.append(signature.clone(), arguments);
        let invocation = &self.log.entries()[sequence as usize];
        if self.config.log_arguments {
            trace!(
                "{}: call #{} {:?}",
                self.config.name,
                sequence,
                invocation.arguments
            );
        }

        let resolution = MatchEngine::new(self.registry).resolve(invocation)?;
        let id = match resolution {
            Resolution::Resolved(id) => id,
            Resolution::NoMatch(no_match) => {
                debug!(
                    "{}: call #{} to {} matched no setup",
                    self.config.name, sequence, signature
                );
                return Err(DispatchError::UnmatchedCall {
                    sequence,
                    signature: signature.clone(),
                    arguments: invocation.arguments.clone(),
                    candidates: no_match.candidates,
                });
            }
        };
        self.log.set_matched(sequence, id);

        let setup = self.registry.entry_mut(id);
        if let Some(bound) = setup.bound() {
            if !bound.admits_another(setup.times_called()) {
                warn!(
                    "{}: setup {} exceeded its call bound ({}) on call #{}",
                    self.config.name, setup, bound, sequence
                );
                return Err(DispatchError::CallCountExceeded {
                    setup: id,
                    signature: signature.clone(),
                    bound,
                    times_called: setup.times_called(),
                });
            }
        }
        setup.record_call();
        debug!(
            "{}: call #{} dispatched to setup {} ({} call(s))",
            self.config.name,
            sequence,
            setup,
            setup.times_called()
        );

        let setup = &*setup;
        let arguments = self.log.entries()[sequence as usize].arguments.as_slice();

        for (index, callback) in setup.callbacks().iter().enumerate() {
            callback
                .invoke(arguments)
                .map_err(|fault| DispatchError::Callback {
                    setup: id,
                    index,
                    fault,
                })?;
        }

        setup
            .result()
            .produce(arguments, signature.returns().default_value())
            .map_err(DispatchError::Raised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::matcher::Matcher;
    use crate::setup::{CallBound, Callback, ResultProducer};
    use crate::value::{Fault, ValueKind};

    struct Fixture {
        registry: SetupRegistry,
        log: InvocationLog,
        config: SubstituteConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: SetupRegistry::new(),
                log: InvocationLog::new(),
                config: SubstituteConfig::default(),
            }
        }

        fn call(&mut self, sig: &CallSignature, args: Vec<Value>) -> Result<Value, DispatchError> {
            Dispatcher::new(&mut self.registry, &mut self.log, &self.config).intercept(sig, args)
        }
    }

    fn execute() -> CallSignature {
        CallSignature::new("Execute", vec![ValueKind::Str], ValueKind::Bool)
    }

    #[test]
    fn test_unset_returns_default() {
        let mut fx = Fixture::new();
        fx.registry.register(execute(), vec![Matcher::any()]).unwrap();

        assert_eq!(fx.call(&execute(), vec![Value::from("go")]), Ok(Value::Bool(false)));
        assert_eq!(fx.log.entries()[0].matched_setup.map(|s| s.index()), Some(0));
    }

    #[test]
    fn test_unmatched_call_is_logged() {
        let mut fx = Fixture::new();
        let err = fx.call(&execute(), vec![Value::from("go")]).unwrap_err();

        assert!(matches!(err, DispatchError::UnmatchedCall { sequence: 0, candidates: 0, .. }));
        assert_eq!(fx.log.len(), 1);
        assert_eq!(fx.log.entries()[0].matched_setup, None);
    }

    #[test]
    fn test_arity_and_kind_rejected_before_logging() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.call(&execute(), vec![]),
            Err(DispatchError::ArityMismatch { expected: 1, found: 0, .. })
        ));
        assert!(matches!(
            fx.call(&execute(), vec![Value::from(3)]),
            Err(DispatchError::ArgumentKind { position: 0, .. })
        ));
        assert!(fx.log.is_empty());
    }

    #[test]
    fn test_callbacks_run_in_order_before_result() {
        let mut fx = Fixture::new();
        let id = fx.registry.register(execute(), vec![Matcher::any()]).unwrap();
        let trace = Arc::new(Mutex::new(Vec::new()));

        let setup = fx.registry.get_mut(id).unwrap();
        for label in ["first", "second"] {
            let trace = Arc::clone(&trace);
            setup
                .add_callback(Callback::nullary(move || trace.lock().push(label)))
                .unwrap();
        }
        let t = Arc::clone(&trace);
        setup
            .set_return(ResultProducer::ValueWith(Arc::new(move |_: crate::value::Args<'_>| {
                t.lock().push("result");
                Value::Bool(true)
            })))
            .unwrap();

        assert_eq!(fx.call(&execute(), vec![Value::from("go")]), Ok(Value::Bool(true)));
        assert_eq!(*trace.lock(), vec!["first", "second", "result"]);
    }

    #[test]
    fn test_callback_fault_stops_dispatch() {
        let mut fx = Fixture::new();
        let id = fx.registry.register(execute(), vec![Matcher::any()]).unwrap();
        let ran_after = Arc::new(Mutex::new(false));

        let setup = fx.registry.get_mut(id).unwrap();
        setup
            .add_callback(Callback::new(0, |_| Err(Fault::new("Boom", "callback"))))
            .unwrap();
        let flag = Arc::clone(&ran_after);
        setup
            .add_callback(Callback::nullary(move || *flag.lock() = true))
            .unwrap();
        setup.set_return(ResultProducer::Value(Value::Bool(true))).unwrap();

        let err = fx.call(&execute(), vec![Value::from("go")]).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Callback {
                setup: id,
                index: 0,
                fault: Fault::new("Boom", "callback"),
            }
        );
        assert!(!*ran_after.lock());
        assert_eq!(fx.registry.get(id).unwrap().times_called(), 1);
    }

    #[test]
    fn test_throw_producer_raises() {
        let mut fx = Fixture::new();
        let id = fx.registry.register(execute(), vec![Matcher::any()]).unwrap();
        fx.registry
            .get_mut(id)
            .unwrap()
            .set_throw(ResultProducer::Fault(Fault::new("InvalidOperation", "nope")))
            .unwrap();

        let err = fx.call(&execute(), vec![Value::from("go")]).unwrap_err();
        assert_eq!(err.raised(), Some(&Fault::new("InvalidOperation", "nope")));
    }

    #[test]
    fn test_call_bound_enforced_eagerly() {
        let mut fx = Fixture::new();
        let id = fx.registry.register(execute(), vec![Matcher::any()]).unwrap();
        fx.registry.get_mut(id).unwrap().set_bound(CallBound::once());

        assert!(fx.call(&execute(), vec![Value::from("a")]).is_ok());
        let err = fx.call(&execute(), vec![Value::from("b")]).unwrap_err();
        assert!(matches!(err, DispatchError::CallCountExceeded { times_called: 1, .. }));

        let setup = fx.registry.get(id).unwrap();
        assert_eq!(setup.times_called(), 1);
        // The rejected call is still logged and still knows which setup it hit.
        assert_eq!(fx.log.len(), 2);
        assert_eq!(fx.log.entries()[1].matched_setup, Some(id));
    }
}
