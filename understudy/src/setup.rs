//! Setups: registered expectations and their attached behaviors.
//!
//! A [`Setup`] pairs a call shape (signature plus one matcher per
//! parameter) with what happens when a call of that shape arrives:
//! callbacks run in attachment order, then the result producer decides
//! the outcome.
//!
//! ## State
//!
//! A setup is either active or overridden. Registering a later setup with
//! the identical call shape overrides it; an overridden setup never
//! matches again but keeps its call counter for verification.

use std::fmt;
use std::sync::Arc;

use crate::error::SetupError;
use crate::matcher::Matcher;
use crate::signature::CallSignature;
use crate::value::{Args, Fault, Value};

/// Index of a setup in its registry, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetupId(pub(crate) usize);

impl SetupId {
    /// Position of this setup in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Signature of a callback action.
pub type CallbackFn = dyn Fn(Args<'_>) -> Result<(), Fault> + Send + Sync;

/// A side effect run when a setup matches.
///
/// The action sees the first `arity` arguments of the call. Arity 0 is
/// the no-argument form.
#[derive(Clone)]
pub struct Callback {
    arity: usize,
    action: Arc<CallbackFn>,
}

impl Callback {
    /// Creates a callback receiving the first `arity` arguments.
    pub fn new<F>(arity: usize, action: F) -> Self
    where
        F: Fn(Args<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self {
            arity,
            action: Arc::new(action),
        }
    }

    /// Creates a callback that receives no arguments and cannot fault.
    pub fn nullary<F>(action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(0, move |_| {
            action();
            Ok(())
        })
    }

    /// Declared arity.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Runs the action against the leading arguments of a call.
    pub fn invoke(&self, arguments: &[Value]) -> Result<(), Fault> {
        let visible = &arguments[..self.arity.min(arguments.len())];
        (self.action)(Args::new(visible))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Produces a return value from the call's arguments.
pub type ValueFactory = dyn Fn(Args<'_>) -> Value + Send + Sync;

/// Produces a fault from the call's arguments.
pub type FaultFactory = dyn Fn(Args<'_>) -> Fault + Send + Sync;

/// What a matched setup yields once its callbacks have run.
#[derive(Clone, Default)]
pub enum ResultProducer {
    /// Nothing attached; the call returns the default of its return kind.
    #[default]
    Unset,
    /// Return a captured value.
    Value(Value),
    /// Return the result of a factory.
    ValueWith(Arc<ValueFactory>),
    /// Raise a captured fault.
    Fault(Fault),
    /// Raise the result of a factory.
    FaultWith(Arc<FaultFactory>),
}

impl ResultProducer {
    /// Returns true for the return-value forms.
    pub fn is_return(&self) -> bool {
        matches!(self, ResultProducer::Value(_) | ResultProducer::ValueWith(_))
    }

    /// Returns true for the throw forms.
    pub fn is_throw(&self) -> bool {
        matches!(self, ResultProducer::Fault(_) | ResultProducer::FaultWith(_))
    }

    fn describe(&self) -> &'static str {
        if self.is_return() {
            "return"
        } else if self.is_throw() {
            "throw"
        } else {
            "unset"
        }
    }

    /// Computes the outcome for a call.
    pub fn produce(&self, arguments: &[Value], default: Value) -> Result<Value, Fault> {
        match self {
            ResultProducer::Unset => Ok(default),
            ResultProducer::Value(v) => Ok(v.clone()),
            ResultProducer::ValueWith(factory) => Ok(factory(Args::new(arguments))),
            ResultProducer::Fault(fault) => Err(fault.clone()),
            ResultProducer::FaultWith(factory) => Err(factory(Args::new(arguments))),
        }
    }
}

impl fmt::Debug for ResultProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultProducer::Unset => write!(f, "Unset"),
            ResultProducer::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ResultProducer::ValueWith(_) => write!(f, "ValueWith(..)"),
            ResultProducer::Fault(fault) => f.debug_tuple("Fault").field(fault).finish(),
            ResultProducer::FaultWith(_) => write!(f, "FaultWith(..)"),
        }
    }
}

/// An inclusive call-count constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallBound {
    min: u32,
    max: Option<u32>,
}

impl CallBound {
    /// Must never be called.
    pub fn never() -> Self {
        Self { min: 0, max: Some(0) }
    }

    /// Must be called exactly once.
    pub fn once() -> Self {
        Self::exactly(1)
    }

    /// Must be called exactly `n` times.
    pub fn exactly(n: u32) -> Self {
        Self { min: n, max: Some(n) }
    }

    /// Must be called at least `n` times.
    pub fn at_least(n: u32) -> Self {
        Self { min: n, max: None }
    }

    /// Must be called at least once.
    pub fn at_least_once() -> Self {
        Self::at_least(1)
    }

    /// May be called at most `n` times.
    pub fn at_most(n: u32) -> Self {
        Self { min: 0, max: Some(n) }
    }

    /// Must be called between `min` and `max` times, inclusive.
    pub fn between(min: u32, max: u32) -> Result<Self, SetupError> {
        if min > max {
            return Err(SetupError::InvalidCallBound { min, max });
        }
        Ok(Self { min, max: Some(max) })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound, or `None` if unbounded.
    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Check if one more call after `times_called` stays within `max`.
    pub fn admits_another(&self, times_called: u32) -> bool {
        self.max.map_or(true, |max| times_called < max)
    }

    /// Check if a final count satisfies the bound.
    pub fn is_satisfied_by(&self, times_called: u32) -> bool {
        times_called >= self.min && self.max.map_or(true, |max| times_called <= max)
    }
}

impl fmt::Display for CallBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(0) => write!(f, "never"),
            Some(max) if max == self.min => write!(f, "exactly {}", max),
            Some(max) if self.min == 0 => write!(f, "at most {}", max),
            Some(max) => write!(f, "between {} and {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// One registered expectation.
pub struct Setup {
    id: SetupId,
    signature: CallSignature,
    matchers: Vec<Matcher>,
    callbacks: Vec<Callback>,
    result: ResultProducer,
    bound: Option<CallBound>,
    overridden: bool,
    times_called: u32,
}

impl Setup {
    pub(crate) fn new(id: SetupId, signature: CallSignature, matchers: Vec<Matcher>) -> Self {
        Self {
            id,
            signature,
            matchers,
            callbacks: Vec::new(),
            result: ResultProducer::Unset,
            bound: None,
            overridden: false,
            times_called: 0,
        }
    }

    pub fn id(&self) -> SetupId {
        self.id
    }

    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    /// Per-parameter matchers, one per signature parameter.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Callbacks in attachment order.
    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    pub fn result(&self) -> &ResultProducer {
        &self.result
    }

    pub fn bound(&self) -> Option<CallBound> {
        self.bound
    }

    /// Returns true once a later identical setup has superseded this one.
    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    /// Number of dispatched calls this setup has accepted.
    pub fn times_called(&self) -> u32 {
        self.times_called
    }

    /// Check if this setup declares the given call shape.
    pub fn has_shape(&self, signature: &CallSignature, matchers: &[Matcher]) -> bool {
        self.signature == *signature && self.matchers == matchers
    }

    /// Snapshot of the state visible to verification.
    pub fn state(&self) -> SetupState {
        SetupState {
            id: self.id,
            signature: self.signature.clone(),
            times_called: self.times_called,
            overridden: self.overridden,
            bound: self.bound,
        }
    }

    pub(crate) fn add_callback(&mut self, callback: Callback) -> Result<(), SetupError> {
        if callback.arity() > self.signature.arity() {
            return Err(SetupError::CallbackArity {
                setup: self.id,
                signature: self.signature.clone(),
                callback: callback.arity(),
                arity: self.signature.arity(),
            });
        }
        self.callbacks.push(callback);
        Ok(())
    }

    /// Installs a return producer, replacing any earlier one.
    pub(crate) fn set_return(&mut self, producer: ResultProducer) -> Result<(), SetupError> {
        debug_assert!(producer.is_return());
        if self.result.is_throw() {
            return Err(self.conflict("return"));
        }
        self.result = producer;
        Ok(())
    }

    /// Installs a throw producer, replacing any earlier one.
    pub(crate) fn set_throw(&mut self, producer: ResultProducer) -> Result<(), SetupError> {
        debug_assert!(producer.is_throw());
        if self.result.is_return() {
            return Err(self.conflict("throw"));
        }
        self.result = producer;
        Ok(())
    }

    fn conflict(&self, attempted: &'static str) -> SetupError {
        SetupError::ConflictingResultProducer {
            setup: self.id,
            existing: self.result.describe(),
            attempted,
        }
    }

    pub(crate) fn set_bound(&mut self, bound: CallBound) {
        self.bound = Some(bound);
    }

    pub(crate) fn mark_overridden(&mut self) {
        self.overridden = true;
    }

    pub(crate) fn record_call(&mut self) {
        self.times_called += 1;
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("matchers", &self.matchers)
            .field("callbacks", &self.callbacks.len())
            .field("result", &self.result)
            .field("bound", &self.bound)
            .field("overridden", &self.overridden)
            .field("times_called", &self.times_called)
            .finish()
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.id, self.signature.name())?;
        for (i, m) in self.matchers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", m)?;
        }
        write!(f, ")")
    }
}

/// Read-only view of a setup's verification state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupState {
    pub id: SetupId,
    pub signature: CallSignature,
    pub times_called: u32,
    pub overridden: bool,
    pub bound: Option<CallBound>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn make_setup(arity: usize) -> Setup {
        let sig = CallSignature::new("Execute", vec![ValueKind::Any; arity], ValueKind::Int);
        Setup::new(SetupId(0), sig, vec![Matcher::any(); arity])
    }

    #[test]
    fn test_callback_arity_limit() {
        let mut setup = make_setup(1);
        assert!(setup.add_callback(Callback::new(1, |_| Ok(()))).is_ok());
        assert!(setup.add_callback(Callback::nullary(|| {})).is_ok());

        let err = setup.add_callback(Callback::new(2, |_| Ok(()))).unwrap_err();
        assert!(matches!(err, SetupError::CallbackArity { callback: 2, arity: 1, .. }));
        assert_eq!(setup.callbacks().len(), 2);
    }

    #[test]
    fn test_conflicting_producers() {
        let mut setup = make_setup(0);
        setup.set_return(ResultProducer::Value(Value::from(1))).unwrap();

        let err = setup
            .set_throw(ResultProducer::Fault(Fault::new("Boom", "no")))
            .unwrap_err();
        assert!(matches!(
            err,
            SetupError::ConflictingResultProducer { existing: "return", attempted: "throw", .. }
        ));
        // Prior state unchanged.
        assert!(matches!(setup.result(), ResultProducer::Value(Value::Int(1))));

        // A second return replaces the first.
        setup.set_return(ResultProducer::Value(Value::from(2))).unwrap();
        assert!(matches!(setup.result(), ResultProducer::Value(Value::Int(2))));
    }

    #[test]
    fn test_produce_unset_uses_default() {
        let producer = ResultProducer::Unset;
        assert_eq!(producer.produce(&[], Value::Int(0)), Ok(Value::Int(0)));
    }

    #[test]
    fn test_produce_factories_see_arguments() {
        let args = vec![Value::from(20), Value::from(22)];
        let sum = ResultProducer::ValueWith(Arc::new(|a: Args<'_>| {
            let x = a.arg::<i64>(0).unwrap_or_default();
            let y = a.arg::<i64>(1).unwrap_or_default();
            Value::from(x + y)
        }));
        assert_eq!(sum.produce(&args, Value::Unit), Ok(Value::from(42)));

        let fail = ResultProducer::FaultWith(Arc::new(|a: Args<'_>| {
            Fault::new("Rejected", format!("{} args", a.len()))
        }));
        assert_eq!(fail.produce(&args, Value::Unit), Err(Fault::new("Rejected", "2 args")));
    }

    #[test]
    fn test_call_bound() {
        let once = CallBound::once();
        assert!(once.admits_another(0));
        assert!(!once.admits_another(1));
        assert!(!once.is_satisfied_by(0));
        assert!(once.is_satisfied_by(1));

        let open = CallBound::at_least(2);
        assert!(open.admits_another(100));
        assert!(!open.is_satisfied_by(1));

        assert!(CallBound::between(3, 2).is_err());
        assert_eq!(CallBound::between(1, 3).unwrap().to_string(), "between 1 and 3");
        assert_eq!(CallBound::never().to_string(), "never");
        assert_eq!(CallBound::at_most(4).to_string(), "at most 4");
    }

    #[test]
    fn test_callback_sees_prefix() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb = Callback::new(1, move |a| {
            sink.lock().extend_from_slice(a.as_slice());
            Ok(())
        });
        cb.invoke(&[Value::from("a"), Value::from(5)]).unwrap();
        assert_eq!(*seen.lock(), vec![Value::from("a")]);
    }
}
