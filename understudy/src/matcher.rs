//! Argument matchers.
//!
//! A [`Matcher`] is a predicate over one argument position. All matcher
//! kinds are variants of one enum and are evaluated through
//! [`Matcher::matches`]. Matchers are immutable once built and may be
//! evaluated concurrently.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::value::{Fault, Value};

static NEXT_PREDICATE_ID: AtomicU64 = AtomicU64::new(0);

/// Signature of a user predicate.
pub type PredicateFn = dyn Fn(&Value) -> Result<bool, Fault> + Send + Sync;

/// A user-supplied unary predicate with a stable identity.
///
/// Two predicates are equal only if one is a clone of the other; the
/// closure itself is never compared.
#[derive(Clone)]
pub struct Predicate {
    id: u64,
    label: String,
    func: Arc<PredicateFn>,
}

impl Predicate {
    /// Creates a predicate that may fault.
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, Fault> + Send + Sync + 'static,
    {
        Self {
            id: NEXT_PREDICATE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            func: Arc::new(func),
        }
    }

    /// The predicate's identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluates the predicate against a value.
    pub fn evaluate(&self, value: &Value) -> Result<bool, Fault> {
        (self.func)(value)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Predicate {}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A predicate over a single argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Matches every value.
    Any,
    /// Matches values equal to the captured literal.
    Equal(Value),
    /// Matches values the captured predicate accepts.
    Predicate(Predicate),
    /// Matches values in `low..=high`, both bounds of the value's own kind.
    Range { low: Value, high: Value },
    /// Matches values equal to any of the listed literals.
    OneOf(Vec<Value>),
}

impl Matcher {
    /// Matches anything.
    pub fn any() -> Self {
        Matcher::Any
    }

    /// Matches values equal to `value`.
    pub fn equal(value: impl Into<Value>) -> Self {
        Matcher::Equal(value.into())
    }

    /// Matches values for which `func` returns true.
    pub fn when<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Matcher::Predicate(Predicate::new(label, move |v| Ok(func(v))))
    }

    /// Matches values for which a fallible `func` returns true.
    pub fn try_when<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, Fault> + Send + Sync + 'static,
    {
        Matcher::Predicate(Predicate::new(label, func))
    }

    /// Matches values in the inclusive range.
    pub fn range(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Matcher::Range {
            low: low.into(),
            high: high.into(),
        }
    }

    /// Matches any of the given values.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Matcher::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Evaluates this matcher against one argument.
    ///
    /// Only predicate matchers can fault.
    pub fn matches(&self, value: &Value) -> Result<bool, Fault> {
        match self {
            Matcher::Any => Ok(true),
            Matcher::Equal(expected) => Ok(expected == value),
            Matcher::Predicate(predicate) => predicate.evaluate(value),
            Matcher::Range { low, high } => Ok(value.same_kind(low)
                && value.same_kind(high)
                && low <= value
                && value <= high),
            Matcher::OneOf(values) => Ok(values.contains(value)),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => write!(f, "_"),
            Matcher::Equal(v) => write!(f, "{}", v),
            Matcher::Predicate(p) => write!(f, "<{}>", p.label()),
            Matcher::Range { low, high } => write!(f, "{}..={}", low, high),
            Matcher::OneOf(values) => {
                write!(f, "one of [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A fault raised by the matcher at `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherFault {
    /// Zero-based parameter position of the faulting matcher.
    pub position: usize,
    /// The fault the predicate raised.
    pub fault: Fault,
}

/// Evaluates a matcher sequence pairwise against an argument sequence.
///
/// Stops at the first rejection or the first fault. The lengths are
/// expected to agree; extra entries on either side are ignored.
pub fn match_all(matchers: &[Matcher], arguments: &[Value]) -> Result<bool, MatcherFault> {
    debug_assert_eq!(matchers.len(), arguments.len());
    for (position, (matcher, value)) in matchers.iter().zip(arguments).enumerate() {
        let accepted = matcher
            .matches(value)
            .map_err(|fault| MatcherFault { position, fault })?;
        if !accepted {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_and_equal() {
        assert!(Matcher::any().matches(&Value::from(42)).unwrap());
        assert!(Matcher::equal("x").matches(&Value::from("x")).unwrap());
        assert!(!Matcher::equal("x").matches(&Value::from("y")).unwrap());
        assert!(!Matcher::equal(1).matches(&Value::from(1.0)).unwrap());
    }

    #[test]
    fn test_predicate_fault_propagates() {
        let m = Matcher::try_when("explodes", |_| Err(Fault::new("Boom", "no")));
        assert_eq!(m.matches(&Value::Unit), Err(Fault::new("Boom", "no")));
    }

    #[test]
    fn test_predicate_identity() {
        let a = Matcher::when("positive", |v| v.as_int().is_some_and(|i| i > 0));
        let b = Matcher::when("positive", |v| v.as_int().is_some_and(|i| i > 0));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_range() {
        let m = Matcher::range(1, 10);
        assert!(m.matches(&Value::from(1)).unwrap());
        assert!(m.matches(&Value::from(10)).unwrap());
        assert!(!m.matches(&Value::from(11)).unwrap());
        // Different kind never matches, even though Value has a total order.
        assert!(!m.matches(&Value::from("5")).unwrap());
    }

    #[test]
    fn test_one_of() {
        let m = Matcher::one_of(["a", "b"]);
        assert!(m.matches(&Value::from("b")).unwrap());
        assert!(!m.matches(&Value::from("c")).unwrap());
    }

    #[test]
    fn test_match_all_stops_at_first_rejection() {
        let matchers = vec![
            Matcher::equal("nope"),
            Matcher::try_when("explodes", |_| Err(Fault::new("Boom", "no"))),
        ];
        let args = vec![Value::from("x"), Value::from(1)];
        assert_eq!(match_all(&matchers, &args), Ok(false));
    }

    #[test]
    fn test_match_all_reports_position() {
        let matchers = vec![
            Matcher::any(),
            Matcher::try_when("explodes", |_| Err(Fault::new("Boom", "no"))),
        ];
        let args = vec![Value::from("x"), Value::from(1)];
        let fault = match_all(&matchers, &args).unwrap_err();
        assert_eq!(fault.position, 1);
    }
}
