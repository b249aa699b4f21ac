//! Call signatures.
//!
//! A signature identifies one method or property accessor on a substitute:
//! its name, the kinds of its parameters, and its return kind. Two
//! signatures are the same call shape only if all three agree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueKind};

/// Identity of a method or property accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSignature {
    name: String,
    params: Vec<ValueKind>,
    #[serde(default)]
    returns: ValueKind,
}

impl CallSignature {
    /// Creates a signature for a value-returning method.
    pub fn new(name: impl Into<String>, params: Vec<ValueKind>, returns: ValueKind) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
        }
    }

    /// Creates a signature for a method with no result.
    pub fn action(name: impl Into<String>, params: Vec<ValueKind>) -> Self {
        Self::new(name, params, ValueKind::Unit)
    }

    /// Creates the getter signature for a property.
    pub fn getter(property: &str, kind: ValueKind) -> Self {
        Self::new(format!("get_{}", property), Vec::new(), kind)
    }

    /// Creates the setter signature for a property.
    pub fn setter(property: &str, kind: ValueKind) -> Self {
        Self::new(format!("set_{}", property), vec![kind], ValueKind::Unit)
    }

    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter kinds.
    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    /// Declared return kind.
    pub fn returns(&self) -> ValueKind {
        self.returns
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Finds the first argument whose kind the signature does not admit.
    ///
    /// Returns `None` when every argument conforms. Arity is checked
    /// separately by the caller.
    pub fn first_nonconforming(&self, arguments: &[Value]) -> Option<usize> {
        self.params
            .iter()
            .zip(arguments)
            .position(|(kind, value)| !kind.admits(value))
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, kind) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", kind)?;
        }
        write!(f, ")")?;
        if self.returns != ValueKind::Unit {
            write!(f, " -> {}", self.returns)?;
        }
        Ok(())
    }
}
