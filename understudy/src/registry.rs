//! The per-substitute setup arena.
//!
//! Setups live in a vector in registration order and are addressed by
//! [`SetupId`] index. Entries are never removed; registration only appends
//! and flips the override flag on earlier entries with the same call shape.

use tracing::debug;

use crate::error::SetupError;
use crate::matcher::Matcher;
use crate::setup::{Setup, SetupId};
use crate::signature::CallSignature;

/// Ordered collection of the setups declared on one substitute.
#[derive(Debug, Default)]
pub struct SetupRegistry {
    entries: Vec<Setup>,
}

impl SetupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new setup and returns its handle.
    ///
    /// Any active setup with an identical signature and matcher sequence is
    /// marked overridden first, so the newest declaration of a call shape is
    /// the only one that can still match.
    pub fn register(
        &mut self,
        signature: CallSignature,
        matchers: Vec<Matcher>,
    ) -> Result<SetupId, SetupError> {
        if matchers.len() != signature.arity() {
            return Err(SetupError::ArityMismatch {
                arity: signature.arity(),
                matchers: matchers.len(),
                signature,
            });
        }

        for older in self
            .entries
            .iter_mut()
            .filter(|s| !s.is_overridden() && s.has_shape(&signature, &matchers))
        {
            debug!("setup {} overridden by a later identical setup", older);
            older.mark_overridden();
        }

        let id = SetupId(self.entries.len());
        let setup = Setup::new(id, signature, matchers);
        debug!("registered setup {}", setup);
        self.entries.push(setup);
        Ok(id)
    }

    /// Returns the setup with the given handle.
    pub fn get(&self, id: SetupId) -> Option<&Setup> {
        self.entries.get(id.0)
    }

    /// Returns the setup with the given handle for mutation.
    pub fn get_mut(&mut self, id: SetupId) -> Result<&mut Setup, SetupError> {
        self.entries.get_mut(id.0).ok_or(SetupError::UnknownSetup(id))
    }

    /// Returns a setup whose handle came from this registry.
    pub(crate) fn entry_mut(&mut self, id: SetupId) -> &mut Setup {
        &mut self.entries[id.0]
    }

    /// All setups in registration order.
    pub fn entries(&self) -> &[Setup] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active setups for a signature, most recently registered first.
    pub fn candidates<'a>(
        &'a self,
        signature: &'a CallSignature,
    ) -> impl Iterator<Item = &'a Setup> + 'a {
        self.entries
            .iter()
            .rev()
            .filter(move |s| !s.is_overridden() && s.signature() == signature)
    }

    /// Drops every setup.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
