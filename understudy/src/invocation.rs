//! Recorded calls.

use crate::setup::SetupId;
use crate::signature::CallSignature;
use crate::value::Value;

/// One real call made against a substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Position in the substitute's call order, starting at 0.
    pub sequence: u64,
    pub signature: CallSignature,
    pub arguments: Vec<Value>,
    /// The setup that resolved for this call, if any.
    pub matched_setup: Option<SetupId>,
}

/// Append-only log of a substitute's invocations.
#[derive(Debug, Default)]
pub struct InvocationLog {
    entries: Vec<Invocation>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call and returns its sequence number.
    pub fn append(&mut self, signature: CallSignature, arguments: Vec<Value>) -> u64 {
        let sequence = self.entries.len() as u64;
        self.entries.push(Invocation {
            sequence,
            signature,
            arguments,
            matched_setup: None,
        });
        sequence
    }

    pub fn get(&self, sequence: u64) -> Option<&Invocation> {
        self.entries.get(sequence as usize)
    }

    /// Fills in the back-reference to the resolved setup.
    pub(crate) fn set_matched(&mut self, sequence: u64, setup: SetupId) {
        if let Some(invocation) = self.entries.get_mut(sequence as usize) {
            invocation.matched_setup = Some(setup);
        }
    }

    /// All invocations in call order.
    pub fn entries(&self) -> &[Invocation] {
        &self.entries
    }

    /// Invocations of one signature, in call order.
    pub fn of<'a>(
        &'a self,
        signature: &'a CallSignature,
    ) -> impl Iterator<Item = &'a Invocation> + 'a {
        self.entries.iter().filter(move |i| i.signature == *signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the log and restarts sequence numbering.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
