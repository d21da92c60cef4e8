//! Invariant checking for chat view state.
//!
//! Invariants are properties that must always hold. Unlike example-based
//! tests that check specific scenarios, they verify behavior across arbitrary
//! event sequences.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = ViewSnapshot::from_view(&view);
//! registry.assert_all(&snapshot, "after echo");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{ActiveConversationHasNoForeignMessages, NoDuplicateEcho, OptimisticOnlyWhenActive};
pub use snapshot::ViewSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Identifies an invariant in violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// See [`ActiveConversationHasNoForeignMessages`].
    ActiveConversationHasNoForeignMessages,
    /// See [`NoDuplicateEcho`].
    NoDuplicateEcho,
    /// See [`OptimisticOnlyWhenActive`].
    OptimisticOnlyWhenActive,
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// The violated invariant.
    pub invariant: InvariantKind,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against a [`ViewSnapshot`].
pub trait Invariant: Send + Sync {
    /// Which invariant this is.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant.
    fn check(&self, state: &ViewSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every standard chat-view invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ActiveConversationHasNoForeignMessages);
        registry.add(NoDuplicateEcho);
        registry.add(OptimisticOnlyWhenActive);
        registry
    }

    /// Add an invariant.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants, collecting every violation.
    pub fn check_all(&self, state: &ViewSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with context on violation.
    ///
    /// For tests.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &ViewSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
