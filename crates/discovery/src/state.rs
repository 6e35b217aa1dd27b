//! The discovery state machine.

use parking_lot::Mutex;
use std::fmt;

/// Pipeline state for one connection lifetime.
///
/// Transitions are monotonic; no state is ever revisited. The cell is
/// discarded with its session when the connection is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiscoveryState {
    /// Nothing has run yet
    Idle,
    /// Root descriptors are being built and registered
    DiscoveringRoots,
    /// Derived resources are being read off the roots
    DiscoveringDerived,
    /// The full closure has been registered
    Complete,
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryState::Idle => write!(f, "idle"),
            DiscoveryState::DiscoveringRoots => write!(f, "discovering-roots"),
            DiscoveryState::DiscoveringDerived => write!(f, "discovering-derived"),
            DiscoveryState::Complete => write!(f, "complete"),
        }
    }
}

/// Holder enforcing the monotonic transition rules.
///
/// `begin` is the single re-entrancy guard for the whole pipeline: it only
/// succeeds from `Idle`, so a second invocation while discovery is running
/// (or after it completed) changes nothing.
#[derive(Debug)]
pub struct StateCell {
    inner: Mutex<DiscoveryState>,
}

impl StateCell {
    /// Creates a cell in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DiscoveryState::Idle),
        }
    }

    /// The current state.
    #[must_use]
    pub fn current(&self) -> DiscoveryState {
        *self.inner.lock()
    }

    /// Attempts the `Idle -> DiscoveringRoots` transition. Returns false
    /// from any other state.
    pub fn begin(&self) -> bool {
        let mut state = self.inner.lock();
        if *state == DiscoveryState::Idle {
            *state = DiscoveryState::DiscoveringRoots;
            true
        } else {
            false
        }
    }

    /// Attempts a forward transition from `from` to `to`. Returns false if
    /// the current state is not `from` or the transition would not move
    /// forward.
    pub fn advance(&self, from: DiscoveryState, to: DiscoveryState) -> bool {
        let mut state = self.inner.lock();
        if *state == from && to > from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Whether the pipeline has reached `Complete`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current() == DiscoveryState::Complete
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_only_succeeds_from_idle() {
        let cell = StateCell::new();
        assert!(cell.begin());
        assert!(!cell.begin());
        assert_eq!(cell.current(), DiscoveryState::DiscoveringRoots);
    }

    #[test]
    fn advance_requires_the_expected_state() {
        let cell = StateCell::new();
        assert!(!cell.advance(
            DiscoveryState::DiscoveringRoots,
            DiscoveryState::DiscoveringDerived
        ));
        cell.begin();
        assert!(cell.advance(
            DiscoveryState::DiscoveringRoots,
            DiscoveryState::DiscoveringDerived
        ));
        assert!(cell.advance(
            DiscoveryState::DiscoveringDerived,
            DiscoveryState::Complete
        ));
        assert!(cell.is_complete());
    }

    #[test]
    fn states_are_never_revisited() {
        let cell = StateCell::new();
        cell.begin();
        cell.advance(
            DiscoveryState::DiscoveringRoots,
            DiscoveryState::DiscoveringDerived,
        );
        assert!(!cell.advance(
            DiscoveryState::DiscoveringDerived,
            DiscoveryState::DiscoveringRoots
        ));
        assert!(!cell.advance(DiscoveryState::DiscoveringDerived, DiscoveryState::Idle));
        assert_eq!(cell.current(), DiscoveryState::DiscoveringDerived);
    }
}
