//! Settlement FSM State Definitions

use std::fmt;

use serde::Serialize;

/// Settlement FSM States
///
/// ```text
/// INIT → PREPARED → COMMITTING → COMMITTED
///   ↓                   ↓
/// FAILED          COMPENSATING → ROLLED_BACK
/// ```
///
/// Terminal states: COMMITTED, FAILED, ROLLED_BACK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementState {
    /// Legs recorded, nothing validated yet
    Init,

    /// Every leg validated against live balances
    Prepared,

    /// Legs being applied - funds are IN-FLIGHT
    Committing,

    /// Terminal: every leg applied
    Committed,

    /// Terminal: prepare rejected a leg (no funds moved)
    Failed,

    /// Reversing the legs already applied
    Compensating,

    /// Terminal: every applied leg reversed
    RolledBack,
}

impl SettlementState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementState::Committed | SettlementState::Failed | SettlementState::RolledBack
        )
    }

    /// Check if funds are in-flight (some legs applied, outcome not final)
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SettlementState::Committing | SettlementState::Compensating
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Init => "INIT",
            SettlementState::Prepared => "PREPARED",
            SettlementState::Committing => "COMMITTING",
            SettlementState::Committed => "COMMITTED",
            SettlementState::Failed => "FAILED",
            SettlementState::Compensating => "COMPENSATING",
            SettlementState::RolledBack => "ROLLED_BACK",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SettlementState::Committed.is_terminal());
        assert!(SettlementState::Failed.is_terminal());
        assert!(SettlementState::RolledBack.is_terminal());

        assert!(!SettlementState::Init.is_terminal());
        assert!(!SettlementState::Prepared.is_terminal());
        assert!(!SettlementState::Committing.is_terminal());
        assert!(!SettlementState::Compensating.is_terminal());
    }

    #[test]
    fn test_in_flight_states() {
        assert!(SettlementState::Committing.is_in_flight());
        assert!(SettlementState::Compensating.is_in_flight());

        assert!(!SettlementState::Init.is_in_flight());
        assert!(!SettlementState::Prepared.is_in_flight());
        assert!(!SettlementState::Committed.is_in_flight());
        assert!(!SettlementState::Failed.is_in_flight());
        assert!(!SettlementState::RolledBack.is_in_flight());
    }

    #[test]
    fn test_display() {
        assert_eq!(SettlementState::Init.to_string(), "INIT");
        assert_eq!(SettlementState::Committed.to_string(), "COMMITTED");
        assert_eq!(SettlementState::RolledBack.to_string(), "ROLLED_BACK");
    }

    #[test]
    fn test_serialized_name_matches_as_str() {
        let json = serde_json::to_string(&SettlementState::RolledBack).unwrap();
        assert_eq!(json, "\"ROLLED_BACK\"");
    }
}
