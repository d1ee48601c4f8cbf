//! Quote model and status state machine

use super::actor::Actor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of bespoke work a quote is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteType {
    Wedding,
    Funeral,
    Event,
    Custom,
}

/// Quote status
///
/// `Pending → InProgress → Sent → {Accepted | Declined | Expired}`;
/// an accepted quote may later be marked `Completed` once converted
/// to an order. `Declined`, `Expired` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    #[default]
    Pending,
    InProgress,
    Sent,
    Accepted,
    Declined,
    Expired,
    Completed,
}

impl QuoteStatus {
    /// Whether the state machine admits a transition to `next`.
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        use QuoteStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Sent)
                | (Sent, Accepted)
                | (Sent, Declined)
                | (Sent, Expired)
                | (Accepted, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Sent => "SENT",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Expired => "EXPIRED",
            Self::Completed => "COMPLETED",
        }
    }
}

/// One itemized proposal line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalLine {
    pub description: String,
    pub amount: Decimal,
}

/// Priced proposal attached when the quote is sent to the customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteProposal {
    /// Total proposed amount
    pub amount: Decimal,
    pub lines: Vec<ProposalLine>,
    /// Millisecond timestamp after which the proposal can no longer
    /// be accepted
    pub valid_until: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Immutable status history entry, mirroring the order machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteStatusEntry {
    pub status: QuoteStatus,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub actor_id: String,
    pub actor_name: String,
}

impl QuoteStatusEntry {
    pub fn new(status: QuoteStatus, actor: &Actor, note: Option<String>) -> Self {
        Self {
            status,
            timestamp: crate::util::now_millis(),
            note,
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
        }
    }
}

/// Quote entity
///
/// Invariant: `proposal` is present exactly from the `Sent` status
/// onward; never deleted, only transitioned to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub user_id: String,
    pub quote_type: QuoteType,
    /// Free-form request description from the customer
    pub details: String,
    pub status: QuoteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<QuoteProposal>,
    /// Append-only; never rewritten
    pub status_history: Vec<QuoteStatusEntry>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create quote payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub quote_type: QuoteType,
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_flow() {
        use QuoteStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Accepted));
        assert!(Sent.can_transition_to(Declined));
        assert!(Sent.can_transition_to(Expired));
        assert!(Accepted.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states() {
        use QuoteStatus::*;
        for terminal in [Declined, Expired, Completed] {
            for next in [Pending, InProgress, Sent, Accepted, Declined, Expired, Completed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_no_skipping() {
        use QuoteStatus::*;
        assert!(!Pending.can_transition_to(Sent));
        assert!(!Pending.can_transition_to(Accepted));
        assert!(!InProgress.can_transition_to(Accepted));
    }
}
