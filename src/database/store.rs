//! Storage contract for card scheduling state.
//!
//! Every read hands back the version the state was read at. A write names the
//! version it expects to replace, so `put_scheduling_state` is a compare-and-swap
//! and can serve as the commit point of a read-compute-write sequence.

use crate::models::{CardId, CardSchedulingState, Versioned};
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("card {0} not found")]
    NotFound(CardId),
    /// The card changed between the read and the write.
    #[error("card {card_id} was updated concurrently (expected version {expected})")]
    Conflict { card_id: CardId, expected: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Any other failure reported by the backing store.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Whether repeating the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait CardStore: Send + Sync {
    /// Creates a card with the default scheduling state and returns its id.
    fn create_card(&self) -> Result<CardId>;

    fn get_scheduling_state(&self, card_id: CardId) -> Result<Versioned<CardSchedulingState>>;

    /// Replaces all scheduling fields of `card_id` at once, provided the stored
    /// version still equals `expected_version`. Returns the new version.
    fn put_scheduling_state(
        &self,
        card_id: CardId,
        state: &CardSchedulingState,
        expected_version: u64,
    ) -> Result<u64>;

    /// Cards that were never reviewed or whose due date is not after `now`,
    /// never-reviewed first, then by due date and id.
    fn due_cards(&self, now: DateTime<Utc>) -> Result<Vec<(CardId, CardSchedulingState)>>;
}

impl<S: CardStore + ?Sized> CardStore for std::sync::Arc<S> {
    fn create_card(&self) -> Result<CardId> {
        (**self).create_card()
    }

    fn get_scheduling_state(&self, card_id: CardId) -> Result<Versioned<CardSchedulingState>> {
        (**self).get_scheduling_state(card_id)
    }

    fn put_scheduling_state(
        &self,
        card_id: CardId,
        state: &CardSchedulingState,
        expected_version: u64,
    ) -> Result<u64> {
        (**self).put_scheduling_state(card_id, state, expected_version)
    }

    fn due_cards(&self, now: DateTime<Utc>) -> Result<Vec<(CardId, CardSchedulingState)>> {
        (**self).due_cards(now)
    }
}

/// Sort order shared by the store implementations for `due_cards`.
pub(crate) fn due_order(
    a: &(CardId, CardSchedulingState),
    b: &(CardId, CardSchedulingState),
) -> std::cmp::Ordering {
    // None sorts before Some
    a.1.due_date.cmp(&b.1.due_date).then(a.0.cmp(&b.0))
}
