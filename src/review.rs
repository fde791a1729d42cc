//! Applies review events to stored cards.
//!
//! A review reads the card's state, runs it through SM-2 and writes the result
//! back conditioned on the version it read. If another review of the same card
//! committed in between, the write is rejected as a conflict instead of
//! overwriting that review. Callers decide whether to retry.

use crate::database::{CardStore, StoreError};
use crate::models::sm2::compute_next_state;
use crate::models::{CardId, CardSchedulingState, Quality};
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("card {0} not found")]
    NotFound(CardId),
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

impl ReviewError {
    /// Conflicts and unavailable stores may succeed when the review is submitted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound(_) => false,
            Self::Store(e) => e.is_transient(),
        }
    }
}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(card_id) => Self::NotFound(card_id),
            other => Self::Store(other),
        }
    }
}

/// Records one review of `card_id` and returns the card's new scheduling state.
///
/// `now` defaults to the current wall-clock time.
pub fn apply_review<S: CardStore + ?Sized>(
    store: &S,
    card_id: CardId,
    quality: impl Into<Quality>,
    now: Option<DateTime<Utc>>,
) -> Result<CardSchedulingState, ReviewError> {
    let quality = quality.into();
    let now = now.unwrap_or_else(Utc::now);

    let current = store.get_scheduling_state(card_id)?;
    let next = compute_next_state(&current.value, quality, now);

    match store.put_scheduling_state(card_id, &next, current.version) {
        Ok(version) => {
            tracing::info!(
                card_id,
                quality = quality.value(),
                version,
                interval_days = next.interval_days,
                "review applied"
            );
            Ok(next)
        }
        Err(err) => {
            tracing::warn!(card_id, quality = quality.value(), error = %err, "review not applied");
            Err(err.into())
        }
    }
}

/// Caller-facing entry point bound to one store.
pub struct ReviewApplier<S> {
    store: S,
}

impl<S: CardStore> ReviewApplier<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn submit_review(
        &self,
        card_id: CardId,
        quality: i32,
        now: Option<DateTime<Utc>>,
    ) -> Result<CardSchedulingState, ReviewError> {
        apply_review(&self.store, card_id, quality, now)
    }
}
