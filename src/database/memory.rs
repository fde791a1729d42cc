//! In-process card store.
//!
//! Each card lives in its own mutex slot; the outer map lock is only taken for
//! writing when a card is created. Reviews of different cards never wait on
//! each other's slot.

use super::store::{CardStore, Result, StoreError, due_order};
use crate::models::{CardId, CardSchedulingState, Versioned};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

type Slot = Arc<Mutex<Versioned<CardSchedulingState>>>;

#[derive(Default)]
pub struct MemoryStore {
    cards: RwLock<HashMap<CardId, Slot>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, card_id: CardId) -> Result<Slot> {
        let cards = self
            .cards
            .read()
            .map_err(|_| StoreError::Unavailable("card map lock poisoned".into()))?;
        cards
            .get(&card_id)
            .cloned()
            .ok_or(StoreError::NotFound(card_id))
    }
}

impl CardStore for MemoryStore {
    fn create_card(&self) -> Result<CardId> {
        let card_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = Arc::new(Mutex::new(Versioned {
            value: CardSchedulingState::default(),
            version: 0,
        }));
        self.cards
            .write()
            .map_err(|_| StoreError::Unavailable("card map lock poisoned".into()))?
            .insert(card_id, slot);
        tracing::info!(card_id, "card created");
        Ok(card_id)
    }

    fn get_scheduling_state(&self, card_id: CardId) -> Result<Versioned<CardSchedulingState>> {
        let slot = self.slot(card_id)?;
        let current = slot
            .lock()
            .map_err(|_| StoreError::Unavailable(format!("card {card_id} lock poisoned")))?;
        Ok(current.clone())
    }

    fn put_scheduling_state(
        &self,
        card_id: CardId,
        state: &CardSchedulingState,
        expected_version: u64,
    ) -> Result<u64> {
        let slot = self.slot(card_id)?;
        let mut current = slot
            .lock()
            .map_err(|_| StoreError::Unavailable(format!("card {card_id} lock poisoned")))?;
        if current.version != expected_version {
            return Err(StoreError::Conflict {
                card_id,
                expected: expected_version,
            });
        }
        *current = Versioned {
            value: state.clone(),
            version: expected_version + 1,
        };
        Ok(current.version)
    }

    fn due_cards(&self, now: DateTime<Utc>) -> Result<Vec<(CardId, CardSchedulingState)>> {
        let slots: Vec<(CardId, Slot)> = self
            .cards
            .read()
            .map_err(|_| StoreError::Unavailable("card map lock poisoned".into()))?
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        let mut due = Vec::new();
        for (card_id, slot) in slots {
            let current = slot
                .lock()
                .map_err(|_| StoreError::Unavailable(format!("card {card_id} lock poisoned")))?;
            if current.value.is_due(now) {
                due.push((card_id, current.value.clone()));
            }
        }
        due.sort_by(due_order);
        Ok(due)
    }
}
