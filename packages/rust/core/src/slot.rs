//! Latest-wins slot for generation results.
//!
//! Each run takes a [`GenerationTicket`] from the slot. Starting a new run
//! cancels the previous ticket's token, and only the holder of the newest
//! ticket may publish a result.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use roadmapper_shared::{Result, RoadmapError};

/// Proof of which run a result belongs to.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    seq: u64,
    token: CancellationToken,
}

impl GenerationTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Token cancelled when a newer run begins.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_superseded(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct SlotState<T> {
    latest: u64,
    token: CancellationToken,
    value: Option<T>,
}

/// Holds the result of the most recent run.
#[derive(Debug)]
pub struct GenerationSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Default for GenerationSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GenerationSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                latest: 0,
                token: CancellationToken::new(),
                value: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new run, superseding any run in flight.
    pub fn begin(&self) -> GenerationTicket {
        let mut state = self.lock();
        state.token.cancel();
        state.latest += 1;
        state.token = CancellationToken::new();
        debug!(seq = state.latest, "generation run started");
        GenerationTicket {
            seq: state.latest,
            token: state.token.clone(),
        }
    }

    /// Publish a result. Fails with [`RoadmapError::Cancelled`] when a newer
    /// run has started since `ticket` was issued.
    pub fn commit(&self, ticket: &GenerationTicket, value: T) -> Result<()> {
        let mut state = self.lock();
        if ticket.seq != state.latest {
            debug!(seq = ticket.seq, latest = state.latest, "stale result discarded");
            return Err(RoadmapError::Cancelled);
        }
        state.value = Some(value);
        Ok(())
    }

    /// Cancel the run in flight without starting another.
    pub fn cancel(&self) {
        self.lock().token.cancel();
    }

    pub fn take(&self) -> Option<T> {
        self.lock().value.take()
    }
}

impl<T: Clone> GenerationSlot<T> {
    pub fn current(&self) -> Option<T> {
        self.lock().value.clone()
    }
}
