use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use shared::domain::{AxisSelection, Phase, SessionId, Table, TableGeneration};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Everything one browser session has accumulated: the current table slot,
/// the last axis selection and where the page is in its upload/chart cycle.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub selection: AxisSelection,
    table: Option<Arc<Table>>,
    generation: TableGeneration,
}

impl SessionState {
    /// Replaces the table slot. Last write wins.
    pub fn put(&mut self, table: Table) -> TableGeneration {
        self.table = Some(Arc::new(table));
        self.generation = self.generation.next();
        self.generation
    }

    pub fn get(&self) -> Option<&Arc<Table>> {
        self.table.as_ref()
    }

    /// Generation of the table currently in the slot; zero before any upload.
    pub fn generation(&self) -> TableGeneration {
        self.generation
    }

    /// True while the session holds nothing worth keeping.
    pub fn is_idle(&self) -> bool {
        self.table.is_none() && self.phase == Phase::Idle
    }
}

#[derive(Debug)]
struct Slot {
    state: SessionState,
    last_seen: Instant,
}

type SharedSlot = Arc<Mutex<Slot>>;

/// Per-session state, isolated by [`SessionId`]. Each session sits behind its
/// own lock; the map lock is only held to find or drop a slot.
#[derive(Clone, Default)]
pub struct Storage {
    sessions: Arc<RwLock<HashMap<SessionId, SharedSlot>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session; unknown sessions read as fresh ones.
    pub async fn load(&self, session: SessionId) -> SessionState {
        let Some(slot) = self.existing(session).await else {
            return SessionState::default();
        };
        let state = slot.lock().await.state.clone();
        state
    }

    /// Runs `f` against the session's current state and stores the state it
    /// returns. Updates to one session never interleave; other sessions are
    /// not blocked while `f` runs. A session left idle is not kept.
    pub async fn apply<T>(
        &self,
        session: SessionId,
        f: impl FnOnce(&SessionState) -> (SessionState, T),
    ) -> T {
        let slot = self.slot(session).await;
        let mut guard = slot.lock().await;
        let (next, output) = f(&guard.state);
        debug!(
            %session,
            phase = ?next.phase,
            generation = next.generation.0,
            "session state updated"
        );
        let idle = next.is_idle();
        guard.state = next;
        guard.last_seen = Instant::now();
        drop(guard);
        drop(slot);

        if idle {
            self.forget_if_idle(session).await;
        }
        output
    }

    pub async fn put_table(&self, session: SessionId, table: Table) -> TableGeneration {
        self.apply(session, |state| {
            let mut next = state.clone();
            let generation = next.put(table);
            (next, generation)
        })
        .await
    }

    pub async fn table(&self, session: SessionId) -> Option<Arc<Table>> {
        let slot = self.existing(session).await?;
        let table = slot.lock().await.state.table.clone();
        table
    }

    /// Drops every session not touched within `max_idle`. Sessions with a
    /// request in flight are kept. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .map_or(true, |slot| slot.last_seen.elapsed() < max_idle)
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "expired idle sessions");
        }
        evicted
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn existing(&self, session: SessionId) -> Option<SharedSlot> {
        self.sessions.read().await.get(&session).cloned()
    }

    async fn slot(&self, session: SessionId) -> SharedSlot {
        if let Some(slot) = self.existing(session).await {
            return slot;
        }
        self.sessions
            .write()
            .await
            .entry(session)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Slot {
                    state: SessionState::default(),
                    last_seen: Instant::now(),
                }))
            })
            .clone()
    }

    /// Slots are only cloned under the map lock, so a strong count of one
    /// here means no request is using this slot.
    async fn forget_if_idle(&self, session: SessionId) {
        let mut sessions = self.sessions.write().await;
        let idle = sessions.get(&session).is_some_and(|slot| {
            Arc::strong_count(slot) == 1
                && slot.try_lock().is_ok_and(|slot| slot.state.is_idle())
        });
        if idle {
            sessions.remove(&session);
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
