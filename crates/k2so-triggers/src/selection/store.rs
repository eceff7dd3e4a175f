//! Per-conversation selection state
//!
//! Concurrent map keyed by conversation id. Writes are last-write-wins; two
//! menu clicks racing on the same conversation may interleave, but each
//! conversation's flow is always a value some transition produced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::catalog::CommandCatalog;
use super::machine::FlowState;
use super::{ConversationFlow, SelectionField};

/// Idle conversations older than this are dropped by the sweeper
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    flow: ConversationFlow,
    touched_at: Instant,
}

impl Entry {
    fn new(flow: ConversationFlow) -> Self {
        Self {
            flow,
            touched_at: Instant::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectionStore {
    entries: DashMap<String, Entry>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current flow, or `None` for a conversation never seen (or evicted)
    pub fn get(&self, conversation_id: &str) -> Option<ConversationFlow> {
        self.entries.get(conversation_id).map(|e| e.flow.clone())
    }

    pub fn put(&self, conversation_id: &str, flow: ConversationFlow) {
        self.entries
            .insert(conversation_id.to_string(), Entry::new(flow));
    }

    /// Set one field, clearing every later field, and re-derive the flow state.
    /// A conversation with no entry starts from an empty selection.
    pub fn set_field(
        &self,
        catalog: &CommandCatalog,
        conversation_id: &str,
        field: SelectionField,
        value: impl Into<String>,
    ) -> ConversationFlow {
        let mut entry = self
            .entries
            .entry(conversation_id.to_string())
            .or_insert_with(|| Entry::new(ConversationFlow::default()));

        entry.flow.selection.set(field, value);
        entry.flow.state = FlowState::infer(catalog, &entry.flow.selection);
        entry.touched_at = Instant::now();
        entry.flow.clone()
    }

    pub fn remove(&self, conversation_id: &str) -> Option<ConversationFlow> {
        self.entries.remove(conversation_id).map(|(_, e)| e.flow)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop conversations untouched for longer than `max_idle`
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched_at) <= max_idle);
        before.saturating_sub(self.entries.len())
    }

    /// Run [`evict_idle`](Self::evict_idle) every `interval` until the handle is aborted
    pub fn spawn_eviction(
        self: &Arc<Self>,
        max_idle: Duration,
        interval: Duration,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(max_idle);
                if evicted > 0 {
                    debug!("Evicted {} idle conversation selections", evicted);
                }
            }
        })
    }
}
