//! In-memory ring buffer of upstream model calls, exposed over the
//! management API.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCallEntry {
    pub id: u64,
    pub timestamp: i64,
    /// Which operation triggered the call (e.g. `vnest.generate_verbs`).
    pub operation: String,
    pub deployment: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub latency_ms: u32,
    pub status_code: u16,
    pub error: Option<String>,
}

pub struct LogStore {
    logs: RwLock<VecDeque<ModelCallEntry>>,
    max_size: usize,
    next_id: AtomicU64,
}

impl LogStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            logs: RwLock::new(VecDeque::with_capacity(max_size)),
            max_size,
            next_id: AtomicU64::new(1),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        operation: String,
        deployment: String,
        tokens_in: u32,
        tokens_out: u32,
        latency_ms: u32,
        status_code: u16,
        error: Option<String>,
    ) {
        let entry = ModelCallEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            timestamp: chrono::Utc::now().timestamp(),
            operation,
            deployment,
            tokens_in,
            tokens_out,
            latency_ms,
            status_code,
            error,
        };

        let mut logs = self.logs.write().expect("log store lock poisoned");

        if logs.len() >= self.max_size {
            logs.pop_front();
        }

        logs.push_back(entry);
    }

    /// One page of entries, newest first, plus the total count. Both come
    /// from the same lock acquisition so they stay consistent.
    pub fn page(&self, limit: usize, offset: usize) -> (Vec<ModelCallEntry>, usize) {
        let logs = self.logs.read().expect("log store lock poisoned");
        let entries = logs.iter().rev().skip(offset).take(limit).cloned().collect();
        (entries, logs.len())
    }

    pub fn clear(&self) {
        self.logs.write().expect("log store lock poisoned").clear();
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(1000)
    }
}
