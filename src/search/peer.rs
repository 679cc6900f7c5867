//! The record-source seam: a peer owns the append-only buffer for one app
//! run and fans out newly-ingested records to every manager registered
//! against it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::ids::WidgetId;
use crate::record::Record;

use super::manager::SearchManager;

/// The record source a manager subscribes to. A real implementation wraps
/// an RPC client talking to the observed program's agent; this crate only
/// depends on the trait.
pub trait Peer: Send + Sync {
    /// An atomic snapshot: `(orderedSequenceOfRecords, totalCountSinceStart)`.
    /// Must come from one synchronized read so `searchedCount <= totalCount`
    /// always holds.
    fn snapshot(&self) -> (Vec<Arc<dyn Record>>, u64);

    /// Add `manager` to the fan-out set that receives every future record.
    fn register(&self, manager: Arc<SearchManager>);

    /// Remove a manager from the fan-out set by widget id.
    fn unregister(&self, widget_id: &WidgetId);
}

/// An in-memory [`Peer`], used by tests and as a reference implementation
/// for callers that don't yet have a real transport wired up.
#[derive(Default)]
pub struct MemoryPeer {
    records: RwLock<Vec<Arc<dyn Record>>>,
    total_count: AtomicU64,
    subscribers: RwLock<Vec<Arc<SearchManager>>>,
}

impl MemoryPeer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the buffer and fan it out to every registered
    /// manager, mirroring what a real transport layer does on ingestion.
    pub async fn ingest(&self, record: Arc<dyn Record>) {
        self.total_count.fetch_add(1, Ordering::SeqCst);
        self.records.write().expect("peer lock poisoned").push(record.clone());
        let subscribers: Vec<_> = self.subscribers.read().expect("peer lock poisoned").clone();
        for manager in subscribers {
            manager.process_new_record(record.clone()).await;
        }
    }
}

impl Peer for MemoryPeer {
    fn snapshot(&self) -> (Vec<Arc<dyn Record>>, u64) {
        let records = self.records.read().expect("peer lock poisoned");
        (records.clone(), self.total_count.load(Ordering::SeqCst))
    }

    fn register(&self, manager: Arc<SearchManager>) {
        self.subscribers.write().expect("peer lock poisoned").push(manager);
    }

    fn unregister(&self, widget_id: &WidgetId) {
        self.subscribers
            .write()
            .expect("peer lock poisoned")
            .retain(|m| m.widget_id() != widget_id);
    }
}
