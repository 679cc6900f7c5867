//! Outrig's search core: the query language, the matcher tree, the
//! per-widget streaming search manager, and its registry.
//!
//! Transport, record ingestion, and UI all live outside this crate; the
//! only seams are [`search::Peer`] (inbound) and [`search::StreamPublisher`]
//! (outbound).

pub mod error;
pub mod ids;
pub mod mark;
pub mod matcher;
pub mod query;
pub mod record;
pub mod search;

pub use error::{CompileError, ManagerError};
pub use ids::{AppRunId, WidgetId};
pub use mark::MarkManager;
pub use matcher::{Matcher, SearchContext};
pub use query::{compile, parse};
pub use record::{FieldMods, Goroutine, LogLine, Record, Watch};
pub use search::{ManagerRegistry, Peer, SearchManager, StreamPublisher};

use std::sync::Arc;

use eyre::Result;
use tokio::task::JoinHandle;

/// Boot a registry wired to `peer`/`publisher` and start its background
/// cleanup task, the crate's single process-wide entry point. Returns
/// `eyre::Result` so a caller can wire this into a runtime that may itself
/// fail to start up around it, even though nothing in this crate's own
/// startup path is fallible today.
///
/// Returns the registry plus the cleanup task's `JoinHandle`, so a caller
/// can `handle.abort()` it on shutdown.
pub async fn boot(
    peer: Arc<dyn Peer>,
    publisher: Arc<dyn StreamPublisher>,
) -> Result<(Arc<ManagerRegistry>, JoinHandle<()>)> {
    let registry = ManagerRegistry::new(peer, publisher);
    let cleanup_handle = registry.spawn_cleanup_task();
    Ok((registry, cleanup_handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ChannelPublisher, MemoryPeer};

    #[tokio::test]
    async fn boot_returns_an_empty_registry_and_a_live_cleanup_task() {
        let (registry, cleanup_handle) =
            boot(Arc::new(MemoryPeer::new()), Arc::new(ChannelPublisher::new()))
                .await
                .unwrap();
        assert!(registry.is_empty());
        assert!(!cleanup_handle.is_finished());
        cleanup_handle.abort();
    }
}
