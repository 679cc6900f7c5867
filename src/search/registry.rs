//! The manager registry: a process-wide, bounded, idle-evicting cache of
//! [`SearchManager`]s, backed by `dashmap::DashMap`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::error::ManagerError;
use crate::ids::{AppRunId, WidgetId};

use super::constants::{CLEANUP_INTERVAL, MAX_IDLE, MAX_MANAGERS};
use super::manager::{ManagerDiagnostics, SearchManager};
use super::peer::Peer;
use super::rpc::{GetMarkedRequest, GetMarkedResponse, StreamPublisher, UpdateMarksRequest};

pub struct ManagerRegistry {
    managers: DashMap<WidgetId, Arc<SearchManager>>,
    peer: Arc<dyn Peer>,
    publisher: Arc<dyn StreamPublisher>,
}

impl ManagerRegistry {
    pub fn new(peer: Arc<dyn Peer>, publisher: Arc<dyn StreamPublisher>) -> Arc<Self> {
        Arc::new(Self {
            managers: DashMap::new(),
            peer,
            publisher,
        })
    }

    /// Create-if-absent. After creation, or if size exceeds `MAX_MANAGERS`,
    /// runs `cleanup`.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, widget_id: WidgetId, app_run_id: AppRunId) -> Arc<SearchManager> {
        if let Some(existing) = self.managers.get(&widget_id) {
            existing.touch().await;
            return existing.clone();
        }

        let manager = Arc::new(SearchManager::new(
            widget_id.clone(),
            app_run_id,
            self.publisher.clone(),
        ));
        self.peer.register(manager.clone());
        self.managers.insert(widget_id, manager.clone());

        if self.managers.len() > MAX_MANAGERS {
            self.cleanup().await;
        }

        manager
    }

    pub fn get(&self, widget_id: &WidgetId) -> Option<Arc<SearchManager>> {
        self.managers.get(widget_id).map(|m| m.clone())
    }

    /// Explicit removal, unregistering from the peer first.
    #[instrument(skip(self))]
    pub fn drop_manager(&self, widget_id: &WidgetId) {
        if let Some((_, manager)) = self.managers.remove(widget_id) {
            self.peer.unregister(manager.widget_id());
        }
    }

    /// Run `request` against the manager for `widget_id`, creating it if
    /// absent, sourcing the full-rescan snapshot from this registry's peer.
    pub async fn search(
        &self,
        app_run_id: AppRunId,
        request: &super::rpc::SearchRequest,
    ) -> Result<super::rpc::SearchResponse, crate::error::ManagerError> {
        let manager = self.get_or_create(request.widget_id.clone(), app_run_id).await;
        let peer = self.peer.clone();
        manager
            .search(request, || {
                let (records, total_count) = peer.snapshot();
                (records, total_count as usize)
            })
            .await
    }

    /// `updateMarks`: set/unset marks on an existing manager's mark set.
    /// Does not itself trigger a rescan - the next `search` call picks up
    /// the new marks via `SearchContext`.
    pub async fn update_marks(&self, request: &UpdateMarksRequest) -> Result<(), ManagerError> {
        let manager = self.require(&request.widget_id)?;
        manager.mark_manager().update_marks(request.marks.iter().copied());
        manager.touch().await;
        Ok(())
    }

    /// `clearMarks`: drop every mark on an existing manager.
    pub fn clear_marks(&self, widget_id: &WidgetId) -> Result<(), ManagerError> {
        self.require(widget_id)?.mark_manager().clear_marks();
        Ok(())
    }

    /// `getMarked`: resolve the manager's marked ids against the peer's
    /// current snapshot.
    pub fn get_marked(&self, request: &GetMarkedRequest) -> Result<GetMarkedResponse, ManagerError> {
        let manager = self.require(&request.widget_id)?;
        let (records, _total_count) = self.peer.snapshot();
        let record_ids = manager
            .mark_manager()
            .marked_records(&records)
            .into_iter()
            .map(|record| record.id())
            .collect();
        Ok(GetMarkedResponse { record_ids })
    }

    fn require(&self, widget_id: &WidgetId) -> Result<Arc<SearchManager>, ManagerError> {
        self.get(widget_id)
            .ok_or_else(|| ManagerError::NotFound(widget_id.to_string()))
    }

    /// Evict anything idle past `MAX_IDLE`; if still over `MAX_MANAGERS`,
    /// evict least-recently-used managers until the bound is satisfied.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) {
        let mut idle_times = Vec::with_capacity(self.managers.len());
        for entry in self.managers.iter() {
            idle_times.push((entry.key().clone(), entry.value().idle_for().await));
        }

        for (widget_id, idle) in &idle_times {
            if *idle > MAX_IDLE {
                debug!(?widget_id, ?idle, "evicting idle manager");
                self.drop_manager(widget_id);
            }
        }

        if self.managers.len() <= MAX_MANAGERS {
            return;
        }

        let mut remaining: Vec<(WidgetId, std::time::Duration)> = idle_times
            .into_iter()
            .filter(|(id, _)| self.managers.contains_key(id))
            .collect();
        remaining.sort_by_key(|(_, idle)| std::cmp::Reverse(*idle));

        let excess = self.managers.len().saturating_sub(MAX_MANAGERS);
        for (widget_id, _) in remaining.into_iter().take(excess) {
            info!(?widget_id, "evicting least-recently-used manager over capacity");
            self.drop_manager(&widget_id);
        }
    }

    /// Spawn the background task that runs `cleanup` every `CLEANUP_INTERVAL`.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                registry.cleanup().await;
            }
        })
    }

    pub async fn diagnostics(&self) -> Vec<ManagerDiagnostics> {
        let mut out = Vec::with_capacity(self.managers.len());
        for entry in self.managers.iter() {
            out.push(entry.value().diagnostics().await);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::peer::MemoryPeer;
    use crate::search::rpc::ChannelPublisher;

    fn registry() -> Arc<ManagerRegistry> {
        ManagerRegistry::new(Arc::new(MemoryPeer::new()), Arc::new(ChannelPublisher::new()))
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_widget() {
        let registry = registry();
        let a = registry
            .get_or_create(WidgetId::new("w1"), AppRunId::new("run1"))
            .await;
        let b = registry
            .get_or_create(WidgetId::new("w1"), AppRunId::new("run1"))
            .await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn drop_manager_removes_and_unregisters() {
        let registry = registry();
        registry
            .get_or_create(WidgetId::new("w1"), AppRunId::new("run1"))
            .await;
        registry.drop_manager(&WidgetId::new("w1"));
        assert!(registry.get(&WidgetId::new("w1")).is_none());
    }

    #[tokio::test]
    async fn registry_bound_evicts_lru_over_capacity() {
        let registry = registry();
        for i in 0..(MAX_MANAGERS + 2) {
            registry
                .get_or_create(WidgetId::new(format!("w{i}")), AppRunId::new("run1"))
                .await;
        }
        assert!(registry.len() <= MAX_MANAGERS);
    }

    #[tokio::test]
    async fn mark_rpc_trio_round_trips_through_an_existing_manager() {
        use crate::record::LogLine;

        let peer = Arc::new(MemoryPeer::new());
        let registry = ManagerRegistry::new(peer.clone(), Arc::new(ChannelPublisher::new()));
        registry
            .get_or_create(WidgetId::new("w1"), AppRunId::new("run1"))
            .await;
        peer.ingest(Arc::new(LogLine::new(1, "a", "", 0))).await;
        peer.ingest(Arc::new(LogLine::new(2, "b", "", 0))).await;

        registry
            .update_marks(&UpdateMarksRequest {
                app_run_id: AppRunId::new("run1"),
                widget_id: WidgetId::new("w1"),
                marks: vec![(2, true)],
            })
            .await
            .unwrap();

        let marked = registry
            .get_marked(&GetMarkedRequest {
                app_run_id: AppRunId::new("run1"),
                widget_id: WidgetId::new("w1"),
            })
            .unwrap();
        assert_eq!(marked.record_ids, vec![2]);

        registry.clear_marks(&WidgetId::new("w1")).unwrap();
        let marked = registry
            .get_marked(&GetMarkedRequest {
                app_run_id: AppRunId::new("run1"),
                widget_id: WidgetId::new("w1"),
            })
            .unwrap();
        assert!(marked.record_ids.is_empty());
    }

    #[tokio::test]
    async fn mark_rpcs_on_unknown_widget_return_not_found() {
        let registry = registry();
        let result = registry.clear_marks(&WidgetId::new("ghost"));
        assert!(matches!(result, Err(ManagerError::NotFound(_))));
    }
}
