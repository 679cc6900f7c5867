//! The per-widget streaming search manager.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::ManagerError;
use crate::ids::{AppRunId, WidgetId};
use crate::mark::MarkManager;
use crate::matcher::{Matcher, SearchContext};
use crate::query::{compile, extract_error_spans};
use crate::record::Record;

use super::constants::{BUFFER, TRIM_SLACK};
use super::rpc::{ErrorSpan, Page, SearchRequest, SearchResponse, StreamUpdate};
use super::StreamPublisher;

/// Running totals maintained across both full rescans and incremental
/// `process_new_record` calls.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub total_count: usize,
    pub searched_count: usize,
    pub last_record_id: Option<u64>,
    pub search_duration_ms: u64,
}

/// A sentinel no real query text can ever equal, used to force the next
/// `search()` call to always rerun a full rescan after a compile failure.
fn broken_sentinel() -> String {
    "\u{0}outrig-internal-broken-sentinel\u{0}".to_string()
}

/// All of a manager's mutable state, guarded by one lock.
struct Inner {
    user_query_text: String,
    user_matcher: Option<Arc<dyn Matcher>>,
    system_query_text: String,
    system_matcher: Option<Arc<dyn Matcher>>,
    streaming: bool,
    filtered_window: Vec<Arc<dyn Record>>,
    trimmed_count: usize,
    stats: Stats,
    subscriber_route: String,
    last_used: Instant,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            user_query_text: broken_sentinel(),
            user_matcher: None,
            system_query_text: String::new(),
            system_matcher: None,
            streaming: false,
            filtered_window: Vec::new(),
            trimmed_count: 0,
            stats: Stats::default(),
            subscriber_route: String::new(),
            last_used: Instant::now(),
        }
    }
}

/// A read-only snapshot of manager state for registry diagnostics.
#[derive(Debug, Clone)]
pub struct ManagerDiagnostics {
    pub widget_id: WidgetId,
    pub app_run_id: AppRunId,
    pub idle_for: std::time::Duration,
    pub user_query_text: String,
    pub filtered_count: usize,
    pub marked_count: usize,
    pub subscriber_route: String,
    pub trimmed_count: usize,
    pub stats: Stats,
    pub streaming: bool,
}

pub struct SearchManager {
    widget_id: WidgetId,
    app_run_id: AppRunId,
    mark_manager: MarkManager,
    publisher: Arc<dyn StreamPublisher>,
    inner: Mutex<Inner>,
}

impl SearchManager {
    pub fn new(widget_id: WidgetId, app_run_id: AppRunId, publisher: Arc<dyn StreamPublisher>) -> Self {
        Self {
            widget_id,
            app_run_id,
            mark_manager: MarkManager::new(),
            publisher,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn widget_id(&self) -> &WidgetId {
        &self.widget_id
    }

    pub fn app_run_id(&self) -> &AppRunId {
        &self.app_run_id
    }

    pub fn mark_manager(&self) -> &MarkManager {
        &self.mark_manager
    }

    /// `search(request) -> response`.
    #[instrument(skip(self, all_records))]
    pub async fn search(
        &self,
        request: &SearchRequest,
        all_records: impl FnOnce() -> (Vec<Arc<dyn Record>>, usize),
    ) -> Result<SearchResponse, ManagerError> {
        let mut inner = self.inner.lock().await;
        inner.last_used = Instant::now();
        inner.subscriber_route = request.subscriber_route.clone();

        let triple_changed = inner.user_query_text != request.search_term
            || inner.system_query_text != request.system_query
            || inner.streaming != request.streaming;

        let mut error_spans = Vec::new();
        if triple_changed {
            let (records, total_count) = all_records();
            let marked = self.mark_manager.snapshot();
            match run_full_search(&mut inner, request, records, total_count, marked) {
                Ok(spans) => error_spans = spans,
                Err(err) => return Err(err),
            }
        }

        let filtered_size = inner.filtered_window.len();
        let page_size = request.page_size.max(1);
        let trimmed_pages = inner.trimmed_count / page_size;
        let total_logical_pages = filtered_size.div_ceil(page_size) + trimmed_pages;

        let mut seen = std::collections::HashSet::new();
        let mut pages = Vec::new();
        for &requested in &request.request_pages {
            let resolved = if requested < 0 {
                total_logical_pages as i64 + requested
            } else {
                requested
            };
            if resolved < 0 || resolved as usize >= total_logical_pages {
                continue;
            }
            if !seen.insert(resolved) {
                continue;
            }
            let page_num = resolved as usize;
            if page_num < trimmed_pages {
                pages.push(Page {
                    page_num: resolved,
                    lines: Vec::new(),
                });
                continue;
            }
            let local = page_num - trimmed_pages;
            let start = (local * page_size).min(filtered_size);
            let end = ((local + 1) * page_size).min(filtered_size);
            let lines = inner.filtered_window[start..end]
                .iter()
                .map(|record| record.id())
                .collect();
            pages.push(Page {
                page_num: resolved,
                lines,
            });
        }

        Ok(SearchResponse {
            filtered_count: filtered_size,
            searched_count: inner.stats.searched_count,
            total_count: inner.stats.total_count,
            max_count: BUFFER,
            pages,
            error_spans,
        })
    }

    /// `processNewRecord(record)` - called by the peer for every
    /// newly-ingested record. Never fails outward.
    #[instrument(skip(self, record))]
    pub async fn process_new_record(&self, record: Arc<dyn Record>) {
        let mut inner = self.inner.lock().await;

        if !inner.streaming {
            return;
        }
        if let Some(last) = inner.stats.last_record_id {
            if record.id() <= last {
                return;
            }
        }

        inner.stats.last_record_id = Some(record.id());
        inner.stats.total_count += 1;
        inner.stats.searched_count += 1;

        let Some(matcher) = effective_matcher(&inner) else {
            return;
        };

        let ctx = SearchContext::new(self.mark_manager.snapshot(), inner.user_matcher.clone());
        if !matcher.matches(&ctx, record.as_ref()) {
            return;
        }

        inner.filtered_window.push(record.clone());
        let mut trimmed_lines = 0;
        if inner.filtered_window.len() > BUFFER + TRIM_SLACK {
            inner.filtered_window.drain(0..TRIM_SLACK);
            inner.trimmed_count += TRIM_SLACK;
            trimmed_lines = TRIM_SLACK;
        }

        let update = StreamUpdate {
            widget_id: self.widget_id.clone(),
            filtered_count: inner.filtered_window.len(),
            searched_count: inner.stats.searched_count,
            total_count: inner.stats.total_count,
            trimmed_lines,
            offset: inner.filtered_window.len() - 1 + inner.trimmed_count,
            lines: vec![record.id()],
        };
        let route = inner.subscriber_route.clone();

        // Release the lock before the fire-and-forget publish, so the
        // publishing I/O never extends the critical section.
        drop(inner);
        let publisher = self.publisher.clone();
        tokio::spawn(async move {
            publisher.publish(&route, update);
        });
    }

    pub async fn diagnostics(&self) -> ManagerDiagnostics {
        let inner = self.inner.lock().await;
        ManagerDiagnostics {
            widget_id: self.widget_id.clone(),
            app_run_id: self.app_run_id.clone(),
            idle_for: inner.last_used.elapsed(),
            user_query_text: inner.user_query_text.clone(),
            filtered_count: inner.filtered_window.len(),
            marked_count: self.mark_manager.snapshot().len(),
            subscriber_route: inner.subscriber_route.clone(),
            trimmed_count: inner.trimmed_count,
            stats: inner.stats.clone(),
            streaming: inner.streaming,
        }
    }

    pub async fn idle_for(&self) -> std::time::Duration {
        self.inner.lock().await.last_used.elapsed()
    }

    pub async fn touch(&self) {
        self.inner.lock().await.last_used = Instant::now();
    }
}

fn effective_matcher(inner: &Inner) -> Option<Arc<dyn Matcher>> {
    inner
        .system_matcher
        .clone()
        .or_else(|| inner.user_matcher.clone())
}

/// Recompile both queries and rescan the full snapshot. Returns the
/// user-query error spans on success; a system-query compile error is
/// always a hard failure (system queries are UI-generated, never user
/// text).
fn run_full_search(
    inner: &mut Inner,
    request: &SearchRequest,
    records: Vec<Arc<dyn Record>>,
    total_count: usize,
    marked: Arc<std::collections::HashSet<u64>>,
) -> Result<Vec<ErrorSpan>, ManagerError> {
    let started = Instant::now();

    let user_ast = crate::query::parse(&request.search_term);
    let mut user_error_spans: Vec<ErrorSpan> = extract_error_spans(&user_ast)
        .into_iter()
        .map(|(span, message)| ErrorSpan::from_span(span, message))
        .collect();
    // A user-query regex compile failure is reported the same way a syntax
    // error is (error span, no matcher), but it also forces the manager
    // into Broken - the cached triple can never match the sentinel again,
    // so the next `search()` always retries.
    let (user_matcher, user_broken) = match compile(&user_ast) {
        Ok(matcher) => (matcher, false),
        Err(err) => {
            user_error_spans.push(ErrorSpan::from_span(user_ast.span(), err.to_string()));
            (None, true)
        }
    };

    let system_matcher = if request.system_query.is_empty() {
        None
    } else {
        let system_ast = crate::query::parse(&request.system_query);
        match compile(&system_ast) {
            Ok(matcher) => matcher,
            Err(err) => {
                inner.user_query_text = broken_sentinel();
                inner.user_matcher = None;
                inner.system_matcher = None;
                inner.stats = Stats::default();
                return Err(ManagerError::from(err));
            }
        }
    };

    inner.user_matcher = user_matcher;
    inner.system_matcher = system_matcher;
    inner.user_query_text = if user_broken {
        broken_sentinel()
    } else {
        request.search_term.clone()
    };
    inner.system_query_text = request.system_query.clone();
    inner.streaming = request.streaming;
    inner.filtered_window.clear();
    inner.trimmed_count = 0;

    let Some(matcher) = effective_matcher(inner) else {
        inner.stats = if user_broken {
            Stats::default()
        } else {
            Stats {
                total_count,
                searched_count: records.len(),
                last_record_id: records.last().map(|r| r.id()),
                search_duration_ms: started.elapsed().as_millis() as u64,
            }
        };
        return Ok(user_error_spans);
    };

    let ctx = SearchContext::new(marked, inner.user_matcher.clone());
    let mut last_record_id = None;
    for record in &records {
        last_record_id = Some(record.id());
        if matcher.matches(&ctx, record.as_ref()) {
            inner.filtered_window.push(record.clone());
        }
    }

    inner.stats = if user_broken {
        Stats::default()
    } else {
        Stats {
            total_count,
            searched_count: records.len(),
            last_record_id,
            search_duration_ms: started.elapsed().as_millis() as u64,
        }
    };

    Ok(user_error_spans)
}
