//! Detail drawer: fetches one record's full view model and materializes
//! derived attributes on demand.
//!
//! The view model is fetched once on open. Invoking a function patches only
//! that function's slot in the local `ai` map - no reload. Closing discards
//! all local patches; the next open reflects only what the service persisted.
//! Each open gets a fresh epoch so completions addressed to a closed drawer
//! are dropped instead of resurrecting stale state.
//!
//! While a drawer is open the page-level scroll lock is held; the guard
//! releases it on every exit path, including forced teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::{DatasetAdapter, DerivedFunction};
use crate::browser::TriggerState;
use crate::error::ApiError;
use crate::models::{DerivedResult, DetailView, TriggerResponse};
use crate::types::{DetailRequest, InvokeRequest, TriggerOrigin};

/// The one shared mutable resource outside request state.
#[derive(Clone, Default)]
pub struct ScrollLock(Arc<AtomicBool>);

impl ScrollLock {
    pub fn locked(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn acquire(&self) -> ScrollLockGuard {
        self.0.store(true, Ordering::SeqCst);
        ScrollLockGuard(self.0.clone())
    }
}

pub struct ScrollLockGuard(Arc<AtomicBool>);

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Drawer {
    adapter: &'static DatasetAdapter,
    epoch: u64,
    id: String,
    view: Option<DetailView>,
    loading: bool,
    error: Option<String>,
    selected_fn: usize,
    context_override: Option<String>,
    scroll: u16,
    triggers: HashMap<String, TriggerState>,
    provenance: HashMap<String, DerivedResult>,
    _lock: ScrollLockGuard,
}

impl Drawer {
    /// Open for one record id. Returns the drawer plus the single detail
    /// fetch to run.
    pub fn open(
        adapter: &'static DatasetAdapter,
        id: String,
        epoch: u64,
        lock: &ScrollLock,
    ) -> (Self, DetailRequest) {
        let req = DetailRequest { id: id.clone(), epoch };
        let drawer = Self {
            adapter,
            epoch,
            id,
            view: None,
            loading: true,
            error: None,
            selected_fn: 0,
            context_override: None,
            scroll: 0,
            triggers: HashMap::new(),
            provenance: HashMap::new(),
            _lock: lock.acquire(),
        };
        (drawer, req)
    }

    // ----- getters -----
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn view(&self) -> Option<&DetailView> {
        self.view.as_ref()
    }
    pub fn loading(&self) -> bool {
        self.loading
    }
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    pub fn scroll(&self) -> u16 {
        self.scroll
    }
    pub fn selected_fn(&self) -> usize {
        self.selected_fn
    }
    pub fn context_override(&self) -> Option<&str> {
        self.context_override.as_deref()
    }

    pub fn selected_function(&self) -> &'static DerivedFunction {
        &self.adapter.functions[self.selected_fn]
    }

    pub fn trigger_state(&self, function: &str) -> TriggerState {
        self.triggers.get(function).copied().unwrap_or_default()
    }

    /// Session-local provenance (cache/computed + timestamp) of the last
    /// invocation of a function, if any happened in this drawer.
    pub fn provenance(&self, function: &str) -> Option<&DerivedResult> {
        self.provenance.get(function)
    }

    // ----- completions -----

    /// Apply the one-shot detail fetch. Stale epochs are discarded.
    pub fn apply_details(&mut self, epoch: u64, result: Result<DetailView, ApiError>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.loading = false;
        match result {
            Ok(view) => {
                self.view = Some(view);
                self.error = None;
            }
            Err(e) => {
                self.view = None;
                self.error = Some(e.to_string());
            }
        }
        true
    }

    /// Merge one trigger completion: patch exactly the function's slot.
    /// A failure never corrupts what is already displayed.
    pub fn apply_trigger(
        &mut self,
        epoch: u64,
        function: &str,
        result: Result<TriggerResponse, ApiError>,
    ) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match result {
            Ok(resp) => {
                self.triggers.insert(function.to_string(), TriggerState::Succeeded);
                self.provenance.insert(
                    function.to_string(),
                    DerivedResult {
                        function: function.to_string(),
                        source: resp.source,
                        computed_at: resp.created_at.clone(),
                    },
                );
                if let Some(view) = &mut self.view {
                    view.patch(function, resp.payload);
                }
                self.error = None;
            }
            Err(e) => {
                self.triggers.insert(function.to_string(), TriggerState::Failed);
                self.error = Some(e.to_string());
            }
        }
        true
    }

    // ----- invocation -----

    /// Invoke the highlighted function. Always passes the current view's
    /// best-available context text: an explicit override wins over the
    /// record's own title/description field. Concurrent invocations of the
    /// same pair are not deduplicated here.
    pub fn invoke_selected(&mut self, refresh: bool) -> Option<InvokeRequest> {
        let view = self.view.as_ref()?;
        let function = self.selected_function();
        let context_text = self
            .context_override
            .clone()
            .or_else(|| self.adapter.context_text(&view.raw));
        self.triggers.insert(function.name.to_string(), TriggerState::Pending);
        Some(InvokeRequest {
            id: self.id.clone(),
            function: function.name.to_string(),
            context_text,
            refresh,
            origin: TriggerOrigin::Drawer,
            epoch: self.epoch,
        })
    }

    pub fn set_context_override(&mut self, text: Option<String>) {
        self.context_override = text.filter(|t| !t.trim().is_empty());
    }

    // ----- navigation -----

    pub fn select_next_fn(&mut self) {
        self.selected_fn = (self.selected_fn + 1) % self.adapter.functions.len();
    }

    pub fn select_prev_fn(&mut self) {
        let n = self.adapter.functions.len();
        self.selected_fn = (self.selected_fn + n - 1) % n;
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let next = (self.scroll as i32 + delta).max(0);
        self.scroll = next.min(u16::MAX as i32) as u16;
    }
}
