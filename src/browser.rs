//! Generic record browser: one instance drives one dataset adapter.
//!
//! Pure state machine - it never performs I/O. Navigation and search methods
//! return `FetchRequest`s for the caller to run; completions come back through
//! `apply_*` tagged with the sequence number they were issued under, and
//! anything older than the latest applied response is discarded. That keeps a
//! slow page-1 response from overwriting an already-rendered page 2.
//!
//! Two orthogonal axes: display mode (Paging / Searching) and, per visible
//! record, the primary derived function's trigger state.

use std::collections::HashMap;

use crate::adapter::DatasetAdapter;
use crate::error::ApiError;
use crate::models::{ListPage, Record};
use crate::types::{FetchRequest, InvokeRequest, TriggerOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Paging,
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

pub struct Browser {
    adapter: &'static DatasetAdapter,
    page_size: usize,
    search_limit: usize,

    mode: DisplayMode,
    page: usize, // 1-based, Paging mode
    total: usize,
    rows: Vec<Record>,
    selected: usize,

    search_input: String,
    active_term: Option<String>,

    seq: u64,
    applied_seq: u64,
    loading: bool,
    error: Option<String>,

    // (record id, function name) -> state
    triggers: HashMap<(String, String), TriggerState>,
}

impl Browser {
    pub fn new(adapter: &'static DatasetAdapter, page_size: usize, search_limit: usize) -> Self {
        Self {
            adapter,
            page_size: page_size.max(1),
            search_limit: search_limit.max(1),
            mode: DisplayMode::Paging,
            page: 1,
            total: 0,
            rows: Vec::new(),
            selected: 0,
            search_input: String::new(),
            active_term: None,
            seq: 0,
            applied_seq: 0,
            loading: false,
            error: None,
            triggers: HashMap::new(),
        }
    }

    // ----- getters -----
    pub fn adapter(&self) -> &'static DatasetAdapter {
        self.adapter
    }
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }
    pub fn page(&self) -> usize {
        self.page
    }
    pub fn page_size(&self) -> usize {
        self.page_size
    }
    pub fn total(&self) -> usize {
        self.total
    }
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }
    pub fn selected(&self) -> usize {
        self.selected
    }
    pub fn loading(&self) -> bool {
        self.loading
    }
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    pub fn search_input(&self) -> &str {
        &self.search_input
    }
    pub fn active_term(&self) -> Option<&str> {
        self.active_term.as_deref()
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.rows.get(self.selected)
    }

    /// `ceil(total / page_size)`, with zero records still making one
    /// (possibly empty) page.
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Pager controls are suppressed while searching and on an empty dataset.
    pub fn pager_visible(&self) -> bool {
        self.mode == DisplayMode::Paging && self.total > 0
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    // ----- fetch issuing -----

    /// Load (or reload) the current page. Used at mount and after dataset
    /// switches.
    pub fn reload(&mut self) -> FetchRequest {
        match (&self.mode, self.active_term.clone()) {
            (DisplayMode::Searching, Some(term)) => {
                let seq = self.next_seq();
                self.loading = true;
                FetchRequest::Search { seq, term, limit: self.search_limit }
            }
            _ => {
                let seq = self.next_seq();
                self.loading = true;
                FetchRequest::List {
                    seq,
                    offset: (self.page - 1) * self.page_size,
                    limit: self.page_size,
                }
            }
        }
    }

    /// No-op outside `[1, total_pages]` and while searching; otherwise
    /// re-issues `list` at the new offset.
    pub fn go_to_page(&mut self, n: usize) -> Option<FetchRequest> {
        if self.mode != DisplayMode::Paging {
            return None;
        }
        if n < 1 || n > self.total_pages() {
            return None;
        }
        self.page = n;
        let seq = self.next_seq();
        self.loading = true;
        Some(FetchRequest::List {
            seq,
            offset: (n - 1) * self.page_size,
            limit: self.page_size,
        })
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        self.go_to_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        if self.page <= 1 {
            return None;
        }
        self.go_to_page(self.page - 1)
    }

    // ----- search -----

    pub fn search_add_char(&mut self, c: char) {
        self.search_input.push(c);
    }

    pub fn search_backspace(&mut self) {
        self.search_input.pop();
    }

    /// Submit the typed term. An empty term never issues a search: with a
    /// term already active it clears back to the paged view, otherwise it
    /// falls back to reloading the current page.
    pub fn submit_search(&mut self) -> FetchRequest {
        let term = self.search_input.trim().to_string();
        if term.is_empty() {
            if self.active_term.is_some() {
                return self.clear_search();
            }
            self.search_input.clear();
            return self.reload();
        }
        self.mode = DisplayMode::Searching;
        self.active_term = Some(term.clone());
        let seq = self.next_seq();
        self.loading = true;
        FetchRequest::Search { seq, term, limit: self.search_limit }
    }

    /// Leave search mode and return to page 1 of the paged view. The result
    /// set differs, so the previously viewed page is not restored.
    pub fn clear_search(&mut self) -> FetchRequest {
        self.search_input.clear();
        self.active_term = None;
        self.mode = DisplayMode::Paging;
        self.page = 1;
        let seq = self.next_seq();
        self.loading = true;
        FetchRequest::List { seq, offset: 0, limit: self.page_size }
    }

    // ----- completions -----

    /// Responses older than the latest applied one are stale: a later
    /// navigation already replaced the display they were meant for.
    fn accept_seq(&mut self, seq: u64) -> bool {
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        true
    }

    /// Returns false when the completion was discarded as stale.
    pub fn apply_list(&mut self, seq: u64, result: Result<ListPage, ApiError>) -> bool {
        if self.mode != DisplayMode::Paging || !self.accept_seq(seq) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.rows = page.items;
                self.total = page.total;
                self.error = None;
                // A shrink (e.g. after deletions upstream) can leave the
                // current page past the end; clamp to the last valid page.
                if self.page > self.total_pages() {
                    self.page = self.total_pages();
                }
                self.clamp_selection();
            }
            Err(e) => {
                // Do not retain the stale page under an error banner
                self.rows.clear();
                self.total = 0;
                self.page = 1;
                self.selected = 0;
                self.error = Some(e.to_string());
            }
        }
        true
    }

    pub fn apply_search(
        &mut self,
        seq: u64,
        term: &str,
        result: Result<Vec<Record>, ApiError>,
    ) -> bool {
        if self.mode != DisplayMode::Searching
            || self.active_term.as_deref() != Some(term)
            || !self.accept_seq(seq)
        {
            return false;
        }
        self.loading = false;
        match result {
            Ok(items) => {
                self.rows = items;
                self.error = None;
                self.clamp_selection();
            }
            Err(e) => {
                self.rows.clear();
                self.selected = 0;
                self.error = Some(e.to_string());
            }
        }
        true
    }

    // ----- selection -----

    fn clamp_selection(&mut self) {
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn select_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    // ----- derived-function triggers (row level: primary function only) -----

    pub fn trigger_state(&self, id: &str, function: &str) -> TriggerState {
        self.triggers
            .get(&(id.to_string(), function.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Whether the selected row still offers its one-click action. Once the
    /// primary function is computed the action disappears; recompute is only
    /// reachable from the drawer.
    pub fn row_action_available(&self, record: &Record) -> bool {
        let primary = self.adapter.primary_function;
        if record.ai_flag(primary) {
            return false;
        }
        match self
            .adapter
            .record_id(record)
            .map(|id| self.trigger_state(id, primary))
        {
            Some(TriggerState::Pending) => false,
            Some(_) => true,
            None => false,
        }
    }

    /// Start the primary derived function for the selected row.
    pub fn row_trigger(&mut self) -> Option<InvokeRequest> {
        let record = self.rows.get(self.selected)?.clone();
        if !self.row_action_available(&record) {
            return None;
        }
        let id = self.adapter.record_id(&record)?.to_string();
        let function = self.adapter.primary_function.to_string();
        self.triggers.insert((id.clone(), function.clone()), TriggerState::Pending);
        Some(InvokeRequest {
            id,
            function,
            context_text: self.adapter.context_text(&record),
            refresh: false,
            origin: TriggerOrigin::Row,
            epoch: 0,
        })
    }

    /// Merge a trigger completion. Success sets only the function's status
    /// flag on the matching row; failure raises the dataset-level banner and
    /// leaves the flag unset so the affordance returns for a retry.
    pub fn apply_trigger(&mut self, id: &str, function: &str, result: Result<(), ApiError>) {
        let key = (id.to_string(), function.to_string());
        match result {
            Ok(()) => {
                self.triggers.insert(key, TriggerState::Succeeded);
                let adapter = self.adapter;
                if let Some(row) = self
                    .rows
                    .iter_mut()
                    .find(|r| adapter.record_id(r) == Some(id))
                {
                    row.set_ai_flag(function, true);
                }
            }
            Err(e) => {
                self.triggers.insert(key, TriggerState::Failed);
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
