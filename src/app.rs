//! Application orchestrator: composition root state.
//!
//! Selects the active dataset adapter, mounts exactly one record browser at
//! a time, owns the (at most one) open drawer, and routes completions from
//! the event channel into whichever state machine they address. Key handling
//! lives in `main.rs`; everything here is synchronous state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::adapter::Dataset;
use crate::browser::Browser;
use crate::drawer::{Drawer, ScrollLock};
use crate::theme::Theme;
use crate::types::{AppEvent, DetailRequest, FetchRequest, TriggerOrigin};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into the search bar.
    Search,
    /// Typing a context-text override for the drawer.
    Context,
}

pub struct App {
    quit: bool,
    fps: u32,
    theme: Theme,
    page_size: usize,
    search_limit: usize,

    dataset: Dataset,
    browser: Browser,
    drawer: Option<Drawer>,
    drawer_epoch: u64,
    scroll_lock: ScrollLock,

    input_mode: InputMode,
    context_input: String,

    toast: Option<(String, Instant)>,
    debug_log: VecDeque<String>,
    debug_visible: bool,
}

impl App {
    /// Mount the initial browser. The returned request loads page 1.
    pub fn new(
        dataset: Dataset,
        page_size: usize,
        search_limit: usize,
        fps: u32,
    ) -> (Self, FetchRequest) {
        let mut browser = Browser::new(dataset.adapter(), page_size, search_limit);
        let initial = browser.reload();
        let app = Self {
            quit: false,
            fps,
            theme: Theme::default(),
            page_size,
            search_limit,
            dataset,
            browser,
            drawer: None,
            drawer_epoch: 0,
            scroll_lock: ScrollLock::default(),
            input_mode: InputMode::Normal,
            context_input: String::new(),
            toast: None,
            debug_log: VecDeque::new(),
            debug_visible: false,
        };
        (app, initial)
    }

    // ----- getters -----
    pub fn quit_flag(&self) -> bool {
        self.quit
    }
    pub fn fps(&self) -> u32 {
        self.fps
    }
    pub fn theme(&self) -> &Theme {
        &self.theme
    }
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }
    pub fn browser(&self) -> &Browser {
        &self.browser
    }
    pub fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }
    pub fn drawer(&self) -> Option<&Drawer> {
        self.drawer.as_ref()
    }
    pub fn drawer_mut(&mut self) -> Option<&mut Drawer> {
        self.drawer.as_mut()
    }
    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }
    pub fn context_input(&self) -> &str {
        &self.context_input
    }
    pub fn debug_visible(&self) -> bool {
        self.debug_visible
    }
    pub fn debug_log(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.debug_log.iter().map(String::as_str)
    }
    pub fn scroll_locked(&self) -> bool {
        self.scroll_lock.locked()
    }

    // ----- dataset switching (composition root) -----

    /// Replace the mounted browser with a fresh one for another dataset.
    /// The open drawer, if any, is discarded with it.
    pub fn select_dataset(&mut self, dataset: Dataset) -> Option<FetchRequest> {
        if dataset == self.dataset && self.drawer.is_none() {
            return None;
        }
        self.dataset = dataset;
        self.close_drawer();
        self.browser = Browser::new(dataset.adapter(), self.page_size, self.search_limit);
        self.input_mode = InputMode::Normal;
        Some(self.browser.reload())
    }

    // ----- drawer lifecycle -----

    /// Open the drawer for the selected row. Each open gets a fresh epoch so
    /// late completions for older instances are dropped.
    pub fn open_drawer(&mut self) -> Option<DetailRequest> {
        let record = self.browser.selected_record()?;
        let id = self.dataset.adapter().record_id(record)?.to_string();
        self.drawer_epoch += 1;
        let (drawer, req) =
            Drawer::open(self.dataset.adapter(), id, self.drawer_epoch, &self.scroll_lock);
        self.drawer = Some(drawer);
        Some(req)
    }

    /// Close on any path (Esc, backdrop click, dataset switch). Local patches
    /// are discarded; the scroll lock releases with the guard.
    pub fn close_drawer(&mut self) {
        self.drawer = None;
        if self.input_mode == InputMode::Context {
            self.input_mode = InputMode::Normal;
        }
        self.context_input.clear();
    }

    // ----- input modes -----

    pub fn start_search(&mut self) {
        if self.drawer.is_none() {
            self.input_mode = InputMode::Search;
        }
    }

    pub fn leave_search_input(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn start_context_input(&mut self) {
        if let Some(d) = &self.drawer {
            self.context_input = d.context_override().unwrap_or_default().to_string();
            self.input_mode = InputMode::Context;
        }
    }

    pub fn context_add_char(&mut self, c: char) {
        self.context_input.push(c);
    }

    pub fn context_backspace(&mut self) {
        self.context_input.pop();
    }

    pub fn apply_context_input(&mut self) {
        let text = self.context_input.trim().to_string();
        if let Some(d) = &mut self.drawer {
            d.set_context_override(if text.is_empty() { None } else { Some(text) });
        }
        self.context_input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_context_input(&mut self) {
        self.context_input.clear();
        self.input_mode = InputMode::Normal;
    }

    // ----- toast / debug -----

    pub fn show_toast(&mut self, msg: String) {
        self.toast = Some((msg, Instant::now()));
    }

    pub fn toast_message(&self) -> Option<&str> {
        const TOAST_DURATION: Duration = Duration::from_secs(2);
        self.toast.as_ref().and_then(|(msg, at)| {
            if at.elapsed() < TOAST_DURATION {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    pub fn toggle_debug_panel(&mut self) {
        self.debug_visible = !self.debug_visible;
    }

    pub fn log_debug(&mut self, msg: String) {
        const MAX_LOG_ENTRIES: usize = 50;
        self.debug_log.push_back(msg);
        while self.debug_log.len() > MAX_LOG_ENTRIES {
            self.debug_log.pop_front();
        }
    }

    // ----- event routing -----

    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Quit => self.quit = true,
            AppEvent::Net(line) => self.log_debug(line),
            AppEvent::ListLoaded { dataset, seq, result } => {
                if dataset == self.dataset {
                    self.browser.apply_list(seq, result);
                }
            }
            AppEvent::SearchLoaded { dataset, seq, term, result } => {
                if dataset == self.dataset {
                    self.browser.apply_search(seq, &term, result);
                }
            }
            AppEvent::DetailLoaded { dataset, epoch, result } => {
                if dataset == self.dataset {
                    if let Some(d) = &mut self.drawer {
                        d.apply_details(epoch, result);
                    }
                    // No drawer: it was closed while the fetch was in flight;
                    // the view model is gone, drop the result.
                }
            }
            AppEvent::TriggerDone { dataset, origin, epoch, id, function, result } => {
                if dataset != self.dataset {
                    return;
                }
                match origin {
                    TriggerOrigin::Row => {
                        self.browser.apply_trigger(&id, &function, result.map(|_| ()));
                    }
                    TriggerOrigin::Drawer => {
                        let applied = match &mut self.drawer {
                            Some(d) => d.apply_trigger(epoch, &function, result.clone()),
                            None => false,
                        };
                        if applied {
                            // Keep the row's computed flag in sync without
                            // re-fetching the list
                            if result.is_ok() {
                                self.browser.apply_trigger(&id, &function, Ok(()));
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::{ListPage, Record, TriggerResponse, TriggerSource};
    use serde_json::json;

    fn issue_row(id: &str) -> Record {
        Record::from_value(json!({
            "issue_id": id,
            "issue_title": format!("Issue {id}"),
            "ai_status": {}
        }))
        .unwrap()
    }

    fn app_with_rows() -> App {
        let (mut app, initial) = App::new(Dataset::Issues, 20, 25, 30);
        app.on_event(AppEvent::ListLoaded {
            dataset: Dataset::Issues,
            seq: initial.seq(),
            result: Ok(ListPage { items: vec![issue_row("ISS-1"), issue_row("ISS-2")], total: 2 }),
        });
        app
    }

    fn trigger_ok() -> TriggerResponse {
        TriggerResponse {
            status: "ok".into(),
            source: TriggerSource::Computed,
            payload: json!({"theme": "Ops"}),
            created_at: "2026-03-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn quit_event_sets_the_flag() {
        let mut app = app_with_rows();
        assert!(!app.quit_flag());
        app.on_event(AppEvent::Quit);
        assert!(app.quit_flag());
    }

    #[test]
    fn dataset_switch_replaces_browser_and_closes_drawer() {
        let mut app = app_with_rows();
        app.open_drawer().unwrap();
        assert!(app.scroll_locked());

        let req = app.select_dataset(Dataset::Controls).unwrap();
        assert!(matches!(req, FetchRequest::List { offset: 0, .. }));
        assert!(app.drawer().is_none());
        assert!(!app.scroll_locked());
        assert!(app.browser().rows().is_empty());
    }

    #[test]
    fn reselecting_same_dataset_is_a_noop() {
        let mut app = app_with_rows();
        assert!(app.select_dataset(Dataset::Issues).is_none());
        assert_eq!(app.browser().rows().len(), 2);
    }

    #[test]
    fn completions_for_another_dataset_are_ignored() {
        let mut app = app_with_rows();
        app.on_event(AppEvent::ListLoaded {
            dataset: Dataset::Controls,
            seq: 99,
            result: Ok(ListPage { items: vec![], total: 0 }),
        });
        assert_eq!(app.browser().rows().len(), 2);
    }

    #[test]
    fn drawer_result_after_close_is_discarded() {
        let mut app = app_with_rows();
        let req = app.open_drawer().unwrap();
        app.close_drawer();
        // The in-flight detail fetch lands after close
        app.on_event(AppEvent::DetailLoaded {
            dataset: Dataset::Issues,
            epoch: req.epoch,
            result: Ok(serde_json::from_value(json!({
                "raw": {"issue_id": "ISS-1"},
                "ai": {}
            }))
            .unwrap()),
        });
        assert!(app.drawer().is_none());
    }

    #[test]
    fn reopened_drawer_ignores_previous_epoch() {
        let mut app = app_with_rows();
        let first = app.open_drawer().unwrap();
        app.close_drawer();
        let second = app.open_drawer().unwrap();
        assert!(second.epoch > first.epoch);

        app.on_event(AppEvent::TriggerDone {
            dataset: Dataset::Issues,
            origin: TriggerOrigin::Drawer,
            epoch: first.epoch,
            id: "ISS-1".into(),
            function: "issue_taxonomy".into(),
            result: Ok(trigger_ok()),
        });
        // Stale epoch: the browser flag must not be synced either
        assert!(!app.browser().rows()[0].ai_flag("issue_taxonomy"));
    }

    #[test]
    fn drawer_success_syncs_row_flag_without_refetch() {
        let mut app = app_with_rows();
        let req = app.open_drawer().unwrap();
        app.on_event(AppEvent::DetailLoaded {
            dataset: Dataset::Issues,
            epoch: req.epoch,
            result: Ok(serde_json::from_value(json!({
                "raw": {"issue_id": "ISS-1", "issue_title": "Issue ISS-1"},
                "ai": {"issue_taxonomy": null, "root_cause": null, "enrichment": null}
            }))
            .unwrap()),
        });
        app.on_event(AppEvent::TriggerDone {
            dataset: Dataset::Issues,
            origin: TriggerOrigin::Drawer,
            epoch: req.epoch,
            id: "ISS-1".into(),
            function: "issue_taxonomy".into(),
            result: Ok(trigger_ok()),
        });
        assert!(app.browser().rows()[0].ai_flag("issue_taxonomy"));
        assert_eq!(
            app.drawer().unwrap().view().unwrap().ai["issue_taxonomy"],
            Some(json!({"theme": "Ops"}))
        );
    }

    #[test]
    fn row_trigger_failure_reaches_banner() {
        let mut app = app_with_rows();
        let req = app.browser_mut().row_trigger().unwrap();
        app.on_event(AppEvent::TriggerDone {
            dataset: Dataset::Issues,
            origin: TriggerOrigin::Row,
            epoch: 0,
            id: req.id,
            function: req.function,
            result: Err(ApiError::Overload { status: 503, detail: "busy".into() }),
        });
        assert!(app.browser().error().unwrap().contains("busy"));
    }

    #[test]
    fn context_input_roundtrip() {
        let mut app = app_with_rows();
        let req = app.open_drawer().unwrap();
        app.on_event(AppEvent::DetailLoaded {
            dataset: Dataset::Issues,
            epoch: req.epoch,
            result: Ok(serde_json::from_value(json!({
                "raw": {"issue_id": "ISS-1", "issue_title": "Issue ISS-1"},
                "ai": {}
            }))
            .unwrap()),
        });
        app.start_context_input();
        assert_eq!(app.input_mode(), InputMode::Context);
        for c in "override text".chars() {
            app.context_add_char(c);
        }
        app.apply_context_input();
        assert_eq!(app.input_mode(), InputMode::Normal);
        assert_eq!(app.drawer().unwrap().context_override(), Some("override text"));
    }
}
