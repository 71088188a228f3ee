use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Position, Terminal};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use riskcat::adapter::Dataset;
use riskcat::app::{App, InputMode};
use riskcat::client::ApiClient;
use riskcat::config;
use riskcat::fetch::{ChannelObserver, Fetcher};
use riskcat::session::SessionContext;
use riskcat::transport::ReqwestTransport;
use riskcat::types::AppEvent;
use riskcat::ui;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = config::load().context("Failed to load configuration")?;
    if cfg.verbose {
        cfg.print_summary();
    }
    let session = SessionContext::new(cfg.session_id.clone(), cfg.user_id.clone());
    log::info!("session {} / user {}", session.session_id(), session.user_id());

    // app + channels
    let (tx, rx) = unbounded_channel::<AppEvent>();
    let client = Arc::new(ApiClient::new(
        cfg.api_base_url.clone(),
        cfg.http_timeout_ms,
        session,
        Arc::new(ReqwestTransport),
        Arc::new(ChannelObserver::new(tx.clone())),
    ));
    let fetcher = Fetcher::new(client, tx);

    let (mut app, initial) = App::new(
        cfg.dataset,
        cfg.page_size,
        cfg.search_limit,
        cfg.render_fps,
    );
    fetcher.spawn_fetch(app.dataset(), initial);

    // terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_loop(&mut app, &mut terminal, rx, &fetcher).await;

    // cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    result
}

async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut rx: UnboundedReceiver<AppEvent>,
    fetcher: &Fetcher,
) -> Result<()> {
    let mut last_frame = Instant::now();
    loop {
        // frame budget (coalesced renders)
        let frame_ms = 1000u32.saturating_div(app.fps()) as u64;
        let budget = Duration::from_millis(frame_ms.max(1));
        let wait = budget.saturating_sub(last_frame.elapsed());

        // input or fetch completions
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(k) => {
                    if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                        handle_key(app, k, fetcher);
                    }
                }
                Event::Mouse(m) => handle_mouse(app, m, terminal.size()?),
                _ => {}
            }
        }
        while let Ok(ev) = rx.try_recv() {
            app.on_event(ev);
        }

        if last_frame.elapsed() >= budget {
            terminal.draw(|f| ui::draw(f, app))?;
            last_frame = Instant::now();
        }
        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}

/// Backdrop click closes the drawer; clicks inside it are ignored.
fn handle_mouse(app: &mut App, m: MouseEvent, size: ratatui::layout::Size) {
    if m.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    if app.drawer().is_none() {
        return;
    }
    let area = ratatui::layout::Rect::new(0, 0, size.width, size.height);
    let inside = ui::drawer_rect(area).contains(Position { x: m.column, y: m.row });
    if !inside {
        app.close_drawer();
    }
}

fn handle_key(app: &mut App, k: KeyEvent, fetcher: &Fetcher) {
    // Search input mode
    if app.input_mode() == InputMode::Search {
        match k.code {
            KeyCode::Char(c) => app.browser_mut().search_add_char(c),
            KeyCode::Backspace => app.browser_mut().search_backspace(),
            KeyCode::Enter => {
                let req = app.browser_mut().submit_search();
                app.leave_search_input();
                fetcher.spawn_fetch(app.dataset(), req);
            }
            KeyCode::Esc => {
                app.leave_search_input();
                if app.browser().active_term().is_some() {
                    let req = app.browser_mut().clear_search();
                    fetcher.spawn_fetch(app.dataset(), req);
                } else {
                    while !app.browser().search_input().is_empty() {
                        app.browser_mut().search_backspace();
                    }
                }
            }
            _ => {}
        }
        return;
    }

    // Context-override input mode (drawer)
    if app.input_mode() == InputMode::Context {
        match k.code {
            KeyCode::Char(c) => app.context_add_char(c),
            KeyCode::Backspace => app.context_backspace(),
            KeyCode::Enter => app.apply_context_input(),
            KeyCode::Esc => app.cancel_context_input(),
            _ => {}
        }
        return;
    }

    // Drawer open: keys address the drawer
    if app.drawer().is_some() {
        match (k.code, k.modifiers) {
            (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                app.on_event(AppEvent::Quit)
            }
            (KeyCode::Esc, _) => app.close_drawer(),
            (KeyCode::Up, _) => {
                if let Some(d) = app.drawer_mut() {
                    d.select_prev_fn();
                }
            }
            (KeyCode::Down, _) => {
                if let Some(d) = app.drawer_mut() {
                    d.select_next_fn();
                }
            }
            (KeyCode::Enter, _) => {
                let dataset = app.dataset();
                if let Some(req) = app.drawer_mut().and_then(|d| d.invoke_selected(false)) {
                    fetcher.spawn_invoke(dataset, req);
                }
            }
            (KeyCode::Char('r'), _) => {
                // Force recomputation even when a cached result exists
                let dataset = app.dataset();
                if let Some(req) = app.drawer_mut().and_then(|d| d.invoke_selected(true)) {
                    fetcher.spawn_invoke(dataset, req);
                }
            }
            (KeyCode::Char('c'), _) => app.start_context_input(),
            (KeyCode::PageUp, _) => {
                if let Some(d) = app.drawer_mut() {
                    d.scroll_by(-10);
                }
            }
            (KeyCode::PageDown, _) => {
                if let Some(d) = app.drawer_mut() {
                    d.scroll_by(10);
                }
            }
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => app.toggle_debug_panel(),
            _ => {}
        }
        return;
    }

    // Normal mode: keys address the browser
    match (k.code, k.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.on_event(AppEvent::Quit)
        }

        (KeyCode::Char(c @ '1'..='4'), _) => {
            let dataset = Dataset::ALL[c as usize - '1' as usize];
            if let Some(req) = app.select_dataset(dataset) {
                fetcher.spawn_fetch(dataset, req);
            }
        }

        (KeyCode::Char('/'), _) => app.start_search(),

        (KeyCode::Up, _) => app.browser_mut().select_up(),
        (KeyCode::Down, _) => app.browser_mut().select_down(),

        (KeyCode::Left, _) | (KeyCode::PageUp, _) => {
            if let Some(req) = app.browser_mut().prev_page() {
                fetcher.spawn_fetch(app.dataset(), req);
            }
        }
        (KeyCode::Right, _) | (KeyCode::PageDown, _) => {
            if let Some(req) = app.browser_mut().next_page() {
                fetcher.spawn_fetch(app.dataset(), req);
            }
        }
        (KeyCode::Home, _) => {
            if let Some(req) = app.browser_mut().go_to_page(1) {
                fetcher.spawn_fetch(app.dataset(), req);
            }
        }
        (KeyCode::End, _) => {
            let last = app.browser().total_pages();
            if let Some(req) = app.browser_mut().go_to_page(last) {
                fetcher.spawn_fetch(app.dataset(), req);
            }
        }

        (KeyCode::Enter, _) => {
            if let Some(req) = app.open_drawer() {
                fetcher.spawn_details(app.dataset(), req);
            }
        }
        (KeyCode::Char('t'), _) => {
            if let Some(req) = app.browser_mut().row_trigger() {
                app.show_toast(format!("computing {} for {}", req.function, req.id));
                fetcher.spawn_invoke(app.dataset(), req);
            }
        }

        (KeyCode::Esc, _) => {
            if app.browser().error().is_some() {
                app.browser_mut().clear_error();
            } else if app.browser().active_term().is_some() {
                let req = app.browser_mut().clear_search();
                fetcher.spawn_fetch(app.dataset(), req);
            }
        }

        (KeyCode::Char('d'), KeyModifiers::CONTROL) => app.toggle_debug_panel(),
        _ => {}
    }
}
