//! Rendering. Pure function of app state; no mutation except the table's
//! selection offset bookkeeping handled by ratatui's stateful widgets.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::browser::{Browser, DisplayMode, TriggerState};
use crate::drawer::Drawer;
use crate::json_pretty;
use crate::models::Record;

const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 15;
const PAYLOAD_MAX_BYTES: usize = 16 * 1024;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let warning = Paragraph::new(format!(
            "Terminal too small\nMinimum: {MIN_WIDTH}x{MIN_HEIGHT}\nCurrent: {}x{}",
            area.width, area.height
        ))
        .style(Style::default().fg(app.theme().banner_error))
        .wrap(Wrap { trim: true });
        f.render_widget(warning, area);
        return;
    }

    let debug_height = if app.debug_visible() { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),            // header: dataset tabs
            Constraint::Length(3),            // search bar
            Constraint::Min(5),               // records table
            Constraint::Length(debug_height), // debug panel
            Constraint::Length(1),            // footer: pager + hints
        ])
        .split(area);

    draw_header(f, app, chunks[0]);
    draw_search_bar(f, app, chunks[1]);
    draw_table(f, app, chunks[2]);
    if app.debug_visible() {
        draw_debug_panel(f, app, chunks[3]);
    }
    draw_footer(f, app, chunks[4]);

    if let Some(drawer) = app.drawer() {
        draw_drawer(f, app, drawer, drawer_rect(area));
    }

    if let Some(msg) = app.toast_message() {
        draw_toast(f, app, msg, area);
    }
}

/// Render an RFC 3339 timestamp compactly; pass unparseable values through.
fn format_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Centered overlay region of the drawer; also used for backdrop-click
/// hit testing.
pub fn drawer_rect(area: Rect) -> Rect {
    let width = (area.width as u32 * 4 / 5) as u16;
    let height = (area.height as u32 * 4 / 5) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut spans: Vec<Span> = vec![Span::styled(
        " riskcat ",
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )];
    for (i, ds) in crate::adapter::Dataset::ALL.iter().enumerate() {
        let style = if *ds == app.dataset() {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_dim)
        };
        spans.push(Span::styled(format!(" [{}] {} ", i + 1, ds.label()), style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_search_bar(f: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let browser = app.browser();
    let editing = app.input_mode() == InputMode::Search;

    let (border, text) = match (editing, browser.active_term()) {
        (true, _) => (
            theme.focus_border,
            format!("{}\u{2588}", browser.search_input()),
        ),
        (false, Some(term)) => (theme.accent, format!("{term}  (Esc to clear)")),
        (false, None) => (theme.unfocused_border, "press / to search by id".to_string()),
    };

    let para = Paragraph::new(text)
        .style(Style::default().fg(if editing { theme.text } else { theme.text_dim }))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(" Search "),
        );
    f.render_widget(para, area);
}

fn ai_indicator(browser: &Browser, record: &Record) -> (&'static str, bool) {
    let adapter = browser.adapter();
    if record.ai_flag(adapter.primary_function) {
        return ("\u{2713}", true);
    }
    match adapter
        .record_id(record)
        .map(|id| browser.trigger_state(id, adapter.primary_function))
    {
        Some(TriggerState::Pending) => ("\u{2026}", false),
        Some(TriggerState::Failed) => ("!", false),
        _ => ("t", false),
    }
}

fn draw_table(f: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let browser = app.browser();
    let adapter = browser.adapter();

    let title = match browser.mode() {
        DisplayMode::Paging => format!(" {} ", adapter.label),
        DisplayMode::Searching => format!(" {} - search results ", adapter.label),
    };

    let mut header_cells = vec!["ID", "Title"];
    if adapter.type_field.is_some() {
        header_cells.push("Type");
    }
    header_cells.extend(["Theme", "Subtheme", "AI"]);
    let header = Row::new(header_cells)
        .style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = browser
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let (indicator, computed) = ai_indicator(browser, r);
            let mut cells = vec![
                Cell::from(adapter.record_id(r).unwrap_or("-").to_string()),
                Cell::from(r.field_str(adapter.title_field).unwrap_or("-").to_string()),
            ];
            if let Some(type_field) = adapter.type_field {
                cells.push(Cell::from(r.field_str(type_field).unwrap_or("-").to_string()));
            }
            cells.push(Cell::from(r.field_str(adapter.theme_field).unwrap_or("-").to_string()));
            cells.push(Cell::from(
                r.field_str(adapter.subtheme_field).unwrap_or("-").to_string(),
            ));
            cells.push(Cell::from(Span::styled(
                indicator,
                Style::default().fg(if computed { theme.computed } else { theme.pending }),
            )));

            let style = if i == browser.selected() {
                Style::default().fg(theme.text).add_modifier(Modifier::REVERSED)
            } else {
                Style::default().fg(theme.text)
            };
            Row::new(cells).style(style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(16), Constraint::Min(24)];
    if adapter.type_field.is_some() {
        widths.push(Constraint::Length(14));
    }
    widths.extend([Constraint::Length(16), Constraint::Length(16), Constraint::Length(3)]);

    let border = if browser.error().is_some() {
        theme.banner_error
    } else {
        theme.focus_border
    };
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    f.render_widget(table, area);

    if let Some(err) = browser.error() {
        let banner_area = Rect {
            x: area.x + 1,
            y: area.y + area.height.saturating_sub(2),
            width: area.width.saturating_sub(2),
            height: 1,
        };
        let banner = Paragraph::new(format!(" {err}  (Esc to dismiss) "))
            .style(Style::default().fg(theme.text).bg(theme.banner_error));
        f.render_widget(banner, banner_area);
    } else if browser.loading() && browser.rows().is_empty() {
        let msg_area = Rect {
            x: area.x + 2,
            y: area.y + 2,
            width: area.width.saturating_sub(4),
            height: 1,
        };
        f.render_widget(
            Paragraph::new("loading...").style(Style::default().fg(theme.text_dim)),
            msg_area,
        );
    }
}

fn draw_debug_panel(f: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let lines: Vec<Line> = app
        .debug_log()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.text_dim))))
        .collect();
    let para = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.unfocused_border))
            .title(" Requests (Ctrl+D) "),
    );
    f.render_widget(para, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let browser = app.browser();

    let pager = if browser.pager_visible() {
        format!(
            " Page {}/{} \u{b7} {} records ",
            browser.page(),
            browser.total_pages(),
            browser.total()
        )
    } else if browser.mode() == DisplayMode::Searching {
        format!(" {} results ", browser.rows().len())
    } else {
        String::new()
    };

    let hints = if app.drawer().is_some() {
        "\u{2191}\u{2193} function \u{b7} Enter invoke \u{b7} r refresh \u{b7} c context \u{b7} PgUp/PgDn scroll \u{b7} Esc close"
    } else {
        "\u{2191}\u{2193} select \u{b7} \u{2190}\u{2192} page \u{b7} Enter details \u{b7} t trigger \u{b7} / search \u{b7} q quit"
    };

    let line = Line::from(vec![
        Span::styled(pager, Style::default().fg(theme.accent)),
        Span::styled(hints, Style::default().fg(theme.text_dim)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_drawer(f: &mut Frame, app: &App, drawer: &Drawer, area: Rect) {
    let theme = app.theme();
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.focus_border))
        .title(format!(" {} \u{b7} details ", drawer.id()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();

    if drawer.loading() {
        lines.push(Line::from(Span::styled(
            "loading...",
            Style::default().fg(theme.text_dim),
        )));
    }
    if let Some(err) = drawer.error() {
        lines.push(Line::from(Span::styled(
            format!("error: {err}"),
            Style::default().fg(theme.banner_error),
        )));
        lines.push(Line::default());
    }

    if let Some(view) = drawer.view() {
        lines.push(Line::from(Span::styled(
            "Record",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )));
        for (name, value) in &view.raw.0 {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {name}: "), Style::default().fg(theme.text_dim)),
                Span::styled(rendered, Style::default().fg(theme.text)),
            ]));
        }
        lines.push(Line::default());

        lines.push(Line::from(Span::styled(
            "Derived attributes",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )));
        let adapter = app.dataset().adapter();
        for (i, function) in adapter.functions.iter().enumerate() {
            let selected = i == drawer.selected_fn();
            let marker = if selected { "\u{25b6} " } else { "  " };
            let state = drawer.trigger_state(function.name);
            let slot = view.ai.get(function.name).and_then(|s| s.as_ref());

            let status = match (state, slot) {
                (TriggerState::Pending, _) => Span::styled("computing\u{2026}", Style::default().fg(theme.pending)),
                (TriggerState::Failed, _) => Span::styled("failed", Style::default().fg(theme.banner_error)),
                (_, Some(_)) => Span::styled("computed", Style::default().fg(theme.computed)),
                (_, None) => Span::styled("not computed", Style::default().fg(theme.text_dim)),
            };

            let mut spans = vec![
                Span::styled(
                    format!("{marker}{}", function.label),
                    if selected {
                        Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(theme.text)
                    },
                ),
                Span::raw("  "),
                status,
            ];
            if let Some(p) = drawer.provenance(function.name) {
                spans.push(Span::styled(
                    format!("  [{} @ {}]", p.source, format_timestamp(&p.computed_at)),
                    Style::default().fg(theme.text_dim),
                ));
            }
            lines.push(Line::from(spans));

            if let Some(payload) = slot {
                for raw_line in json_pretty::pretty_safe(payload, PAYLOAD_MAX_BYTES).lines() {
                    lines.push(Line::from(Span::styled(
                        format!("    {raw_line}"),
                        Style::default().fg(theme.text_dim),
                    )));
                }
            }
        }

        lines.push(Line::default());
        match app.input_mode() {
            InputMode::Context => lines.push(Line::from(vec![
                Span::styled("context: ", Style::default().fg(theme.accent)),
                Span::styled(
                    format!("{}\u{2588}", app.context_input()),
                    Style::default().fg(theme.text),
                ),
            ])),
            _ => {
                if let Some(text) = drawer.context_override() {
                    lines.push(Line::from(vec![
                        Span::styled("context override: ", Style::default().fg(theme.accent)),
                        Span::styled(text.to_string(), Style::default().fg(theme.text)),
                    ]));
                }
            }
        }
    }

    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((drawer.scroll(), 0));
    f.render_widget(para, inner);
}

fn draw_toast(f: &mut Frame, app: &App, msg: &str, area: Rect) {
    let width = (msg.len() as u16 + 4).min(area.width.saturating_sub(2));
    let rect = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + area.height.saturating_sub(3),
        width,
        height: 1,
    };
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(format!(" {msg} "))
            .style(Style::default().fg(app.theme().text).bg(app.theme().unfocused_border)),
        rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawer_rect_is_centered() {
        let area = Rect { x: 0, y: 0, width: 100, height: 40 };
        let r = drawer_rect(area);
        assert_eq!(r.width, 80);
        assert_eq!(r.height, 32);
        assert_eq!(r.x, 10);
        assert_eq!(r.y, 4);
        // Symmetric margins
        assert_eq!(area.width - (r.x + r.width), r.x);
    }

    #[test]
    fn timestamps_render_compactly() {
        assert_eq!(
            format_timestamp("2026-04-01T12:30:00+02:00"),
            "2026-04-01 10:30:00 UTC"
        );
        assert_eq!(format_timestamp("not-a-date"), "not-a-date");
    }

    #[test]
    fn drawer_rect_contains_clicks_inside_only() {
        let area = Rect { x: 0, y: 0, width: 100, height: 40 };
        let r = drawer_rect(area);
        assert!(r.contains(ratatui::layout::Position { x: 50, y: 20 }));
        assert!(!r.contains(ratatui::layout::Position { x: 2, y: 2 }));
    }
}
