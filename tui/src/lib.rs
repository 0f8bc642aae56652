//! TUI rendering for Disentangler using ratatui.

mod input;
mod render;
mod theme;

pub use input::{InputPump, apply_event, handle_events};
pub use render::display_text;
pub use theme::{Glyphs, Palette, glyphs, palette, spinner_frame, styles};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap},
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use disentangler_engine::{App, DraftInput, FormField, GateStatus};
use disentangler_types::render_output;

const FIELD_HEIGHT: u16 = 3;
const CATALOG_WIDTH: u16 = 52;
const CATALOG_MAX_HEIGHT: u16 = 20;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let options = app.ui_options();
    let palette = palette(options);
    let glyphs = glyphs(options);
    // Clear with background color
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),            // Title
            Constraint::Length(FIELD_HEIGHT), // Output quantity
            Constraint::Length(FIELD_HEIGHT), // Input quantities
            Constraint::Length(FIELD_HEIGHT), // Constants
            Constraint::Length(1),            // Auto-search + trigger
            Constraint::Min(3),               // Output region
            Constraint::Length(1),            // Status bar
        ])
        .split(frame.area());

    draw_title(frame, chunks[0], &palette);
    let modal_open = app.catalog().is_open();
    for (field, area) in [
        (FormField::Output, chunks[1]),
        (FormField::Inputs, chunks[2]),
        (FormField::Constants, chunks[3]),
    ] {
        draw_field(frame, app, field, area, &palette, !modal_open);
    }
    draw_controls(frame, app, chunks[4], &palette, &glyphs);
    draw_output(frame, app, chunks[5], &palette, &glyphs);
    draw_status_bar(frame, app, chunks[6], &palette, &glyphs);

    if modal_open {
        draw_catalog(frame, app, &palette, &glyphs);
    }
}

fn draw_title(frame: &mut Frame, area: Rect, palette: &Palette) {
    let title = Line::from(vec![
        Span::styled("Disentangler", styles::title(palette)),
        Span::styled(
            "  physics hypothesis discovery",
            Style::default().fg(palette.text_muted),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn draw_field(
    frame: &mut Frame,
    app: &App,
    field: FormField,
    area: Rect,
    palette: &Palette,
    place_cursor: bool,
) {
    let Some(draft) = app.form().draft(field) else {
        return;
    };
    let focused = app.form().focus() == field;
    let content_width = usize::from(area.width.saturating_sub(4));
    let (visible, horizontal_scroll) = scrolled(draft, content_width);

    let label_style = if focused {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.text_secondary)
    };
    let hint = match field {
        FormField::Output => "e.g. energy",
        FormField::Inputs | FormField::Constants => "comma separated",
        FormField::AutoSearch => "",
    };

    let widget = Paragraph::new(Line::from(Span::styled(
        visible,
        Style::default().fg(palette.text_primary),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(styles::border(palette, focused))
            .title_top(Line::from(Span::styled(
                format!(" {} ", field.label()),
                label_style,
            )))
            .title_top(
                Line::from(Span::styled(format!(" {hint} "), styles::key_hint(palette)))
                    .alignment(Alignment::Right),
            )
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(widget, area);

    if focused && place_cursor {
        let cursor_display_pos = draft.text_before_cursor().width() as u16;
        let cursor_x = area
            .x
            .saturating_add(2)
            .saturating_add(cursor_display_pos)
            .saturating_sub(horizontal_scroll);
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

/// Visible slice of a field and how many columns were scrolled off the left
/// so the cursor stays in view.
fn scrolled(draft: &DraftInput, content_width: usize) -> (String, u16) {
    let text = draft.text();
    let cursor_display_pos = draft.text_before_cursor().width();
    if content_width == 0 || cursor_display_pos < content_width {
        return (text.to_string(), 0);
    }

    let scroll_target = cursor_display_pos - content_width + 1;
    let mut byte_offset = text.len();
    let mut skipped_width = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        if skipped_width >= scroll_target {
            byte_offset = idx;
            break;
        }
        skipped_width += grapheme.width();
    }
    (
        text[byte_offset..].to_string(),
        u16::try_from(skipped_width).unwrap_or(u16::MAX),
    )
}

fn draw_controls(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let focused = app.form().focus() == FormField::AutoSearch;
    let checkbox = if app.form().auto_search() {
        glyphs.checkbox_on
    } else {
        glyphs.checkbox_off
    };
    let toggle_style = if focused {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.text_secondary)
    };
    let marker = if focused { glyphs.selected } else { " " };

    let busy = app.is_busy();
    let trigger = if busy {
        " Disentangling... "
    } else {
        " Disentangle (Enter) "
    };

    let line = Line::from(vec![
        Span::styled(format!("{marker} "), toggle_style),
        Span::styled(
            format!("{checkbox} {}", FormField::AutoSearch.label()),
            toggle_style,
        ),
        Span::raw("    "),
        Span::styled(trigger, styles::trigger(palette, !busy)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_output(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let tree = render_output(&app.output());
    let widget = Paragraph::new(display_text(&tree, palette, glyphs))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(styles::border(palette, false))
                .title_top(Line::from(Span::styled(
                    " Result ",
                    Style::default().fg(palette.text_secondary),
                )))
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(widget, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let options = app.ui_options();
    let busy = app.is_busy();
    let (indicator, indicator_style, text) = match app.gate_status() {
        GateStatus::Unstarted => (
            glyphs.bullet,
            Style::default().fg(palette.text_muted),
            "Engine idle".to_string(),
        ),
        GateStatus::Starting(stage) => (
            spinner_frame(app.tick_count(), options),
            Style::default().fg(palette.accent),
            format!("Starting engine: {stage}"),
        ),
        GateStatus::Ready if busy => (
            spinner_frame(app.tick_count(), options),
            Style::default().fg(palette.accent),
            "Discovering".to_string(),
        ),
        GateStatus::Ready => (
            glyphs.status_ready,
            Style::default().fg(palette.success),
            "Engine ready".to_string(),
        ),
        GateStatus::Failed(stage) => (
            glyphs.status_error,
            Style::default().fg(palette.error),
            format!("Engine failed at {stage}"),
        ),
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(indicator, indicator_style),
        Span::raw(" "),
        Span::styled(text, Style::default().fg(palette.text_secondary)),
    ];
    if let Some(notice) = app.notice() {
        spans.push(Span::styled("  |  ", Style::default().fg(palette.text_muted)));
        spans.push(Span::styled(
            notice.to_string(),
            Style::default().fg(palette.warning),
        ));
    }

    let hints = if app.catalog().is_open() {
        vec![("Esc", "close"), ("Ctrl+C", "quit")]
    } else {
        vec![
            ("Enter", "discover"),
            ("Tab", "next field"),
            ("Ctrl+L", "quantities"),
            ("Ctrl+C", "quit"),
        ]
    };
    let mut hint_spans = Vec::new();
    for (key, action) in hints {
        hint_spans.push(Span::styled(key, styles::key_highlight(palette)));
        hint_spans.push(Span::styled(format!(" {action}  "), styles::key_hint(palette)));
    }

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(line_width(&hint_spans))])
        .split(area);
    frame.render_widget(Paragraph::new(Line::from(spans)), halves[0]);
    frame.render_widget(
        Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Right),
        halves[1],
    );
}

fn line_width(spans: &[Span<'_>]) -> u16 {
    let width: usize = spans.iter().map(|span| span.content.width()).sum();
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn draw_catalog(frame: &mut Frame, app: &App, palette: &Palette, glyphs: &Glyphs) {
    let area = frame.area();
    let view = app.catalog().view();

    let catalog_width = CATALOG_WIDTH.min(area.width.saturating_sub(4));
    let catalog_height = CATALOG_MAX_HEIGHT.min(area.height.saturating_sub(4));
    let catalog_area = Rect {
        x: area.x + (area.width.saturating_sub(catalog_width) / 2),
        y: area.y + (area.height.saturating_sub(catalog_height) / 2),
        width: catalog_width,
        height: catalog_height,
    };

    // Clear background
    frame.render_widget(Clear, catalog_area);

    let mut lines: Vec<Line> = vec![Line::from(vec![
        Span::styled("Filter: ", Style::default().fg(palette.text_muted)),
        Span::styled(
            view.filter.clone(),
            Style::default().fg(palette.text_primary),
        ),
    ])];

    if view.loading {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Loading...",
            Style::default()
                .fg(palette.text_muted)
                .add_modifier(Modifier::ITALIC),
        )));
    } else if view.total == 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "No quantities available.",
            Style::default().fg(palette.text_muted),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("{} of {}", view.names.len(), view.total),
            Style::default().fg(palette.text_muted),
        )));
        lines.push(Line::from(""));
        lines.extend(display_text(&view.list, palette, glyphs).lines);
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(palette.primary))
            .style(Style::default().bg(palette.bg_popup))
            .title_top(Line::from(Span::styled(
                " Available Quantities ",
                styles::title(palette),
            )))
            .title_bottom(
                Line::from(Span::styled(" Esc to close ", styles::key_hint(palette)))
                    .alignment(Alignment::Right),
            )
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(widget, catalog_area);

    let filter_x = catalog_area
        .x
        .saturating_add(2 + "Filter: ".len() as u16)
        .saturating_add(view.filter.width() as u16);
    frame.set_cursor_position((filter_x, catalog_area.y.saturating_add(1)));
}
