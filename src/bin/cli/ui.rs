use crate::app::{App, AppState};
use crate::constants::{COORD_WIDTH, HELP, NAME_WIDTH};
use gpxcmt::MAX_COMMENT_CHARS;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
};
use unicode_width::UnicodeWidthStr;

pub(crate) fn ui(f: &mut Frame, app: &mut App) {
    let full = f.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(full);

    match app.state {
        AppState::Picker => render_picker(f, app, layout[0]),
        _ => render_table(f, app, layout[0]),
    }
    render_status_bar(f, app, layout[1]);

    render_editor(f, app);

    if app.state == AppState::Help {
        render_help(f, full);
    }
    if let Some(msg) = app.error.clone() {
        render_error(f, &msg, full);
    }
}

fn render_table(f: &mut Frame, app: &mut App, area: Rect) {
    let header = Row::new(vec![
        "Name (latin!)".to_string(),
        "Coordinates".to_string(),
        format!("Comment, up to {} characters", MAX_COMMENT_CHARS),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|r| Row::new(vec![r.name.clone(), r.coords.clone(), r.cmt.clone()]))
        .collect();

    let widths = [
        Constraint::Length(NAME_WIDTH),
        Constraint::Length(COORD_WIDTH),
        Constraint::Min(20),
    ];
    let title = if app.dirty {
        format!(" {} * ", app.file_label())
    } else {
        format!(" {} ", app.file_label())
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    // rows start below the border and the header line; remembered so mouse
    // clicks and the editor overlay can be mapped back to a row
    app.table_area = Rect {
        x: area.x + 1,
        y: area.y + 2,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(3),
    };
    f.render_stateful_widget(table, area, &mut app.table_state);
}

/// The inline editor sits on top of the comment cell of the row being
/// edited, the way an entry popup would in a desktop table widget.
fn render_editor(f: &mut Frame, app: &App) {
    let Some(edit) = app.edit.as_ref() else {
        return;
    };
    let area = app.table_area;
    let offset = app.table_state.offset();
    if edit.row < offset {
        return;
    }
    let y = area.y + (edit.row - offset) as u16;
    if y >= area.y + area.height {
        return;
    }
    let x = area.x + NAME_WIDTH + COORD_WIDTH + 2;
    let width = (area.x + area.width).saturating_sub(x);
    if width == 0 {
        return;
    }
    let cell = Rect {
        x,
        y,
        width,
        height: 1,
    };

    let style = if edit.selected_all {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default().fg(Color::Black).bg(Color::White)
    };

    // keep the cursor in view when the text outgrows the cell
    let prefix: String = edit.input.chars().take(edit.cursor).collect();
    let cursor_w = UnicodeWidthStr::width(prefix.as_str()) as u16;
    let shift = cursor_w.saturating_sub(width.saturating_sub(1));

    f.render_widget(Clear, cell);
    f.render_widget(
        Paragraph::new(edit.input.as_str())
            .style(style)
            .scroll((0, shift)),
        cell,
    );
    f.set_cursor_position((x + cursor_w - shift, y));
}

fn render_picker(f: &mut Frame, app: &mut App, area: Rect) {
    let rect = centered_rect(60, 60, area);
    f.render_widget(Clear, rect);
    let block = Block::default().borders(Borders::ALL).title(" Open GPX file ");
    if app.picker_entries.is_empty() {
        let msg = Paragraph::new(
            "No .gpx files in the current directory.\nPass a path on the command line instead.",
        )
        .block(block)
        .wrap(Wrap { trim: false });
        f.render_widget(msg, rect);
        return;
    }
    let items: Vec<ListItem> = app
        .picker_entries
        .iter()
        .map(|p| ListItem::new(p.display().to_string()))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, rect, &mut app.picker_state);
}

fn render_help(f: &mut Frame, full: Rect) {
    let rect = centered_rect(70, 70, full);
    f.render_widget(Clear, rect);
    let block = Block::default().borders(Borders::ALL).title(" Help ");
    f.render_widget(
        Paragraph::new(HELP).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

fn render_error(f: &mut Frame, msg: &str, full: Rect) {
    let rect = centered_rect(60, 30, full);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Error ")
        .border_style(Style::default().fg(Color::Red));
    let text = format!("{}\n\npress any key", msg);
    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        app.file_label(),
        Style::default().fg(Color::Cyan),
    )];
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!("  {notice}"),
            Style::default().fg(Color::Green),
        ));
    }
    let hints = match app.state {
        AppState::Picker => "  Enter open · q quit",
        _ if app.edit.is_some() => "  Enter keep · Esc discard · Ctrl-A select all",
        _ => "  Enter edit · s save · ? help · q quit",
    };
    spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray)));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    let middle = popup_layout[1];

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(middle)[1]
}
