use crate::app::{App, AppState};
use crate::constants::DOUBLE_CLICK;
use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use std::error::Error;
use std::time::Instant;

pub(crate) fn handle_picker_key(app: &mut App, key: KeyCode) -> Result<(), Box<dyn Error>> {
    match key {
        KeyCode::Esc | KeyCode::Char('q') => return Err("quit".into()),
        KeyCode::Enter => {
            if let Some(idx) = app.picker_state.selected() {
                if let Some(path) = app.picker_entries.get(idx).cloned() {
                    // malformed XML is fatal here, same as on the command line
                    app.open_file(&path)?;
                }
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let i = (app.picker_state.selected().unwrap_or(0) + 1)
                .min(app.picker_entries.len().saturating_sub(1));
            app.picker_state.select(Some(i));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let i = app.picker_state.selected().unwrap_or(0).saturating_sub(1);
            app.picker_state.select(Some(i));
        }
        KeyCode::F(1) | KeyCode::Char('?') => {
            app.previous_state = Some(AppState::Picker);
            app.state = AppState::Help;
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn handle_table_key(app: &mut App, key: KeyCode) -> Result<(), Box<dyn Error>> {
    match key {
        KeyCode::Esc | KeyCode::Char('q') => return Err("quit".into()),
        KeyCode::Enter => app.begin_edit(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Home => {
            if !app.rows.is_empty() {
                app.table_state.select(Some(0));
            }
        }
        KeyCode::End => {
            if !app.rows.is_empty() {
                app.table_state.select(Some(app.rows.len() - 1));
            }
        }
        KeyCode::Char('s') => app.save(),
        KeyCode::F(1) | KeyCode::Char('?') => {
            app.previous_state = Some(AppState::Table);
            app.state = AppState::Help;
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn handle_edit_key(app: &mut App, key: KeyCode) -> Result<(), Box<dyn Error>> {
    match key {
        KeyCode::Enter => app.confirm_edit(),
        KeyCode::Esc => app.cancel_edit(),
        other => {
            if let Some(edit) = app.edit.as_mut() {
                match other {
                    KeyCode::Char(c) => edit.insert_char(c),
                    KeyCode::Backspace => edit.backspace(),
                    KeyCode::Delete => edit.delete(),
                    KeyCode::Left => edit.left(),
                    KeyCode::Right => edit.right(),
                    KeyCode::Home => edit.home(),
                    KeyCode::End => edit.end(),
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

/// A single click selects a row (force-closing any open editor, discarding
/// its text); a double-click on a row opens its comment for editing, no
/// matter which column the pointer was over.
pub(crate) fn handle_mouse(app: &mut App, me: MouseEvent) {
    if app.state != AppState::Table {
        return;
    }
    if !matches!(me.kind, MouseEventKind::Down(MouseButton::Left)) {
        return;
    }
    let area = app.table_area;
    if me.row < area.y
        || me.row >= area.y + area.height
        || me.column < area.x
        || me.column >= area.x + area.width
    {
        return;
    }
    let idx = (me.row - area.y) as usize + app.table_state.offset();
    if idx >= app.rows.len() {
        return;
    }

    let now = Instant::now();
    let double = matches!(
        app.last_click,
        Some((row, at)) if row == idx && now.duration_since(at) < DOUBLE_CLICK
    );
    app.last_click = Some((idx, now));

    if app.edit.is_some() {
        app.cancel_edit();
    }
    app.table_state.select(Some(idx));
    if double {
        app.begin_edit();
    }
}
