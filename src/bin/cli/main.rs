mod app;
mod constants;
mod handlers;
mod ui;

use std::error::Error;
use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use app::{App, AppState};
use crossterm::event::KeyCode;

fn main() -> Result<(), Box<dyn Error>> {
    let mut app = match std::env::args().nth(1) {
        Some(arg) if Path::new(&arg).is_file() => App::with_file(Path::new(&arg))?,
        Some(arg) => {
            eprintln!("{arg}: not a file, falling back to the picker");
            App::new()
        }
        None => App::new(),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    match result {
        Err(e) if e.to_string() == "quit" => Ok(()),
        other => other,
    }
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::ui(f, app))?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    match key.code {
                        KeyCode::Char('c') => return Err("quit".into()),
                        KeyCode::Char('s') if app.state == AppState::Table => {
                            app.save();
                            continue;
                        }
                        KeyCode::Char('a') => {
                            if let Some(edit) = app.edit.as_mut() {
                                edit.select_all();
                            }
                            continue;
                        }
                        _ => {}
                    }
                }

                // any key puts an error modal away before doing anything else
                if app.error.is_some() {
                    app.error = None;
                    continue;
                }

                if app.edit.is_some() && app.state == AppState::Table {
                    handlers::handle_edit_key(app, key.code)?;
                    continue;
                }

                match app.state {
                    AppState::Picker => handlers::handle_picker_key(app, key.code)?,
                    AppState::Table => handlers::handle_table_key(app, key.code)?,
                    AppState::Help => match key.code {
                        KeyCode::Esc
                        | KeyCode::Enter
                        | KeyCode::F(1)
                        | KeyCode::Char('?')
                        | KeyCode::Char('q') => {
                            app.state = app.previous_state.take().unwrap_or(AppState::Table);
                        }
                        _ => {}
                    },
                }
            }
            Event::Mouse(me) => {
                if app.error.is_some() {
                    continue;
                }
                handlers::handle_mouse(app, me);
            }
            _ => {}
        }
    }
}
