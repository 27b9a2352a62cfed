use std::time::Duration;

pub const NAME_WIDTH: u16 = 18;
pub const COORD_WIDTH: u16 = 24;

// Two clicks on the same row within this window count as a double-click.
pub const DOUBLE_CLICK: Duration = Duration::from_millis(400);

pub const HELP: &str = "Minimal GPX file editor-corrector.

Only the comment can be edited (for now?). Double-click a row,
or select it and press Enter, to open the comment for editing.

While editing a field:
    Ctrl-A  - select all;
    Escape, double-click on another row
            - leave the field without keeping changes;
    Enter   - keep the change. Keeping can fail when the line
              does not fit the comment size OZI Explorer
              allows (100 characters).

Everywhere else:
    Up/Down, j/k  - select a row
    s, Ctrl-S     - save the file (writes only when something changed)
    F1, ?         - this help
    q, Escape     - quit
";
