pub mod consulta_screen;
pub mod dashboard;
pub mod form_field;
pub mod intake_screen;
pub mod resource_list;
pub mod terminal_guard;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub use consulta_screen::{ConsultaAction, ConsultaMode, ConsultaScreen};
pub use dashboard::{Dashboard, MenuEntry};
pub use form_field::TextInput;
pub use intake_screen::{IntakeAction, IntakeScreen};
pub use resource_list::{list_pane_for, ListAction, ListPane};
pub use terminal_guard::{install_panic_hook, TerminalGuard, Tui};

/// Helper to create a centered rect
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
