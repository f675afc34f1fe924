//! Terminal state guard that restores the terminal on drop.

use anyhow::Result;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// RAII guard for raw mode and the alternate screen.
///
/// Cleanup runs on early `?` returns, on panics (via the panic hook) and on
/// normal scope exit.
pub struct TerminalGuard {
    active: AtomicBool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, returning the terminal.
    pub fn enter() -> Result<(Self, Tui)> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        let guard = Self {
            active: AtomicBool::new(true),
        };
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok((guard, terminal))
    }

    /// Restore the terminal; safe to call more than once.
    pub fn cleanup() {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        let _ = io::stdout().flush();
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            Self::cleanup();
        }
    }
}

/// Restore the terminal before the panic message is printed.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        TerminalGuard::cleanup();
        original_hook(panic_info);
    }));
}
