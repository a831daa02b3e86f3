//! Terminal support for interruptible execution.
//!
//! The `continue` loop must honor a keyboard interrupt between any two
//! instructions. On a cooked terminal Ctrl+C would kill the process
//! instead, so while the engine is running free the terminal is held in
//! raw mode and the event queue is polled with a zero timeout. Supervisor
//! call I/O runs inside [`ExecGuard::suspend`], which cooks the terminal
//! for the duration of the call. Piped sessions skip all of this.

use std::io::IsTerminal;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::machine::{StdIo, SvcIo};

/// Holds the terminal in raw mode for the lifetime of one execution run.
pub struct ExecGuard {
    raw: bool,
}

impl ExecGuard {
    pub fn new() -> Self {
        let interactive = std::io::stdin().is_terminal() && std::io::stderr().is_terminal();
        ExecGuard {
            raw: interactive && terminal::enable_raw_mode().is_ok(),
        }
    }

    /// Drain pending key events; true once Ctrl+C was seen.
    pub fn interrupted(&self) -> bool {
        if !self.raw {
            return false;
        }
        let mut hit = false;
        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(event) = event::read() else {
                break;
            };
            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event
            {
                if matches!(kind, KeyEventKind::Release) {
                    continue;
                }
                if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                    hit = true;
                }
            }
        }
        hit
    }

    /// Run `f` on a cooked terminal.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
        let result = f();
        if self.raw {
            let _ = terminal::enable_raw_mode();
        }
        result
    }
}

impl Drop for ExecGuard {
    fn drop(&mut self) {
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

impl Default for ExecGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard supervisor I/O, cooked-terminal-wrapped for use under an
/// [`ExecGuard`].
pub struct GuardedIo<'a> {
    guard: &'a ExecGuard,
    inner: StdIo,
}

impl<'a> GuardedIo<'a> {
    pub fn new(guard: &'a ExecGuard) -> Self {
        GuardedIo {
            guard,
            inner: StdIo,
        }
    }
}

impl SvcIo for GuardedIo<'_> {
    fn input(&mut self) -> Option<String> {
        self.guard.suspend(|| self.inner.input())
    }

    fn output(&mut self, text: &str) {
        self.guard.suspend(|| self.inner.output(text))
    }
}
