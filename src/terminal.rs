//! Terminal environment: geometry lookup and full-screen frame output.
//!
//! Playback only talks to the terminal through [`TerminalEnv`], so the
//! scheduler can be driven by an in-memory double in tests.

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::frame::TerminalGeometry;

/// Whether playback currently has the cursor hidden (for the panic hook and
/// the interrupt path).
static CURSOR_HIDDEN: AtomicBool = AtomicBool::new(false);

/// The output device playback draws on.
pub trait TerminalEnv {
    /// Current size in character cells, if it can be determined.
    fn geometry(&self) -> Option<TerminalGeometry>;

    /// Clear the surface and draw `text` from the top-left corner.
    fn present(&mut self, text: &str) -> io::Result<()>;

    /// Prepare the surface before the first frame.
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Restore the surface after the last frame.
    fn end(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Geometry of `env`, falling back to 150x40 when unknown or degenerate.
pub fn geometry_or_fallback<T: TerminalEnv + ?Sized>(env: &T) -> TerminalGeometry {
    env.geometry()
        .filter(|g| !g.is_degenerate())
        .unwrap_or(TerminalGeometry::FALLBACK)
}

/// Parse a colour name such as `white` or `dark_grey`.
pub fn parse_color(name: &str) -> Option<Color> {
    Color::try_from(name.trim().to_lowercase().as_str()).ok()
}

/// The process's stdout terminal.
pub struct CrosstermTerminal<W: Write = io::Stdout> {
    out: W,
    color: Color,
}

impl CrosstermTerminal<io::Stdout> {
    /// Terminal on stdout drawing in `color`.
    pub fn stdout(color: Color) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> CrosstermTerminal<W> {
    pub fn new(out: W, color: Color) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TerminalEnv for CrosstermTerminal<W> {
    fn geometry(&self) -> Option<TerminalGeometry> {
        crossterm::terminal::size()
            .ok()
            .map(|(columns, rows)| TerminalGeometry::new(columns, rows))
    }

    fn present(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            Clear(ClearType::All),
            MoveTo(0, 0),
            SetForegroundColor(self.color),
            Print(text),
            ResetColor,
        )?;
        self.out.flush()
    }

    /// Hide the cursor for the duration of playback.
    fn begin(&mut self) -> io::Result<()> {
        install_panic_hook();
        CURSOR_HIDDEN.store(true, Ordering::SeqCst);
        execute!(self.out, Hide)
    }

    /// Restore the cursor and colours after playback.
    fn end(&mut self) -> io::Result<()> {
        CURSOR_HIDDEN.store(false, Ordering::SeqCst);
        execute!(self.out, ResetColor, Show, Print("\n"))
    }
}

/// Best-effort reset of anything playback changed on stdout.
pub fn restore_terminal() {
    if CURSOR_HIDDEN.swap(false, Ordering::SeqCst) {
        let _ = execute!(io::stdout(), ResetColor, Show);
    }
}

/// Install a panic hook that shows the cursor again before panicking.
fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));
}
