//! Control of the real terminal: raw mode and window size.
//!
//! Both are traits so a session can run against something other than the
//! process's own terminal.

use std::io;

/// Puts the controlling terminal into raw mode and restores it.
pub trait RawMode: Send {
    /// Save the current line discipline and switch to raw mode.
    fn enable(&mut self) -> io::Result<()>;
    /// Restore the saved line discipline.
    fn restore(&mut self) -> io::Result<()>;
}

/// Raw mode on the process's terminal via crossterm, which keeps the
/// termios it replaced and puts it back on `restore`.
#[derive(Debug, Default)]
pub struct CrosstermRawMode;

impl RawMode for CrosstermRawMode {
    fn enable(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn restore(&mut self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

/// Leaves the terminal untouched, for sessions not attached to a TTY.
#[derive(Debug, Default)]
pub struct NoRawMode;

impl RawMode for NoRawMode {
    fn enable(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Source of the real terminal's dimensions as `(cols, rows)`.
pub trait WindowSize: Send + Sync {
    fn size(&self) -> Option<(u16, u16)>;
}

#[derive(Debug, Default)]
pub struct CrosstermWindowSize;

impl WindowSize for CrosstermWindowSize {
    fn size(&self) -> Option<(u16, u16)> {
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => Some((cols, rows)),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Could not read terminal size: {}", e);
                None
            }
        }
    }
}

/// A constant size.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindowSize {
    pub cols: u16,
    pub rows: u16,
}

impl WindowSize for FixedWindowSize {
    fn size(&self) -> Option<(u16, u16)> {
        Some((self.cols, self.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_raw_mode_never_fails() {
        let mut raw_mode = NoRawMode;
        assert!(raw_mode.enable().is_ok());
        assert!(raw_mode.restore().is_ok());
        assert!(raw_mode.restore().is_ok());
    }

    #[test]
    fn test_fixed_window_size() {
        let size = FixedWindowSize { cols: 132, rows: 43 };
        assert_eq!(size.size(), Some((132, 43)));
    }
}
