//! Line-oriented output collaborator.
//!
//! The upgrade pipeline never writes to stdout directly. Status lines such as
//! "prepare to upgrade to v1.2.0" go through a [`Printer`] supplied by the
//! caller, which lets the CLI colour them, silence them with `--quiet`, and
//! lets tests capture them.

use colored::Colorize;
use std::fmt;

/// Sink for user-facing status lines.
pub trait Printer: Send + Sync {
    /// Print without a trailing newline.
    fn print(&self, msg: &str);

    /// Print a complete line.
    fn println(&self, msg: &str);

    /// Print a formatted line; the `printf` form of [`Printer::println`].
    fn printf(&self, args: fmt::Arguments<'_>) {
        self.println(&args.to_string());
    }
}

/// [`Printer`] writing to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrinter {
    quiet: bool,
}

impl ConsolePrinter {
    /// Create a printer; when `quiet` nothing is written.
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self {
            quiet,
        }
    }
}

impl Printer for ConsolePrinter {
    fn print(&self, msg: &str) {
        if !self.quiet {
            print!("{msg}");
        }
    }

    fn println(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.cyan());
        }
    }
}
