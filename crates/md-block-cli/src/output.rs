//! Terminal output.
//!
//! Rendered documents go to stdout; diagnostics go to stderr, colored.

use console::{Style, Term};

pub(crate) struct Output {
    out: Term,
    err: Term,
    yellow: Style,
    red: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Write a rendered document, newline-terminated.
    pub(crate) fn document(&self, text: &str) -> std::io::Result<()> {
        if text.ends_with('\n') {
            self.out.write_str(text)
        } else {
            self.out.write_line(text)
        }
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.err.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.err.write_line(&self.red.apply_to(msg).to_string());
    }
}
