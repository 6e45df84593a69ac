use colored::Colorize;
use std::fmt;

/// Informational outcomes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Nothing newer with a usable installer.
    UpdateNotApplicable,
    /// A newer version exists but only with a different install technology.
    DifferentInstallTechnology,
    /// A batch found no package to update.
    NothingToUpdate,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Diagnostic::UpdateNotApplicable => "No applicable update found.",
            Diagnostic::DifferentInstallTechnology => {
                "A newer version was found, but the install technology is different from the \
                 current version installed. Please uninstall the package and install the newer \
                 version."
            }
            Diagnostic::NothingToUpdate => "No installed package has an applicable update.",
        };
        f.write_str(message)
    }
}

/// Sink for user-facing informational messages.
pub trait Reporter {
    fn info(&self, message: &str);

    fn diagnostic(&self, diagnostic: Diagnostic) {
        self.info(&diagnostic.to_string());
    }
}

/// Writes messages to stdout, or nowhere when quiet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message.yellow());
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::Reporter;
    use std::cell::RefCell;

    /// Keeps every message for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        messages: RefCell<Vec<String>>,
    }

    impl RecordingReporter {
        pub fn messages(&self) -> Vec<String> {
            self.messages.borrow().clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn info(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }
}
