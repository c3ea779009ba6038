//! Terminal confirmations and notices

use std::io::{self, BufRead, Write};

use framenote_lib::core::prompt::{Notice, UserPrompt};

/// Asks on stderr and reads the answer from stdin
pub struct CliPrompt {
    assume_yes: bool,
}

impl CliPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn ask(&self, message: &str, input: &mut dyn BufRead) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("{} [y/N] ", message);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if input.read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

impl UserPrompt for CliPrompt {
    fn confirm(&self, message: &str) -> bool {
        self.ask(message, &mut io::stdin().lock())
    }

    fn notify(&self, notice: &Notice) {
        eprintln!("{}", notice);
    }
}
