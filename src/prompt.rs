//! Interactive questions for `profile create` values left off the command line.

use std::io::{self, BufRead, Write};

const EMPTY_VALUE_HINT: &str = "Value cannot be empty, please enter non-empty value";

/// Source of answers to interactive questions
pub trait Prompter {
    /// Reads one line of plain text, without the line ending.
    fn text(&mut self, label: &str) -> io::Result<String>;

    /// Reads one line without echoing it.
    fn secret(&mut self, label: &str) -> io::Result<String>;
}

/// Asks on the controlling terminal; secrets are read with echo disabled.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn text(&mut self, label: &str) -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{label}: ")?;
        stderr.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no value given for '{label}'"),
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn secret(&mut self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(format!("{label}: "))
    }
}

/// Repeats the question until the answer is not blank. Text answers are
/// trimmed, secrets are kept as typed.
pub fn required(prompter: &mut dyn Prompter, label: &str, masked: bool) -> io::Result<String> {
    let mut question = label.to_string();
    loop {
        let answer = if masked {
            prompter.secret(&question)?
        } else {
            prompter.text(&question)?
        };
        if !answer.trim().is_empty() {
            return Ok(if masked { answer } else { answer.trim().to_string() });
        }
        question = EMPTY_VALUE_HINT.to_string();
    }
}

#[cfg(test)]
pub(crate) use tests::ScriptedPrompter;
