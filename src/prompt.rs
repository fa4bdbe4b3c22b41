//! Interactive input.

use crate::error::{ConfigError, Result};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::Path;

const STDIN: &str = "<stdin>";

/// Synchronous question/answer capability supplied by the caller.
pub trait Prompter {
    /// `None` when no answer is available (closed input, non-interactive).
    fn ask(&mut self, question: &str) -> Result<Option<String>>;

    /// Like `ask`, for values that must not be echoed back in output.
    fn ask_secret(&mut self, question: &str) -> Result<Option<String>>;

    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Reads answers from stdin, one line each. Questions are written to stderr.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line(&self, question: &str) -> Result<Option<String>> {
        read_answer(&mut io::stderr().lock(), &mut io::stdin().lock(), question)
    }
}

/// Write `question` to `out`, then read one line from `input`.
fn read_answer(out: &mut impl Write, input: &mut impl BufRead, question: &str) -> Result<Option<String>> {
    let stdin = Path::new(STDIN);
    write!(out, "{question}")
        .and_then(|()| out.flush())
        .map_err(|e| ConfigError::io("write", stdin, e))?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| ConfigError::io("read", stdin, e))?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.read_line(question)
    }

    fn ask_secret(&mut self, question: &str) -> Result<Option<String>> {
        self.read_line(question)
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{question} [y/N] "))?;
        Ok(answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")))
    }
}

/// Never answers; confirmations are declined.
#[derive(Debug, Default)]
pub struct NoPrompter;

impl Prompter for NoPrompter {
    fn ask(&mut self, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn ask_secret(&mut self, _question: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn confirm(&mut self, _question: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Answers from a fixed script, recording every question asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    confirmations: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, text: &str) -> Self {
        self.answers.push_back(text.to_string());
        self
    }

    pub fn confirm_with(mut self, yes: bool) -> Self {
        self.confirmations.push_back(yes);
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front())
    }

    fn ask_secret(&mut self, question: &str) -> Result<Option<String>> {
        self.ask(question)
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.confirmations.pop_front().unwrap_or(false))
    }
}
