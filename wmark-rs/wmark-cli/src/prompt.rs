use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read or write the terminal: {0}")]
    Io(#[from] io::Error),
    #[error("input stream closed")]
    Closed,
    #[error("no choices to select from")]
    NoChoices,
    #[error("choice {0} is out of range")]
    InvalidChoice(usize),
}

/// Interactive questions asked by the session flow.
pub trait PromptEngine {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Free-form answer; an empty reply yields `default` (or an empty string).
    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Index into `choices` of the selected entry.
    fn select(&mut self, message: &str, choices: &[&str]) -> Result<usize, PromptError>;

    fn notify(&mut self, message: &str) -> Result<(), PromptError>;
}

/// Line-based prompts over any reader/writer pair, normally stdin and stdout.
#[derive(Debug)]
pub struct TerminalPrompt<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        write!(self.writer, "{question}")?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> PromptEngine for TerminalPrompt<R, W> {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        loop {
            let answer = self.ask(&format!("? {message} {hint} "))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.writer, ">> Please answer y or n")?,
            }
        }
    }

    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let question = match default {
            Some(value) => format!("? {message} ({value}) "),
            None => format!("? {message} "),
        };
        let answer = self.ask(&question)?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    fn select(&mut self, message: &str, choices: &[&str]) -> Result<usize, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::NoChoices);
        }

        writeln!(self.writer, "? {message}")?;
        for (index, choice) in choices.iter().enumerate() {
            writeln!(self.writer, "  {}) {choice}", index + 1)?;
        }

        loop {
            let answer = self.ask("  Answer: ")?;
            if answer.is_empty() {
                return Ok(0);
            }
            match answer.parse::<usize>() {
                Ok(number) if (1..=choices.len()).contains(&number) => return Ok(number - 1),
                _ => writeln!(
                    self.writer,
                    ">> Please enter a number between 1 and {}",
                    choices.len()
                )?,
            }
        }
    }

    fn notify(&mut self, message: &str) -> Result<(), PromptError> {
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;
        Ok(())
    }
}
