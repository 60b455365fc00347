//! Confirmation before destructive cleanup.

use std::io::{BufRead, Write};

pub trait Confirm: Send + Sync {
    /// Ask a yes/no question. `Ok(false)` means "do not proceed".
    fn confirm(&self, question: &str) -> std::io::Result<bool>;
}

/// Never asks; every question is answered `yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _question: &str) -> std::io::Result<bool> {
        Ok(true)
    }
}

/// Asks on the terminal, accepting only `yes` or `no`.
pub struct ConsolePrompt;

impl Confirm for ConsolePrompt {
    fn confirm(&self, question: &str) -> std::io::Result<bool> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        ask(question, &mut input, &mut output)
    }
}

/// Re-prompts until the answer is `yes` or `no`. End of input counts as `no`.
pub fn ask<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<bool> {
    loop {
        write!(output, "{question} [yes/no] ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "yes" => return Ok(true),
            "no" => return Ok(false),
            _ => writeln!(output, "Please answer yes or no.")?,
        }
    }
}
