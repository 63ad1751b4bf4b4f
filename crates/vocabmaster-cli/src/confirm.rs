//! Interactive answers for restore confirmation and spelling corrections.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use vocabmaster_llm_sync::Decider;

/// Reads answers line by line. End of input counts as "no" / "skip".
pub struct TerminalDecider<R, W> {
    input: R,
    output: W,
}

impl TerminalDecider<io::StdinLock<'static>, io::Stderr> {
    /// Prompts go to stderr so stdout stays clean for piping.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalDecider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_confirm(&mut self, prompt: &str) -> io::Result<bool> {
        loop {
            write!(self.output, "{} {} ", prompt.bold(), "[y/N]".dimmed())?;
            let answer = match self.read_answer()? {
                Some(answer) => answer.to_ascii_lowercase(),
                None => return Ok(false),
            };
            match answer.as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn ask_choice(&mut self, prompt: &str, options: &[String]) -> io::Result<Option<usize>> {
        writeln!(self.output, "{}", prompt.bold())?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, option.cyan())?;
        }
        loop {
            write!(
                self.output,
                "Choose 1-{} (Enter to keep the original): ",
                options.len()
            )?;
            let answer = match self.read_answer()? {
                Some(answer) => answer,
                None => return Ok(None),
            };
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(self.output, "Not a valid choice: {answer}")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Decider for TerminalDecider<R, W> {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.ask_confirm(prompt).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read answer; treating as no");
            false
        })
    }

    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        self.ask_choice(prompt, options).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read choice; skipping");
            None
        })
    }
}
