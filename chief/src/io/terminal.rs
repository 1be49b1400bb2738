//! Interactive terminal prompts.
//!
//! Prompts are written to stderr so stdout stays usable for command output
//! (`cd $(chief cd)`). The [`Prompter`] trait lets tests script the answers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use tracing::warn;

/// Disables terminal focus reporting, which an agent session may leave enabled
/// and which otherwise injects `ESC [ I` / `ESC [ O` into typed answers.
const FOCUS_REPORTING_DISABLE: &str = "\u{1b}[?1004l";

/// Failures are logged, not returned.
fn disable_focus_reporting<W: Write>(out: &mut W) {
    if let Err(e) = out.write_all(FOCUS_REPORTING_DISABLE.as_bytes()) {
        warn!(err = %e, "failed to disable focus reporting");
    }
}

/// Source of interactive answers.
pub trait Prompter {
    /// Free-text entry, finished by an empty line.
    fn multiline(&self, question: &str) -> Result<String>;

    /// Pick one of `choices`; `None` when the user cancels.
    fn select(&self, message: &str, choices: &[String]) -> Result<Option<usize>>;

    /// Pick any number of `choices` (possibly none).
    fn multi_select(&self, message: &str, choices: &[String]) -> Result<Vec<usize>>;

    /// Yes/no question defaulting to no.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// [`Prompter`] reading from stdin and writing to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn begin(&self) {
        let mut err = io::stderr();
        if err.is_terminal() {
            disable_focus_reporting(&mut err);
        }
    }

    /// Read one line; `None` on end of input.
    fn read_line(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line).context("read stdin")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn ask(&self, prompt: &str) -> Result<Option<String>> {
        eprint!("{prompt}");
        io::stderr().flush().context("flush stderr")?;
        self.read_line()
    }
}

impl Prompter for TerminalPrompter {
    fn multiline(&self, question: &str) -> Result<String> {
        self.begin();
        eprintln!("{question}");
        eprintln!("(Enter an empty line to finish)\n");
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    fn select(&self, message: &str, choices: &[String]) -> Result<Option<usize>> {
        self.begin();
        eprintln!("\n{message}");
        print_choices(choices);
        loop {
            let Some(answer) = self.ask(&format!("Select [1-{}] (Enter to cancel): ", choices.len()))?
            else {
                return Ok(None);
            };
            match parse_selection(&answer, choices.len()) {
                Ok(choice) => return Ok(choice),
                Err(err) => eprintln!("{err}"),
            }
        }
    }

    fn multi_select(&self, message: &str, choices: &[String]) -> Result<Vec<usize>> {
        self.begin();
        eprintln!("\n{message}");
        print_choices(choices);
        loop {
            let Some(answer) =
                self.ask("Numbers separated by spaces or commas (Enter for none): ")?
            else {
                return Ok(Vec::new());
            };
            match parse_multi_selection(&answer, choices.len()) {
                Ok(picked) => return Ok(picked),
                Err(err) => eprintln!("{err}"),
            }
        }
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        self.begin();
        let answer = self.ask(&format!("{question} (y/N) "))?.unwrap_or_default();
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

fn print_choices(choices: &[String]) {
    for (idx, choice) in choices.iter().enumerate() {
        eprintln!("  {:>2}) {}", idx + 1, choice);
    }
}

/// Parse a 1-based single choice. Blank input cancels.
pub fn parse_selection(input: &str, len: usize) -> Result<Option<usize>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_index(trimmed, len)?))
}

/// Parse 1-based choices separated by whitespace or commas, deduplicated in
/// input order. Blank input selects nothing.
pub fn parse_multi_selection(input: &str, len: usize) -> Result<Vec<usize>> {
    let mut picked = Vec::new();
    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let idx = parse_index(token, len)?;
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }
    Ok(picked)
}

fn parse_index(token: &str, len: usize) -> Result<usize> {
    match token.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
        _ => bail!("Please enter a number between 1 and {len}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn focus_reporting_sequence_is_written() {
        let mut out = Vec::new();
        disable_focus_reporting(&mut out);
        assert_eq!(out, FOCUS_REPORTING_DISABLE.as_bytes());
    }

    #[test]
    fn focus_reporting_write_failure_is_not_fatal() {
        disable_focus_reporting(&mut BrokenPipe);
    }

    #[test]
    fn selection_is_one_based() {
        assert_eq!(parse_selection("2", 3).expect("parse"), Some(1));
        assert_eq!(parse_selection(" 1 \n", 3).expect("parse"), Some(0));
    }

    #[test]
    fn blank_selection_cancels() {
        assert_eq!(parse_selection("", 3).expect("parse"), None);
        assert_eq!(parse_selection("   ", 3).expect("parse"), None);
    }

    #[test]
    fn out_of_range_selection_is_rejected() {
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("two", 3).is_err());
    }

    #[test]
    fn multi_selection_accepts_mixed_separators_and_dedups() {
        assert_eq!(
            parse_multi_selection("3, 1 3,2", 3).expect("parse"),
            vec![2, 0, 1]
        );
        assert!(parse_multi_selection("", 3).expect("parse").is_empty());
        assert!(parse_multi_selection("1 9", 3).is_err());
    }
}
