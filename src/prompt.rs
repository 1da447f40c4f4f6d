//! Interactive yes/no/all confirmation on the terminal.

use std::io::{self, BufRead, Write};

use treemerge_core::{Confirm, ConfirmRequest};

/// Asks on stderr and reads the answer from stdin.
///
/// Accepts `y`/`yes`, `n`/`no` and `a`/`all`. After `all` every later
/// request is accepted without asking. End of input counts as no.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    accept_all: bool,
}

/// One parsed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    All,
}

impl Answer {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            "a" | "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    fn ask(&mut self, request: &ConfirmRequest, input: &mut impl BufRead, output: &mut impl Write) -> bool {
        if self.accept_all {
            return true;
        }

        loop {
            if write!(output, "{request}? [y/n/all] ").and_then(|_| output.flush()).is_err() {
                return false;
            }

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }

            match Answer::parse(&line) {
                Some(Answer::Yes) => return true,
                Some(Answer::No) => return false,
                Some(Answer::All) => {
                    self.accept_all = true;
                    return true;
                }
                None => {
                    let _ = writeln!(output, "Please answer y, n or all.");
                }
            }
        }
    }
}

impl Confirm for TerminalPrompt {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        let stdin = io::stdin();
        self.ask(request, &mut stdin.lock(), &mut io::stderr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use treemerge_core::ConfirmAction;

    fn request() -> ConfirmRequest {
        ConfirmRequest::new(ConfirmAction::DeleteDuplicate, "/y/a.txt", "same content as /x/a.txt")
    }

    #[test]
    fn test_answers() {
        assert_eq!(Answer::parse("Y\n"), Some(Answer::Yes));
        assert_eq!(Answer::parse(" no "), Some(Answer::No));
        assert_eq!(Answer::parse("ALL"), Some(Answer::All));
        assert_eq!(Answer::parse("maybe"), None);
    }

    #[test]
    fn test_reprompts_until_valid() {
        let mut prompt = TerminalPrompt::new();
        let mut input = Cursor::new("huh\nn\n");
        let mut output = Vec::new();

        assert!(!prompt.ask(&request(), &mut input, &mut output));
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("[y/n/all]").count(), 2);
    }

    #[test]
    fn test_all_sticks() {
        let mut prompt = TerminalPrompt::new();
        let mut output = Vec::new();

        assert!(prompt.ask(&request(), &mut Cursor::new("all\n"), &mut output));
        // No input left; still accepted.
        assert!(prompt.ask(&request(), &mut Cursor::new(""), &mut output));
    }

    #[test]
    fn test_eof_is_no() {
        let mut prompt = TerminalPrompt::new();
        assert!(!prompt.ask(&request(), &mut Cursor::new(""), &mut Vec::new()));
    }
}
