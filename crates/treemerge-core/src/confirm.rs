//! Confirmation oracle consulted before destructive actions.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Destructive action awaiting a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum ConfirmAction {
    /// Replace a target file with a newer source file.
    Overwrite,
    /// Delete a source file whose content already exists in the target.
    #[strum(to_string = "Delete duplicate")]
    DeleteDuplicate,
    /// Delete a source file that lost a name conflict.
    #[strum(to_string = "Discard older")]
    DiscardOlder,
    /// Delete an empty or temporary file.
    #[strum(to_string = "Delete")]
    DeleteJunk,
    /// Rename a file with tricky characters.
    Rename,
    /// Change permission bits.
    #[strum(to_string = "Change permissions of")]
    ChangePermissions,
}

/// A single question put to the [`Confirm`] oracle.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    /// What is about to happen.
    pub action: ConfirmAction,
    /// The file that will be affected.
    pub path: PathBuf,
    /// Extra context shown to the user.
    pub detail: String,
}

impl ConfirmRequest {
    /// Create a new request.
    pub fn new(action: ConfirmAction, path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self {
            action,
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Render a modification time for prompt details.
    pub fn format_time(time: SystemTime) -> String {
        DateTime::<Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

impl fmt::Display for ConfirmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.path.display())?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

/// Synchronous yes/no oracle.
///
/// Implementations may keep state, e.g. an "all" answer that accepts every
/// later request.
pub trait Confirm {
    /// Return `true` to allow the action.
    fn confirm(&mut self, request: &ConfirmRequest) -> bool;
}

/// Accepts everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Confirm for DenyAll {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        false
    }
}

impl<F> Confirm for F
where
    F: FnMut(&ConfirmRequest) -> bool,
{
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_oracles() {
        let request = ConfirmRequest::new(ConfirmAction::DeleteJunk, "/x/a.tmp", "");
        assert!(AutoConfirm.confirm(&request));
        assert!(!DenyAll.confirm(&request));
    }

    #[test]
    fn test_closure_oracle() {
        let mut asked = Vec::new();
        let mut oracle = |request: &ConfirmRequest| {
            asked.push(request.action);
            request.action != ConfirmAction::Overwrite
        };

        assert!(!oracle.confirm(&ConfirmRequest::new(ConfirmAction::Overwrite, "/x/a", "")));
        assert!(oracle.confirm(&ConfirmRequest::new(ConfirmAction::Rename, "/x/b", "")));
        assert_eq!(asked, vec![ConfirmAction::Overwrite, ConfirmAction::Rename]);
    }

    #[test]
    fn test_request_display() {
        let request = ConfirmRequest::new(ConfirmAction::DeleteDuplicate, "/y/b.txt", "same as /x/a.txt");
        assert_eq!(request.to_string(), "Delete duplicate /y/b.txt (same as /x/a.txt)");
    }
}
