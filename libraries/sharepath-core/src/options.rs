//! Client-wide behaviour switches.

use serde::{Deserialize, Serialize};

/// What to do when a move, rename or upload lands on a name that is taken.
///
/// One policy applies to every mutating operation of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail with `LibraryError::Conflict`
    #[default]
    Reject,
    /// Delete the existing item, then commit
    Replace,
    /// Commit under the first free `stem (n).ext`
    AutoSuffix,
}

/// How `delete_file` treats a file that is already gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Report `LibraryError::NotFound`
    #[default]
    Strict,
    /// Report `DeleteOutcome::AlreadyAbsent`
    Idempotent,
}

/// Options fixed at client construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    #[serde(default)]
    pub delete_mode: DeleteMode,
}

impl ClientOptions {
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }
}

/// `report.xlsx` with n = 2 becomes `report (2).xlsx`.
pub(crate) fn suffixed_name(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({}){}", &name[..dot], n, &name[dot..]),
        _ => format!("{} ({})", name, n),
    }
}
