// Commit message synthesis from `git status --porcelain`.
//
// Counts are taken from git itself, not from the watcher's pending set, so
// files changed outside observed events are still described.

const PREFIX: &str = "Auto-commit: ";
/// Message used when status is empty or has no countable lines.
pub const FALLBACK_MESSAGE: &str = "Auto-commit: updated files";

/// Per-category file counts parsed from porcelain status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl ChangeSummary {
    /// Count porcelain lines by status code: `A `, `M `/` M`, `D `, `R `.
    /// Other codes (untracked, copies, conflicts) are not counted.
    pub fn from_porcelain(status: &str) -> Self {
        let mut summary = Self::default();
        for line in status.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if line.starts_with("A ") {
                summary.created += 1;
            } else if line.starts_with("M ") {
                summary.modified += 1;
            } else if line.starts_with("D ") {
                summary.deleted += 1;
            } else if line.starts_with("R ") {
                summary.renamed += 1;
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.created + self.modified + self.deleted + self.renamed
    }

    /// `Auto-commit: created 1 file, modified 2 files, ...` over the non-zero
    /// categories in fixed order, or the fallback when nothing was counted.
    pub fn message(&self) -> String {
        let parts: Vec<String> = [
            ("created", self.created),
            ("modified", self.modified),
            ("deleted", self.deleted),
            ("renamed", self.renamed),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(verb, count)| format!("{verb} {count} {}", files(count)))
        .collect();

        if parts.is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            format!("{PREFIX}{}", parts.join(", "))
        }
    }
}

/// Message for the root commit that records a submodule's new pointer.
pub fn submodule_update_message(submodule_name: &str) -> String {
    format!("Update {submodule_name} submodule")
}

/// `N new commit(s)` line used in remote-change reports.
pub fn new_commits_summary(count: u64) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} new commit{plural}")
}

fn files(count: usize) -> &'static str {
    if count == 1 {
        "file"
    } else {
        "files"
    }
}
