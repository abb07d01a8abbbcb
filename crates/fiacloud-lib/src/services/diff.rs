// Line diff reconciliation for AI edits
//
// `original` is the accepted baseline and `modified` the proposed text.
// Accepting a hunk folds it into `original`; rejecting a hunk folds it out
// of `modified`. Once both sides agree there is nothing left to review.
//
// A removed hunk immediately followed by an added hunk is a replacement;
// actions on either half apply to the pair.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// Kind of a diff hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HunkKind {
    Added,
    Removed,
    Unchanged,
}

/// Run of consecutive lines with the same kind; `value` keeps line endings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    pub kind: HunkKind,
    pub value: String,
}

impl DiffHunk {
    pub fn is_change(&self) -> bool {
        self.kind != HunkKind::Unchanged
    }
}

/// Line-level hunks between two texts
pub fn diff_lines(original: &str, modified: &str) -> Vec<DiffHunk> {
    let diff = TextDiff::from_lines(original, modified);
    let mut hunks: Vec<DiffHunk> = Vec::new();

    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => HunkKind::Unchanged,
            ChangeTag::Delete => HunkKind::Removed,
            ChangeTag::Insert => HunkKind::Added,
        };
        match hunks.last_mut() {
            Some(last) if last.kind == kind => last.value.push_str(change.value()),
            _ => hunks.push(DiffHunk {
                kind,
                value: change.value().to_string(),
            }),
        }
    }

    hunks
}

/// The other half of a replacement pair, if `index` belongs to one
pub fn paired_index(hunks: &[DiffHunk], index: usize) -> Option<usize> {
    let hunk = hunks.get(index)?;
    match hunk.kind {
        HunkKind::Removed => hunks
            .get(index + 1)
            .filter(|next| next.kind == HunkKind::Added)
            .map(|_| index + 1),
        HunkKind::Added if index > 0 => hunks
            .get(index - 1)
            .filter(|prev| prev.kind == HunkKind::Removed)
            .map(|_| index - 1),
        _ => None,
    }
}

/// Trailing pure removal while the proposal is still streaming
///
/// The model simply has not produced those lines yet, so it is shown but
/// cannot be acted on.
pub fn is_pending_removal(hunks: &[DiffHunk], index: usize, streaming: bool) -> bool {
    streaming
        && index + 1 == hunks.len()
        && hunks
            .get(index)
            .map(|h| h.kind == HunkKind::Removed)
            .unwrap_or(false)
}

/// Whether accept/reject may be applied to `index`
pub fn is_actionable(hunks: &[DiffHunk], index: usize, streaming: bool) -> bool {
    hunks.get(index).map(DiffHunk::is_change).unwrap_or(false)
        && !is_pending_removal(hunks, index, streaming)
}

/// Number of hunks that can be reviewed
pub fn change_count(hunks: &[DiffHunk], streaming: bool) -> usize {
    (0..hunks.len())
        .filter(|&i| is_actionable(hunks, i, streaming))
        .count()
}

fn targets(hunks: &[DiffHunk], index: usize) -> (usize, Option<usize>) {
    (index, paired_index(hunks, index))
}

/// New `modified` text with hunk `index` rejected
///
/// The rejected hunk is dropped if added and restored if removed; every other
/// hunk keeps its modified-side state. Returns `None` for unchanged or
/// out-of-range hunks.
pub fn reject_hunk(hunks: &[DiffHunk], index: usize) -> Option<String> {
    if !hunks.get(index)?.is_change() {
        return None;
    }
    let (a, b) = targets(hunks, index);
    let mut out = String::new();
    for (i, hunk) in hunks.iter().enumerate() {
        let selected = i == a || Some(i) == b;
        let keep = match (selected, hunk.kind) {
            (true, HunkKind::Added) => false,
            (true, _) => true,
            (false, HunkKind::Removed) => false,
            (false, _) => true,
        };
        if keep {
            out.push_str(&hunk.value);
        }
    }
    Some(out)
}

/// New `original` text with hunk `index` accepted
///
/// The accepted hunk is included if added and excluded if removed; every
/// other hunk keeps its original-side state.
pub fn accept_hunk(hunks: &[DiffHunk], index: usize) -> Option<String> {
    if !hunks.get(index)?.is_change() {
        return None;
    }
    let (a, b) = targets(hunks, index);
    let mut out = String::new();
    for (i, hunk) in hunks.iter().enumerate() {
        let selected = i == a || Some(i) == b;
        let keep = match (selected, hunk.kind) {
            (true, HunkKind::Removed) => false,
            (true, _) => true,
            (false, HunkKind::Added) => false,
            (false, _) => true,
        };
        if keep {
            out.push_str(&hunk.value);
        }
    }
    Some(out)
}

/// Review state for one proposal: the two baselines and their hunks
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReview {
    original: String,
    modified: String,
    hunks: Vec<DiffHunk>,
}

impl DiffReview {
    pub fn new(original: impl Into<String>, modified: impl Into<String>) -> Self {
        let original = original.into();
        let modified = modified.into();
        let hunks = diff_lines(&original, &modified);
        Self {
            original,
            modified,
            hunks,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn modified(&self) -> &str {
        &self.modified
    }

    pub fn hunks(&self) -> &[DiffHunk] {
        &self.hunks
    }

    /// Replace the proposal (streaming updates)
    pub fn set_modified(&mut self, modified: impl Into<String>) {
        self.modified = modified.into();
        self.refresh();
    }

    /// Accept hunk `index`; returns false if it was not actionable
    pub fn accept(&mut self, index: usize, streaming: bool) -> bool {
        if !is_actionable(&self.hunks, index, streaming) {
            return false;
        }
        match accept_hunk(&self.hunks, index) {
            Some(original) => {
                self.original = original;
                self.refresh();
                true
            }
            None => false,
        }
    }

    /// Reject hunk `index`; returns false if it was not actionable
    pub fn reject(&mut self, index: usize, streaming: bool) -> bool {
        if !is_actionable(&self.hunks, index, streaming) {
            return false;
        }
        match reject_hunk(&self.hunks, index) {
            Some(modified) => {
                self.modified = modified;
                self.refresh();
                true
            }
            None => false,
        }
    }

    /// Both baselines agree
    pub fn is_settled(&self) -> bool {
        self.original == self.modified
    }

    fn refresh(&mut self) {
        self.hunks = diff_lines(&self.original, &self.modified);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(hunks: &[DiffHunk]) -> Vec<(HunkKind, &str)> {
        hunks.iter().map(|h| (h.kind, h.value.as_str())).collect()
    }

    #[test]
    fn test_single_line_replacement_hunks() {
        let hunks = diff_lines("a\nb\nc", "a\nx\nc");
        assert_eq!(
            kinds(&hunks),
            vec![
                (HunkKind::Unchanged, "a\n"),
                (HunkKind::Removed, "b\n"),
                (HunkKind::Added, "x\n"),
                (HunkKind::Unchanged, "c"),
            ]
        );
    }

    #[test]
    fn test_reject_added_half_of_replacement_restores_original_line() {
        let hunks = diff_lines("a\nb\nc", "a\nx\nc");
        assert_eq!(reject_hunk(&hunks, 2).as_deref(), Some("a\nb\nc"));
        assert_eq!(reject_hunk(&hunks, 1).as_deref(), Some("a\nb\nc"));
    }

    #[test]
    fn test_accept_replacement_updates_original() {
        let hunks = diff_lines("a\nb\nc", "a\nx\nc");
        assert_eq!(accept_hunk(&hunks, 2).as_deref(), Some("a\nx\nc"));
    }

    #[test]
    fn test_pure_addition_accept_and_reject() {
        let hunks = diff_lines("a\nc\n", "a\nb\nc\n");
        assert_eq!(
            kinds(&hunks),
            vec![
                (HunkKind::Unchanged, "a\n"),
                (HunkKind::Added, "b\n"),
                (HunkKind::Unchanged, "c\n"),
            ]
        );
        assert_eq!(reject_hunk(&hunks, 1).as_deref(), Some("a\nc\n"));
        assert_eq!(accept_hunk(&hunks, 1).as_deref(), Some("a\nb\nc\n"));
    }

    #[test]
    fn test_pure_removal_accept_and_reject() {
        let hunks = diff_lines("a\nb\nc\n", "a\nc\n");
        assert_eq!(hunks[1].kind, HunkKind::Removed);
        assert_eq!(reject_hunk(&hunks, 1).as_deref(), Some("a\nb\nc\n"));
        assert_eq!(accept_hunk(&hunks, 1).as_deref(), Some("a\nc\n"));
    }

    #[test]
    fn test_actions_on_unchanged_or_missing_hunks() {
        let hunks = diff_lines("a\n", "a\nb\n");
        assert_eq!(reject_hunk(&hunks, 0), None);
        assert_eq!(accept_hunk(&hunks, 9), None);
    }

    #[test]
    fn test_trailing_removal_pending_while_streaming() {
        // Model has only produced the first line so far
        let hunks = diff_lines("a\nb\nc\n", "a\n");
        let last = hunks.len() - 1;
        assert_eq!(hunks[last].kind, HunkKind::Removed);
        assert!(is_pending_removal(&hunks, last, true));
        assert!(!is_actionable(&hunks, last, true));
        assert!(is_actionable(&hunks, last, false));
        assert_eq!(change_count(&hunks, true), 0);
    }

    #[test]
    fn test_review_settles_after_rejecting_everything() {
        let mut review = DiffReview::new("a\nb\nc", "a\nx\nc\nd");
        assert!(!review.is_settled());

        while let Some(i) = (0..review.hunks().len())
            .find(|&i| is_actionable(review.hunks(), i, false))
        {
            assert!(review.reject(i, false));
        }
        assert!(review.is_settled());
        assert_eq!(review.modified(), "a\nb\nc");
    }

    #[test]
    fn test_review_accept_moves_original() {
        let mut review = DiffReview::new("a\nb\nc", "a\nx\nc");
        assert!(review.accept(1, false));
        assert_eq!(review.original(), "a\nx\nc");
        assert!(review.is_settled());
        assert!(!review.accept(0, false));
    }
}
