// AI edit session
//
// One slot per open file: at most one edit is streaming or awaiting review.
// Every session gets a fresh epoch; a ticket only writes while its epoch is
// still current, so callbacks that arrive after accept/reject/cancel are
// dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::{AIError, AIResult};
use crate::services::diff::{DiffHunk, DiffReview};
use crate::services::storage::FileManager;

#[derive(Debug)]
struct Session {
    epoch: u64,
    file_key: String,
    /// Original side grows with accepted hunks, modified side sheds rejected ones
    review: DiffReview,
    has_proposal: bool,
    streaming: bool,
}

#[derive(Debug, Default)]
struct EditState {
    epoch: u64,
    session: Option<Session>,
}

/// Read-only view of the pending edit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSnapshot {
    pub file_key: String,
    pub original_edit_content: String,
    pub pending_edit_content: Option<String>,
    pub hunks: Vec<DiffHunk>,
    pub streaming: bool,
}

/// Owner of the single pending-edit slot
#[derive(Debug, Clone, Default)]
pub struct EditController {
    state: Arc<Mutex<EditState>>,
}

/// Write handle for the session that issued it
#[derive(Debug, Clone)]
pub struct EditTicket {
    epoch: u64,
    controller: EditController,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AIResult<MutexGuard<'_, EditState>> {
        self.state
            .lock()
            .map_err(|_| AIError::StreamError("edit state lock poisoned".to_string()))
    }

    /// Open a session for `file_key`; rejected while another one is open
    pub fn begin(&self, file_key: &str, original: &str) -> AIResult<EditTicket> {
        let mut state = self.lock()?;
        if state.session.is_some() {
            return Err(AIError::EditInProgress);
        }
        state.epoch += 1;
        let epoch = state.epoch;
        state.session = Some(Session {
            epoch,
            file_key: file_key.to_string(),
            review: DiffReview::new(original, original),
            has_proposal: false,
            streaming: true,
        });
        log::info!("[edit] Session {} started for {}", epoch, file_key);
        Ok(EditTicket {
            epoch,
            controller: self.clone(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.lock().map(|s| s.session.is_some()).unwrap_or(false)
    }

    pub fn snapshot(&self) -> Option<EditSnapshot> {
        let state = self.lock().ok()?;
        let session = state.session.as_ref()?;
        Some(EditSnapshot {
            file_key: session.file_key.clone(),
            original_edit_content: session.review.original().to_string(),
            pending_edit_content: session
                .has_proposal
                .then(|| session.review.modified().to_string()),
            hunks: session.review.hunks().to_vec(),
            streaming: session.streaming,
        })
    }

    /// Accept hunk `index` into the original baseline
    pub fn accept_hunk(&self, index: usize) -> AIResult<bool> {
        self.with_reviewable(|session| session.review.accept(index, session.streaming))
    }

    /// Reject hunk `index` out of the proposal
    pub fn reject_hunk(&self, index: usize) -> AIResult<bool> {
        self.with_reviewable(|session| session.review.reject(index, session.streaming))
    }

    /// Take the proposal as the new truth and close the session
    ///
    /// Returns `(file_key, content)`.
    pub fn accept_all(&self) -> AIResult<(String, String)> {
        let session = self.take_finished()?;
        log::info!("[edit] Session {} accepted", session.epoch);
        Ok((session.file_key, session.review.modified().to_string()))
    }

    /// Restore the original snapshot and close the session
    ///
    /// Returns `(file_key, content)`.
    pub fn reject_all(&self) -> AIResult<(String, String)> {
        let session = self.take_finished()?;
        log::info!("[edit] Session {} rejected", session.epoch);
        Ok((session.file_key, session.review.original().to_string()))
    }

    /// Accept the whole proposal and write it back to storage
    pub async fn accept_and_save(&self, files: &FileManager) -> AIResult<String> {
        let (key, content) = self.accept_all()?;
        files.save_file_content(&key, &content).await?;
        Ok(content)
    }

    /// Drop whatever is pending (edit mode exited); late callbacks become no-ops
    pub fn cancel(&self) {
        if let Ok(mut state) = self.lock() {
            if let Some(session) = state.session.take() {
                log::info!("[edit] Session {} cancelled", session.epoch);
            }
        }
    }

    fn with_reviewable(&self, f: impl FnOnce(&mut Session) -> bool) -> AIResult<bool> {
        let mut state = self.lock()?;
        match state.session.as_mut() {
            Some(session) if session.has_proposal => Ok(f(session)),
            _ => Err(AIError::NoPendingEdit),
        }
    }

    fn take_finished(&self) -> AIResult<Session> {
        let mut state = self.lock()?;
        match &state.session {
            Some(session) if session.streaming => Err(AIError::EditInProgress),
            Some(session) if session.has_proposal => {
                state.session.take().ok_or(AIError::NoPendingEdit)
            }
            _ => Err(AIError::NoPendingEdit),
        }
    }

    /// Run `f` on the session only if `epoch` is still current
    fn with_live(&self, epoch: u64, f: impl FnOnce(&mut Option<Session>)) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        let live = state.epoch == epoch
            && state
                .session
                .as_ref()
                .map(|s| s.epoch == epoch)
                .unwrap_or(false);
        if live {
            f(&mut state.session);
        }
        live
    }
}

impl EditTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Store a streamed preview; false once the session has moved on
    pub fn update(&self, preview: &str) -> bool {
        self.controller.with_live(self.epoch, |slot| {
            if let Some(session) = slot.as_mut() {
                session.review.set_modified(preview);
                session.has_proposal = true;
            }
        })
    }

    /// Install the authoritative content and open the session for review
    pub fn finish(&self, content: &str) -> bool {
        self.controller.with_live(self.epoch, |slot| {
            if let Some(session) = slot.as_mut() {
                session.review.set_modified(content);
                session.has_proposal = true;
                session.streaming = false;
            }
        })
    }

    /// Abandon the session after a failure
    pub fn fail(&self) -> bool {
        self.controller.with_live(self.epoch, |slot| {
            slot.take();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::diff::HunkKind;
    use crate::services::storage::MemoryStorage;

    #[test]
    fn test_second_begin_is_rejected() {
        let controller = EditController::new();
        let _ticket = controller.begin("a.txt", "a").unwrap();
        assert!(matches!(
            controller.begin("a.txt", "a"),
            Err(AIError::EditInProgress)
        ));
    }

    #[test]
    fn test_stream_then_accept_all() {
        let controller = EditController::new();
        let ticket = controller.begin("a.txt", "a\nb\nc").unwrap();

        assert!(ticket.update("a\nx"));
        let snapshot = controller.snapshot().unwrap();
        assert!(snapshot.streaming);
        assert_eq!(snapshot.pending_edit_content.as_deref(), Some("a\nx"));

        // Cannot settle while streaming
        assert!(matches!(controller.accept_all(), Err(AIError::EditInProgress)));

        assert!(ticket.finish("a\nx\nc"));
        let (key, content) = controller.accept_all().unwrap();
        assert_eq!(key, "a.txt");
        assert_eq!(content, "a\nx\nc");
        assert!(!controller.is_active());
    }

    #[test]
    fn test_reject_all_restores_original() {
        let controller = EditController::new();
        let ticket = controller.begin("a.txt", "keep").unwrap();
        ticket.finish("changed");
        let (_, content) = controller.reject_all().unwrap();
        assert_eq!(content, "keep");
    }

    #[test]
    fn test_late_callbacks_after_cancel_are_noops() {
        let controller = EditController::new();
        let stale = controller.begin("a.txt", "a").unwrap();
        controller.cancel();

        let fresh = controller.begin("b.txt", "b").unwrap();
        assert!(!stale.update("stale preview"));
        assert!(!stale.finish("stale"));
        assert!(!stale.fail());

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.file_key, "b.txt");
        assert_eq!(snapshot.pending_edit_content, None);
        assert!(fresh.update("b2"));
    }

    #[test]
    fn test_per_hunk_review() {
        let controller = EditController::new();
        let ticket = controller.begin("a.txt", "a\nb\nc").unwrap();
        ticket.finish("a\nx\nc");

        let hunks = controller.snapshot().unwrap().hunks;
        let added = hunks
            .iter()
            .position(|h| h.kind == HunkKind::Added)
            .unwrap();
        assert!(controller.reject_hunk(added).unwrap());

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.pending_edit_content.as_deref(), Some("a\nb\nc"));
        assert!(snapshot.hunks.iter().all(|h| !h.is_change()));
    }

    #[test]
    fn test_review_without_proposal() {
        let controller = EditController::new();
        assert!(matches!(
            controller.accept_hunk(0),
            Err(AIError::NoPendingEdit)
        ));
        let _ticket = controller.begin("a.txt", "a").unwrap();
        assert!(matches!(
            controller.reject_hunk(0),
            Err(AIError::NoPendingEdit)
        ));
        assert!(matches!(
            controller.reject_all(),
            Err(AIError::EditInProgress)
        ));
    }

    #[tokio::test]
    async fn test_accept_and_save_writes_file() {
        let storage = Arc::new(MemoryStorage::new());
        let files = FileManager::new(storage.clone());
        files.save_file_content("notes.txt", "old").await.unwrap();

        let controller = EditController::new();
        let ticket = controller.begin("notes.txt", "old").unwrap();
        ticket.finish("new");
        controller.accept_and_save(&files).await.unwrap();

        assert_eq!(files.get_file_content("notes.txt").await.unwrap(), "new");
        assert!(!controller.is_active());
    }
}
