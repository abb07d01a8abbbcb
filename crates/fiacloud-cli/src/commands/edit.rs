// AI edit with per-hunk review

use std::io::Write;

use anyhow::{anyhow, bail, Result};
use fiacloud_lib::services::ai::EditController;
use fiacloud_lib::services::diff::{is_actionable, HunkKind};
use fiacloud_lib::services::storage::manager::is_text_file;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::context::AppContext;
use crate::output::render_hunks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    AcceptAll,
    RejectAll,
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accept,
    Reject,
    Skip,
    AcceptRest,
    RejectRest,
}

fn parse_decision(input: &str) -> Option<Decision> {
    match input.trim() {
        "a" | "y" => Some(Decision::Accept),
        "r" | "n" => Some(Decision::Reject),
        "s" | "" => Some(Decision::Skip),
        "A" => Some(Decision::AcceptRest),
        "R" | "q" => Some(Decision::RejectRest),
        _ => None,
    }
}

/// Index of the `skip`-th reviewable change, counting a replacement pair once
fn nth_change(edit: &EditController, skip: usize) -> Option<usize> {
    let snapshot = edit.snapshot()?;
    let hunks = &snapshot.hunks;
    (0..hunks.len())
        .filter(|&i| is_actionable(hunks, i, snapshot.streaming))
        .filter(|&i| {
            // The added half of a replacement is reviewed with its removal
            !(hunks[i].kind == HunkKind::Added
                && i > 0
                && hunks[i - 1].kind == HunkKind::Removed)
        })
        .nth(skip)
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>) -> Result<Decision> {
    loop {
        print!("[a]ccept  [r]eject  [s]kip  [A]ccept rest  [R]eject rest > ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            return Ok(Decision::RejectRest);
        };
        if let Some(decision) = parse_decision(&line) {
            return Ok(decision);
        }
    }
}

/// Walk the changes one by one; returns the content to write
async fn review(edit: &EditController) -> Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut skipped = 0;

    while let Some(index) = nth_change(edit, skipped) {
        let snapshot = edit
            .snapshot()
            .ok_or_else(|| anyhow!("Edit session ended unexpectedly"))?;
        let mut shown = vec![snapshot.hunks[index].clone()];
        if let Some(next) = snapshot.hunks.get(index + 1) {
            if snapshot.hunks[index].kind == HunkKind::Removed && next.kind == HunkKind::Added {
                shown.push(next.clone());
            }
        }
        println!("\n{}", render_hunks(&shown));

        match prompt(&mut lines).await? {
            Decision::Accept => {
                edit.accept_hunk(index)?;
            }
            Decision::Reject => {
                edit.reject_hunk(index)?;
            }
            Decision::Skip => skipped += 1,
            Decision::AcceptRest => return accept_remaining(edit, skipped),
            Decision::RejectRest => break,
        }
    }

    // Skipped changes are left out; accepted ones are already in the baseline
    let (_, content) = edit.reject_all()?;
    Ok(content)
}

/// Accept every change not skipped so far and close the session
fn accept_remaining(edit: &EditController, skipped: usize) -> Result<String> {
    // Each accepted change folds into the original and leaves the diff
    while let Some(index) = nth_change(edit, skipped) {
        if !edit.accept_hunk(index)? {
            break;
        }
    }
    let (_, content) = edit.reject_all()?;
    Ok(content)
}

pub async fn edit(ctx: &AppContext, key: &str, instruction: &str, mode: ReviewMode) -> Result<()> {
    if !is_text_file(key) {
        bail!("{} is not a text file", key);
    }
    let files = ctx.files()?;
    let original = files
        .get_file_content(key)
        .await
        .map_err(|e| anyhow!(e.to_user_message()))?;

    let chat = ctx.chat();
    if !chat.is_edit_mode() {
        chat.toggle_edit_mode()?;
    }

    let on_update = |preview: &str| {
        log::debug!("[cli] Preview: {} bytes", preview.len());
        eprint!("\rReceiving edit... {} bytes", preview.len());
    };
    let proposal = chat
        .generate_edit(instruction, key, &original, &on_update)
        .await;
    eprintln!();
    proposal?;

    let edit = chat.edit();
    let snapshot = edit
        .snapshot()
        .ok_or_else(|| anyhow!("Edit session ended unexpectedly"))?;
    if snapshot.hunks.iter().all(|h| !h.is_change()) {
        edit.cancel();
        println!("The AI proposed no changes to {}", key);
        return Ok(());
    }
    print!("{}", render_hunks(&snapshot.hunks));

    let content = match mode {
        ReviewMode::AcceptAll => edit.accept_all()?.1,
        ReviewMode::RejectAll => edit.reject_all()?.1,
        ReviewMode::Interactive => review(edit).await?,
    };

    if content == original {
        println!("No changes written to {}", key);
    } else {
        files
            .save_file_content(key, &content)
            .await
            .map_err(|e| anyhow!(e.to_user_message()))?;
        println!("Saved {}", key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decision() {
        assert_eq!(parse_decision("a\n"), Some(Decision::Accept));
        assert_eq!(parse_decision(""), Some(Decision::Skip));
        assert_eq!(parse_decision("R"), Some(Decision::RejectRest));
        assert_eq!(parse_decision("x"), None);
    }

    #[test]
    fn test_accept_rest_keeps_skipped_changes_out() {
        let edit = EditController::new();
        let ticket = edit.begin("a.txt", "a\nb\nc\nd\n").unwrap();
        ticket.finish("a\nX\nc\nY\n");

        // Skip the b -> X replacement, then accept the rest from d -> Y
        assert_eq!(nth_change(&edit, 1), Some(4));
        let content = accept_remaining(&edit, 1).unwrap();
        assert_eq!(content, "a\nb\nc\nY\n");
        assert!(!edit.is_active());
    }

    #[test]
    fn test_accept_rest_with_nothing_skipped_takes_everything() {
        let edit = EditController::new();
        let ticket = edit.begin("a.txt", "a\nb\nc\n").unwrap();
        ticket.finish("a\nx\nc\nd\n");

        assert_eq!(accept_remaining(&edit, 0).unwrap(), "a\nx\nc\nd\n");
    }

    #[test]
    fn test_nth_change_counts_replacement_once() {
        let edit = EditController::new();
        let ticket = edit.begin("a.txt", "a\nb\nc\nd\n").unwrap();
        ticket.finish("a\nx\nc\nd\ne\n");

        // [a] [-b] [+x] [c d] [+e]
        assert_eq!(nth_change(&edit, 0), Some(1));
        assert_eq!(nth_change(&edit, 1), Some(4));
        assert_eq!(nth_change(&edit, 2), None);
    }
}
