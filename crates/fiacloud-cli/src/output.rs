// Terminal rendering helpers

use fiacloud_lib::models::OSSFile;
use fiacloud_lib::services::diff::{DiffHunk, HunkKind};
use fiacloud_lib::services::storage::TreeNode;

/// Human readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// One line per object: size, last modified, key
pub fn render_listing(files: &[OSSFile]) -> String {
    let mut out = String::new();
    for file in files.iter().filter(|f| !f.is_placeholder()) {
        out.push_str(&format!(
            "{:>10}  {:<24}  {}\n",
            format_size(file.size),
            file.last_modified,
            file.name
        ));
    }
    out
}

pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    render_level(nodes, "", &mut out);
    out
}

fn render_level(nodes: &[TreeNode], indent: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        if node.is_folder() {
            out.push_str(&format!("{}{}{}/\n", indent, branch, node.name));
            let child_indent = format!("{}{}", indent, if last { "    " } else { "│   " });
            render_level(&node.children, &child_indent, out);
        } else {
            out.push_str(&format!("{}{}{}\n", indent, branch, node.name));
        }
    }
}

/// Unified-style rendering; change hunks are prefixed with their index
pub fn render_hunks(hunks: &[DiffHunk]) -> String {
    let mut out = String::new();
    for (i, hunk) in hunks.iter().enumerate() {
        let marker = match hunk.kind {
            HunkKind::Added => "+",
            HunkKind::Removed => "-",
            HunkKind::Unchanged => " ",
        };
        if hunk.is_change() {
            out.push_str(&format!("@@ #{} @@\n", i));
        }
        for line in hunk.value.lines() {
            out.push_str(marker);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
