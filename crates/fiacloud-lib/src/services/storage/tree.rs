// Folder tree built from a flat object listing

use std::cmp::Ordering;

use serde::Serialize;

use crate::models::OSSFile;
use crate::utils::object_key::PLACEHOLDER_FILENAME;

/// A folder (no `file`) or a file leaf
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Last path segment
    pub name: String,
    /// Path from the bucket root, without trailing slash
    pub key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<OSSFile>,
}

impl TreeNode {
    fn folder(name: &str, key: String) -> Self {
        Self {
            name: name.to_string(),
            key,
            children: Vec::new(),
            file: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.file.is_none()
    }
}

/// Convert a flat listing into a tree
///
/// Placeholders are hidden but still produce their folder. Each level lists
/// folders before files, both ordered by name.
pub fn build_tree(files: &[OSSFile]) -> Vec<TreeNode> {
    let mut root: Vec<TreeNode> = Vec::new();

    for file in files {
        let segments: Vec<&str> = file.name.split('/').collect();
        let last = segments.len().saturating_sub(1);
        let mut level = &mut root;

        for (i, part) in segments.iter().enumerate() {
            if part.is_empty() || *part == PLACEHOLDER_FILENAME {
                continue;
            }
            let key = segments[..=i].join("/");

            if i == last {
                if !level.iter().any(|n| n.key == key) {
                    level.push(TreeNode {
                        name: part.to_string(),
                        key,
                        children: Vec::new(),
                        file: Some(file.clone()),
                    });
                }
                break;
            }

            let idx = match level.iter().position(|n| n.is_folder() && n.key == key) {
                Some(idx) => idx,
                None => {
                    level.push(TreeNode::folder(part, key));
                    level.len() - 1
                }
            };
            level = &mut level[idx].children;
        }
    }

    sort_level(&mut root);
    root
}

fn sort_level(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| match (a.is_folder(), b.is_folder()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    });
    for node in nodes.iter_mut() {
        sort_level(&mut node.children);
    }
}
