//! Nested directory view of a flat path map

use serde::Serialize;
use std::collections::BTreeMap;

/// A directory level: segment name to child node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tree(BTreeMap<String, TreeNode>);

/// A file (rendered as `null`) or a nested directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TreeNode {
    Dir(Tree),
    File,
}

impl Tree {
    /// Build a tree by splitting every path on `/`
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut root = Tree::default();
        for path in paths {
            root.insert(path);
        }
        root
    }

    /// Insert one path. A directory wins over a file of the same name.
    pub fn insert(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file, dirs)) = segments.split_last() else {
            return;
        };

        let mut current = self;
        for dir in dirs {
            let node = current
                .0
                .entry((*dir).to_string())
                .or_insert_with(|| TreeNode::Dir(Tree::default()));
            if matches!(node, TreeNode::File) {
                *node = TreeNode::Dir(Tree::default());
            }
            current = match node {
                TreeNode::Dir(tree) => tree,
                TreeNode::File => unreachable!("file node was replaced by a directory"),
            };
        }

        current
            .0
            .entry((*file).to_string())
            .or_insert(TreeNode::File);
    }

    pub fn get(&self, segment: &str) -> Option<&TreeNode> {
        self.0.get(segment)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
