//! Folder-shaped view of the file list used for interactive selection.

use std::collections::{BTreeMap, HashMap};

use crate::models::{FileEntry, FileSelection, IdentifiedFile};

#[derive(Debug, Clone, PartialEq)]
pub enum HierarchicalNode {
    Leaf(FileEntry),
    Folder {
        name: String,
        children: Vec<HierarchicalNode>,
    },
}

impl HierarchicalNode {
    pub fn folder(name: impl Into<String>, children: Vec<HierarchicalNode>) -> Self {
        HierarchicalNode::Folder {
            name: name.into(),
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, HierarchicalNode::Leaf(_))
    }
}

/// Depth-first, left-to-right list of every leaf's `{original_path, selected}`.
/// Folders contribute nothing themselves.
pub fn flatten_tree(forest: &[HierarchicalNode]) -> Vec<FileSelection> {
    fn visit(node: &HierarchicalNode, out: &mut Vec<FileSelection>) {
        match node {
            HierarchicalNode::Leaf(entry) => out.push(entry.selection()),
            HierarchicalNode::Folder { children, .. } => {
                for child in children {
                    visit(child, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    for node in forest {
        visit(node, &mut out);
    }
    out
}

#[derive(Default)]
struct FolderBuilder {
    folders: BTreeMap<String, FolderBuilder>,
    leaves: Vec<(String, FileEntry)>,
}

impl FolderBuilder {
    fn insert(&mut self, entry: &FileEntry) {
        let mut parts: Vec<&str> = entry
            .original_path
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .collect();
        let leaf_name = parts.pop().unwrap_or(entry.original_path.as_str()).to_string();

        let mut folder = self;
        for part in parts {
            folder = folder.folders.entry(part.to_string()).or_default();
        }
        folder.leaves.push((leaf_name, entry.clone()));
    }

    fn build(mut self) -> Vec<HierarchicalNode> {
        self.leaves.sort_by(|a, b| a.0.cmp(&b.0));

        let mut nodes: Vec<HierarchicalNode> = self
            .folders
            .into_iter()
            .map(|(name, sub)| HierarchicalNode::folder(name, sub.build()))
            .collect();
        nodes.extend(self.leaves.into_iter().map(|(_, entry)| HierarchicalNode::Leaf(entry)));
        nodes
    }
}

/// Groups a flat file list into folders by path component. Folders come
/// before files at each level, both ordered by name.
pub fn build_tree(files: &[FileEntry]) -> Vec<HierarchicalNode> {
    let mut root = FolderBuilder::default();
    for entry in files {
        root.insert(entry);
    }
    root.build()
}

/// Tree-shaped identification merge. Unlike the flat merge it also records
/// per-file identification errors on the leaves. Returns the number of leaves updated.
pub fn apply_identification_to_tree(forest: &mut [HierarchicalNode], results: &[IdentifiedFile]) -> usize {
    let mut by_path: HashMap<&str, &IdentifiedFile> = HashMap::with_capacity(results.len());
    for result in results {
        by_path.entry(result.original_path.as_str()).or_insert(result);
    }

    fn visit(node: &mut HierarchicalNode, by_path: &HashMap<&str, &IdentifiedFile>) -> usize {
        match node {
            HierarchicalNode::Leaf(entry) => match by_path.get(entry.original_path.as_str()) {
                Some(result) => {
                    entry.new_name = result.new_name.clone().unwrap_or_default();
                    entry.new_sub_folder = result.new_sub_folder.clone().unwrap_or_default();
                    entry.tmdb_match = result.tmdb.clone();
                    entry.titles = result.titles.clone();
                    entry.error = result.error.clone();
                    1
                }
                None => 0,
            },
            HierarchicalNode::Folder { children, .. } => children.iter_mut().map(|child| visit(child, by_path)).sum(),
        }
    }

    forest.iter_mut().map(|node| visit(node, &by_path)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReleaseYear, TitleInfo};

    fn leaf(path: &str, selected: bool) -> HierarchicalNode {
        let mut entry = FileEntry::discovered(path);
        entry.selected = selected;
        HierarchicalNode::Leaf(entry)
    }

    fn paths(selections: &[FileSelection]) -> Vec<&str> {
        selections.iter().map(|s| s.original_path.as_str()).collect()
    }

    #[test]
    fn test_flatten_empty_forest() {
        assert!(flatten_tree(&[]).is_empty());
    }

    #[test]
    fn test_flatten_leaves_only_keeps_order() {
        let forest = vec![leaf("/b.mkv", true), leaf("/a.mkv", false)];
        let flat = flatten_tree(&forest);
        assert_eq!(paths(&flat), vec!["/b.mkv", "/a.mkv"]);
        assert!(flat[0].selected);
        assert!(!flat[1].selected);
    }

    #[test]
    fn test_flatten_is_depth_first_left_to_right() {
        let forest = vec![
            HierarchicalNode::folder(
                "movies",
                vec![
                    HierarchicalNode::folder("a", vec![leaf("/movies/a/1.mkv", true), leaf("/movies/a/2.mkv", true)]),
                    leaf("/movies/3.mkv", false),
                ],
            ),
            leaf("/4.mkv", true),
        ];
        assert_eq!(
            paths(&flatten_tree(&forest)),
            vec!["/movies/a/1.mkv", "/movies/a/2.mkv", "/movies/3.mkv", "/4.mkv"]
        );
    }

    #[test]
    fn test_empty_folders_do_not_change_the_result() {
        let with_empty = vec![
            HierarchicalNode::folder("empty", vec![]),
            leaf("/x.mkv", true),
            HierarchicalNode::folder("outer", vec![HierarchicalNode::folder("inner", vec![])]),
            leaf("/y.mkv", false),
        ];
        let without = vec![leaf("/x.mkv", true), leaf("/y.mkv", false)];
        assert_eq!(flatten_tree(&with_empty), flatten_tree(&without));
    }

    #[test]
    fn test_build_tree_groups_by_directory() {
        let files = vec![
            FileEntry::discovered("/lib/Shows/b.mkv"),
            FileEntry::discovered("/lib/z.mkv"),
            FileEntry::discovered("/lib/Movies/a.mkv"),
            FileEntry::discovered("/lib/Movies/0.mkv"),
        ];
        let tree = build_tree(&files);

        assert_eq!(tree.len(), 1);
        let HierarchicalNode::Folder { name, children } = &tree[0] else {
            panic!("expected a folder");
        };
        assert_eq!(name, "lib");
        assert_eq!(children.len(), 3);
        assert!(!children[0].is_leaf());
        assert!(!children[1].is_leaf());
        assert!(children[2].is_leaf());

        assert_eq!(
            paths(&flatten_tree(&tree)),
            vec!["/lib/Movies/0.mkv", "/lib/Movies/a.mkv", "/lib/Shows/b.mkv", "/lib/z.mkv"]
        );
    }

    #[test]
    fn test_build_tree_handles_windows_paths() {
        let tree = build_tree(&[FileEntry::discovered("D:\\Media\\A.mkv")]);
        let HierarchicalNode::Folder { name, children } = &tree[0] else {
            panic!("expected a folder");
        };
        assert_eq!(name, "D:");
        assert!(matches!(&children[0], HierarchicalNode::Folder { name, .. } if name == "Media"));
    }

    #[test]
    fn test_tree_merge_updates_matching_leaves() {
        let mut forest = build_tree(&[FileEntry::discovered("/lib/A.mkv"), FileEntry::discovered("/lib/B.mkv")]);
        let results = vec![
            IdentifiedFile {
                original_path: "/lib/B.mkv".to_string(),
                new_name: Some("B (1999).mkv".to_string()),
                new_sub_folder: None,
                tmdb: None,
                titles: TitleInfo {
                    english_title: Some("B".to_string()),
                    year: Some(ReleaseYear::Number(1999)),
                    ..TitleInfo::default()
                },
                error: Some("no match".to_string()),
            },
            IdentifiedFile {
                original_path: "/elsewhere/C.mkv".to_string(),
                new_name: Some("C.mkv".to_string()),
                new_sub_folder: None,
                tmdb: None,
                titles: TitleInfo::default(),
                error: None,
            },
        ];

        assert_eq!(apply_identification_to_tree(&mut forest, &results), 1);

        let HierarchicalNode::Folder { children, .. } = &forest[0] else {
            panic!("expected a folder");
        };
        let HierarchicalNode::Leaf(b) = &children[1] else {
            panic!("expected a leaf");
        };
        assert_eq!(b.new_name, "B (1999).mkv");
        assert_eq!(b.new_sub_folder, "");
        assert_eq!(b.error.as_deref(), Some("no match"));
        assert_eq!(b.titles.english_title.as_deref(), Some("B"));
        assert_eq!(b.titles.year, Some(ReleaseYear::Number(1999)));
    }
}
