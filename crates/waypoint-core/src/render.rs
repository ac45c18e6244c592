//! Text rendering of a checkpoint tree.
//!
//! Output is a function of the checkpoint set and the active id only, so the
//! same tree always renders to the same text. Children are visited in
//! ascending sequence-number order and branch guides are derived from
//! per-depth "last sibling" flags rather than from previously emitted text.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::checkpoint::Checkpoint;

pub const ACTIVE_MARKER: &str = "<- active";

const BRANCH: &str = "├── ";
const CORNER: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";

/// Render `checkpoints` as a tree rooted at the single parentless checkpoint.
///
/// Fails with [`Error::Integrity`] when there is not exactly one root, when a
/// checkpoint is unreachable from the root, or when `active_id` does not name
/// a checkpoint in the set.
pub fn render(checkpoints: &[Checkpoint], active_id: Option<Uuid>) -> Result<String> {
    let roots: Vec<&Checkpoint> = checkpoints.iter().filter(|cp| cp.is_root()).collect();
    let root = match roots.as_slice() {
        [root] => *root,
        [] => return Err(Error::Integrity("checkpoint tree has no root".to_string())),
        many => {
            return Err(Error::Integrity(format!(
                "checkpoint tree has {} roots",
                many.len()
            )));
        }
    };

    if let Some(active) = active_id {
        if !checkpoints.iter().any(|cp| cp.id == active) {
            return Err(Error::Integrity(format!(
                "active checkpoint {active} is not part of the tree"
            )));
        }
    }

    // parent id -> children keyed by sequence number
    let mut children: HashMap<Uuid, BTreeMap<i64, &Checkpoint>> = HashMap::new();
    for cp in checkpoints {
        if let Some(parent_id) = cp.parent_id {
            children.entry(parent_id).or_default().insert(cp.number, cp);
        }
    }

    let mut out = String::new();
    let mut visited = 0usize;
    let mut guides: Vec<bool> = Vec::new();
    write_node(root, &children, active_id, &mut guides, None, &mut out, &mut visited);

    if visited != checkpoints.len() {
        return Err(Error::Integrity(format!(
            "{} checkpoint(s) are not reachable from the root",
            checkpoints.len().saturating_sub(visited)
        )));
    }
    Ok(out)
}

/// `guides[d]` is true when the ancestor at depth `d + 1` was the last of its siblings.
fn write_node(
    node: &Checkpoint,
    children: &HashMap<Uuid, BTreeMap<i64, &Checkpoint>>,
    active_id: Option<Uuid>,
    guides: &mut Vec<bool>,
    is_last: Option<bool>,
    out: &mut String,
    visited: &mut usize,
) {
    *visited += 1;

    for &ancestor_last in guides.iter() {
        out.push_str(if ancestor_last { BLANK } else { PIPE });
    }
    if let Some(last) = is_last {
        out.push_str(if last { CORNER } else { BRANCH });
    }
    out.push_str(&format_line(node));
    if active_id == Some(node.id) {
        out.push(' ');
        out.push_str(ACTIVE_MARKER);
    }
    out.push('\n');

    let Some(kids) = children.get(&node.id) else {
        return;
    };
    let count = kids.len();
    if let Some(last) = is_last {
        guides.push(last);
    }
    for (i, child) in kids.values().enumerate() {
        write_node(child, children, active_id, guides, Some(i + 1 == count), out, visited);
    }
    if is_last.is_some() {
        guides.pop();
    }
}

fn format_line(cp: &Checkpoint) -> String {
    format!("#{} {} [{}]", cp.number, cp.label, cp.branch_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(number: i64, label: &str, parent: Option<&Checkpoint>, line: &str) -> Checkpoint {
        Checkpoint {
            id: Uuid::now_v7(),
            context_id: Uuid::nil(),
            number,
            token: format!("rev{number}"),
            label: label.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            parent_id: parent.map(|p| p.id),
            branch_line: line.to_string(),
        }
    }

    #[test]
    fn test_single_root() {
        let root = cp(1, "start", None, "s");
        let text = render(&[root.clone()], Some(root.id)).unwrap();
        assert_eq!(text, "#1 start [s] <- active\n");
    }

    #[test]
    fn test_forked_tree_layout() {
        let root = cp(1, "start", None, "s");
        let a = cp(2, "a", Some(&root), "s");
        let b = cp(3, "b", Some(&a), "s");
        let c = cp(4, "c", Some(&root), "s-4");
        let d = cp(5, "d", Some(&a), "s-5");
        let all = vec![root.clone(), a, b, c.clone(), d];

        let text = render(&all, Some(c.id)).unwrap();
        let expected = "\
#1 start [s]
├── #2 a [s]
│   ├── #3 b [s]
│   └── #5 d [s-5]
└── #4 c [s-4] <- active
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_deep_last_branch_uses_blank_guide() {
        let root = cp(1, "start", None, "s");
        let a = cp(2, "a", Some(&root), "s");
        let b = cp(3, "b", Some(&a), "s");
        let c = cp(4, "c", Some(&b), "s");
        let e = cp(5, "e", Some(&b), "s-5");
        let text = render(&[root, a, b, c, e], None).unwrap();
        let expected = "\
#1 start [s]
└── #2 a [s]
    └── #3 b [s]
        ├── #4 c [s]
        └── #5 e [s-5]
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let root = cp(1, "start", None, "s");
        let a = cp(2, "a", Some(&root), "s");
        let b = cp(3, "b", Some(&root), "s-3");
        let forward = render(&[root.clone(), a.clone(), b.clone()], Some(a.id)).unwrap();
        let reversed = render(&[b, a.clone(), root], Some(a.id)).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_marker_characters_in_labels_are_inert() {
        let root = cp(1, "│   └── ", None, "s");
        let a = cp(2, "├── x", Some(&root), "s");
        let b = cp(3, "y", Some(&a), "s");
        let text = render(&[root, a, b], None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "└── #2 ├── x [s]");
        assert_eq!(lines[2], "    └── #3 y [s]");
    }

    #[test]
    fn test_no_root_is_integrity_error() {
        let root = cp(1, "start", None, "s");
        let mut orphan = cp(2, "a", Some(&root), "s");
        orphan.parent_id = Some(Uuid::now_v7());
        let err = render(&[orphan], None).unwrap_err();
        assert!(err.is_integrity());
        assert!(render(&[], None).unwrap_err().is_integrity());
    }

    #[test]
    fn test_two_roots_is_integrity_error() {
        let first = cp(1, "start", None, "s");
        let second = cp(2, "start", None, "t");
        let err = render(&[first, second], None).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn test_unreachable_checkpoint_is_integrity_error() {
        let root = cp(1, "start", None, "s");
        let mut a = cp(2, "a", Some(&root), "s");
        let mut b = cp(3, "b", Some(&root), "s");
        // a <-> b cycle, detached from the root
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let err = render(&[root, a, b], None).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn test_unknown_active_is_integrity_error() {
        let root = cp(1, "start", None, "s");
        let err = render(&[root], Some(Uuid::now_v7())).unwrap_err();
        assert!(err.is_integrity());
    }
}
