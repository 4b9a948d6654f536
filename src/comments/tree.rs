//! Comment tree assembly.
//!
//! Comments for an article are loaded in one query and grouped by
//! `parent_id`; replies whose parent was filtered out are not shown.

use crate::orm::comments;
use std::collections::HashMap;
use std::fmt;

/// A comment with its visible replies.
///
/// Reply chains may be arbitrarily deep, so nothing here recurses: building,
/// counting and dropping all walk the tree with an explicit stack.
pub struct CommentNode {
    pub comment: comments::Model,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// This comment plus every reply below it.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }
}

impl fmt::Debug for CommentNode {
    // Shallow: replies are summarized, not walked
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentNode")
            .field("comment", &self.comment)
            .field("replies", &self.replies.len())
            .finish()
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// Build the forest from `rows`, keeping their order at every level.
pub fn build_tree(rows: Vec<comments::Model>) -> Vec<CommentNode> {
    let mut children: HashMap<Option<i32>, Vec<i32>> = HashMap::new();
    let mut by_id: HashMap<i32, comments::Model> = HashMap::with_capacity(rows.len());
    for row in rows {
        children.entry(row.parent_id).or_default().push(row.id);
        by_id.insert(row.id, row);
    }
    let roots = children.remove(&None).unwrap_or_default();

    // Pre-order from the roots; orphans are never reached
    let mut order = Vec::with_capacity(by_id.len());
    let mut stack = roots.clone();
    while let Some(id) = stack.pop() {
        order.push(id);
        if let Some(kids) = children.get(&Some(id)) {
            stack.extend(kids.iter().copied());
        }
    }

    // Reversed pre-order sees every reply before its parent
    let mut built: HashMap<i32, CommentNode> = HashMap::with_capacity(order.len());
    for id in order.into_iter().rev() {
        let replies = children
            .get(&Some(id))
            .map(|kids| kids.iter().filter_map(|kid| built.remove(kid)).collect())
            .unwrap_or_default();
        if let Some(comment) = by_id.remove(&id) {
            built.insert(id, CommentNode { comment, replies });
        }
    }

    roots.iter().filter_map(|id| built.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: i32, parent_id: Option<i32>) -> comments::Model {
        let now = Utc::now().naive_utc();
        comments::Model {
            id,
            article_id: 1,
            author_id: 1,
            parent_id,
            content: format!("c{}", id),
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_nested_replies() {
        let tree = build_tree(vec![
            row(4, Some(2)),
            row(3, None),
            row(2, Some(1)),
            row(1, None),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, 3);
        assert_eq!(tree[1].comment.id, 1);
        assert_eq!(tree[1].replies[0].comment.id, 2);
        assert_eq!(tree[1].replies[0].replies[0].comment.id, 4);
        assert_eq!(tree[1].subtree_len(), 3);
    }

    #[test]
    fn test_deep_reply_chain() {
        let depth = 100_000;
        let mut rows = vec![row(1, None)];
        rows.extend((2..=depth).map(|id| row(id, Some(id - 1))));

        let tree = build_tree(rows);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].subtree_len(), depth as usize);

        let mut node = &tree[0];
        while let Some(reply) = node.replies.first() {
            node = reply;
        }
        assert_eq!(node.comment.id, depth);
        drop(tree);
    }

    #[test]
    fn test_siblings_keep_row_order() {
        let tree = build_tree(vec![row(1, None), row(3, Some(1)), row(2, Some(1))]);
        let ids: Vec<i32> = tree[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_orphans_dropped() {
        let tree = build_tree(vec![row(5, Some(99)), row(1, None)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].subtree_len(), 1);
    }
}
