use std::{
    collections::{hash_map, HashMap},
    fmt,
};

use crate::api::{Rating, RecordId, ReplyRecord, ReplyTarget, ReviewRecord, Time, User};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeRecord {
    Review(ReviewRecord),
    Reply(ReplyRecord),
}

impl NodeRecord {
    pub fn id(&self) -> RecordId {
        match self {
            NodeRecord::Review(r) => r.id,
            NodeRecord::Reply(r) => r.id,
        }
    }

    pub fn author(&self) -> Option<&User> {
        match self {
            NodeRecord::Review(r) => r.author.as_ref(),
            NodeRecord::Reply(r) => r.author.as_ref(),
        }
    }

    pub fn display_author(&self) -> Option<&str> {
        match self {
            NodeRecord::Review(r) => r.display_author(),
            NodeRecord::Reply(r) => r.display_author(),
        }
    }

    pub fn comment(&self) -> &str {
        match self {
            NodeRecord::Review(r) => &r.comment,
            NodeRecord::Reply(r) => &r.comment,
        }
    }

    pub fn created_at(&self) -> Time {
        match self {
            NodeRecord::Review(r) => r.created_at,
            NodeRecord::Reply(r) => r.created_at,
        }
    }

    pub fn rating(&self) -> Option<Rating> {
        match self {
            NodeRecord::Review(r) => r.rating,
            NodeRecord::Reply(_) => None,
        }
    }

    pub fn course(&self) -> Option<&str> {
        match self {
            NodeRecord::Review(r) => r.course.as_deref(),
            NodeRecord::Reply(_) => None,
        }
    }
}

pub struct ThreadNode {
    pub record: NodeRecord,

    /// Root review of the tree this node is in
    pub review_id: RecordId,

    /// 0 for reviews, parent's depth + 1 for replies
    pub depth: usize,

    pub children: Vec<ThreadNode>,
}

impl fmt::Debug for ThreadNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow, so that printing a deep thread does not recurse
        f.debug_struct("ThreadNode")
            .field("record", &self.record)
            .field("review_id", &self.review_id)
            .field("depth", &self.depth)
            .field("num_children", &self.children.len())
            .finish()
    }
}

impl ThreadNode {
    fn shallow_clone(&self) -> ThreadNode {
        ThreadNode {
            record: self.record.clone(),
            review_id: self.review_id,
            depth: self.depth,
            children: Vec::with_capacity(self.children.len()),
        }
    }

    pub fn id(&self) -> RecordId {
        self.record.id()
    }

    pub fn is_review(&self) -> bool {
        matches!(self.record, NodeRecord::Review(_))
    }

    /// Target to use for replying to this node
    pub fn target(&self) -> ReplyTarget {
        match self.record {
            NodeRecord::Review(ref r) => ReplyTarget::review(r.id),
            NodeRecord::Reply(ref r) => ReplyTarget {
                review_id: self.review_id,
                reply_id: Some(r.id),
            },
        }
    }
}

/// Reasons for a record to be left out of the forest
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Diagnostic {
    /// The reply's immediate parent is not a known record
    MissingParent { reply: RecordId, parent: RecordId },

    /// The parent exists, but is itself not in the forest (orphaned ancestor or cycle)
    Unreachable { reply: RecordId },

    /// Another record with the same id came first
    DuplicateId { id: RecordId },
}

#[derive(Default)]
pub struct Forest {
    roots: Vec<ThreadNode>,
    diagnostics: Vec<Diagnostic>,
    len: usize,
}

impl Forest {
    pub fn roots(&self) -> &[ThreadNode] {
        &self.roots
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of nodes in the forest, roots included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order walk over all the nodes
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.roots.iter().rev().collect(),
        }
    }

    pub fn find(&self, id: RecordId) -> Option<&ThreadNode> {
        self.walk().find(|n| n.id() == id)
    }

    /// Finds the only node whose hyphenated id starts with `prefix`
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&ThreadNode> {
        let prefix = prefix.to_lowercase();
        let mut matches = self
            .walk()
            .filter(|n| n.id().0.hyphenated().to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(n), None) => Some(n),
            _ => None,
        }
    }
}

// Clone, comparison and debug output all go through `walk`, as the derived impls
// would recurse once per level of nesting

impl Clone for Forest {
    fn clone(&self) -> Forest {
        // In reverse pre-order, the children of a node are the last subtrees completed
        // before reaching it, its first child on top
        let flat = self
            .walk()
            .map(|n| (n.shallow_clone(), n.children.len()))
            .collect::<Vec<_>>();
        let mut done: Vec<ThreadNode> = Vec::with_capacity(self.roots.len());
        for (mut node, num_children) in flat.into_iter().rev() {
            let mut children = done.split_off(done.len() - num_children);
            children.reverse();
            node.children = children;
            done.push(node);
        }
        done.reverse();
        Forest {
            roots: done,
            diagnostics: self.diagnostics.clone(),
            len: self.len,
        }
    }
}

impl PartialEq for Forest {
    fn eq(&self, other: &Forest) -> bool {
        // Pre-order plus the number of children of each node determines the shape
        self.len == other.len
            && self.roots.len() == other.roots.len()
            && self.diagnostics == other.diagnostics
            && self.walk().zip(other.walk()).all(|(a, b)| {
                a.record == b.record
                    && a.review_id == b.review_id
                    && a.depth == b.depth
                    && a.children.len() == b.children.len()
            })
    }
}

impl Eq for Forest {}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forest")
            .field("nodes", &self.walk().collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics)
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for Forest {
    fn drop(&mut self) {
        // The derived drop glue would recurse once per level of nesting
        let mut stack = std::mem::take(&mut self.roots);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a ThreadNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a ThreadNode;

    fn next(&mut self) -> Option<&'a ThreadNode> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Threads the flat collections into a forest.
///
/// Roots are exactly the reviews, in their input order. Each reply goes under its
/// `parent_reply_id` if set, under its `parent_review_id` otherwise, with siblings
/// kept in input order. Replies whose parent cannot be resolved are dropped along
/// with their descendants, and reported in `Forest::diagnostics`.
///
/// This runs in O(n) and uses no recursion, so arbitrarily deep threads are fine.
pub fn build_forest(reviews: &[ReviewRecord], replies: &[ReplyRecord]) -> Forest {
    // Slots 0..reviews.len() are the reviews, the replies come after
    let num_reviews = reviews.len();
    let num_slots = num_reviews + replies.len();
    let slot_id = |slot: usize| match slot < num_reviews {
        true => reviews[slot].id,
        false => replies[slot - num_reviews].id,
    };

    let mut diagnostics = Vec::new();
    let mut index = HashMap::with_capacity(num_slots);
    let mut live = vec![false; num_slots];
    for slot in 0..num_slots {
        let id = slot_id(slot);
        match index.entry(id) {
            hash_map::Entry::Occupied(_) => {
                tracing::warn!(?id, "dropping record with duplicate id");
                diagnostics.push(Diagnostic::DuplicateId { id });
            }
            hash_map::Entry::Vacant(e) => {
                e.insert(slot);
                live[slot] = true;
            }
        }
    }

    let mut children = vec![Vec::new(); num_slots];
    let mut parent_of = vec![None; num_slots];
    for (i, reply) in replies.iter().enumerate() {
        let slot = num_reviews + i;
        if !live[slot] {
            continue;
        }
        let parent = reply.immediate_parent();
        match index.get(&parent) {
            Some(&p) => {
                children[p].push(slot);
                parent_of[slot] = Some(p);
            }
            None => {
                tracing::warn!(reply=?reply.id, ?parent, "dropping orphaned reply");
                diagnostics.push(Diagnostic::MissingParent {
                    reply: reply.id,
                    parent,
                });
            }
        }
    }

    // Pre-order from the roots. Every reply slot is in at most one children list and
    // reviews are in none, so nothing can be visited twice and cycles stay unreached.
    let mut depth = vec![0; num_slots];
    let mut root_of = vec![None; num_slots];
    let mut order = Vec::with_capacity(num_slots);
    let mut stack = (0..num_reviews).rev().filter(|&s| live[s]).collect::<Vec<_>>();
    for &root in stack.iter() {
        root_of[root] = Some(reviews[root].id);
    }
    while let Some(slot) = stack.pop() {
        order.push(slot);
        for &child in children[slot].iter().rev() {
            depth[child] = depth[slot] + 1;
            root_of[child] = root_of[slot];
            stack.push(child);
        }
    }

    for (i, reply) in replies.iter().enumerate() {
        let slot = num_reviews + i;
        if live[slot] && parent_of[slot].is_some() && root_of[slot].is_none() {
            tracing::warn!(reply=?reply.id, "dropping reply not attached to any review");
            diagnostics.push(Diagnostic::Unreachable { reply: reply.id });
        }
    }

    let mut nodes: Vec<Option<ThreadNode>> = (0..num_slots).map(|_| None).collect();
    for &slot in order.iter() {
        let (record, review_id) = match (slot < num_reviews, root_of[slot]) {
            (true, _) => (NodeRecord::Review(reviews[slot].clone()), reviews[slot].id),
            (false, Some(root)) => (
                NodeRecord::Reply(replies[slot - num_reviews].clone()),
                root,
            ),
            (false, None) => continue,
        };
        nodes[slot] = Some(ThreadNode {
            record,
            review_id,
            depth: depth[slot],
            children: Vec::with_capacity(children[slot].len()),
        });
    }

    // In reverse pre-order, all the descendants of a node have already been moved into
    // it by the time it is reached. They were pushed last-sibling-first, hence the reverse.
    for &slot in order.iter().rev() {
        if let Some(node) = nodes[slot].as_mut() {
            node.children.reverse();
        }
        if let Some(parent) = parent_of[slot] {
            if let Some(node) = nodes[slot].take() {
                if let Some(parent) = nodes[parent].as_mut() {
                    parent.children.push(node);
                }
            }
        }
    }

    let roots = nodes
        .into_iter()
        .take(num_reviews)
        .flatten()
        .collect::<Vec<_>>();
    Forest {
        roots,
        diagnostics,
        len: order.len(),
    }
}
