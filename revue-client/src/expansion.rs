use std::collections::HashMap;

use crate::{
    api::{RecordId, ReplyTarget},
    ThreadNode,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct NodeExpansion {
    all_children: bool,
    full_body: bool,
}

/// The reply being written. There is at most one at any time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Composer {
    pub target: ReplyTarget,
    pub draft: String,
}

/// A comment body, possibly cut short
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Body<'a> {
    pub text: &'a str,
    pub truncated: bool,
}

/// Per-node display state: how many children are shown, whether the body is shown
/// in full, and which node the composer is open on
#[derive(Clone, Debug)]
pub struct ExpansionState {
    reply_threshold: usize,
    body_threshold: usize,
    nodes: HashMap<RecordId, NodeExpansion>,
    composer: Option<Composer>,
}

impl ExpansionState {
    pub fn new(reply_threshold: usize, body_threshold: usize) -> ExpansionState {
        ExpansionState {
            reply_threshold,
            body_threshold,
            nodes: HashMap::new(),
            composer: None,
        }
    }

    pub fn reply_threshold(&self) -> usize {
        self.reply_threshold
    }

    /// Forgets everything, including the composer and its draft
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.composer = None;
    }

    /// Number of `node`'s children currently shown, out of `total`
    pub fn visible_count(&self, node: RecordId, total: usize) -> usize {
        match self.nodes.get(&node) {
            Some(e) if e.all_children => total,
            _ => total.min(self.reply_threshold),
        }
    }

    pub fn visible_children<'a>(&self, node: &'a ThreadNode) -> &'a [ThreadNode] {
        &node.children[..self.visible_count(node.id(), node.children.len())]
    }

    pub fn hidden_children(&self, node: &ThreadNode) -> usize {
        node.children.len() - self.visible_count(node.id(), node.children.len())
    }

    pub fn shows_all_children(&self, node: RecordId) -> bool {
        self.nodes.get(&node).map(|e| e.all_children).unwrap_or(false)
    }

    /// Flips between showing the threshold and all of this node's children. The
    /// children's own state is left alone.
    pub fn toggle_children(&mut self, node: RecordId) {
        let e = self.nodes.entry(node).or_default();
        e.all_children = !e.all_children;
    }

    pub fn toggle_body(&mut self, node: RecordId) {
        let e = self.nodes.entry(node).or_default();
        e.full_body = !e.full_body;
    }

    pub fn body<'a>(&self, node: RecordId, text: &'a str) -> Body<'a> {
        let full = self.nodes.get(&node).map(|e| e.full_body).unwrap_or(false);
        match text.char_indices().nth(self.body_threshold) {
            Some((cut, _)) if !full => Body {
                text: &text[..cut],
                truncated: true,
            },
            _ => Body {
                text,
                truncated: false,
            },
        }
    }

    pub fn composer(&self) -> Option<&Composer> {
        self.composer.as_ref()
    }

    pub fn is_composing(&self, node: RecordId) -> bool {
        self.composer
            .as_ref()
            .map(|c| c.target.node() == node)
            .unwrap_or(false)
    }

    /// Opens the composer on `target`, closing any composer open elsewhere. Reopening
    /// on the same target keeps the draft.
    pub fn open_composer(&mut self, target: ReplyTarget) {
        if self.is_composing_on(target) {
            return;
        }
        if let Some(old) = self.composer.take() {
            tracing::debug!(previous=?old.target, "closing composer to open another one");
        }
        self.composer = Some(Composer {
            target,
            draft: String::new(),
        });
    }

    /// Opens the composer on `target` if it is not already there, closes it otherwise
    pub fn toggle_composer(&mut self, target: ReplyTarget) {
        match self.is_composing_on(target) {
            true => self.composer = None,
            false => self.open_composer(target),
        }
    }

    fn is_composing_on(&self, target: ReplyTarget) -> bool {
        self.composer
            .as_ref()
            .map(|c| c.target == target)
            .unwrap_or(false)
    }

    pub fn close_composer(&mut self) -> Option<Composer> {
        self.composer.take()
    }

    /// Returns `false` if no composer is open
    pub fn set_draft(&mut self, draft: String) -> bool {
        match &mut self.composer {
            Some(c) => {
                c.draft = draft;
                true
            }
            None => false,
        }
    }
}

impl Default for ExpansionState {
    fn default() -> ExpansionState {
        ExpansionState::new(2, 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{ReplyRecord, ReviewRecord, Uuid},
        build_forest,
    };

    fn id(n: u128) -> RecordId {
        RecordId(Uuid::from_u128(n))
    }

    fn thread(num_replies: u128) -> crate::Forest {
        let review = ReviewRecord {
            id: id(1),
            author: None,
            is_anonymous: false,
            rating: None,
            course: None,
            comment: String::from("review"),
            created_at: chrono::Utc::now(),
        };
        let replies = (0..num_replies)
            .map(|n| ReplyRecord {
                id: id(100 + n),
                parent_review_id: id(1),
                parent_reply_id: (n + 3 >= num_replies && n > 0).then(|| id(100)),
                author: None,
                is_anonymous: false,
                comment: format!("reply {n}"),
                created_at: chrono::Utc::now(),
            })
            .collect::<Vec<_>>();
        build_forest(&[review], &replies)
    }

    #[test]
    fn show_more_toggles_one_level() {
        // 5 direct replies, then 3 nested under the first one
        let forest = thread(8);
        let root = &forest.roots()[0];
        assert_eq!(root.children.len(), 5);
        assert_eq!(root.children[0].children.len(), 3);

        let mut state = ExpansionState::default();
        assert_eq!(state.visible_children(root).len(), 2);
        assert_eq!(state.hidden_children(root), 3);

        state.toggle_children(root.id());
        assert_eq!(state.visible_children(root).len(), 5);
        assert_eq!(state.hidden_children(root), 0);
        let first = &root.children[0];
        assert_eq!(state.visible_children(first).len(), 2);
        assert!(!state.shows_all_children(first.id()));

        state.toggle_children(root.id());
        assert_eq!(state.visible_children(root).len(), 2);
    }

    #[test]
    fn few_children_are_all_shown() {
        let forest = thread(1);
        let root = &forest.roots()[0];
        let state = ExpansionState::new(2, 10);
        assert_eq!(state.visible_children(root).len(), 1);
        assert_eq!(state.hidden_children(root), 0);
    }

    #[test]
    fn single_composer() {
        let a = ReplyTarget::review(id(1));
        let b = ReplyTarget {
            review_id: id(1),
            reply_id: Some(id(2)),
        };
        let mut state = ExpansionState::default();
        assert!(!state.set_draft(String::from("lost")));

        state.open_composer(a);
        assert!(state.set_draft(String::from("draft for a")));
        state.open_composer(a);
        assert_eq!(state.composer().unwrap().draft, "draft for a");

        state.open_composer(b);
        assert!(!state.is_composing(id(1)));
        assert!(state.is_composing(id(2)));
        assert_eq!(state.composer().unwrap().draft, "");

        state.toggle_composer(b);
        assert!(state.composer().is_none());
        state.toggle_composer(a);
        assert!(state.is_composing(id(1)));
    }

    #[test]
    fn long_bodies() {
        let mut state = ExpansionState::new(2, 5);
        assert_eq!(
            state.body(id(1), "short"),
            Body {
                text: "short",
                truncated: false
            }
        );
        assert_eq!(
            state.body(id(1), "éééééé"),
            Body {
                text: "ééééé",
                truncated: true
            }
        );
        state.toggle_body(id(1));
        assert!(!state.body(id(1), "éééééé").truncated);
        assert!(state.body(id(2), "éééééé").truncated);
    }
}
