use std::collections::HashSet;

use chrono::{TimeZone, Utc};

use crate::{
    api::{RecordId, ReplyRecord, ReviewRecord, Uuid},
    build_forest, Forest, NodeRecord, RecordStore,
};

// Ids are drawn from a small space so that duplicates, cycles and missing parents
// all show up often
const ID_SPACE: u8 = 48;

const MAX_REVIEWS: usize = 8;
const MAX_REPLIES: usize = 64;

/// `(id, review, parent)`
type RawReply = (u8, u8, Option<u8>);

/// Reviews, replies, and one more reply to append afterwards
type RawDiscussion = (Vec<u8>, Vec<RawReply>, RawReply);

#[derive(Clone, Debug)]
struct FuzzReply {
    id: u8,
    review: u8,
    parent: Option<u8>,
}

impl From<&RawReply> for FuzzReply {
    fn from(&(id, review, parent): &RawReply) -> FuzzReply {
        FuzzReply { id, review, parent }
    }
}

#[derive(Clone, Debug)]
struct FuzzDiscussion {
    reviews: Vec<u8>,
    replies: Vec<FuzzReply>,
    appended: FuzzReply,
}

impl From<&RawDiscussion> for FuzzDiscussion {
    fn from((reviews, replies, appended): &RawDiscussion) -> FuzzDiscussion {
        FuzzDiscussion {
            reviews: reviews.iter().copied().take(MAX_REVIEWS).collect(),
            replies: replies.iter().take(MAX_REPLIES).map(FuzzReply::from).collect(),
            appended: FuzzReply::from(appended),
        }
    }
}

fn id(n: u8) -> RecordId {
    RecordId(Uuid::from_u128(u128::from(n % ID_SPACE)))
}

fn review(n: u8) -> ReviewRecord {
    ReviewRecord {
        id: id(n),
        author: None,
        is_anonymous: false,
        rating: None,
        course: None,
        comment: format!("review {n}"),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    }
}

fn reply(r: &FuzzReply) -> ReplyRecord {
    ReplyRecord {
        id: id(r.id),
        parent_review_id: id(r.review),
        parent_reply_id: r.parent.map(id),
        author: None,
        is_anonymous: false,
        comment: format!("reply {}", r.id),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
    }
}

impl FuzzDiscussion {
    fn records(&self) -> (Vec<ReviewRecord>, Vec<ReplyRecord>) {
        (
            self.reviews.iter().map(|&n| review(n)).collect(),
            self.replies.iter().map(reply).collect(),
        )
    }
}

fn check_structure(forest: &Forest, reviews: &[ReviewRecord], replies: &[ReplyRecord]) {
    // Every input record is either in the forest or reported, never both
    assert_eq!(
        forest.len() + forest.diagnostics().len(),
        reviews.len() + replies.len()
    );
    assert_eq!(forest.walk().count(), forest.len());

    let mut seen = HashSet::new();
    for root in forest.roots() {
        assert!(root.is_review(), "reply {:?} was promoted to a root", root.id());
        assert_eq!(root.depth, 0);
        assert_eq!(root.review_id, root.id());
    }
    for node in forest.walk() {
        assert!(seen.insert(node.id()), "{:?} is in the forest twice", node.id());
        for child in node.children.iter() {
            assert_eq!(child.depth, node.depth + 1);
            assert_eq!(child.review_id, node.review_id);
            match &child.record {
                NodeRecord::Reply(r) => assert_eq!(r.immediate_parent(), node.id()),
                NodeRecord::Review(r) => panic!("review {:?} is not a root", r.id),
            }
        }
    }
}

#[test]
fn forest_structure() {
    bolero::check!()
        .with_type::<RawDiscussion>()
        .for_each(|raw| {
            let d = FuzzDiscussion::from(raw);
            let (reviews, replies) = d.records();
            let forest = build_forest(&reviews, &replies);
            check_structure(&forest, &reviews, &replies);
            assert_eq!(build_forest(&reviews, &replies), forest);
        })
}

#[test]
fn appends_only_grow_the_forest() {
    bolero::check!()
        .with_type::<RawDiscussion>()
        .for_each(|raw| {
            let d = FuzzDiscussion::from(raw);
            let (reviews, replies) = d.records();
            let mut store = RecordStore::new();
            store.initialize(Some(reviews), Some(replies));
            let before = build_forest(store.reviews(), store.replies());

            let new = reply(&d.appended);
            let parent_attached = before.find(new.immediate_parent()).is_some();
            let added = store.append_reply(new.clone());
            let known = d
                .reviews
                .iter()
                .chain(d.replies.iter().map(|r| &r.id))
                .any(|&n| id(n) == new.id);
            assert_eq!(added, !known);

            let after = build_forest(store.reviews(), store.replies());
            check_structure(&after, store.reviews(), store.replies());
            for node in before.walk() {
                assert!(after.find(node.id()).is_some(), "{:?} disappeared", node.id());
            }
            // The new reply may also be the missing parent of earlier ones
            match (added, parent_attached) {
                (true, true) => {
                    assert!(after.find(new.id).is_some());
                    assert!(after.len() > before.len());
                }
                (true, false) => assert_eq!(after.len(), before.len()),
                (false, _) => assert_eq!(after, before),
            }

            // Delivering the same record again changes nothing
            assert!(!store.append_reply(new));
            assert_eq!(build_forest(store.reviews(), store.replies()), after);
        })
}
