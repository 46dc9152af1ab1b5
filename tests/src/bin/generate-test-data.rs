use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use revue_api::{EntityId, Faculty, RecordId, ReplyRecord, ReviewRecord, User, UserId, Uuid};

const NUM_USERS: usize = 5;
const COURSES: &[&str] = &["CSE110", "CSE220", "CSE250", "MAT120"];

const NUM_REVIEWS: usize = 8;
const NUM_REPLIES: usize = 200;

// Length of the reply chain hanging under the first review
const DEEP_THREAD_LEN: usize = 60;

// Replies whose parent does not exist, and should not be displayed
const NUM_ORPHANS: usize = 5;

const ANONYMOUS_PROBABILITY: f64 = 0.2;
const COMMENT_MAX_WORDS: usize = 80;

fn gen_comment(rng: &mut impl Rng) -> String {
    lipsum::lipsum_words(rng.gen_range(1..=COMMENT_MAX_WORDS))
}

fn gen_date(rng: &mut impl Rng) -> chrono::DateTime<Utc> {
    Utc::now() - Duration::minutes(rng.gen_range(0..60 * 24 * 365))
}

fn main() {
    let mut rng = rand::thread_rng();

    let users = (0..NUM_USERS)
        .map(|_| User {
            id: UserId(Uuid::new_v4()),
            name: lipsum::lipsum_title(),
        })
        .collect::<Vec<_>>();

    let reviews = (0..NUM_REVIEWS)
        .map(|_| {
            let rating = rng.gen_range(1..=5u8);
            ReviewRecord {
                id: RecordId(Uuid::new_v4()),
                author: users.choose(&mut rng).cloned(),
                is_anonymous: rng.gen_bool(ANONYMOUS_PROBABILITY),
                rating: rating.try_into().ok(),
                course: COURSES.choose(&mut rng).map(|c| c.to_string()),
                comment: gen_comment(&mut rng),
                created_at: gen_date(&mut rng),
            }
        })
        .collect::<Vec<_>>();

    let mut replies: Vec<ReplyRecord> = Vec::new();
    let new_reply =
        |rng: &mut rand::rngs::ThreadRng, review: RecordId, parent: Option<RecordId>| {
            ReplyRecord {
                id: RecordId(Uuid::new_v4()),
                parent_review_id: review,
                parent_reply_id: parent,
                author: users.choose(rng).cloned(),
                is_anonymous: rng.gen_bool(ANONYMOUS_PROBABILITY),
                comment: gen_comment(rng),
                created_at: gen_date(rng),
            }
        };

    // Random replies, each under either a review or an earlier reply
    for _ in 0..NUM_REPLIES {
        let reply = match rng.gen_range(0..reviews.len() + replies.len()) {
            i if i < reviews.len() => new_reply(&mut rng, reviews[i].id, None),
            i => {
                let parent = &replies[i - reviews.len()];
                let (review, parent) = (parent.parent_review_id, parent.id);
                new_reply(&mut rng, review, Some(parent))
            }
        };
        replies.push(reply);
    }

    let first = reviews[0].id;
    let mut parent = None;
    for _ in 0..DEEP_THREAD_LEN {
        let reply = new_reply(&mut rng, first, parent);
        parent = Some(reply.id);
        replies.push(reply);
    }

    for _ in 0..NUM_ORPHANS {
        let review = reviews[rng.gen_range(0..reviews.len())].id;
        let missing = RecordId(Uuid::new_v4());
        replies.push(new_reply(&mut rng, review, Some(missing)));
    }

    // The backend gives no ordering guarantee
    replies.shuffle(&mut rng);

    let forest = revue_client::build_forest(&reviews, &replies);
    eprintln!(
        "generated {} reviews and {} replies, {} of which are displayable",
        reviews.len(),
        replies.len(),
        forest.len() - reviews.len(),
    );

    let ratings = reviews.iter().filter_map(|r| r.rating).map(|r| f64::from(r.get()));
    let avg_rating = ratings.clone().sum::<f64>() / ratings.count().max(1) as f64;
    let faculty = Faculty {
        id: EntityId(Uuid::new_v4()),
        name: lipsum::lipsum_title(),
        initials: String::from("LI"),
        department: Some(String::from("CSE")),
        email: None,
        courses: COURSES.iter().map(|c| c.to_string()).collect(),
        avg_rating,
    };

    let data = serde_json::json!({
        "faculty": faculty,
        "reviews": reviews,
        "replies": replies,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&data).expect("serializing test data")
    );
}
