use anyhow::{anyhow, Context};
use revue_api::{AuthToken, EntityId, Faculty, NewReview, NewSession, Rating, Uuid};
use revue_client::{render, Backend, Discussion, DiscussionConfig, RestBackend};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "http://localhost:5000")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Log in, and print the token to put in REVUE_TOKEN
    Login { email: String, password: String },

    /// List faculty members
    List {
        /// Only list those teaching a course matching this
        #[structopt(short, long, default_value = "")]
        course: String,
    },

    /// Show the reviews of a faculty member, and their replies
    Show {
        entity: Uuid,

        /// Number of replies shown under each review or reply
        #[structopt(long, default_value = "2")]
        threshold: usize,

        /// Number of characters shown of each comment
        #[structopt(long, default_value = "200")]
        body_threshold: usize,

        /// Show all replies and comments in full
        #[structopt(long)]
        expand_all: bool,
    },

    /// Reply to a review or to a reply
    Reply {
        entity: Uuid,

        /// Beginning of the id of the review or reply to answer, as shown by `show`
        to: String,

        comment: String,
    },

    /// Review a faculty member
    Review {
        entity: Uuid,

        #[structopt(short, long)]
        rating: u8,

        #[structopt(short, long)]
        course: String,

        #[structopt(long)]
        anonymous: bool,

        comment: String,
    },
}

fn token() -> anyhow::Result<Option<AuthToken>> {
    let tok = match std::env::var("REVUE_TOKEN") {
        Ok(tok) => tok,
        Err(std::env::VarError::NotPresent) => return Ok(None),
        Err(e) => return Err(e).context("retrieving REVUE_TOKEN environment variable"),
    };
    let tok = Uuid::try_parse(&tok).context("parsing REVUE_TOKEN as an auth token")?;
    Ok(Some(AuthToken(tok)))
}

fn required_token() -> anyhow::Result<AuthToken> {
    token()?.ok_or_else(|| anyhow!("REVUE_TOKEN must be set, see the `login` subcommand"))
}

async fn load(
    backend: &RestBackend,
    entity: Uuid,
    config: DiscussionConfig,
) -> anyhow::Result<Discussion> {
    let mut d = Discussion::new(EntityId(entity), config);
    d.load(backend)
        .await
        .with_context(|| format!("loading the reviews of {entity}"))?;
    Ok(d)
}

fn print_faculty(f: &Faculty) {
    println!(
        "{}  {:<4} {:<30} {:.1}/5  {}",
        f.id.0,
        f.initials,
        f.name,
        f.avg_rating,
        f.courses.join(", ")
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    match opt.cmd {
        Command::Login { email, password } => {
            let tok = RestBackend::login(&opt.host, NewSession::new(email, password))
                .await
                .context("logging in")?;
            println!("{}", tok.0);
        }
        Command::List { course } => {
            let backend = RestBackend::new(opt.host, token()?);
            let all = backend
                .fetch_faculties()
                .await
                .context("fetching faculty list")?;
            for f in Faculty::filter_by_course(&all, &course) {
                print_faculty(f);
            }
        }
        Command::Show {
            entity,
            threshold,
            body_threshold,
            expand_all,
        } => {
            let backend = RestBackend::new(opt.host, token()?);
            let faculty = backend
                .fetch_faculty(EntityId(entity))
                .await
                .context("fetching faculty")?;
            let config = DiscussionConfig {
                reply_threshold: threshold,
                body_threshold,
                ..DiscussionConfig::default()
            };
            let mut d = load(&backend, entity, config).await?;
            if expand_all {
                let ids = d
                    .forest()
                    .map(|f| f.walk().map(|n| n.id()).collect::<Vec<_>>())
                    .unwrap_or_default();
                let expansion = d.expansion_mut();
                for id in ids {
                    expansion.toggle_children(id);
                    expansion.toggle_body(id);
                }
            }
            let forest = d
                .forest()
                .ok_or_else(|| anyhow!("discussion did not load"))?;
            print_faculty(&faculty);
            println!();
            print!("{}", render(forest, d.expansion()));
            if !forest.diagnostics().is_empty() {
                tracing::warn!(
                    num_excluded = forest.diagnostics().len(),
                    "some replies could not be attached and were not shown"
                );
            }
        }
        Command::Reply {
            entity,
            to,
            comment,
        } => {
            let backend = RestBackend::new(opt.host, Some(required_token()?));
            let mut d = load(&backend, entity, DiscussionConfig::default()).await?;
            let target = d
                .forest()
                .and_then(|f| f.find_by_prefix(&to))
                .map(|n| n.target())
                .ok_or_else(|| anyhow!("no single review or reply has an id starting with {to:?}"))?;
            let reply = d
                .submit_reply(&backend, target, comment)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", reply.id.0);
        }
        Command::Review {
            entity,
            rating,
            course,
            anonymous,
            comment,
        } => {
            let backend = RestBackend::new(opt.host, Some(required_token()?));
            let mut d = load(&backend, entity, DiscussionConfig::default()).await?;
            let review = NewReview {
                rating: Rating::try_from(rating)?,
                course,
                comment,
                is_anonymous: anonymous,
            };
            let review = d
                .submit_review(&backend, review)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", review.id.0);
        }
    }

    Ok(())
}
