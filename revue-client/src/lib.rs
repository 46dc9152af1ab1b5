mod backend;
pub use backend::{Backend, BackendError};

mod discussion;
pub use discussion::{Discussion, DiscussionConfig, Notification, PendingSubmission, SubmitError};

mod expansion;
pub use expansion::{Body, Composer, ExpansionState};

mod render;
pub use render::render;

mod rest;
pub use rest::RestBackend;

mod store;
pub use store::{LoadState, RecordStore};

mod thread;
pub use thread::{build_forest, Diagnostic, Forest, NodeRecord, ThreadNode, Walk};

#[cfg(test)]
mod fuzz;

pub mod api {
    pub use revue_api::*;
}
