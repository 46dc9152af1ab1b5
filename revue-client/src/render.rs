use std::fmt::Write;

use crate::{ExpansionState, Forest, ThreadNode};

pub const NO_REVIEWS: &str = "No reviews yet. Be the first to add one!";

const INDENT: &str = "    ";

enum Step<'a> {
    Node(&'a ThreadNode),
    Footer(&'a ThreadNode),
}

/// Renders the visible part of `forest` as indented plain text, one block per node.
///
/// Each header carries the first 8 characters of the node's id, enough to designate
/// it with `Forest::find_by_prefix`.
pub fn render(forest: &Forest, state: &ExpansionState) -> String {
    if forest.is_empty() {
        return format!("{NO_REVIEWS}\n");
    }

    let mut out = String::new();
    let mut stack = forest
        .roots()
        .iter()
        .rev()
        .map(Step::Node)
        .collect::<Vec<_>>();
    while let Some(step) = stack.pop() {
        match step {
            Step::Node(node) => {
                render_node(&mut out, node, state);
                stack.push(Step::Footer(node));
                stack.extend(state.visible_children(node).iter().rev().map(Step::Node));
            }
            Step::Footer(node) => render_footer(&mut out, node, state),
        }
    }
    out
}

fn render_node(out: &mut String, node: &ThreadNode, state: &ExpansionState) {
    let indent = INDENT.repeat(node.depth);
    let id = node.id().0.simple().to_string();
    let author = node.record.display_author().unwrap_or("Anonymous");
    let date = node.record.created_at().format("%Y-%m-%d");

    // Writing to a String cannot fail
    let _ = write!(out, "{indent}[{}] {author}, {date}", &id[..8]);
    if let Some(rating) = node.record.rating() {
        let _ = write!(out, ", rated {}/5", rating.get());
    }
    if let Some(course) = node.record.course() {
        let _ = write!(out, ", for {course}");
    }
    out.push('\n');

    let body = state.body(node.id(), node.record.comment());
    for line in body.text.lines() {
        let _ = writeln!(out, "{indent}  {line}");
    }
    if body.truncated {
        let _ = writeln!(out, "{indent}  ... (read more)");
    }

    if let Some(composer) = state.composer().filter(|c| c.target.node() == node.id()) {
        let _ = writeln!(out, "{indent}  > replying: {}", composer.draft);
    }
}

fn render_footer(out: &mut String, node: &ThreadNode, state: &ExpansionState) {
    let indent = INDENT.repeat(node.depth + 1);
    let hidden = state.hidden_children(node);
    if hidden > 0 {
        let _ = writeln!(out, "{indent}(view {hidden} more replies)");
    } else if state.shows_all_children(node.id())
        && node.children.len() > state.reply_threshold()
    {
        let _ = writeln!(out, "{indent}(hide replies)");
    }
}
