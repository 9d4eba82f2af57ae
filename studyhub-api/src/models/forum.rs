//! Discussions and threaded replies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Discussion {
    pub id: i64,
    pub author: i64,
    pub author_username: String,
    pub subject: Option<i64>,
    pub subject_name: Option<String>,
    pub title: String,
    pub content: String,
    pub reply_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discussion together with its reply tree
#[derive(Debug, Clone, Serialize)]
pub struct DiscussionDetail {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub replies: Vec<ReplyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Reply {
    pub id: i64,
    pub discussion: i64,
    pub author: i64,
    pub author_username: String,
    pub parent: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply with its nested children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyNode {
    #[serde(flatten)]
    pub reply: Reply,
    pub children: Vec<ReplyNode>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDiscussionRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subject: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDiscussionRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subject: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    pub content: Option<String>,
    pub parent: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscussionFilter {
    pub subject: Option<i64>,
    pub author: Option<i64>,
}

/// Build the reply forest from a flat list ordered by creation
///
/// Replies are indexed by id and grouped under their parent id; top-level
/// replies and replies whose parent is missing from the list become roots.
/// Sibling order follows the input order.
pub fn build_reply_tree(replies: Vec<Reply>) -> Vec<ReplyNode> {
    let known: HashMap<i64, usize> = replies
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.id, idx))
        .collect();

    let mut roots = Vec::new();
    let mut children: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, reply) in replies.iter().enumerate() {
        match reply.parent {
            Some(parent) if parent != reply.id && known.contains_key(&parent) => {
                children.entry(parent).or_default().push(idx)
            }
            _ => roots.push(idx),
        }
    }

    let mut slots: Vec<Option<Reply>> = replies.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|idx| assemble(idx, &mut slots, &children))
        .collect()
}

fn assemble(
    idx: usize,
    slots: &mut [Option<Reply>],
    children: &HashMap<i64, Vec<usize>>,
) -> Option<ReplyNode> {
    // Taking the slot means a malformed cycle can never be visited twice
    let reply = slots.get_mut(idx)?.take()?;
    let nested = children
        .get(&reply.id)
        .map(|kids| {
            kids.iter()
                .filter_map(|&child| assemble(child, slots, children))
                .collect()
        })
        .unwrap_or_default();

    Some(ReplyNode {
        reply,
        children: nested,
    })
}
