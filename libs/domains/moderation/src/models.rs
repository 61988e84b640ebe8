use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{ModerationError, ModerationResult};

/// Queue payload enqueued when a comment needs moderation.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationTask {
    pub comment_id: i64,
    /// Re-run moderation even if the comment already has a verdict.
    #[serde(default)]
    pub force: bool,
}

/// Moderation lifecycle of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

/// A blog comment as served by the platform API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Reject,
}

/// Persisted outcome of a moderation run.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationVerdict {
    pub verdict: Verdict,
    pub reason: Option<String>,
    /// Which model produced the verdict, for auditability.
    pub model: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    verdict: String,
    reason: Option<String>,
}

/// Extract a verdict from the model's reply.
///
/// Models wrap the JSON in prose or markdown fences often enough that we
/// parse the substring between the first `{` and the last `}` instead of
/// the whole reply.
pub fn parse_verdict(reply: &str) -> ModerationResult<(Verdict, Option<String>)> {
    let start = reply
        .find('{')
        .ok_or_else(|| ModerationError::InvalidVerdict("no JSON object in reply".to_string()))?;
    let end = reply
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ModerationError::InvalidVerdict("no JSON object in reply".to_string()))?;

    let raw: RawVerdict = serde_json::from_str(&reply[start..=end])
        .map_err(|e| ModerationError::InvalidVerdict(format!("malformed verdict JSON: {}", e)))?;

    let verdict = match raw.verdict.trim().to_lowercase().as_str() {
        "approve" | "approved" => Verdict::Approve,
        "reject" | "rejected" => Verdict::Reject,
        other => {
            return Err(ModerationError::InvalidVerdict(format!(
                "unknown verdict '{}'",
                other
            )))
        }
    };

    Ok((verdict, raw.reason))
}
