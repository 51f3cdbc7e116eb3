use serde::{Deserialize, Serialize};

/// One decoded unit from the streaming feed. Immutable once decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    pub text: String,
    #[serde(rename = "edit_history_tweet_ids", default)]
    pub edit_history_ids: Vec<String>,
}

/// Wire envelope around a single stream line.
#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    pub data: Record,
}

/// Aggregate statistics served by `GET /stats`. Built fresh per request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub count: usize,
    pub top_hashtags: Vec<String>,
    pub top_mentions: Vec<String>,
    pub as_of: String,
}
