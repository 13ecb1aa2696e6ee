use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored scrape snapshot. A logical story accumulates a new row per
/// crawl; readers collapse rows sharing a title to the one with the
/// highest id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub hn_id: i64,
    pub title: String,
    pub link: String,
    pub article_rank: i64,
    pub content: String,
    pub summary: Option<String>,
    pub source: String,
    pub upvotes: Option<i64>,
    pub comment_count: Option<i64>,
    pub comment_link: Option<String>,
    pub flagged: bool,
    pub dead: bool,
    pub dupe: bool,
    pub commit_hash: Option<String>,
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A freshly scraped article, not yet inserted.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub hn_id: i64,
    pub title: String,
    pub link: String,
    pub article_rank: i64,
    pub content: String,
    pub source: String,
    pub upvotes: Option<i64>,
    pub comment_count: Option<i64>,
    pub comment_link: Option<String>,
    pub flagged: bool,
    pub dead: bool,
    pub dupe: bool,
}
