pub const SCHEMA: &str = r#"
-- articles table: one row per scrape snapshot, insert-only
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hn_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    link TEXT NOT NULL,
    article_rank INTEGER NOT NULL DEFAULT 0,
    content TEXT NOT NULL DEFAULT '',
    summary TEXT,
    source TEXT NOT NULL,
    upvotes INTEGER,
    comment_count INTEGER,
    comment_link TEXT,
    flagged INTEGER NOT NULL DEFAULT 0,
    dead INTEGER NOT NULL DEFAULT 0,
    dupe INTEGER NOT NULL DEFAULT 0,
    commit_hash TEXT,
    model_name TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- title groups snapshots of the same story; the read path dedups on it
CREATE INDEX IF NOT EXISTS idx_articles_title ON articles(title);
CREATE INDEX IF NOT EXISTS idx_articles_hn_id ON articles(hn_id);
"#;
