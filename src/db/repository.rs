use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, NewArticle};

use super::query::{ArticleQuery, CountColumn, FlagColumn, ARTICLE_COLUMNS};
use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Write path

    /// Insert a scraped batch as new rows; earlier snapshots of the same
    /// story are never touched. The batch runs in one transaction so a
    /// crash cannot expose a half-written generation; a single row's
    /// failure is logged and skipped without aborting the rest.
    /// Returns the number of rows actually inserted.
    pub async fn save_articles(&self, articles: Vec<NewArticle>) -> Result<usize> {
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0usize;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO articles (
                            hn_id, title, link, article_rank, content, source,
                            upvotes, comment_count, comment_link, flagged, dead, dupe
                         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    )?;
                    for article in &articles {
                        let result = stmt.execute(params![
                            article.hn_id,
                            article.title,
                            article.link,
                            article.article_rank,
                            article.content,
                            article.source,
                            article.upvotes,
                            article.comment_count,
                            article.comment_link,
                            article.flagged,
                            article.dead,
                            article.dupe,
                        ]);
                        match result {
                            Ok(_) => inserted += 1,
                            Err(e) => {
                                tracing::warn!("skipping article '{}': {}", article.title, e)
                            }
                        }
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }

    // Read path. All queries dedup by title (newest snapshot wins) and
    // page the final id-descending set.

    /// Current front page: deduplicated stories that have a real summary
    /// and are neither flagged, dead, nor dupes.
    pub async fn get_articles(&self, limit: i64, offset: i64) -> Result<Vec<Article>> {
        let query = ArticleQuery::new(limit, offset)
            .with_meaningful_summary()
            .with_flag(FlagColumn::Flagged, None)
            .with_flag(FlagColumn::Dead, None)
            .with_flag(FlagColumn::Dupe, None);
        self.query_articles(query).await
    }

    /// Moderation view: each axis matches a supplied value exactly, and
    /// defaults to requiring false when absent.
    pub async fn get_filtered_articles(
        &self,
        flagged: Option<bool>,
        dead: Option<bool>,
        dupe: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>> {
        let query = ArticleQuery::new(limit, offset)
            .with_flag(FlagColumn::Flagged, flagged)
            .with_flag(FlagColumn::Dead, dead)
            .with_flag(FlagColumn::Dupe, dupe);
        self.query_articles(query).await
    }

    /// Front page restricted to stories above minimum engagement counts.
    pub async fn get_articles_with_thresholds(
        &self,
        limit: i64,
        offset: i64,
        min_upvotes: i64,
        min_comments: i64,
    ) -> Result<Vec<Article>> {
        let query = ArticleQuery::new(limit, offset)
            .with_meaningful_summary()
            .with_flag(FlagColumn::Flagged, None)
            .with_flag(FlagColumn::Dead, None)
            .with_flag(FlagColumn::Dupe, None)
            .with_min(CountColumn::Upvotes, min_upvotes)
            .with_min(CountColumn::CommentCount, min_comments);
        self.query_articles(query).await
    }

    /// Thresholds combined with per-axis moderation filters, all inside
    /// the same dedup subquery.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_articles_with_thresholds_and_filters(
        &self,
        flagged: Option<bool>,
        dead: Option<bool>,
        dupe: Option<bool>,
        min_upvotes: i64,
        min_comments: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>> {
        let query = ArticleQuery::new(limit, offset)
            .with_meaningful_summary()
            .with_flag(FlagColumn::Flagged, flagged)
            .with_flag(FlagColumn::Dead, dead)
            .with_flag(FlagColumn::Dupe, dupe)
            .with_min(CountColumn::Upvotes, min_upvotes)
            .with_min(CountColumn::CommentCount, min_comments);
        self.query_articles(query).await
    }

    async fn query_articles(&self, query: ArticleQuery) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let (sql, params) = query.build();
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(rusqlite::params_from_iter(params), article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    // Summarizer surface: the summarizer runs out of process and only
    // ever writes the summary and its provenance.

    /// Snapshots still waiting for a summary, newest first.
    pub async fn get_articles_without_summary(&self, limit: i64) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles a \
                     WHERE summary IS NULL OR summary = '' \
                     ORDER BY a.id DESC LIMIT ?1"
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params![limit], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn update_summary(
        &self,
        id: i64,
        summary: String,
        commit_hash: Option<String>,
        model_name: Option<String>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET summary = ?1, commit_hash = ?2, model_name = ?3, \
                     updated_at = datetime('now') WHERE id = ?4",
                    params![summary, commit_hash, model_name, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn mark_article_dead(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET dead = 1, updated_at = datetime('now') WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn mark_article_dupe(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET dupe = 1, updated_at = datetime('now') WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        hn_id: row.get(1)?,
        title: row.get(2)?,
        link: row.get(3)?,
        article_rank: row.get(4)?,
        content: row.get(5)?,
        summary: row.get(6)?,
        source: row.get(7)?,
        upvotes: row.get(8)?,
        comment_count: row.get(9)?,
        comment_link: row.get(10)?,
        flagged: row.get::<_, i64>(11)? != 0,
        dead: row.get::<_, i64>(12)? != 0,
        dupe: row.get::<_, i64>(13)? != 0,
        commit_hash: row.get(14)?,
        model_name: row.get(15)?,
        created_at: row
            .get::<_, String>(16)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(17)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::NO_SUMMARY_PLACEHOLDER;

    async fn test_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        (dir, repo)
    }

    fn stub(title: &str) -> NewArticle {
        NewArticle {
            hn_id: 1,
            title: title.to_string(),
            link: format!("https://example.com/{}", title.replace(' ', "-")),
            article_rank: 1,
            content: "content".to_string(),
            source: "Hacker News".to_string(),
            upvotes: Some(1),
            comment_count: Some(1),
            comment_link: None,
            flagged: false,
            dead: false,
            dupe: false,
        }
    }

    /// Give every unsummarized row a real summary.
    async fn summarize_all(repo: &Repository) {
        for article in repo.get_articles_without_summary(1000).await.unwrap() {
            repo.update_summary(article.id, format!("summary of {}", article.title), None, None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn save_returns_inserted_count() {
        let (_dir, repo) = test_repo().await;
        let n = repo
            .save_articles(vec![stub("one"), stub("two")])
            .await
            .unwrap();
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn dedup_returns_newest_snapshot_per_title() {
        let (_dir, repo) = test_repo().await;
        let mut old = stub("story");
        old.content = "old content".to_string();
        repo.save_articles(vec![old]).await.unwrap();
        let mut new = stub("story");
        new.content = "new content".to_string();
        repo.save_articles(vec![new]).await.unwrap();
        summarize_all(&repo).await;

        let articles = repo.get_articles(30, 0).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].content, "new content");
        assert_eq!(articles[0].id, 2);
    }

    #[tokio::test]
    async fn rows_without_meaningful_summary_are_hidden() {
        let (_dir, repo) = test_repo().await;
        repo.save_articles(vec![stub("unsummarized"), stub("placeholder"), stub("empty")])
            .await
            .unwrap();
        // id order follows batch order: 1, 2, 3
        repo.update_summary(2, NO_SUMMARY_PLACEHOLDER.to_string(), None, None)
            .await
            .unwrap();
        repo.update_summary(3, String::new(), None, None).await.unwrap();

        assert!(repo.get_articles(30, 0).await.unwrap().is_empty());

        // The moderation view has no summary requirement.
        let filtered = repo
            .get_filtered_articles(None, None, None, 30, 0)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[tokio::test]
    async fn absent_filter_requires_false() {
        let (_dir, repo) = test_repo().await;
        let mut flagged = stub("flagged story");
        flagged.flagged = true;
        repo.save_articles(vec![flagged, stub("clean story")])
            .await
            .unwrap();
        summarize_all(&repo).await;

        let default_view = repo
            .get_filtered_articles(None, None, None, 30, 0)
            .await
            .unwrap();
        assert_eq!(default_view.len(), 1);
        assert_eq!(default_view[0].title, "clean story");

        let flagged_view = repo
            .get_filtered_articles(Some(true), None, None, 30, 0)
            .await
            .unwrap();
        assert_eq!(flagged_view.len(), 1);
        assert_eq!(flagged_view[0].title, "flagged story");

        // The quality view also hides the flagged row.
        let front_page = repo.get_articles(30, 0).await.unwrap();
        assert_eq!(front_page.len(), 1);
        assert_eq!(front_page[0].title, "clean story");
    }

    #[tokio::test]
    async fn thresholds_select_exactly_the_qualifying_rows() {
        let (_dir, repo) = test_repo().await;
        let counts = [(5, 2), (10, 5), (15, 8), (3, 1)];
        let batch: Vec<NewArticle> = counts
            .iter()
            .enumerate()
            .map(|(i, (up, com))| {
                let mut a = stub(&format!("story {}", i));
                a.upvotes = Some(*up);
                a.comment_count = Some(*com);
                a
            })
            .collect();
        repo.save_articles(batch).await.unwrap();
        summarize_all(&repo).await;

        let hits = repo
            .get_articles_with_thresholds(10, 0, 10, 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        // id-descending: story 2 (15, 8) before story 1 (10, 5)
        assert_eq!(hits[0].title, "story 2");
        assert_eq!(hits[1].title, "story 1");
    }

    #[tokio::test]
    async fn zero_thresholds_match_the_plain_query() {
        let (_dir, repo) = test_repo().await;
        let mut uncounted = stub("never voted");
        uncounted.upvotes = None;
        uncounted.comment_count = None;
        repo.save_articles(vec![uncounted, stub("voted")]).await.unwrap();
        summarize_all(&repo).await;

        let plain = repo.get_articles(30, 0).await.unwrap();
        let thresholded = repo
            .get_articles_with_thresholds(30, 0, 0, 0)
            .await
            .unwrap();

        assert_eq!(plain.len(), 2);
        let plain_ids: Vec<i64> = plain.iter().map(|a| a.id).collect();
        let thresholded_ids: Vec<i64> = thresholded.iter().map(|a| a.id).collect();
        assert_eq!(plain_ids, thresholded_ids);
    }

    #[tokio::test]
    async fn thresholds_compose_with_moderation_filters() {
        let (_dir, repo) = test_repo().await;
        let mut hot_flagged = stub("hot flagged");
        hot_flagged.flagged = true;
        hot_flagged.upvotes = Some(50);
        hot_flagged.comment_count = Some(20);
        let mut cold_flagged = stub("cold flagged");
        cold_flagged.flagged = true;
        cold_flagged.upvotes = Some(2);
        cold_flagged.comment_count = Some(0);
        repo.save_articles(vec![hot_flagged, cold_flagged])
            .await
            .unwrap();
        summarize_all(&repo).await;

        let hits = repo
            .get_articles_with_thresholds_and_filters(Some(true), None, None, 10, 5, 30, 0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "hot flagged");

        let none = repo
            .get_articles_with_thresholds_and_filters(Some(true), None, None, 100, 5, 30, 0)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn pagination_slices_the_ordered_set() {
        let (_dir, repo) = test_repo().await;
        let batch: Vec<NewArticle> = (0..5).map(|i| stub(&format!("story {}", i))).collect();
        repo.save_articles(batch).await.unwrap();
        summarize_all(&repo).await;

        let page = |articles: Vec<Article>| -> Vec<i64> { articles.iter().map(|a| a.id).collect() };

        assert_eq!(page(repo.get_articles(2, 0).await.unwrap()), [5, 4]);
        assert_eq!(page(repo.get_articles(2, 2).await.unwrap()), [3, 2]);
        assert_eq!(page(repo.get_articles(2, 4).await.unwrap()), [1]);
        assert!(repo.get_articles(2, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_updates_carry_provenance() {
        let (_dir, repo) = test_repo().await;
        repo.save_articles(vec![stub("story")]).await.unwrap();

        let pending = repo.get_articles_without_summary(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        let id = pending[0].id;

        repo.update_summary(
            id,
            "a summary".to_string(),
            Some("abc123".to_string()),
            Some("some-model".to_string()),
        )
        .await
        .unwrap();

        assert!(repo.get_articles_without_summary(10).await.unwrap().is_empty());

        let articles = repo.get_articles(30, 0).await.unwrap();
        assert_eq!(articles[0].summary.as_deref(), Some("a summary"));
        assert_eq!(articles[0].commit_hash.as_deref(), Some("abc123"));
        assert_eq!(articles[0].model_name.as_deref(), Some("some-model"));
    }

    #[tokio::test]
    async fn moderation_marks_move_rows_out_of_the_default_view() {
        let (_dir, repo) = test_repo().await;
        repo.save_articles(vec![stub("story a"), stub("story b")])
            .await
            .unwrap();
        summarize_all(&repo).await;

        repo.mark_article_dead(1).await.unwrap();
        repo.mark_article_dupe(2).await.unwrap();

        assert!(repo.get_articles(30, 0).await.unwrap().is_empty());

        let dead = repo
            .get_filtered_articles(None, Some(true), None, 30, 0)
            .await
            .unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].title, "story a");

        let dupes = repo
            .get_filtered_articles(None, None, Some(true), 30, 0)
            .await
            .unwrap();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].title, "story b");
    }

    #[tokio::test]
    async fn nullable_counts_round_trip_as_none() {
        let (_dir, repo) = test_repo().await;
        let mut a = stub("jobs post");
        a.upvotes = None;
        a.comment_count = None;
        a.comment_link = None;
        repo.save_articles(vec![a]).await.unwrap();

        let rows = repo.get_articles_without_summary(10).await.unwrap();
        assert_eq!(rows[0].upvotes, None);
        assert_eq!(rows[0].comment_count, None);
        assert_eq!(rows[0].comment_link, None);
    }
}
