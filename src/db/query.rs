use rusqlite::types::Value;

/// Placeholder the summarizers write when a model produced nothing usable.
/// Rows carrying it do not count as summarized.
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary available";

/// Column list shared by every article SELECT, in `article_from_row` order.
pub(crate) const ARTICLE_COLUMNS: &str = "a.id, a.hn_id, a.title, a.link, a.article_rank, \
     a.content, a.summary, a.source, a.upvotes, a.comment_count, a.comment_link, \
     a.flagged, a.dead, a.dupe, a.commit_hash, a.model_name, a.created_at, a.updated_at";

#[derive(Debug, Clone, Copy)]
pub(crate) enum FlagColumn {
    Flagged,
    Dead,
    Dupe,
}

impl FlagColumn {
    fn as_str(self) -> &'static str {
        match self {
            FlagColumn::Flagged => "flagged",
            FlagColumn::Dead => "dead",
            FlagColumn::Dupe => "dupe",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CountColumn {
    Upvotes,
    CommentCount,
}

impl CountColumn {
    fn as_str(self) -> &'static str {
        match self {
            CountColumn::Upvotes => "upvotes",
            CountColumn::CommentCount => "comment_count",
        }
    }
}

/// Builds the shared deduplicating read query.
///
/// Predicates narrow the candidate snapshot rows; within the survivors the
/// newest row per title wins, is joined back to its full data, and the
/// final set pages in id-descending order. Only clause presence varies
/// between calls; every value travels as a bound parameter.
#[derive(Debug)]
pub(crate) struct ArticleQuery {
    conditions: Vec<String>,
    params: Vec<Value>,
    limit: i64,
    offset: i64,
}

impl ArticleQuery {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            conditions: Vec::new(),
            params: Vec::new(),
            limit,
            offset,
        }
    }

    /// Require a real summary: present, non-empty, not the placeholder.
    pub fn with_meaningful_summary(mut self) -> Self {
        self.conditions
            .push("summary IS NOT NULL AND summary != '' AND summary != ?".to_string());
        self.params
            .push(Value::from(NO_SUMMARY_PLACEHOLDER.to_string()));
        self
    }

    /// Tri-state moderation filter: a supplied value must match exactly;
    /// an absent one defaults to requiring false.
    pub fn with_flag(mut self, column: FlagColumn, required: Option<bool>) -> Self {
        self.conditions.push(format!("{} = ?", column.as_str()));
        self.params.push(Value::from(required.unwrap_or(false)));
        self
    }

    /// Minimum numeric bound. Zero adds no clause at all, so rows whose
    /// count was never scraped (NULL) are not excluded by a no-op bound.
    pub fn with_min(mut self, column: CountColumn, min: i64) -> Self {
        if min > 0 {
            self.conditions.push(format!("{} >= ?", column.as_str()));
            self.params.push(Value::from(min));
        }
        self
    }

    pub fn build(self) -> (String, Vec<Value>) {
        let where_clause = if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", self.conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} \
             FROM articles a \
             JOIN (SELECT title, MAX(id) AS id FROM articles {where_clause}GROUP BY title) latest \
               ON a.id = latest.id \
             ORDER BY a.id DESC \
             LIMIT ? OFFSET ?"
        );

        let mut params = self.params;
        params.push(Value::from(self.limit));
        params.push(Value::from(self.offset));

        (sql, params)
    }
}
