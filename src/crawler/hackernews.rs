use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::Config;
use crate::crawler::normalizer::{self, MAX_CONTENT_CHARS};
use crate::error::{AppError, Result};
use crate::models::NewArticle;

const SOURCE_NAME: &str = "Hacker News";

pub struct Crawler {
    client: Client,
    seed_url: String,
    fetch_concurrency: usize,
}

/// A listing row before its content has been fetched.
#[derive(Debug, Clone, PartialEq)]
struct ArticleStub {
    hn_id: i64,
    title: String,
    link: String,
    article_rank: i64,
    upvotes: Option<i64>,
    comment_count: Option<i64>,
    comment_link: Option<String>,
    flagged: bool,
    dead: bool,
    dupe: bool,
}

impl Crawler {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("hn-brief/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            seed_url: config.seed_url.clone(),
            fetch_concurrency: config.fetch_concurrency.max(1),
        }
    }

    /// Scrape the seed page and return articles ready for insertion.
    ///
    /// A failure to fetch or read the seed page is fatal; a failure on any
    /// individual article drops only that article.
    pub async fn scrape(&self) -> Result<Vec<NewArticle>> {
        let response = self
            .client
            .get(&self.seed_url)
            .send()
            .await
            .map_err(|e| AppError::Crawl(format!("failed to fetch {}: {}", self.seed_url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Crawl(format!(
                "seed page {} returned HTTP {}",
                self.seed_url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Crawl(format!("failed to read seed page: {}", e)))?;

        let stubs = parse_listing(&body);
        tracing::info!("found {} listing rows on {}", stubs.len(), self.seed_url);

        let mut articles: Vec<NewArticle> = stream::iter(stubs)
            .map(|stub| self.fetch_article(stub))
            .buffered(self.fetch_concurrency)
            .filter_map(|article| async { article })
            .collect()
            .await;

        // Insert the bottom of the listing first so the top story ends up
        // with the highest id; ORDER BY id DESC then reads top-first.
        articles.reverse();

        Ok(articles)
    }

    async fn fetch_article(&self, stub: ArticleStub) -> Option<NewArticle> {
        if !has_http_scheme(&stub.link) {
            tracing::debug!("skipping unsupported protocol for {}", stub.link);
            return None;
        }

        let content = match self.fetch_content(&stub.link).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("dropping {}: {}", stub.link, e);
                return None;
            }
        };

        Some(NewArticle {
            hn_id: stub.hn_id,
            title: stub.title,
            link: stub.link,
            article_rank: stub.article_rank,
            content,
            source: SOURCE_NAME.to_string(),
            upvotes: stub.upvotes,
            comment_count: stub.comment_count,
            comment_link: stub.comment_link,
            flagged: stub.flagged,
            dead: stub.dead,
            dupe: stub.dupe,
        })
    }

    async fn fetch_content(&self, link: &str) -> Result<String> {
        let response = self.client.get(link).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Crawl(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await?;
        let text = normalizer::normalize(&bytes);
        Ok(normalizer::truncate(&text, MAX_CONTENT_CHARS))
    }
}

/// Extract article stubs from the front-page HTML, in listing order.
fn parse_listing(html: &str) -> Vec<ArticleStub> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr.athing").unwrap();
    let titleline_selector = Selector::parse("td.title > span.titleline").unwrap();
    let title_selector = Selector::parse("td.title > span.titleline > a").unwrap();
    let rank_selector = Selector::parse("td.title > span.rank").unwrap();
    let score_selector = Selector::parse(".score").unwrap();
    let anchor_selector = Selector::parse("a").unwrap();

    let mut stubs = Vec::new();

    for row in document.select(&row_selector) {
        let title_el = match row.select(&title_selector).next() {
            Some(el) => el,
            None => continue,
        };
        let title = title_el.text().collect::<String>().trim().to_string();
        let link = title_el
            .value()
            .attr("href")
            .unwrap_or_default()
            .to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }

        let subtext = next_element_sibling(row);

        // Row id attribute carries the item id; fall back to the
        // item?id= comment link when it is missing.
        let hn_id = row
            .value()
            .attr("id")
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| subtext.and_then(|s| hn_id_from_item_link(s, &anchor_selector)));
        let hn_id = match hn_id {
            Some(id) => id,
            None => continue,
        };

        let article_rank = row
            .select(&rank_selector)
            .next()
            .map(|el| first_number(&el.text().collect::<String>()))
            .unwrap_or(0);

        let titleline_text = row
            .select(&titleline_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();

        let mut upvotes = None;
        let mut comment_count = None;
        let mut comment_link = None;
        if let Some(subtext) = subtext {
            upvotes = subtext
                .select(&score_selector)
                .next()
                .map(|el| first_number(&el.text().collect::<String>()));

            let comments_el = subtext
                .select(&anchor_selector)
                .find(|a| a.text().collect::<String>().contains("comment"));
            if let Some(a) = comments_el {
                comment_count = Some(first_number(&a.text().collect::<String>()));
                comment_link = a.value().attr("href").map(str::to_string);
            }
        }

        stubs.push(ArticleStub {
            hn_id,
            title,
            link,
            article_rank,
            upvotes,
            comment_count,
            comment_link,
            flagged: titleline_text.contains("[flagged]"),
            dead: titleline_text.contains("[dead]"),
            dupe: titleline_text.contains("[dupe]"),
        });
    }

    stubs
}

fn has_http_scheme(link: &str) -> bool {
    matches!(Url::parse(link), Ok(url) if matches!(url.scheme(), "http" | "https"))
}

fn next_element_sibling(row: ElementRef) -> Option<ElementRef> {
    let mut node = row.next_sibling();
    while let Some(n) = node {
        if let Some(el) = ElementRef::wrap(n) {
            return Some(el);
        }
        node = n.next_sibling();
    }
    None
}

fn hn_id_from_item_link(subtext: ElementRef, anchor_selector: &Selector) -> Option<i64> {
    let re = Regex::new(r"item\?id=(\d+)").unwrap();
    subtext.select(anchor_selector).find_map(|a| {
        let href = a.value().attr("href")?;
        re.captures(href)?.get(1)?.as_str().parse().ok()
    })
}

fn first_number(text: &str) -> i64 {
    let re = Regex::new(r"\d+").unwrap();
    re.find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
