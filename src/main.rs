use std::time::Duration;

mod config;
mod crawler;
mod db;
mod error;
mod models;

use config::Config;
use crawler::Crawler;
use db::Repository;
use error::{AppError, Result};

const DEFAULT_LIMIT: i64 = 30;
const DEFAULT_OFFSET: i64 = 0;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and up by default, RUST_LOG overrides)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Check for --list flag (print the stored front page, no crawl)
    let list_only = args.len() >= 2 && args[1] == "--list";

    let config = Config::load()?;
    let repository = Repository::new(&config.db_path).await?;

    if list_only {
        let articles = repository
            .get_articles(DEFAULT_LIMIT, DEFAULT_OFFSET)
            .await?;
        for article in &articles {
            println!("{:>8}  {}", article.id, article.title);
            println!("          {}", article.link);
        }
        println!("{} articles", articles.len());
        return Ok(());
    }

    // Ingestion run: one scrape, one batch save.
    let crawler = Crawler::new(&config);
    let deadline = Duration::from_secs(config.scrape_timeout_secs);
    let articles = tokio::time::timeout(deadline, crawler.scrape())
        .await
        .map_err(|_| {
            AppError::Crawl(format!(
                "scrape exceeded {}s deadline",
                config.scrape_timeout_secs
            ))
        })??;

    let inserted = repository.save_articles(articles).await?;
    println!("Saved {} articles", inserted);

    Ok(())
}
