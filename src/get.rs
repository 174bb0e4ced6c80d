//! Paper retrieval by ID.
//!
//! Fetches a single paper's metadata and embedding status from the database.
//! Used by the `pscout get` CLI command.

use anyhow::{bail, Result};
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::models::Paper;

/// Core get function returning structured data.
pub async fn get_paper(config: &Config, id: &str) -> Result<(Paper, bool)> {
    let pool = db::connect(config).await?;

    let row = sqlx::query(
        "SELECT id, title, authors_json, abstract, year, venue, url FROM papers WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => {
            pool.close().await;
            bail!("paper not found: {}", id);
        }
    };

    let authors_json: String = row.get("authors_json");
    let authors: Vec<String> = serde_json::from_str(&authors_json).unwrap_or_default();

    let embedded: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM paper_vectors WHERE paper_id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await?;

    let paper = Paper {
        id: row.get("id"),
        title: row.get("title"),
        authors,
        abstract_text: row.get("abstract"),
        year: row.get("year"),
        venue: row.get("venue"),
        url: row.get("url"),
    };

    pool.close().await;
    Ok((paper, embedded))
}

/// CLI entry point: fetch a paper and print it.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let (paper, embedded) = get_paper(config, id).await?;

    println!("id:       {}", paper.id);
    println!("title:    {}", paper.title);
    if !paper.authors.is_empty() {
        println!("authors:  {}", paper.authors.join(", "));
    }
    if let Some(year) = paper.year {
        println!("year:     {}", year);
    }
    if let Some(ref venue) = paper.venue {
        println!("venue:    {}", venue);
    }
    if let Some(ref url) = paper.url {
        println!("url:      {}", url);
    }
    println!("embedded: {}", if embedded { "yes" } else { "no" });

    if !paper.abstract_text.is_empty() {
        println!();
        println!("{}", paper.abstract_text);
    }

    Ok(())
}
