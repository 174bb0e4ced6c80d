//! Corpus overview.
//!
//! Quick summary of what's indexed: paper counts, embedding coverage, and
//! database size. Used by `pscout stats` to give confidence that ingests
//! are working as expected.

use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_papers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM papers")
        .fetch_one(&pool)
        .await?;

    let total_embedded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paper_vectors")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Paper Scout — Corpus Stats");
    println!("==========================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Papers:     {}", total_papers);
    println!(
        "  Embedded:   {} / {} ({}%)",
        total_embedded,
        total_papers,
        if total_papers > 0 {
            (total_embedded * 100) / total_papers
        } else {
            0
        }
    );
    println!("  Dims:       {}", config.corpus.dims);
    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
