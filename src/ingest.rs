//! Paper corpus ingestion.
//!
//! Reads a JSON file of paper records, dedups by normalized title, embeds
//! anything that arrived without an inline vector, and stores papers plus
//! vectors in SQLite. Vectors are validated against `corpus.dims` up front —
//! a mixed-dimension corpus is rejected rather than discovered at query time.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::embedding::{self, vec_to_blob};

/// One record from the ingest file. `embedding` is optional: records
/// without one are embedded from `title` + `abstract` via the configured
/// provider.
#[derive(Debug, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

pub async fn run_ingest(
    config: &Config,
    file: &Path,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read ingest file: {}", file.display()))?;
    let mut records: Vec<PaperRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse ingest file: {}", file.display()))?;

    if let Some(lim) = limit {
        records.truncate(lim);
    }

    // Validate inline embeddings before touching the database
    for record in &records {
        if let Some(ref emb) = record.embedding {
            if emb.len() != config.corpus.dims {
                bail!(
                    "Paper '{}' has a {}-dim embedding, corpus.dims is {}",
                    record.title,
                    emb.len(),
                    config.corpus.dims
                );
            }
        }
    }

    let missing: usize = records.iter().filter(|r| r.embedding.is_none()).count();

    if dry_run {
        println!("ingest {} (dry-run)", file.display());
        println!("  records found: {}", records.len());
        println!("  inline embeddings: {}", records.len() - missing);
        println!("  to embed via provider: {}", missing);
        return Ok(());
    }

    if missing > 0 && !config.embedding.is_enabled() {
        bail!(
            "{} records have no inline embedding and no embedding provider is configured. \
             Set [embedding] provider in config or supply embeddings in the file.",
            missing
        );
    }

    let pool = db::connect(config).await?;

    let mut inserted = 0u64;
    let mut skipped = 0u64;
    let mut embedded = 0u64;

    // Embed records that arrived without vectors, in provider-sized batches.
    if missing > 0 {
        let provider = embedding::create_provider(&config.embedding)?;
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        for batch in pending.chunks(config.embedding.batch_size) {
            let texts: Vec<String> = batch
                .iter()
                .map(|&i| format!("{}\n\n{}", records[i].title, records[i].abstract_text))
                .collect();
            let vectors =
                embedding::embed_texts(provider.as_ref(), &config.embedding, &texts).await?;

            for (&i, vector) in batch.iter().zip(vectors.into_iter()) {
                if vector.len() != config.corpus.dims {
                    bail!(
                        "Provider returned a {}-dim embedding for '{}', corpus.dims is {}",
                        vector.len(),
                        records[i].title,
                        config.corpus.dims
                    );
                }
                records[i].embedding = Some(vector);
                embedded += 1;
            }
        }
    }

    for record in &records {
        let dedup_hash = title_hash(&record.title);

        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM papers WHERE dedup_hash = ?")
                .bind(&dedup_hash)
                .fetch_one(&pool)
                .await?;
        if exists {
            skipped += 1;
            continue;
        }

        insert_paper(&pool, config.corpus.dims, record, &dedup_hash).await?;
        inserted += 1;
    }

    println!("ingest {}", file.display());
    println!("  records: {}", records.len());
    println!("  inserted: {}", inserted);
    println!("  skipped (duplicate): {}", skipped);
    if config.embedding.is_enabled() {
        println!("  embedded via provider: {}", embedded);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn insert_paper(
    pool: &SqlitePool,
    dims: usize,
    record: &PaperRecord,
    dedup_hash: &str,
) -> Result<()> {
    let embedding = record
        .embedding
        .as_ref()
        .expect("record embedding resolved before insert");

    let paper_id = Uuid::new_v4().to_string();
    let authors_json = serde_json::to_string(&record.authors)?;
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO papers (id, title, authors_json, abstract, year, venue, url, created_at, dedup_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&paper_id)
    .bind(&record.title)
    .bind(&authors_json)
    .bind(&record.abstract_text)
    .bind(record.year)
    .bind(&record.venue)
    .bind(&record.url)
    .bind(now)
    .bind(dedup_hash)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO paper_vectors (paper_id, dims, embedding) VALUES (?, ?, ?)")
        .bind(&paper_id)
        .bind(dims as i64)
        .bind(vec_to_blob(embedding))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Dedup hash over the normalized title: lowercased, whitespace collapsed.
fn title_hash(title: &str) -> String {
    let normalized = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_hash_normalizes_case_and_whitespace() {
        let a = title_hash("Attention Is  All You Need");
        let b = title_hash("attention is all\tyou need");
        assert_eq!(a, b);
    }

    #[test]
    fn test_title_hash_distinguishes_titles() {
        assert_ne!(title_hash("BERT"), title_hash("GPT"));
    }

    #[test]
    fn test_record_parses_minimal_json() {
        let record: PaperRecord = serde_json::from_str(r#"{"title": "Some Paper"}"#).unwrap();
        assert_eq!(record.title, "Some Paper");
        assert!(record.authors.is_empty());
        assert!(record.embedding.is_none());
    }

    #[test]
    fn test_record_parses_abstract_field() {
        let record: PaperRecord = serde_json::from_str(
            r#"{"title": "T", "abstract": "about things", "embedding": [0.1, 0.2]}"#,
        )
        .unwrap();
        assert_eq!(record.abstract_text, "about things");
        assert_eq!(record.embedding.unwrap().len(), 2);
    }
}
