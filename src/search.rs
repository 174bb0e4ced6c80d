//! Search orchestration for the CLI.
//!
//! One-shot `search` embeds the query, pulls oversampled candidates from the
//! flat index, blends them against the (single-query) session context, and
//! prints the top results. `chat` keeps one [`ContextEngine`] alive across
//! queries so the session history actually accumulates, the way the HTTP
//! server does per session.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use std::io::{BufRead, Write};

use crate::config::Config;
use crate::context::ContextEngine;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::index::FlatIndex;
use crate::models::SearchHit;
use crate::rerank::{rerank, ScoredCandidate};

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    ensure_embeddings(config)?;

    let pool = db::connect(config).await?;
    let index = FlatIndex::load(&pool, config.corpus.dims).await?;
    if index.is_empty() {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let mut engine = ContextEngine::from_config(&config.context);

    let top_k = limit.unwrap_or(config.retrieval.top_k);
    let hits = execute_query(
        config,
        &pool,
        &index,
        provider.as_ref(),
        &mut engine,
        query,
        top_k,
    )
    .await?;

    if hits.is_empty() {
        println!("No results.");
    } else {
        print_hits(&hits);
    }

    pool.close().await;
    Ok(())
}

/// Interactive session: queries share one context engine, so each search is
/// nudged by the ones before it. `exit` or EOF ends the session.
pub async fn run_chat(config: &Config) -> Result<()> {
    ensure_embeddings(config)?;

    let pool = db::connect(config).await?;
    let index = FlatIndex::load(&pool, config.corpus.dims).await?;
    if index.is_empty() {
        println!("Corpus is empty. Run `pscout ingest` first.");
        pool.close().await;
        return Ok(());
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let mut engine = ContextEngine::from_config(&config.context);

    println!(
        "Chat session over {} papers (history: {}, alpha: {}). Type 'exit' to quit.",
        index.len(),
        config.context.max_history,
        config.context.alpha
    );

    let stdin = std::io::stdin();
    loop {
        print!("query> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }

        let hits = execute_query(
            config,
            &pool,
            &index,
            provider.as_ref(),
            &mut engine,
            query,
            config.retrieval.top_k,
        )
        .await?;

        if hits.is_empty() {
            println!("No results.");
            continue;
        }

        println!();
        print_hits(&hits);

        // A second view ranked purely by raw relevance, ignoring session
        // context — useful when the conversation has drifted.
        let mut by_relevance = hits.clone();
        by_relevance.sort_by(|a, b| {
            b.base_score
                .partial_cmp(&a.base_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        by_relevance.truncate(3);

        println!("Top by pure relevance:");
        for (i, hit) in by_relevance.iter().enumerate() {
            println!("  {}. [{:.3}] {}", i + 1, hit.base_score, hit.title);
        }
        println!();
    }

    pool.close().await;
    Ok(())
}

/// Embed one query, update the session context, and return the contextual
/// top `top_k` hits with metadata attached.
async fn execute_query(
    config: &Config,
    pool: &SqlitePool,
    index: &FlatIndex,
    provider: &dyn EmbeddingProvider,
    engine: &mut ContextEngine,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>> {
    let query_vec = embedding::embed_query(provider, &config.embedding, query).await?;

    engine.add_query(query_vec.clone())?;
    let context = engine.context_vector();

    let candidate_k = top_k * config.retrieval.candidate_multiplier;
    let candidates = index.search(&query_vec, candidate_k)?;

    let ranked = rerank(&candidates, context.as_deref())?;
    let mut top = ranked.by_context();
    top.truncate(top_k);

    hydrate(pool, &top).await
}

/// Merge paper metadata into scored candidates. A candidate whose paper row
/// is missing is a corpus integrity failure and propagates as an error.
pub(crate) async fn hydrate(
    pool: &SqlitePool,
    scored: &[ScoredCandidate],
) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::with_capacity(scored.len());

    for candidate in scored {
        let row = sqlx::query("SELECT id, title, authors_json, year, venue, url FROM papers WHERE id = ?")
            .bind(&candidate.paper_id)
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            bail!(
                "Paper {} has a vector but no metadata row",
                candidate.paper_id
            );
        };

        let authors_json: String = row.get("authors_json");
        let authors: Vec<String> = serde_json::from_str(&authors_json).unwrap_or_default();

        hits.push(SearchHit {
            id: row.get("id"),
            title: row.get("title"),
            authors,
            year: row.get("year"),
            venue: row.get("venue"),
            url: row.get("url"),
            base_score: candidate.base_score,
            score: candidate.final_score,
        });
    }

    Ok(hits)
}

fn ensure_embeddings(config: &Config) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Search requires embeddings. Set [embedding] provider in config.");
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    for (i, hit) in hits.iter().enumerate() {
        let year_display = hit
            .year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();

        println!(
            "{}. [{:.3} / base {:.3}] {}{}",
            i + 1,
            hit.score,
            hit.base_score,
            hit.title,
            year_display
        );
        if !hit.authors.is_empty() {
            println!("    authors: {}", hit.authors.join(", "));
        }
        if let Some(ref venue) = hit.venue {
            println!("    venue: {}", venue);
        }
        if let Some(ref url) = hit.url {
            println!("    url: {}", url);
        }
        println!("    id: {}", hit.id);
        println!();
    }
}
