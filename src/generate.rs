//! Top-level generation API.
//!
//! [`generate`] drives a whole source: page selection, the per-page budget
//! or single-block batching, progress events, and statistics. The
//! per-batch retry loop lives in [`crate::pipeline::llm`].

use crate::config::{GenerationConfig, GenerationRequest};
use crate::content::SourceContent;
use crate::error::{GeneratorError, QuizForgeError};
use crate::generator::{CompletionRequest, TextGenerator};
use crate::output::{
    ChunkResult, GenerationOutput, GenerationStats, QuestionRecord, SkipReason,
};
use crate::pipeline::chunk::batch_count;
use crate::pipeline::llm::{backoff_delay_ms, generate_batch, BatchLabel};
use crate::pipeline::pages::select_pages;
use crate::prompts::{study_material_prompt, STUDY_SYSTEM_PROMPT};
use std::path::Path;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{info, warn};

/// Generate questions for one source.
///
/// Never fails because the model misbehaved: batches that exhaust their
/// retries contribute nothing and the run carries on. An empty
/// [`GenerationOutput`] is a valid result; use
/// [`GenerationOutput::into_result`] to treat it as an error.
///
/// # Errors
/// Only [`QuizForgeError::InvalidRequest`] when `source_id` is blank.
pub async fn generate(
    generator: &dyn TextGenerator,
    content: &SourceContent,
    request: &GenerationRequest,
    source_id: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, QuizForgeError> {
    let source_id = source_id.trim();
    if source_id.is_empty() {
        return Err(QuizForgeError::InvalidRequest(
            "source_id must not be empty".into(),
        ));
    }

    let start = Instant::now();
    info!(
        "Generating questions for '{}' ({} per chunk, limit {:?})",
        source_id,
        request.questions_per_chunk(),
        request.total_limit()
    );

    let (questions, chunks) = match content {
        SourceContent::Paginated(pages) => {
            generate_paginated(generator, pages, request, source_id, config).await
        }
        SourceContent::SingleBlock(text) => {
            generate_single_block(generator, text, request, source_id, config).await
        }
        SourceContent::Unavailable => {
            warn!("No text could be extracted for '{}'; nothing to do", source_id);
            notify_start(config, 0);
            (Vec::new(), Vec::new())
        }
    };

    let stats = compute_stats(&questions, &chunks, start.elapsed().as_millis() as u64);
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(stats.selected_chunks, stats.total_questions);
    }

    info!(
        "Generated {} questions for '{}' from {}/{} chunks in {}ms",
        stats.total_questions,
        source_id,
        stats.productive_chunks,
        stats.selected_chunks,
        stats.total_duration_ms
    );
    if stats.failed_chunks > 0 {
        warn!("{} chunk(s) produced no questions", stats.failed_chunks);
    }

    Ok(GenerationOutput {
        source_id: source_id.to_string(),
        questions,
        chunks,
        stats,
    })
}

fn notify_start(config: &GenerationConfig, total: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(total);
    }
}

fn skipped_chunk(
    config: &GenerationConfig,
    page_number: usize,
    total: usize,
    reason: SkipReason,
) -> ChunkResult {
    if let Some(ref cb) = config.progress_callback {
        let why = match reason {
            SkipReason::EmptyText => "no text",
            SkipReason::BudgetExhausted => "question limit reached",
        };
        cb.on_chunk_skipped(page_number, total, why);
    }
    ChunkResult {
        page_number,
        requested: 0,
        accepted: 0,
        batches: Vec::new(),
        skipped: Some(reason),
    }
}

/// One batch per selected page, each sized from what the global limit
/// still allows.
async fn generate_paginated(
    generator: &dyn TextGenerator,
    pages: &[String],
    request: &GenerationRequest,
    source_id: &str,
    config: &GenerationConfig,
) -> (Vec<QuestionRecord>, Vec<ChunkResult>) {
    let selected = select_pages(request.page_spec(), pages.len());
    let total = selected.len();
    info!("Processing {} of {} pages", total, pages.len());
    notify_start(config, total);

    let limit = request.total_limit();
    let mut questions: Vec<QuestionRecord> = Vec::new();
    let mut chunks = Vec::with_capacity(total);

    for idx in selected {
        let page_number = idx + 1;
        let remaining = limit.map(|l| l.saturating_sub(questions.len()));

        if remaining == Some(0) {
            chunks.push(skipped_chunk(config, page_number, total, SkipReason::BudgetExhausted));
            continue;
        }
        let text = &pages[idx];
        if text.trim().is_empty() {
            info!("Page {} has no text; skipping", page_number);
            chunks.push(skipped_chunk(config, page_number, total, SkipReason::EmptyText));
            continue;
        }

        let n = match remaining {
            Some(r) => request.questions_per_chunk().min(r),
            None => request.questions_per_chunk(),
        };
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(page_number, total, n);
        }

        let label = BatchLabel {
            page_number,
            batch_number: None,
        };
        let batch = generate_batch(generator, text, n, label, config).await;

        let mut records: Vec<QuestionRecord> = batch
            .questions
            .iter()
            .cloned()
            .map(|q| q.into_record(source_id, page_number))
            .collect();
        if let Some(r) = remaining {
            records.truncate(r);
        }
        let accepted = records.len();
        questions.extend(records);

        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_complete(page_number, total, accepted);
        }
        chunks.push(ChunkResult {
            page_number,
            requested: n,
            accepted,
            batches: vec![batch],
            skipped: None,
        });
    }

    (questions, chunks)
}

/// Fixed number of batches over the whole text, each asking for what is
/// still missing. Page selection does not apply; every record gets page 1.
async fn generate_single_block(
    generator: &dyn TextGenerator,
    text: &str,
    request: &GenerationRequest,
    source_id: &str,
    config: &GenerationConfig,
) -> (Vec<QuestionRecord>, Vec<ChunkResult>) {
    const PAGE: usize = 1;

    if let Some(spec) = request.page_spec() {
        info!("Page selection '{}' ignored for single-block source", spec);
    }
    notify_start(config, 1);

    if text.trim().is_empty() {
        return (
            Vec::new(),
            vec![skipped_chunk(config, PAGE, 1, SkipReason::EmptyText)],
        );
    }

    let target = request
        .total_limit()
        .unwrap_or_else(|| request.questions_per_chunk());
    let batch_total = batch_count(target, config.max_batch_size);
    info!(
        "Generating {} questions in {} batch(es) of up to {}",
        target, batch_total, config.max_batch_size
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_start(PAGE, 1, target);
    }

    let mut questions: Vec<QuestionRecord> = Vec::new();
    let mut batches = Vec::new();

    for batch_index in 0..batch_total {
        let missing = target - questions.len();
        if missing == 0 {
            break;
        }
        let n = config.max_batch_size.min(missing);
        let label = BatchLabel {
            page_number: PAGE,
            batch_number: (batch_total > 1).then_some(batch_index + 1),
        };
        let batch = generate_batch(generator, text, n, label, config).await;
        let exhausted = batch.questions.is_empty();
        questions.extend(
            batch
                .questions
                .iter()
                .take(missing)
                .cloned()
                .map(|q| q.into_record(source_id, PAGE)),
        );
        batches.push(batch);

        // Stop once a batch comes back empty after every retry.
        if exhausted {
            warn!("{}: no questions after all attempts; stopping", label);
            break;
        }
    }

    if questions.len() < target {
        warn!(
            "Generated {} of {} questions after {} batch(es)",
            questions.len(),
            target,
            batches.len()
        );
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_complete(PAGE, 1, questions.len());
    }

    let chunk = ChunkResult {
        page_number: PAGE,
        requested: target,
        accepted: questions.len(),
        batches,
        skipped: None,
    };
    (questions, vec![chunk])
}

fn compute_stats(
    questions: &[QuestionRecord],
    chunks: &[ChunkResult],
    total_duration_ms: u64,
) -> GenerationStats {
    let mut stats = GenerationStats {
        selected_chunks: chunks.len(),
        total_questions: questions.len(),
        total_duration_ms,
        ..Default::default()
    };
    for chunk in chunks {
        if chunk.skipped.is_some() {
            stats.skipped_chunks += 1;
        } else if chunk.accepted > 0 {
            stats.productive_chunks += 1;
        } else {
            stats.failed_chunks += 1;
        }
        stats.requested_questions = stats.requested_questions.saturating_add(chunk.requested);
        for batch in &chunk.batches {
            stats.total_batches += 1;
            stats.total_attempts += batch.attempts as u64;
            stats.rejected_candidates += batch.rejected;
            stats.total_input_tokens += batch.input_tokens as u64;
            stats.total_output_tokens += batch.output_tokens as u64;
        }
    }
    stats
}

/// Generate and write the questions to `output_path` as a JSON array.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    generator: &dyn TextGenerator,
    content: &SourceContent,
    request: &GenerationRequest,
    source_id: &str,
    output_path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationStats, QuizForgeError> {
    let output = generate(generator, content, request, source_id, config).await?;
    write_questions(output_path, &output.questions).await?;
    Ok(output.stats)
}

/// Write `questions` to `path` as a pretty JSON array, creating missing
/// parent directories.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_questions(
    path: impl AsRef<Path>,
    questions: &[QuestionRecord],
) -> Result<(), QuizForgeError> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(questions)
        .map_err(|e| QuizForgeError::Internal(format!("Failed to serialise questions: {e}")))?;
    let write_err = |e: std::io::Error| QuizForgeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    generator: &dyn TextGenerator,
    content: &SourceContent,
    request: &GenerationRequest,
    source_id: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, QuizForgeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| QuizForgeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(generator, content, request, source_id, config))
}

/// Generate plain-text study material about `title`, suitable as input to
/// [`generate`] when a user has no document of their own.
///
/// Retries like a question batch; an empty reply counts as a failure.
pub async fn generate_study_material(
    generator: &dyn TextGenerator,
    title: &str,
    config: &GenerationConfig,
) -> Result<String, QuizForgeError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(QuizForgeError::InvalidRequest("title must not be empty".into()));
    }

    let prompt = study_material_prompt(title);
    let request = CompletionRequest {
        system: STUDY_SYSTEM_PROMPT,
        prompt: &prompt,
        temperature: config.study_temperature,
        max_tokens: config.max_tokens,
        top_p: 1.0,
    };
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_error = GeneratorError::Provider("no attempts made".into());
    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Study material for '{}': retry {}/{} after {}ms ({})",
                title, attempt, config.max_attempts, backoff, last_error
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, generator.complete(&request)).await {
            Ok(Ok(c)) if !c.text.trim().is_empty() => {
                info!("Generated {} characters of study material for '{}'", c.text.len(), title);
                return Ok(c.text.trim().to_string());
            }
            Ok(Ok(_)) => last_error = GeneratorError::Provider("empty response".into()),
            Ok(Err(e)) => last_error = e,
            Err(_) => {
                last_error = GeneratorError::Provider(format!(
                    "timed out after {}s",
                    config.api_timeout_secs
                ))
            }
        }
    }

    Err(QuizForgeError::Generation(last_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BatchResult, QuestionDraft};

    fn batch(attempts: u32, accepted: usize, rejected: usize) -> BatchResult {
        BatchResult {
            requested: accepted,
            questions: Vec::<QuestionDraft>::new(),
            attempts,
            rejected,
            input_tokens: 100,
            output_tokens: 50,
            duration_ms: 1,
            error: None,
        }
    }

    #[test]
    fn stats_classify_chunks() {
        let chunks = vec![
            ChunkResult {
                page_number: 1,
                requested: 5,
                accepted: 5,
                batches: vec![batch(1, 5, 0)],
                skipped: None,
            },
            ChunkResult {
                page_number: 2,
                requested: 0,
                accepted: 0,
                batches: vec![],
                skipped: Some(SkipReason::EmptyText),
            },
            ChunkResult {
                page_number: 3,
                requested: 3,
                accepted: 0,
                batches: vec![batch(3, 0, 2)],
                skipped: None,
            },
        ];
        let stats = compute_stats(&[], &chunks, 10);
        assert_eq!(stats.selected_chunks, 3);
        assert_eq!(stats.productive_chunks, 1);
        assert_eq!(stats.skipped_chunks, 1);
        assert_eq!(stats.failed_chunks, 1);
        assert_eq!(stats.total_batches, 2);
        assert_eq!(stats.total_attempts, 4);
        assert_eq!(stats.rejected_candidates, 2);
        assert_eq!(stats.requested_questions, 8);
        assert_eq!(stats.total_input_tokens, 200);
        assert_eq!(stats.total_output_tokens, 100);
    }
}
