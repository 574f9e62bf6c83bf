//! The single-batch procedure: one chunk of text in, up to `n` validated
//! questions out.
//!
//! ```text
//! PENDING ─▶ CALL ─▶ PARSE ─▶ VALIDATE ─┬─▶ ACCEPT     (n valid)
//!              ▲                        ├─▶ RETRY      (error / short, attempts left)
//!              └────────────────────────┘─▶ EXHAUSTED  (return best attempt)
//! ```
//!
//! ## Retry Strategy
//!
//! Provider errors, timeouts, unparseable responses, and responses with
//! fewer valid questions than requested all trigger a retry while attempts
//! remain. Backoff doubles from `retry_backoff_ms` (500 ms → 1 s → 2 s)
//! up to [`MAX_BACKOFF_MS`].
//!
//! The best attempt so far (most valid questions) is kept across retries,
//! so a short first answer is never lost to a worse second one. The
//! procedure never returns `Err`; total failure is an empty
//! [`BatchResult`] with `error` set.

use crate::config::GenerationConfig;
use crate::error::BatchError;
use crate::generator::{CompletionRequest, TextGenerator};
use crate::output::{BatchResult, QuestionDraft};
use crate::pipeline::chunk::truncate_chunk;
use crate::pipeline::validate::{parse_candidates, validate_all};
use crate::prompts::{question_prompt, system_prompt};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Where a batch sits in the run, for logs and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLabel {
    /// 1-indexed page (1 for single-block sources).
    pub page_number: usize,
    /// 1-indexed batch within the chunk, when the chunk is split.
    pub batch_number: Option<usize>,
}

impl std::fmt::Display for BatchLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.batch_number {
            Some(b) => write!(f, "page {} batch {}", self.page_number, b),
            None => write!(f, "page {}", self.page_number),
        }
    }
}

/// Upper bound on a single retry delay.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Delay before `attempt` (2 = first retry): `base_ms * 2^(attempt-2)`,
/// capped at [`MAX_BACKOFF_MS`].
pub fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(2))
        .unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Why the most recent attempt did not produce a full batch.
enum Failure {
    Provider(String),
    Timeout,
    Malformed(String),
    NoValid,
}

impl Failure {
    fn describe(&self) -> String {
        match self {
            Failure::Provider(e) => format!("provider error: {e}"),
            Failure::Timeout => "timed out".to_string(),
            Failure::Malformed(e) => format!("malformed response: {e}"),
            Failure::NoValid => "no valid questions".to_string(),
        }
    }

    fn into_batch_error(self, attempts: u32, timeout_secs: u64) -> BatchError {
        match self {
            Failure::Provider(detail) => BatchError::Provider { attempts, detail },
            Failure::Timeout => BatchError::Timeout {
                attempts,
                secs: timeout_secs,
            },
            Failure::Malformed(detail) => BatchError::MalformedResponse { attempts, detail },
            Failure::NoValid => BatchError::NoValidQuestions { attempts },
        }
    }
}

/// Ask the generator for `requested` questions about `text`.
pub async fn generate_batch(
    generator: &dyn TextGenerator,
    text: &str,
    requested: usize,
    label: BatchLabel,
    config: &GenerationConfig,
) -> BatchResult {
    let start = Instant::now();

    let chunk = truncate_chunk(text, config.max_chunk_chars);
    if chunk.len() != text.len() {
        info!(
            "{}: truncated text to {} characters",
            label, config.max_chunk_chars
        );
    }

    let system = system_prompt(config.system_prompt.as_deref(), requested);
    let prompt = question_prompt(&chunk, requested);
    let request = CompletionRequest {
        system: &system,
        prompt: &prompt,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        top_p: config.top_p,
    };

    info!("{}: generating {} questions", label, requested);

    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut best: Vec<QuestionDraft> = Vec::new();
    let mut last_failure: Option<Failure> = None;
    let mut rejected = 0usize;
    let mut input_tokens = 0usize;
    let mut output_tokens = 0usize;
    let mut attempts = 0u32;

    while attempts < config.max_attempts {
        attempts += 1;

        if attempts > 1 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempts);
            let reason = last_failure
                .as_ref()
                .map(Failure::describe)
                .unwrap_or_else(|| format!("{} of {} questions", best.len(), requested));
            warn!(
                "{}: retry {}/{} after {}ms ({})",
                label, attempts, config.max_attempts, backoff, reason
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_batch_retry(label.page_number, attempts, &reason);
            }
            sleep(Duration::from_millis(backoff)).await;
        }

        let completion = match timeout(call_timeout, generator.complete(&request)).await {
            Err(_) => {
                warn!("{}: attempt {} timed out", label, attempts);
                last_failure = Some(Failure::Timeout);
                continue;
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", label, attempts, e);
                last_failure = Some(Failure::Provider(e.to_string()));
                continue;
            }
            Ok(Ok(c)) => c,
        };
        input_tokens += completion.input_tokens;
        output_tokens += completion.output_tokens;

        let items = match parse_candidates(&completion.text) {
            Ok(items) => items,
            Err(detail) => {
                warn!("{}: attempt {}: {}", label, attempts, detail);
                if attempts == config.max_attempts {
                    debug!("{}: raw response: {:.500}", label, completion.text);
                }
                last_failure = Some(Failure::Malformed(detail));
                continue;
            }
        };

        let validated = validate_all(&items);
        for (i, reason) in &validated.rejected {
            warn!("{}: question {} is invalid: {}", label, i + 1, reason);
        }
        rejected += validated.rejected.len();

        let mut accepted = validated.accepted;
        if accepted.len() > requested {
            debug!(
                "{}: model returned {} valid questions, keeping {}",
                label,
                accepted.len(),
                requested
            );
            accepted.truncate(requested);
        }

        if accepted.is_empty() {
            last_failure = Some(Failure::NoValid);
            continue;
        }
        last_failure = None;
        if accepted.len() > best.len() {
            best = accepted;
        }
        if best.len() >= requested {
            break;
        }
        warn!(
            "{}: expected {} questions, got {} valid (attempt {})",
            label,
            requested,
            best.len(),
            attempts
        );
    }

    let error = if best.is_empty() {
        let failure = last_failure.unwrap_or(Failure::NoValid);
        let err = failure.into_batch_error(attempts, config.api_timeout_secs);
        warn!("{}: giving up: {}", label, err);
        Some(err)
    } else {
        if best.len() < requested {
            warn!(
                "{}: accepting {} of {} requested questions",
                label,
                best.len(),
                requested
            );
        }
        None
    };

    BatchResult {
        requested,
        questions: best,
        attempts,
        rejected,
        input_tokens,
        output_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    }
}
