//! Pipeline stages for question generation.
//!
//! Each submodule implements exactly one step, so each is testable without
//! a model and the retry loop never has to know about page syntax or JSON
//! quirks.
//!
//! ## Data Flow
//!
//! ```text
//! pages ──▶ chunk ──▶ llm ──▶ repair ──▶ validate
//! (select)  (truncate) (call/retry) (fix JSON) (check shape)
//! ```
//!
//! 1. [`pages`]    — parse a page spec like `"1-3,5"` into 0-indexed pages
//! 2. [`chunk`]    — truncate chunk text and plan batches for single-block
//!    sources
//! 3. [`llm`]      — one batch: prompt, call, retry with backoff; the only
//!    stage with network I/O
//! 4. [`repair`]   — strip prose, fences and trailing commas from the reply
//! 5. [`validate`] — keep the elements that are well-formed questions

pub mod chunk;
pub mod llm;
pub mod pages;
pub mod repair;
pub mod validate;
