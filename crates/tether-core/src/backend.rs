//! Inference backend contract.
//!
//! The agent loop only needs a text-completion service that accepts a
//! grammar constraint, streams tokens to a callback and stops early when the
//! shared [`CancelFlag`] is raised. [`ScriptedBackend`] is a deterministic
//! implementation that replays recorded model turns.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::CoreError;

// ── Cancellation ─────────────────────────────────────────────

/// Cooperative cancellation flag shared between the caller and the loop.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ── Backend Trait ────────────────────────────────────────────

/// One inference call.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    pub prompt: &'a str,
    /// GBNF grammar the output must match.
    pub grammar: &'a str,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    pub cancel: &'a CancelFlag,
}

/// A resident language model.
///
/// Implementations must call `on_token` for every generated piece of text,
/// in order, and should poll `request.cancel` between tokens, returning the
/// text generated so far once it is set.
#[allow(async_fn_in_trait)]
pub trait InferenceBackend {
    /// Load `model` with the given context window.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ModelLoad` if the model cannot be loaded.
    fn load(&mut self, model: &str, context_window: u32) -> Result<(), CoreError>;

    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    /// Generate a completion for `request.prompt`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Inference` if generation fails.
    async fn infer(
        &mut self,
        request: InferenceRequest<'_>,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, CoreError>;
}

// ── Scripted Backend ─────────────────────────────────────────

/// Replays a fixed list of model turns, one per inference call.
///
/// Each turn is streamed in whitespace-delimited chunks, one chunk per
/// token, so cancellation and the token budget behave as they would with a
/// real model.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    turns: VecDeque<String>,
    loaded: Option<String>,
    calls: usize,
}

impl ScriptedBackend {
    pub fn new<I, S>(turns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            turns: turns.into_iter().map(Into::into).collect(),
            loaded: None,
            calls: 0,
        }
    }

    /// Turns not yet replayed.
    pub fn remaining(&self) -> usize {
        self.turns.len()
    }

    /// Number of `infer` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Model name passed to the last successful `load`.
    pub fn loaded_model(&self) -> Option<&str> {
        self.loaded.as_deref()
    }
}

impl InferenceBackend for ScriptedBackend {
    fn load(&mut self, model: &str, context_window: u32) -> Result<(), CoreError> {
        if model.trim().is_empty() {
            return Err(CoreError::ModelLoad {
                model: model.to_owned(),
                reason: "empty model reference".to_owned(),
            });
        }
        debug!(model, context_window, turns = self.turns.len(), "scripted backend loaded");
        self.loaded = Some(model.to_owned());
        Ok(())
    }

    fn unload(&mut self) {
        self.loaded = None;
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    async fn infer(
        &mut self,
        request: InferenceRequest<'_>,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, CoreError> {
        if !self.is_loaded() {
            return Err(CoreError::ModelNotLoaded);
        }
        self.calls += 1;
        let turn = self
            .turns
            .pop_front()
            .ok_or_else(|| CoreError::Inference("script exhausted".to_owned()))?;

        let mut output = String::new();
        for (emitted, chunk) in turn.split_inclusive(char::is_whitespace).enumerate() {
            if request.cancel.is_cancelled() || emitted >= request.max_tokens as usize {
                break;
            }
            output.push_str(chunk);
            on_token(chunk);
            tokio::task::yield_now().await;
        }

        debug!(
            call = self.calls,
            prompt_chars = request.prompt.len(),
            output_chars = output.len(),
            "scripted inference complete"
        );
        Ok(output)
    }
}
