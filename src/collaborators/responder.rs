//! Infallible response generation over a fallible backend

use super::ResponseGenerator;
use crate::Result;
use std::sync::Arc;
use tracing::warn;

/// A text-generation backend that may fail
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Wraps a [`CompletionBackend`] so replies never fail
///
/// Backend errors and blank replies are replaced by the fallback phrase.
pub struct GuardedResponder {
    backend: Arc<dyn CompletionBackend>,
    fallback: String,
}

impl GuardedResponder {
    pub fn new(backend: Arc<dyn CompletionBackend>, fallback: impl Into<String>) -> Self {
        Self {
            backend,
            fallback: fallback.into(),
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl ResponseGenerator for GuardedResponder {
    fn respond(&self, text: &str) -> String {
        match self.backend.complete(text) {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!("Response backend returned nothing, using fallback");
                self.fallback.clone()
            }
            Err(e) => {
                warn!("Response backend failed, using fallback: {}", e);
                self.fallback.clone()
            }
        }
    }
}
