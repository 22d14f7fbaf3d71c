use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tokens::TokenCounter;
use crate::config::ChunkConfig;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Invalid chunk budget: {0}")]
    InvalidBudget(String),
    #[error("Tokenizer unavailable: {0}")]
    Tokenizer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Zero-based position in the document
    pub index: usize,
    pub total: usize,
}

impl Chunk {
    pub const fn is_first(&self) -> bool {
        self.index == 0
    }

    pub const fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Splits text into token-bounded chunks that overlap by a number of words.
///
/// Text that already fits comes back as a single chunk, verbatim. Otherwise
/// words are accumulated greedily and re-joined with single spaces; each chunk
/// after the first starts with the tail of the one before it so a clause that
/// straddles a boundary is visible in both.
///
/// The one exception to the budget: a single word that is by itself larger
/// than `max_tokens` is emitted alone, and the chunk after it carries no
/// overlap.
pub struct Chunker {
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Chunker {
    #[must_use]
    pub fn new(counter: Arc<dyn TokenCounter>, max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            counter,
            max_tokens,
            overlap_tokens,
        }
    }

    #[must_use]
    pub fn from_config(counter: Arc<dyn TokenCounter>, config: &ChunkConfig) -> Self {
        Self::new(counter, config.max_tokens, config.overlap_tokens)
    }

    pub const fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    pub fn split(&self, text: &str) -> Result<Vec<Chunk>, ChunkError> {
        let max = self.max_tokens;
        if max == 0 {
            return Err(ChunkError::InvalidBudget("max_tokens must be positive".into()));
        }
        if self.overlap_tokens >= max {
            return Err(ChunkError::InvalidBudget(format!(
                "overlap ({}) must be smaller than max_tokens ({max})",
                self.overlap_tokens
            )));
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        if self.counter.count(text) <= max {
            return Ok(vec![Chunk {
                text: text.to_string(),
                index: 0,
                total: 1,
            }]);
        }

        let pieces = self.split_words(text);
        let total = pieces.len();
        tracing::debug!(chunks = total, max_tokens = max, "text split");

        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { text, index, total })
            .collect())
    }

    fn split_words(&self, text: &str) -> Vec<String> {
        let max = self.max_tokens;
        let mut pending: VecDeque<&str> = text.split_whitespace().collect();
        let mut pieces = Vec::new();

        let mut current: Vec<&str> = Vec::new();
        let mut current_cost = 0usize;
        // words in `current` that did not come from the overlap seed
        let mut fresh = 0usize;

        loop {
            let Some(word) = pending.pop_front() else {
                if fresh == 0 {
                    break;
                }
                let closed = self.close(&mut current, fresh, &mut pending);
                pieces.push(closed.join(" "));
                (current, current_cost) = self.seed(&closed);
                fresh = 0;
                continue;
            };

            let cost = self.counter.count(word);

            if cost > max {
                if fresh > 0 {
                    pending.push_front(word);
                    let closed = self.close(&mut current, fresh, &mut pending);
                    pieces.push(closed.join(" "));
                    current_cost = 0;
                    fresh = 0;
                    continue;
                }
                tracing::warn!(tokens = cost, max_tokens = max, "word exceeds chunk budget, emitting it alone");
                pieces.push(word.to_string());
                current.clear();
                current_cost = 0;
                continue;
            }

            if current_cost + cost > max {
                if fresh > 0 {
                    pending.push_front(word);
                    let closed = self.close(&mut current, fresh, &mut pending);
                    pieces.push(closed.join(" "));
                    (current, current_cost) = self.seed(&closed);
                    fresh = 0;
                    continue;
                }

                while !current.is_empty() && current_cost + cost > max {
                    let dropped = current.remove(0);
                    current_cost = current_cost.saturating_sub(self.counter.count(dropped));
                }
            }

            current.push(word);
            current_cost += cost;
            fresh += 1;
        }

        pieces
    }

    /// Take the words of the current chunk, returning surplus trailing words
    /// to `pending` until the exact token count fits.
    fn close<'a>(
        &self,
        current: &mut Vec<&'a str>,
        mut fresh: usize,
        pending: &mut VecDeque<&'a str>,
    ) -> Vec<&'a str> {
        let mut words = std::mem::take(current);

        while words.len() > 1 && self.counter.count(&words.join(" ")) > self.max_tokens {
            if fresh > 1 {
                if let Some(last) = words.pop() {
                    pending.push_front(last);
                }
                fresh -= 1;
            } else {
                words.remove(0);
            }
        }

        words
    }

    fn seed<'a>(&self, closed: &[&'a str]) -> (Vec<&'a str>, usize) {
        let start = closed.len().saturating_sub(self.overlap_tokens);
        let seed: Vec<&str> = closed[start..].to_vec();
        let cost = seed.iter().map(|w| self.counter.count(w)).sum();
        (seed, cost)
    }
}
