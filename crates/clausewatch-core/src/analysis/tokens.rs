use tiktoken_rs::CoreBPE;

use super::chunker::ChunkError;

/// Length accounting in model tokens.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// The `cl100k_base` BPE used by the GPT-4 family.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> Result<Self, ChunkError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ChunkError::Tokenizer(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// One token per whitespace-delimited word. Deterministic and dependency
/// free; used offline and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_counter() {
        assert_eq!(WordCounter.count(""), 0);
        assert_eq!(WordCounter.count("  the  lessee\nshall "), 3);
    }

    #[test]
    fn test_cl100k_counts_tokens() {
        let counter = Cl100kCounter::new().unwrap();
        assert_eq!(counter.count(""), 0);
        assert!(counter.count("hello world") >= 2);
        assert!(counter.count("indemnification") >= 1);
    }
}
