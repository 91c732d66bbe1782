//! Token counting seam used for prompt budgeting.

/// Converts text to token identifiers and back.
///
/// Hosts plug in the tokenizer matching their model. Implementations must be
/// deterministic and `decode(encode(text)) == text` for budgeting to be exact.
pub trait Tokenizer: Send + Sync {
    /// Encodes text into token identifiers.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decodes token identifiers back into text.
    fn decode(&self, tokens: &[u32]) -> String;

    /// Returns the number of tokens in `text`.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// Lossless reference tokenizer that maps every Unicode scalar to one token.
///
/// Useful for tests and for hosts without a model-specific tokenizer; it
/// over-counts relative to BPE tokenizers, which keeps budgets conservative.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        tokens.iter().filter_map(|token| char::from_u32(*token)).collect()
    }

    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }
}
