//! Token counting.
//!
//! Chunk budgets and the single-pass threshold are all expressed in
//! cl100k_base tokens. One counter instance is shared across the whole
//! pipeline; mixing encodings would silently change what the 50,000-token
//! threshold means.

use tiktoken_rs::{cl100k_base, CoreBPE};

pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { bpe: cl100k_base()? })
    }

    /// Number of cl100k_base tokens in `text`. Deterministic; empty text
    /// counts as zero.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").field("encoding", &"cl100k_base").finish()
    }
}
