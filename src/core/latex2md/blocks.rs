//! Protected fragment store
//!
//! Finished fragments (math, code, tables, links) are moved out of the buffer and
//! replaced by `@@BLOCK<n>@@` tokens, so the generic substitution passes that follow
//! can't touch them. Restoration puts them back in one pass at the end.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::utils::{replace_delimited, replace_environment, replace_inline_dollars, EnvSpan};

pub const PLACEHOLDER_PREFIX: &str = "@@BLOCK";
pub const PLACEHOLDER_SUFFIX: &str = "@@";

lazy_static! {
    pub static ref PLACEHOLDER_RE: Regex = Regex::new(r"@@BLOCK(\d+)@@").unwrap();
}

/// Build the placeholder token for `index`.
pub fn placeholder(index: usize) -> String {
    format!("{}{}{}", PLACEHOLDER_PREFIX, index, PLACEHOLDER_SUFFIX)
}

/// A finished fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub content: String,
}

impl Block {
    /// Block-level fragments start on their own line (display math, fences, tables).
    pub fn is_block_level(&self) -> bool {
        self.content.starts_with('\n')
    }
}

/// Append-only store of protected fragments.
#[derive(Debug, Clone, Default)]
pub struct BlockStore {
    blocks: Vec<Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Store a fragment and return its placeholder.
    pub fn push(&mut self, content: String) -> String {
        let index = self.blocks.len();
        self.blocks.push(Block { index, content });
        placeholder(index)
    }

    /// Whether `text` references any block-level fragment.
    pub fn contains_block_level(&self, text: &str) -> bool {
        PLACEHOLDER_RE.captures_iter(text).any(|caps| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| self.get(idx))
                .is_some_and(Block::is_block_level)
        })
    }

    /// Whether `text` starts with a block-level placeholder.
    pub fn starts_with_block_level(&self, text: &str) -> bool {
        PLACEHOLDER_RE
            .captures(text)
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .and_then(|idx| self.get(idx))
            .is_some_and(Block::is_block_level)
    }

    /// Replace every placeholder with its fragment. Unknown indices become empty.
    pub fn restore(&self, input: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(input, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.get(idx))
                    .map(|block| block.content.clone())
                    .unwrap_or_default()
            })
            .into_owned()
    }

    // =========================================================================
    // Protection helpers
    // =========================================================================

    /// Protect every `name` environment; `transform` returns the finished fragment or
    /// `None` to leave the match in place.
    pub fn protect_environment<F>(
        &mut self,
        input: &str,
        name: &str,
        max_optional: usize,
        required: usize,
        mut transform: F,
    ) -> String
    where
        F: FnMut(&EnvSpan) -> Option<String>,
    {
        replace_environment(input, name, max_optional, required, |span| {
            transform(span).map(|fragment| self.push(fragment))
        })
    }

    /// Protect every `open .. close` span.
    pub fn protect_delimited<F>(&mut self, input: &str, open: &str, close: &str, mut transform: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        replace_delimited(input, open, close, |body| {
            transform(body).map(|fragment| self.push(fragment))
        })
    }

    /// Protect single-dollar inline math.
    pub fn protect_inline_dollars<F>(&mut self, input: &str, mut transform: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        replace_inline_dollars(input, |body| {
            let fragment = transform(body);
            self.push(fragment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_restore() {
        let mut store = BlockStore::new();
        let a = store.push("A".to_string());
        let b = store.push("\nB\n".to_string());
        assert_eq!(a, "@@BLOCK0@@");
        assert_eq!(b, "@@BLOCK1@@");
        assert_eq!(store.restore("x @@BLOCK0@@ y @@BLOCK1@@"), "x A y \nB\n");
    }

    #[test]
    fn test_unknown_index_restores_empty() {
        let store = BlockStore::new();
        assert_eq!(store.restore("a@@BLOCK7@@b"), "ab");
    }

    #[test]
    fn test_block_level_detection() {
        let mut store = BlockStore::new();
        let inline = store.push("$x$".to_string());
        let display = store.push("\n$$\nx\n$$\n".to_string());
        assert!(!store.contains_block_level(&format!("text {}", inline)));
        assert!(store.contains_block_level(&format!("text {}", display)));
        assert!(store.starts_with_block_level(&display));
        assert!(!store.starts_with_block_level(&format!("a {}", display)));
    }

    #[test]
    fn test_protect_environment_declined_match_stays() {
        let mut store = BlockStore::new();
        let out = store.protect_environment(r"\begin{x}keep\end{x}", "x", 0, 0, |_| None);
        assert_eq!(out, r"\begin{x}keep\end{x}");
        assert!(store.is_empty());
    }
}
