//! Section-aware chunking.
//!
//! Lines accumulate into a block until a section header or the size
//! threshold flushes it. After a size-triggered flush the next block is
//! seeded with whole trailing lines of the previous one, at least
//! `chunk_overlap` characters long.

use alexandria_config::ChunkingConfig;
use alexandria_core::ChunkDraft;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Splits extracted text into ordered chunk drafts.
///
/// A draft's position is its index in the returned vector.
pub trait ChunkStrategy: Send + Sync {
    fn chunk(&self, full_text: &str, pages: Option<&BTreeMap<u32, String>>) -> Vec<ChunkDraft>;
}

/// Configuration for chunking, in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Block length that triggers a flush.
    pub chunk_size: usize,
    /// Minimum length of the overlap carried into the next block.
    pub chunk_overlap: usize,
    /// Length of the single chunk emitted when nothing else is produced.
    pub fallback_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 100,
            fallback_chars: 8000,
        }
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            fallback_chars: config.fallback_chars,
        }
    }
}

/// Chunker recognizing the usual headings of academic papers.
pub struct Chunker {
    config: ChunkConfig,
    header: Regex,
}

impl Chunker {
    /// Create a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        let header = Regex::new(
            r"(?i)^(?:\d+\.?\s*)?(?:abstract|introduction|methods?|materials?\s+and\s+methods?|results?|discussion|conclusions?|references|acknowledg(?:e)?ments?|experimental|background|summary)\s*(?:\s+and\s+discussion)?\s*$",
        )
        .expect("valid section header regex");

        Self { config, header }
    }

    /// Create a chunker with default configuration.
    pub fn default_chunker() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Whether a trimmed line is a section header.
    pub fn is_section_header(&self, line: &str) -> bool {
        !line.is_empty() && self.header.is_match(line)
    }

    /// Chunk one page of text. Each chunk carries the header that opened
    /// its block, or `None` before the first header on the page.
    fn chunk_page(&self, text: &str) -> Vec<(String, Option<String>)> {
        let mut out = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;
        // Lines added since the last flush; a block made only of carried
        // overlap is already part of the previous chunk.
        let mut fresh = false;
        let mut section: Option<String> = None;

        for line in text.split('\n') {
            let stripped = line.trim();

            if self.is_section_header(stripped) {
                if fresh {
                    push_block(&mut out, &current, &section);
                }
                current = vec![line];
                current_len = line_len(line);
                fresh = true;
                section = Some(stripped.to_string());
                continue;
            }

            current.push(line);
            current_len += line_len(line);
            fresh = true;

            if current_len >= self.config.chunk_size {
                push_block(&mut out, &current, &section);

                let start = self.overlap_start(&current);
                current.drain(..start);
                current_len = current.iter().map(|l| line_len(l)).sum();
                fresh = false;
            }
        }

        if fresh {
            push_block(&mut out, &current, &section);
        }

        out
    }

    /// Index of the first line carried into the next block: the shortest
    /// tail whose trimmed, newline-joined text reaches `chunk_overlap`.
    fn overlap_start(&self, lines: &[&str]) -> usize {
        let mut start = lines.len();
        while start > 0 && lines[start..].join("\n").trim().chars().count() < self.config.chunk_overlap {
            start -= 1;
        }
        start
    }

    fn fallback(&self, full_text: &str) -> Vec<ChunkDraft> {
        let head: String = full_text.chars().take(self.config.fallback_chars).collect();
        vec![ChunkDraft::new(head.trim())]
    }
}

impl ChunkStrategy for Chunker {
    fn chunk(&self, full_text: &str, pages: Option<&BTreeMap<u32, String>>) -> Vec<ChunkDraft> {
        let mut drafts = Vec::new();

        match pages.filter(|p| !p.is_empty()) {
            None => {
                for (content, section) in self.chunk_page(full_text) {
                    drafts.push(ChunkDraft::new(content).with_page(1).with_section(section));
                }
            }
            Some(pages) => {
                let mut last_section: Option<String> = None;
                for (&page, text) in pages {
                    if text.trim().is_empty() {
                        continue;
                    }
                    for (content, section) in self.chunk_page(text) {
                        if section.is_some() {
                            last_section = section;
                        }
                        drafts.push(ChunkDraft::new(content).with_page(page).with_section(last_section.clone()));
                    }
                }
            }
        }

        if drafts.is_empty() {
            debug!("No chunks produced, falling back to a single head chunk");
            return self.fallback(full_text);
        }

        drafts
    }
}

fn line_len(line: &str) -> usize {
    line.chars().count() + 1
}

fn push_block(out: &mut Vec<(String, Option<String>)>, lines: &[&str], section: &Option<String>) {
    let block = lines.join("\n");
    let block = block.trim();
    if !block.is_empty() {
        out.push((block.to_string(), section.clone()));
    }
}
