//! Section-aware chunking of extracted page text.
//!
//! Budgets are counted in characters:
//!
//! - A block that looks like a heading opens a new section; blocks are separated by blank lines.
//! - Blocks longer than `max_characters` are split semantically with `semchunk-rs`.
//! - Blocks of one section are packed until the chunk reaches `new_after_characters` (soft
//!   limit) or the next block would overflow `max_characters` (hard limit).
//! - A chunk shorter than `combine_under_characters` absorbs the first chunk of the next section
//!   when the hard limit allows.
//! - An optional overlap repeats the tail of the previous chunk at the start of the next one.

use semchunk_rs::Chunker;

const SECTION_SEPARATOR: &str = "\n\n";
const MAX_HEADING_CHARACTERS: usize = 80;
const MAX_HEADING_WORDS: usize = 10;

/// Character budgets applied to every extracted page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingOptions {
    /// Hard upper bound on chunk length.
    pub max_characters: usize,
    /// Soft bound; a chunk at or beyond it is closed.
    pub new_after_characters: usize,
    /// Chunks below this length are merged with the following section.
    pub combine_under_characters: usize,
    /// Characters repeated from the end of the previous chunk.
    pub overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_characters: 10_000,
            new_after_characters: 6_000,
            combine_under_characters: 2_000,
            overlap: 0,
        }
    }
}

impl ChunkingOptions {
    /// Options derived from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_characters: config.chunk_max_characters.max(1),
            new_after_characters: config.chunk_new_after_characters,
            combine_under_characters: config.chunk_combine_under_characters,
            overlap: config.chunk_overlap,
        }
    }
}

/// Chunk the text of a single page.
///
/// Returns an empty vector when the page holds only whitespace.
pub fn chunk_page(text: &str, options: &ChunkingOptions) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let max = options.max_characters.max(1);
    let mut chunks: Vec<String> = Vec::new();

    for section in split_sections(text) {
        let mut section_chunks = pack_section(section, options, max).into_iter();
        let Some(first) = section_chunks.next() else {
            continue;
        };
        match chunks.last_mut() {
            Some(last)
                if char_len(last) < options.combine_under_characters
                    && char_len(last) + SECTION_SEPARATOR.len() + char_len(&first) <= max =>
            {
                last.push_str(SECTION_SEPARATOR);
                last.push_str(&first);
            }
            _ => chunks.push(first),
        }
        chunks.extend(section_chunks);
    }

    apply_overlap(chunks, max, options.overlap)
}

/// Group blank-line separated blocks into sections opened by heading-like blocks.
fn split_sections(text: &str) -> Vec<Vec<String>> {
    let mut sections: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for block in split_blocks(text) {
        if is_heading(&block) && !current.is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push(block);
    }
    if !current.is_empty() {
        sections.push(current);
    }
    sections
}

fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                blocks.push(lines.join("\n").trim().to_string());
                lines.clear();
            }
        } else {
            lines.push(line.trim_end());
        }
    }
    if !lines.is_empty() {
        blocks.push(lines.join("\n").trim().to_string());
    }
    blocks
}

/// Heuristic for title lines: one short line without sentence punctuation.
fn is_heading(block: &str) -> bool {
    if block.contains('\n') {
        return false;
    }
    let trimmed = block.trim();
    if trimmed.is_empty() || char_len(trimmed) > MAX_HEADING_CHARACTERS {
        return false;
    }
    if trimmed.split_whitespace().count() > MAX_HEADING_WORDS {
        return false;
    }
    if trimmed.ends_with(['.', '!', '?', ',', ';', ':']) {
        return false;
    }
    trimmed.chars().any(char::is_alphabetic)
}

fn pack_section(blocks: Vec<String>, options: &ChunkingOptions, max: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();

    for block in blocks {
        for piece in split_oversized(block, max) {
            if current.is_empty() {
                current = piece;
            } else if char_len(&current) < options.new_after_characters
                && char_len(&current) + SECTION_SEPARATOR.len() + char_len(&piece) <= max
            {
                current.push_str(SECTION_SEPARATOR);
                current.push_str(&piece);
            } else {
                packed.push(std::mem::replace(&mut current, piece));
            }
        }
    }
    if !current.is_empty() {
        packed.push(current);
    }
    packed
}

fn split_oversized(block: String, max: usize) -> Vec<String> {
    if char_len(&block) <= max {
        return vec![block];
    }
    let chunker = Chunker::new(max, Box::new(char_len));
    chunker
        .chunk(&block)
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Prefix each chunk with the tail of its predecessor, keeping the result within `max`.
fn apply_overlap(chunks: Vec<String>, max: usize, overlap: usize) -> Vec<String> {
    let effective_overlap = overlap.min(max.saturating_sub(1));
    if chunks.len() < 2 || effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<&str> = None;
    for current in &chunks {
        let chunk = match previous {
            None => current.clone(),
            Some(prev) => {
                let tail = tail_chars(prev, effective_overlap).trim_start();
                let mut combined = String::with_capacity(tail.len() + current.len() + 1);
                if !tail.is_empty() {
                    combined.push_str(tail);
                    combined.push(' ');
                }
                combined.push_str(current);
                trim_to_budget(&combined, max)
            }
        };
        overlapped.push(chunk);
        previous = Some(current);
    }
    overlapped
}

fn tail_chars(text: &str, count: usize) -> &str {
    let total = char_len(text);
    if total <= count {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - count)
        .map(|(offset, _)| offset)
        .unwrap_or(0);
    &text[start..]
}

fn trim_to_budget(text: &str, budget: usize) -> String {
    let total = char_len(text);
    if total <= budget {
        return text.to_string();
    }
    tail_chars(text, budget).trim_start().to_string()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
