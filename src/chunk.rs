//! Text splitter over byte windows aligned to character boundaries.
//!
//! Splits source text into chunks of at most `chunk_size` bytes (never
//! cutting a UTF-8 character; a single character wider than the window
//! is kept whole) with an optional overlap between consecutive chunks.
//! Split points prefer a newline or space inside the window so chunks
//! end on word boundaries where possible. Used twice by the retriever:
//! large parent chunks (~10,000 bytes, no overlap) and small child
//! chunks (~250 bytes, 20-byte overlap).

/// Split `text` into windows of at most `chunk_size` bytes, overlapping
/// consecutive windows by up to `overlap` bytes. `overlap` must be
/// smaller than `chunk_size`. Always returns at least one chunk, and
/// always advances by at least one character per chunk.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < chunk_size);

    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let mut hard_end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
        if hard_end <= start {
            // Window smaller than the next character: take it whole.
            hard_end = ceil_char_boundary(text, start + 1);
        }
        let end = if hard_end < text.len() {
            // Prefer a newline or space boundary inside the window.
            text[start..hard_end]
                .rfind('\n')
                .or_else(|| text[start..hard_end].rfind(' '))
                .map(|pos| start + pos + 1)
                .filter(|&pos| pos > start)
                .unwrap_or(hard_end)
        } else {
            hard_end
        };

        chunks.push(text[start..end].to_string());
        if end >= text.len() {
            break;
        }

        // Step back by the overlap, but always make forward progress.
        let next = floor_char_boundary(text, end.saturating_sub(overlap));
        start = if next > start { next } else { end };
    }

    chunks
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
