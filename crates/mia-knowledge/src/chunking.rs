//! Paragraph-aware document chunking

/// Default maximum chunk length in characters
pub const DEFAULT_CHUNK_CHARS: usize = 1000;

/// Split `content` into chunks of at most `max_chars` characters
///
/// Lines are packed greedily; a line longer than `max_chars` is cut at the
/// last whitespace before the limit (or hard-cut when there is none).
/// Chunks are trimmed and never empty.
#[must_use]
pub fn chunk_text(content: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        for piece in split_long(line, max_chars) {
            let piece_len = piece.chars().count();
            let joined_len = if current.is_empty() {
                piece_len
            } else {
                current_len + 1 + piece_len
            };

            if joined_len > max_chars && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(piece);
            current_len += piece_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_long(line: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.chars().count() > max_chars {
        // Byte offset of the first character past the limit
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let (head, tail) = rest.split_at(cut);
        let head = head.trim_end();
        if !head.is_empty() {
            pieces.push(head);
        }
        rest = tail.trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}
