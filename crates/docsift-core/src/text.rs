//! Text normalization shared by extraction, embedding and search.

/// Normalize extracted document text.
///
/// Line endings become `\n`, whitespace runs inside a line collapse to one
/// space, lines are trimmed and blank lines are dropped. Applying the
/// function twice yields the same result as applying it once.
#[must_use]
pub fn normalize_content(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split(['\n', '\r']) {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(first);
        for word in words {
            out.push(' ');
            out.push_str(word);
        }
    }
    out
}

/// Normalize text before embedding: trimmed, every whitespace run
/// (newlines included) collapsed to a single space.
#[must_use]
pub fn normalize_for_embedding(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
