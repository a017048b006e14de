//! One-line excerpts for history listings.

/// Number of leading bytes shown for binary content.
const BINARY_PREVIEW_BYTES: usize = 20;

/// Build a short single-line preview of `data`.
///
/// - empty input gives `(empty)`
/// - non-UTF-8 input gives `(binary, N bytes) <hex of the first 20 bytes>`
/// - text has whitespace runs collapsed to one space and is cut to
///   `max_len` characters, the last three being `...`
pub fn make_preview(data: &[u8], max_len: usize) -> String {
    if data.is_empty() {
        return "(empty)".to_string();
    }

    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => {
            let head = &data[..data.len().min(BINARY_PREVIEW_BYTES)];
            return format!("(binary, {} bytes) {}", data.len(), hex::encode(head));
        }
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_len {
        return collapsed;
    }

    let keep = max_len.saturating_sub(3);
    let mut cut: String = collapsed.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
