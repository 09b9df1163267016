use super::types::Diff;

/// Appended to a diff that was cut at the size limit.
pub const TRUNCATION_MARKER: &str = "\n\n[Diff truncated]";

/// Cap a raw unified diff at `max_chars` characters.
///
/// The limit counts `char`s, not bytes, so a cut never lands inside a
/// multi-byte sequence. Diffs at or under the limit pass through unchanged.
pub fn cap_diff(raw_diff: &str, max_chars: usize) -> Diff {
    match raw_diff.char_indices().nth(max_chars) {
        None => Diff {
            text: raw_diff.to_string(),
            truncated: false,
        },
        Some((cut, _)) => {
            let mut text = String::with_capacity(cut + TRUNCATION_MARKER.len());
            text.push_str(&raw_diff[..cut]);
            text.push_str(TRUNCATION_MARKER);
            Diff {
                text,
                truncated: true,
            }
        }
    }
}
