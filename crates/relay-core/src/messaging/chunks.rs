/// Split `text` into pieces of at most `limit` characters.
///
/// A piece ends at the last newline inside the window when there is one, so
/// paragraphs stay intact where possible. Empty input yields no pieces.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((window_end, _)) = rest.char_indices().nth(limit) else {
            out.push(rest.to_string());
            break;
        };

        let window = &rest[..window_end];
        let cut = match window.rfind('\n') {
            Some(i) if i > 0 => i + 1,
            _ => window_end,
        };

        out.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    out
}
