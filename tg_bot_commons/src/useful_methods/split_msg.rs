/// Telegram's limit on the length of a message's text.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Separators we'd rather split on, biggest first: sections (3 newlines),
/// paragraphs (2 newlines), lines, and finally words.
const SEPARATORS: &[&str] = &["\n\n\n", "\n\n", "\n", " ", "\t"];

/// Split text into chunks that are all at most `max_len` bytes long.
///
/// Each chunk is cut at the biggest kind of separator that appears in it,
/// falling back to cutting between characters if there's no separator at all.
/// Whitespace around the cuts is dropped, and so are chunks that end up empty.
///
/// # Panics
/// Panics if a max length of less than 4 is specified.
/// It may be impossible to output data at such lengths due to
/// characters being up to 4 bytes in size.
#[must_use]
pub fn split_for_telegram(text: &str, max_len: usize) -> Vec<&str> {
    assert!(max_len >= 4, "Max length is too small");

    let mut chunks = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        if rest.len() <= max_len {
            chunks.push(rest.trim_end());
            break;
        }

        // A separator starting right at `max_len` still leaves a chunk that fits.
        let window = &rest[..floor_char_boundary(rest, max_len + 1)];

        let cut = SEPARATORS
            .iter()
            .filter_map(|separator| window.rfind(separator))
            .find(|&position| position > 0)
            .unwrap_or_else(|| floor_char_boundary(rest, max_len));

        let chunk = rest[..cut].trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        rest = rest[cut..].trim_start();
    }

    chunks
}

/// Biggest index not above `index` that's on a character boundary.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    (0..=index)
        .rev()
        .find(|&x| text.is_char_boundary(x))
        .unwrap_or(0)
}
