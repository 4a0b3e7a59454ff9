//! Sentence splitting, tokenization, and small string helpers.
//!
//! The splitter is rule-based: a sentence ends at `.`, `!` or `?` (plus any
//! trailing quotes or brackets) followed by whitespace or end of text, except
//! after a known abbreviation, a single-letter initial, or when the next word
//! starts in lowercase. Blank lines always end a sentence. Whitespace inside
//! a sentence is collapsed to single spaces, so the same sentence copied into
//! two differently formatted texts compares equal.

/// Display name used when no usable title can be derived.
pub const UNTITLED: &str = "Untitled Source";

const TITLE_SCAN_CHARS: usize = 500;
const TITLE_MAX_CHARS: usize = 100;
const TITLE_MIN_CHARS: usize = 10;

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig", "al",
    "no", "vol", "pp", "ed", "approx", "dept", "inc", "ltd", "co", "jan", "feb", "mar", "apr",
    "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Split text into sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut out = Vec::new();
    for block in normalized.split("\n\n") {
        split_block(block, &mut out);
    }
    out
}

fn split_block(block: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = block.char_indices().collect();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i].1;
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
            j += 1;
        }

        let at_end = j == chars.len();
        if at_end || chars[j].1.is_whitespace() {
            let end = if at_end { block.len() } else { chars[j].0 };
            let candidate = &block[start..end];
            let next_is_lower = chars[j..]
                .iter()
                .map(|(_, ch)| *ch)
                .find(|ch| !ch.is_whitespace())
                .is_some_and(|ch| ch.is_lowercase());
            let abbreviated = c == '.' && ends_with_abbreviation(candidate);

            if !next_is_lower && !abbreviated {
                push_sentence(candidate, out);
                start = end;
            }
        }
        i = j;
    }

    if start < block.len() {
        push_sentence(&block[start..], out);
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn ends_with_abbreviation(candidate: &str) -> bool {
    let last = match candidate.split_whitespace().last() {
        Some(word) => word,
        None => return false,
    };
    let word = last
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| is_terminator(c) || is_closer(c))
        .to_lowercase();

    if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
        return true;
    }
    ABBREVIATIONS.contains(&word.as_str())
}

fn push_sentence(raw: &str, out: &mut Vec<String>) {
    let collapsed = collapse_whitespace(raw);
    if !collapsed.is_empty() {
        out.push(collapsed);
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased word tokens of at least two characters.
///
/// A token is a maximal run of alphanumeric characters or underscores.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// The first `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A reasonable title for downloaded content: its opening sentence.
///
/// Looks at the first 500 characters, takes the first sentence cut to 100
/// characters, and falls back to [`UNTITLED`] when that is 10 characters or
/// shorter.
pub fn extract_title(text: &str) -> String {
    let head = truncate_chars(text, TITLE_SCAN_CHARS);
    match split_sentences(head).into_iter().next() {
        Some(first) => {
            let title = truncate_chars(&first, TITLE_MAX_CHARS);
            if title.chars().count() > TITLE_MIN_CHARS {
                title.to_string()
            } else {
                UNTITLED.to_string()
            }
        }
        None => UNTITLED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("The river rose. Farmers moved uphill! Was it enough? Nobody knew.");
        assert_eq!(
            s,
            vec![
                "The river rose.",
                "Farmers moved uphill!",
                "Was it enough?",
                "Nobody knew."
            ]
        );
    }

    #[test]
    fn keeps_abbreviations_and_initials_together() {
        let s = split_sentences("Dr. Smith met J. R. Tolkien in 1950. They spoke, e.g. about maps.");
        assert_eq!(
            s,
            vec![
                "Dr. Smith met J. R. Tolkien in 1950.",
                "They spoke, e.g. about maps."
            ]
        );
    }

    #[test]
    fn decimals_do_not_split() {
        let s = split_sentences("Growth was 3.5 percent last year. It slowed after.");
        assert_eq!(s.len(), 2);
        assert!(s[0].contains("3.5"));
    }

    #[test]
    fn blank_lines_end_sentences_and_whitespace_collapses() {
        let s = split_sentences("A heading without stop\n\nBody   text\nwraps here. Done.");
        assert_eq!(
            s,
            vec!["A heading without stop", "Body text wraps here.", "Done."]
        );
    }

    #[test]
    fn quotes_after_terminator_stay_with_sentence() {
        let s = split_sentences("He said \"stop.\" Then he left.");
        assert_eq!(s, vec!["He said \"stop.\"", "Then he left."]);
    }

    #[test]
    fn tokenize_lowercases_and_drops_single_chars() {
        assert_eq!(
            tokenize("A Rust-based tool, v2_beta & Earth's x"),
            vec!["rust", "based", "tool", "v2_beta", "earth"]
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 50), "short");
    }

    #[test]
    fn title_from_first_sentence() {
        assert_eq!(
            extract_title("Glaciers carve valleys slowly. More text."),
            "Glaciers carve valleys slowly."
        );
        assert_eq!(extract_title("Tiny. Rest of it."), UNTITLED);
        assert_eq!(extract_title(""), UNTITLED);
        let long = "word ".repeat(60);
        assert_eq!(extract_title(&long).chars().count(), 100);
    }
}
