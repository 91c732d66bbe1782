//! Shortening text to a token budget without breaking semantic units.

use turn_primitives::Tokenizer;

/// Shortens `text` to at most `max_tokens` tokens.
///
/// Whole trailing lines are dropped first, then whole trailing sentences, and
/// only when no line or sentence prefix fits is the text cut at a token boundary.
#[must_use]
pub fn truncate_to_budget(tokenizer: &dyn Tokenizer, text: &str, max_tokens: usize) -> String {
    if tokenizer.count(text) <= max_tokens {
        return text.to_owned();
    }
    if max_tokens == 0 {
        return String::new();
    }

    longest_fitting_prefix(tokenizer, text, max_tokens, &line_ends(text))
        .or_else(|| longest_fitting_prefix(tokenizer, text, max_tokens, &sentence_ends(text)))
        .unwrap_or_else(|| {
            let tokens = tokenizer.encode(text);
            tokenizer.decode(&tokens[..max_tokens.min(tokens.len())])
        })
}

fn longest_fitting_prefix(
    tokenizer: &dyn Tokenizer,
    text: &str,
    max_tokens: usize,
    ends: &[usize],
) -> Option<String> {
    ends.iter()
        .rev()
        .map(|end| text[..*end].trim_end())
        .find(|prefix| !prefix.is_empty() && tokenizer.count(prefix) <= max_tokens)
        .map(str::to_owned)
}

fn line_ends(text: &str) -> Vec<usize> {
    text.match_indices('\n').map(|(index, _)| index).collect()
}

fn sentence_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            ends.push(index + ch.len_utf8());
        }
    }
    ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use turn_primitives::CharTokenizer;

    #[test]
    fn fitting_text_is_untouched() {
        assert_eq!(truncate_to_budget(&CharTokenizer, "short", 10), "short");
    }

    #[test]
    fn drops_trailing_lines_first() {
        let text = "first line\nsecond line\nthird line";
        assert_eq!(
            truncate_to_budget(&CharTokenizer, text, 24),
            "first line\nsecond line"
        );
    }

    #[test]
    fn falls_back_to_sentences() {
        let text = "One sentence. Two sentence. Three sentence.";
        assert_eq!(
            truncate_to_budget(&CharTokenizer, text, 30),
            "One sentence. Two sentence."
        );
    }

    #[test]
    fn falls_back_to_tokens() {
        assert_eq!(truncate_to_budget(&CharTokenizer, "abcdefghij", 4), "abcd");
        assert_eq!(truncate_to_budget(&CharTokenizer, "abcdefghij", 0), "");
    }
}
