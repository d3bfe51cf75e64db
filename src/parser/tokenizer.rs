//! Splits command text into words and tags.

/// Characters that separate command groups in addition to whitespace.
pub const GROUP_DELIMITERS: &[char] = &[',', ';', '|'];

/// A lexical token of command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// A tag, without its marker.
    Tag(&'a str),
    /// Anything else: an operation name, an argument or garbage.
    Word(&'a str),
}

/// Tokenize command text.
///
/// Whitespace and [`GROUP_DELIMITERS`] separate tokens. A token starting with
/// `tag_marker` followed by at least one character is a tag; a lone marker is
/// dropped.
pub fn tokenize(text: &str, tag_marker: char) -> Vec<Token<'_>> {
    text.split(|c: char| c.is_whitespace() || GROUP_DELIMITERS.contains(&c))
        .filter(|t| !t.is_empty())
        .filter_map(|t| match t.strip_prefix(tag_marker) {
            Some("") => None,
            Some(tag) => Some(Token::Tag(tag)),
            None => Some(Token::Word(t)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_and_tags() {
        let tokens = tokenize("resize 10  20 #png\tcrop", '#');
        assert_eq!(
            tokens,
            vec![
                Token::Word("resize"),
                Token::Word("10"),
                Token::Word("20"),
                Token::Tag("png"),
                Token::Word("crop"),
            ]
        );
    }

    #[test]
    fn test_delimiters_and_lone_marker() {
        let tokens = tokenize("blur 2,flip|# ;  ", '#');
        assert_eq!(tokens, vec![Token::Word("blur"), Token::Word("2"), Token::Word("flip")]);
    }

    #[test]
    fn test_custom_marker() {
        let tokens = tokenize("+gray #x", '+');
        assert_eq!(tokens, vec![Token::Tag("gray"), Token::Word("#x")]);
    }
}
