//! Strip tag-like markup from text entering or leaving the gateway

use crate::constants::MAX_MESSAGE_LENGTH;

/// Remove `<...>` tags and stray angle brackets, trim, and cap the length.
///
/// A tag runs from a `<` to the nearest following `>`. A `<` with no closing
/// `>` is dropped on its own and the text after it is kept.
pub fn sanitize(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        stripped.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        rest = match after.find('>') {
            Some(close) => &after[close + 1..],
            None => after,
        };
    }
    stripped.push_str(rest);

    stripped
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_MESSAGE_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tags_stripped() {
        assert_eq!(sanitize("<script>alert(1)</script>hello"), "alert(1)hello");
    }

    #[test]
    fn test_bare_brackets_removed() {
        assert_eq!(sanitize("a > b"), "a  b");
        assert_eq!(sanitize("1 < 2 and more"), "1  2 and more");
        assert_eq!(sanitize("x <"), "x");
    }

    #[test]
    fn test_nested_open_bracket_is_part_of_tag() {
        assert_eq!(sanitize("keep<a<b>this"), "keepthis");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize("   <b> </b>  "), "");
        assert_eq!(sanitize("\n  How much can I earn?  \t"), "How much can I earn?");
    }

    #[test]
    fn test_truncates_to_max_length() {
        let long = "a".repeat(MAX_MESSAGE_LENGTH + 250);
        assert_eq!(sanitize(&long).chars().count(), MAX_MESSAGE_LENGTH);

        let multibyte = "é".repeat(MAX_MESSAGE_LENGTH + 1);
        assert_eq!(sanitize(&multibyte).chars().count(), MAX_MESSAGE_LENGTH);
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize("What is weETH?"), "What is weETH?");
    }
}
