//! VALUES clause decomposition.
//!
//! [`scan_groups`] finds the parenthesised row groups of one INSERT statement,
//! [`parse_row_values`] splits a single group into its raw string tokens.

use super::lexer::{next_quoted, Chars, Quoted, Scan};
use super::RawRow;

/// Row groups found in one VALUES clause.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Groups<'a> {
    /// Text between each group's outer parentheses, in source order.
    pub inner: Vec<&'a str>,
    /// Groups still open when the clause ended (unbalanced parentheses or an
    /// unterminated string).
    pub unterminated: usize,
}

/// Locate every top-level `( ... )` group in a VALUES clause.
///
/// Parentheses inside string literals never change the depth; bare nested
/// parentheses are kept inside the group text.
pub(crate) fn scan_groups(values: &str) -> Groups<'_> {
    let mut groups = Groups::default();
    let mut chars: Chars<'_> = values.char_indices().peekable();
    let mut state = Scan::Code;
    let mut depth = 0usize;
    let mut start = 0usize;

    loop {
        match state {
            Scan::Quoted(quote) => match next_quoted(&mut chars, quote) {
                Some(Quoted::Close) => state = Scan::Code,
                Some(_) => {}
                None => break,
            },
            Scan::Code => {
                let Some((i, c)) = chars.next() else {
                    break;
                };
                match c {
                    '\'' | '"' => state = Scan::Quoted(c),
                    '(' => {
                        depth += 1;
                        if depth == 1 {
                            start = i + 1;
                        }
                    }
                    ')' if depth > 0 => {
                        depth -= 1;
                        if depth == 0 {
                            groups.inner.push(&values[start..i]);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    if depth > 0 {
        groups.unterminated += 1;
    }
    groups
}

/// Split the text between one row's outer parentheses into raw tokens.
///
/// Tokens are separated by commas at nesting depth zero. Enclosing quotes are
/// stripped, escapes decoded, and surrounding whitespace trimmed. The token
/// after the final comma is always emitted, even when empty, so `()` yields a
/// single empty token. A bare `NULL` comes out as the text `"NULL"`.
pub fn parse_row_values(inner: &str) -> RawRow {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut chars: Chars<'_> = inner.char_indices().peekable();
    let mut depth = 0usize;

    while let Some((_, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                while let Some(step) = next_quoted(&mut chars, c) {
                    match step {
                        Quoted::Char(ch) => buf.push(ch),
                        Quoted::Pair(a, b) => {
                            buf.push(a);
                            buf.push(b);
                        }
                        Quoted::Close => break,
                    }
                }
            }
            ',' if depth == 0 => {
                tokens.push(buf.trim().to_string());
                buf.clear();
            }
            '(' => {
                depth += 1;
                buf.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                buf.push(c);
            }
            _ => buf.push(c),
        }
    }

    tokens.push(buf.trim().to_string());
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_groups_basic() {
        let groups = scan_groups(" (1,'a'),(2,'b') ");
        assert_eq!(groups.inner, vec!["1,'a'", "2,'b'"]);
        assert_eq!(groups.unterminated, 0);
    }

    #[test]
    fn test_scan_groups_parens_inside_strings() {
        let groups = scan_groups("(1,'x)'),(2,'(y')");
        assert_eq!(groups.inner, vec!["1,'x)'", "2,'(y'"]);
    }

    #[test]
    fn test_scan_groups_unbalanced() {
        let groups = scan_groups("(1,'a'),(2,'b'");
        assert_eq!(groups.inner, vec!["1,'a'"]);
        assert_eq!(groups.unterminated, 1);
    }

    #[test]
    fn test_scan_groups_unterminated_string() {
        let groups = scan_groups("(1,'a'),(2,'b");
        assert_eq!(groups.inner, vec!["1,'a'"]);
        assert_eq!(groups.unterminated, 1);
    }

    #[test]
    fn test_parse_row_values_strips_quotes_and_trims() {
        assert_eq!(
            parse_row_values("1, 'Test Hospital' ,NULL,\"Z01\""),
            vec!["1", "Test Hospital", "NULL", "Z01"]
        );
    }

    #[test]
    fn test_parse_row_values_embedded_delimiters() {
        assert_eq!(
            parse_row_values("'a, b','(c)','it''s','it\\'s'"),
            vec!["a, b", "(c)", "it's", "it's"]
        );
    }

    #[test]
    fn test_parse_row_values_keeps_nested_call_together() {
        assert_eq!(parse_row_values("1,POINT(1,2),3"), vec!["1", "POINT(1,2)", "3"]);
    }

    #[test]
    fn test_parse_row_values_trailing_empty_token() {
        assert_eq!(parse_row_values("1,"), vec!["1", ""]);
        assert_eq!(parse_row_values(""), vec![""]);
        assert_eq!(parse_row_values("''"), vec![""]);
    }
}
