//! Lexical layer shared by every stage of dump parsing.
//!
//! A mysqldump file is scanned with a two-state machine: either we are in
//! plain SQL (`Scan::Code`) or inside a string opened by a quote character
//! (`Scan::Quoted`). Everything that has to agree on where a string starts and
//! ends (statement splitting, VALUES group detection, row splitting) goes
//! through [`next_quoted`], so there is exactly one set of escape rules.

use std::iter::Peekable;
use std::str::CharIndices;

pub(crate) type Chars<'a> = Peekable<CharIndices<'a>>;

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    Code,
    Quoted(char),
}

/// One step of string content after escape processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quoted {
    /// A single content character.
    Char(char),
    /// A backslash sequence MySQL keeps verbatim (`\%`, `\_`).
    Pair(char, char),
    /// The closing quote.
    Close,
}

pub(crate) fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

/// Consume the next unit of a quoted string opened with `quote`.
///
/// Precedence inside the string:
/// 1. a backslash escapes the character after it (not for backtick identifiers),
/// 2. the quote character doubled is one literal quote,
/// 3. the quote character alone closes the string.
///
/// Returns `None` when the input ends before the string is closed.
pub(crate) fn next_quoted(chars: &mut Chars<'_>, quote: char) -> Option<Quoted> {
    let (_, c) = chars.next()?;

    if c == '\\' && quote != '`' {
        let Some((_, escaped)) = chars.next() else {
            return Some(Quoted::Char('\\'));
        };
        return Some(match escaped {
            '0' => Quoted::Char('\0'),
            'b' => Quoted::Char('\u{8}'),
            'n' => Quoted::Char('\n'),
            'r' => Quoted::Char('\r'),
            't' => Quoted::Char('\t'),
            'Z' => Quoted::Char('\u{1a}'),
            '%' | '_' => Quoted::Pair('\\', escaped),
            other => Quoted::Char(other),
        });
    }

    if c == quote {
        if matches!(chars.peek(), Some(&(_, next)) if next == quote) {
            chars.next();
            return Some(Quoted::Char(quote));
        }
        return Some(Quoted::Close);
    }

    Some(Quoted::Char(c))
}

/// Skip the rest of a quoted string. Returns `false` if the input ran out first.
pub(crate) fn skip_quoted(chars: &mut Chars<'_>, quote: char) -> bool {
    loop {
        match next_quoted(chars, quote) {
            Some(Quoted::Close) => return true,
            Some(_) => continue,
            None => return false,
        }
    }
}

/// Skip a comment whose opening marker has been peeked at `c`.
///
/// Returns `true` when a comment was consumed.
fn skip_comment(chars: &mut Chars<'_>, c: char) -> bool {
    match c {
        '#' => {
            skip_line(chars);
            true
        }
        '-' => {
            let mut ahead = chars.clone();
            ahead.next();
            if !matches!(ahead.next(), Some((_, '-'))) {
                return false;
            }
            // MySQL only treats `--` as a comment when followed by whitespace.
            let follows = ahead.peek().map(|&(_, w)| w);
            if follows.is_some_and(|w| !w.is_whitespace()) {
                return false;
            }
            *chars = ahead;
            skip_line(chars);
            true
        }
        '/' => {
            let mut ahead = chars.clone();
            ahead.next();
            if !matches!(ahead.next(), Some((_, '*'))) {
                return false;
            }
            *chars = ahead;
            let mut prev = '\0';
            for (_, c) in chars.by_ref() {
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            true
        }
        _ => false,
    }
}

fn skip_line(chars: &mut Chars<'_>) {
    for (_, c) in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}

/// Lazily split SQL text into top-level statements.
///
/// A `;` ends a statement only outside strings, quoted identifiers and
/// comments. Each yielded slice starts at the statement's first code character
/// (leading whitespace and comments are dropped) and excludes the terminating
/// `;`. Comment-only fragments are not yielded.
pub fn split_statements(text: &str) -> Statements<'_> {
    Statements { text, pos: 0 }
}

/// Iterator returned by [`split_statements`].
pub struct Statements<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Statements<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.text.len() {
            let base = self.pos;
            let rest = &self.text[base..];
            let mut chars = rest.char_indices().peekable();
            let mut code_start: Option<usize> = None;
            let mut end = rest.len();
            let mut next_pos = self.text.len();

            while let Some(&(i, c)) = chars.peek() {
                if c == ';' {
                    end = i;
                    next_pos = base + i + 1;
                    break;
                }
                if skip_comment(&mut chars, c) {
                    continue;
                }
                chars.next();
                if c.is_whitespace() {
                    continue;
                }
                code_start.get_or_insert(i);
                if is_quote(c) {
                    skip_quoted(&mut chars, c);
                }
            }

            self.pos = next_pos;
            if let Some(start) = code_start {
                return Some(rest[start..end].trim_end());
            }
        }
        None
    }
}
