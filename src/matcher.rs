//! Pattern matching used by reservations.
//!
//! The [`Matcher`] trait is the seam to whatever glob engine the daemon
//! uses. [`IrcGlob`] is the default: `*` and `?` wildcards under RFC 1459
//! case mapping, with a `\` escape honoured by the non-wildcard count.

use crate::casemap::irc_lower_char;

/// Wildcard matching capability.
pub trait Matcher: Send + Sync {
    /// Does `name` match the glob `pattern`?
    fn matches(&self, pattern: &str, name: &str) -> bool;

    /// Does `pattern` contain at least `min` non-wildcard characters?
    fn has_min_nonwildcard_chars(&self, pattern: &str, min: usize) -> bool;
}

/// RFC 1459 case-insensitive `*`/`?` glob matcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrcGlob;

impl Matcher for IrcGlob {
    fn matches(&self, pattern: &str, name: &str) -> bool {
        wildcard_match(pattern, name)
    }

    fn has_min_nonwildcard_chars(&self, pattern: &str, min: usize) -> bool {
        count_nonwildcard(pattern) >= min
    }
}

/// Match `text` against a glob `pattern` (case-insensitive).
///
/// The pattern is cut at each `*`. The first piece must be a prefix and the
/// last a suffix; the pieces between are found leftmost-first in order.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();

    let mut pieces = pattern.split(|&c| c == '*');
    let head = pieces.next().unwrap_or_default();
    let rest: Vec<&[char]> = pieces.collect();

    let Some((tail, middle)) = rest.split_last() else {
        return text.len() == head.len() && piece_eq(head, &text);
    };

    if text.len() < head.len() || !piece_eq(head, &text[..head.len()]) {
        return false;
    }
    let mut remaining = &text[head.len()..];

    for piece in middle {
        match find_piece(remaining, piece) {
            Some(at) => remaining = &remaining[at + piece.len()..],
            None => return false,
        }
    }

    remaining.len() >= tail.len() && piece_eq(tail, &remaining[remaining.len() - tail.len()..])
}

/// `piece` and `text` are the same length; `?` matches any one character.
fn piece_eq(piece: &[char], text: &[char]) -> bool {
    piece.iter().zip(text).all(|(&p, &t)| p == '?' || p == t)
}

fn find_piece(text: &[char], piece: &[char]) -> Option<usize> {
    if piece.is_empty() {
        return Some(0);
    }
    text.windows(piece.len()).position(|window| piece_eq(piece, window))
}

/// Count characters that are not `*` or `?`. An escaped character counts
/// once together with its backslash.
fn count_nonwildcard(pattern: &str) -> usize {
    let mut count = 0;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
                count += 1;
            }
            '*' | '?' => {}
            _ => count += 1,
        }
    }
    count
}

/// Channel names start with `#` (network-wide) or `&` (server-local).
#[inline]
pub fn is_channel_name(name: &str) -> bool {
    matches!(name.as_bytes().first(), Some(b'#' | b'&'))
}

/// Server-local channels are never announced to other servers.
#[inline]
pub fn is_local_channel(name: &str) -> bool {
    name.starts_with('&')
}

#[inline]
fn is_nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '[' | ']' | '\\' | '`' | '^' | '{' | '}' | '|' | '_')
}

/// Is `mask` an acceptable nickname reservation?
///
/// It may not start with `-` or a digit and may only contain nickname
/// characters plus `*`, `?`, `@` and `#`. A mask made of wildcards alone
/// (at least one `*` and no nickname character) is refused.
pub fn is_valid_nick_mask(mask: &str) -> bool {
    match mask.chars().next() {
        None => return false,
        Some(c) if c == '-' || c.is_ascii_digit() => return false,
        _ => {}
    }

    let mut stars = 0;
    let mut nick_chars = 0;
    for c in mask.chars() {
        match c {
            '?' | '@' | '#' => {}
            '*' => stars += 1,
            c if is_nick_char(c) => nick_chars += 1,
            _ => return false,
        }
    }

    !(nick_chars == 0 && stars > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_basics() {
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("bad*", "BadNick"));
        assert!(wildcard_match("*nick", "badnick"));
        assert!(wildcard_match("b?d*", "bud"));
        assert!(!wildcard_match("bad*", "goodnick"));
        assert!(wildcard_match("*.example.net", "hub.EXAMPLE.net"));
        assert!(wildcard_match("nick[*]", "NICK{away}"));
    }

    #[test]
    fn glob_edges() {
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("", "x"));
        assert!(wildcard_match("exact", "EXACT"));
        assert!(!wildcard_match("exact", "exactly"));
        assert!(wildcard_match("a*b*c", "aXbYbZc"));
        assert!(!wildcard_match("a*b*c", "aXcYb"));
        assert!(wildcard_match("*a?a*", "bbaxab"));
        assert!(!wildcard_match("ab*ba", "aba"));
        assert!(wildcard_match("**", ""));
    }

    #[test]
    fn nonwildcard_count() {
        let glob = IrcGlob;
        assert!(glob.has_min_nonwildcard_chars("badnick*", 3));
        assert!(!glob.has_min_nonwildcard_chars("ba*", 3));
        assert!(!glob.has_min_nonwildcard_chars("?*?*", 1));
        assert!(glob.has_min_nonwildcard_chars("\\*\\*x", 3));
    }

    #[test]
    fn nick_mask_syntax() {
        assert!(is_valid_nick_mask("badnick*"));
        assert!(is_valid_nick_mask("Guest???"));
        assert!(is_valid_nick_mask("[foo]"));
        assert!(!is_valid_nick_mask("*"));
        assert!(!is_valid_nick_mask("-lead"));
        assert!(!is_valid_nick_mask("1abc"));
        assert!(!is_valid_nick_mask("bad nick"));
        assert!(!is_valid_nick_mask(""));
    }

    #[test]
    fn channel_shapes() {
        assert!(is_channel_name("#spam"));
        assert!(is_channel_name("&local"));
        assert!(!is_channel_name("spam"));
        assert!(is_local_channel("&local"));
        assert!(!is_local_channel("#spam"));
    }
}
