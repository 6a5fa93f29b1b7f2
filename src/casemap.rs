//! IRC case mapping.
//!
//! Reservation patterns, channel names and shared-block masks are all
//! compared under `rfc1459` case mapping, where `[]\^` fold to `{}|~`.

/// Fold a single character using RFC 1459 case mapping.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    if !c.is_ascii() {
        return c;
    }
    let b = c as u8;
    match b {
        b'A'..=b'^' => (b + (b'a' - b'A')) as char,
        _ => c,
    }
}

/// Fold a string using RFC 1459 case mapping.
///
/// Used to build the channel reservation index key.
pub fn irc_to_lower(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    folded.extend(s.chars().map(irc_lower_char));
    folded
}

/// Case-insensitive comparison under RFC 1459 case mapping.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().map(irc_lower_char).eq(b.chars().map(irc_lower_char))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_rfc1459_specials() {
        assert_eq!(irc_lower_char('['), '{');
        assert_eq!(irc_lower_char('^'), '~');
        assert_eq!(irc_lower_char('~'), '~');
        assert_eq!(irc_lower_char('é'), 'é');
        assert_eq!(irc_lower_char('Q'), 'q');
        assert_eq!(irc_lower_char('#'), '#');
        assert_eq!(irc_to_lower("#Spam[1]"), "#spam{1}");
    }

    #[test]
    fn eq_ignores_case() {
        assert!(irc_eq("#SPAM", "#spam"));
        assert!(irc_eq("Bad\\Nick", "bad|nick"));
        assert!(!irc_eq("#spam", "#spam2"));
        assert!(!irc_eq("abc", "abd"));
    }
}
