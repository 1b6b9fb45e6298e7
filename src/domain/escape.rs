//! String quoting kinds and their character-escape tables.
//!
//! Every quoting kind has its own table; `unescape(escape(s, q), q) == s`
//! holds for all of them. The escape leader is the backtick.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Value of the `StringConstantType` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum StringQuoting {
    BareWord,
    SingleQuoted,
    DoubleQuoted,
    SingleQuotedHereString,
    DoubleQuotedHereString,
}

const LEADER: char = '`';

/// Characters the language accepts as single-quote delimiters.
const SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];
/// Characters the language accepts as double-quote delimiters.
const DOUBLE_QUOTES: [char; 4] = ['"', '\u{201C}', '\u{201D}', '\u{201E}'];

/// Characters that end or split a bareword token.
const BAREWORD_SPECIAL: [char; 17] = [
    ' ', '\'', '"', '`', '$', '#', ';', ',', '|', '&', '(', ')', '{', '}', '@', '<', '>',
];

fn control_escape(c: char) -> Option<&'static str> {
    match c {
        '\n' => Some("`n"),
        '\r' => Some("`r"),
        '\t' => Some("`t"),
        '\0' => Some("`0"),
        _ => None,
    }
}

fn control_unescape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    }
}

/// Escapes `s` for printing between the delimiters of `quoting`.
pub fn escape(s: &str, quoting: StringQuoting) -> String {
    let mut out = String::with_capacity(s.len());
    match quoting {
        StringQuoting::BareWord => {
            for c in s.chars() {
                if let Some(seq) = control_escape(c) {
                    out.push_str(seq);
                } else {
                    if BAREWORD_SPECIAL.contains(&c) || SINGLE_QUOTES.contains(&c) || DOUBLE_QUOTES.contains(&c) {
                        out.push(LEADER);
                    }
                    out.push(c);
                }
            }
        }
        StringQuoting::SingleQuoted => {
            for c in s.chars() {
                if SINGLE_QUOTES.contains(&c) {
                    out.push(c);
                }
                out.push(c);
            }
        }
        StringQuoting::DoubleQuoted => escape_double(s, true, &mut out),
        StringQuoting::SingleQuotedHereString => out.push_str(s),
        StringQuoting::DoubleQuotedHereString => {
            for c in s.chars() {
                if c == LEADER || c == '$' {
                    out.push(LEADER);
                }
                out.push(c);
            }
        }
    }
    out
}

/// Escapes the raw text of an expandable string: variable references stay
/// live, so `$` is left alone.
pub fn escape_expandable(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_double(s, false, &mut out);
    out
}

fn escape_double(s: &str, dollar: bool, out: &mut String) {
    for c in s.chars() {
        if let Some(seq) = control_escape(c) {
            out.push_str(seq);
        } else {
            if c == LEADER || DOUBLE_QUOTES.contains(&c) || (dollar && c == '$') {
                out.push(LEADER);
            }
            out.push(c);
        }
    }
}

/// Inverse of [`escape`].
pub fn unescape(s: &str, quoting: StringQuoting) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    match quoting {
        StringQuoting::BareWord | StringQuoting::DoubleQuoted => {
            while let Some(c) = chars.next() {
                if c == LEADER {
                    match chars.next() {
                        Some(next) => out.push(control_unescape(next)),
                        None => out.push(LEADER),
                    }
                } else {
                    out.push(c);
                }
            }
        }
        StringQuoting::SingleQuoted => {
            while let Some(c) = chars.next() {
                if SINGLE_QUOTES.contains(&c) && chars.peek() == Some(&c) {
                    chars.next();
                }
                out.push(c);
            }
        }
        StringQuoting::SingleQuotedHereString => out.push_str(s),
        StringQuoting::DoubleQuotedHereString => {
            while let Some(c) = chars.next() {
                if c == LEADER {
                    match chars.next() {
                        Some(next) => out.push(next),
                        None => out.push(LEADER),
                    }
                } else {
                    out.push(c);
                }
            }
        }
    }
    out
}
