//! Parsing utilities for the monitor
//!
//! Splitting an input line into arguments and parsing hex operands.

use crate::config::MAX_ARGS;
use alloc::vec::Vec;
use core::fmt;

/// Input the monitor could not turn into a command invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The line holds at least `max` tokens; at most `max - 1` are accepted
    TooManyArguments { max: usize },
    /// Not a hex number that fits in 64 bits
    InvalidHex,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TooManyArguments { max } => write!(f, "Too many arguments (max {})", max),
            ParseError::InvalidHex => f.write_str("invalid hex number"),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Argument separators. Nothing else counts as whitespace.
fn is_separator(c: char) -> bool {
    matches!(c, '\t' | '\r' | '\n' | ' ')
}

/// Split `line` into whitespace-separated tokens.
///
/// The tokens borrow from `line`. A line with `MAX_ARGS` or more tokens is
/// rejected as a whole.
///
/// # Examples
/// ```
/// # use kmon_kernel::monitor::parsing::parse_args;
/// assert_eq!(parse_args("  dump\tva 0x10\r\n").unwrap(), ["dump", "va", "0x10"]);
/// ```
pub fn parse_args(line: &str) -> ParseResult<Vec<&str>> {
    let mut argv = Vec::new();
    for token in line.split(is_separator).filter(|t| !t.is_empty()) {
        if argv.len() == MAX_ARGS - 1 {
            return Err(ParseError::TooManyArguments { max: MAX_ARGS });
        }
        argv.push(token);
    }
    Ok(argv)
}

/// Parse a hex number with an optional `0x`/`0X` prefix
///
/// # Examples
/// ```
/// # use kmon_kernel::monitor::parsing::parse_hex;
/// assert_eq!(parse_hex("0xF000"), Ok(0xf000));
/// assert_eq!(parse_hex("ff"), Ok(0xff));
/// assert!(parse_hex("0x").is_err());
/// ```
pub fn parse_hex(s: &str) -> ParseResult<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    // from_str_radix would also take a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidHex);
    }
    u64::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidHex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn splits_on_all_separators() {
        let argv = parse_args("\tshowmappings  0x1000\r\n0x3000 ").unwrap();
        assert_eq!(argv, ["showmappings", "0x1000", "0x3000"]);
    }

    #[test]
    fn empty_and_blank_lines_have_no_tokens() {
        assert!(parse_args("").unwrap().is_empty());
        assert!(parse_args(" \t\r\n ").unwrap().is_empty());
    }

    #[test]
    fn other_whitespace_is_part_of_a_token() {
        // Vertical tab and form feed are not separators
        assert_eq!(parse_args("a\x0bb c\x0cd").unwrap(), ["a\x0bb", "c\x0cd"]);
    }

    #[test]
    fn accepts_up_to_fifteen_tokens() {
        for n in 0..MAX_ARGS {
            let line: String = (0..n).map(|i| alloc::format!(" t{} ", i)).collect();
            let argv = parse_args(&line).unwrap();
            assert_eq!(argv.len(), n);
            for (i, token) in argv.iter().enumerate() {
                assert_eq!(*token, alloc::format!("t{}", i));
            }
        }
    }

    #[test]
    fn sixteen_tokens_is_too_many() {
        let line = "a b c d e f g h i j k l m n o p";
        assert_eq!(
            parse_args(line),
            Err(ParseError::TooManyArguments { max: MAX_ARGS })
        );
        assert_eq!(
            alloc::format!("{}", ParseError::TooManyArguments { max: 16 }),
            "Too many arguments (max 16)"
        );
    }

    #[test]
    fn hex_with_and_without_prefix() {
        assert_eq!(parse_hex("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex("0XaBc"), Ok(0xabc));
        assert_eq!(parse_hex("ffffffffffffffff"), Ok(u64::MAX));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        for bad in ["", "0x", "xyz", "+10", "-1", "0x12g", "1_000", "10000000000000000"] {
            assert_eq!(parse_hex(bad), Err(ParseError::InvalidHex), "{:?}", bad);
        }
    }
}
