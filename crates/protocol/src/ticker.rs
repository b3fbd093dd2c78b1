use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Longest symbol accepted on either plane.
pub const MAX_TICKER_LEN: usize = 32;

/// A validated ticker symbol.
///
/// Symbols are trimmed and upper-cased; they must be 1..=32 bytes of ASCII
/// letters, digits and `. ^ = -`, with at least one letter or digit. This
/// admits exchange suffixes (`2330.TW`), class shares (`BRK-B`), indices
/// (`^GSPC`) and FX pairs (`EURUSD=X`) but nothing with URL meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let symbol = raw.trim();
        if symbol.is_empty() {
            return Err("empty symbol".to_string());
        }
        if symbol.len() > MAX_TICKER_LEN {
            return Err(format!("symbol longer than {} bytes", MAX_TICKER_LEN));
        }
        if let Some(c) = symbol.chars().find(|&c| !is_symbol_char(c)) {
            return Err(format!("illegal character {:?}", c));
        }
        if !symbol.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err("symbol has no letters or digits".to_string());
        }
        Ok(Self(symbol.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')
}

impl FromStr for Ticker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let t = Ticker::parse("  aapl\r").unwrap();
        assert_eq!(t.as_str(), "AAPL");
    }

    #[test]
    fn test_parse_accepts_exchange_symbols() {
        for raw in ["2330.TW", "BRK-B", "^GSPC", "EURUSD=X", "0700.HK"] {
            assert!(Ticker::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("   ").is_err());
    }

    #[test]
    fn test_parse_rejects_inner_whitespace_and_control() {
        assert!(Ticker::parse("AA PL").is_err());
        assert!(Ticker::parse("AA\u{0}PL").is_err());
        assert!(Ticker::parse("台積電").is_err());
    }

    #[test]
    fn test_parse_rejects_url_syntax() {
        for raw in ["X/../ADMIN", "AAPL?X=1", "AAPL#FRAG", "AA%2FPL", "..", "A_B", "A:B"] {
            assert!(Ticker::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_parse_rejects_overlong() {
        let raw = "X".repeat(MAX_TICKER_LEN + 1);
        assert!(Ticker::parse(&raw).is_err());
        assert!(Ticker::parse(&"X".repeat(MAX_TICKER_LEN)).is_ok());
    }
}
