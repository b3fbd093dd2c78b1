//! Trading-session table used to label a chart's time axis.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Tw,
    Us,
    Hk,
    Jp,
    Cn,
    Uk,
    De,
    Au,
    In,
    Ca,
}

/// Trading window in minutes after local midnight, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSession {
    pub start: u16,
    pub end: u16,
}

const fn hm(hour: u16, minute: u16) -> u16 {
    hour * 60 + minute
}

impl Market {
    pub const ALL: [Market; 10] = [
        Market::Tw,
        Market::Us,
        Market::Hk,
        Market::Jp,
        Market::Cn,
        Market::Uk,
        Market::De,
        Market::Au,
        Market::In,
        Market::Ca,
    ];

    /// Exchange for a symbol, from its suffix. Bare numeric codes are Tokyo
    /// listings; anything unrecognised is treated as US.
    pub fn for_ticker(ticker: &str) -> Market {
        if let Some((_, suffix)) = ticker.rsplit_once('.') {
            return match suffix {
                "TW" => Market::Tw,
                "HK" => Market::Hk,
                "SS" | "SZ" => Market::Cn,
                "L" => Market::Uk,
                "DE" => Market::De,
                "AX" => Market::Au,
                "BO" => Market::In,
                "TO" => Market::Ca,
                _ => Market::Us,
            };
        }
        if !ticker.is_empty() && ticker.bytes().all(|b| b.is_ascii_digit()) {
            Market::Jp
        } else {
            Market::Us
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Market::Tw => "TW",
            Market::Us => "US",
            Market::Hk => "HK",
            Market::Jp => "JP",
            Market::Cn => "CN",
            Market::Uk => "UK",
            Market::De => "DE",
            Market::Au => "AU",
            Market::In => "IN",
            Market::Ca => "CA",
        }
    }

    pub fn session(self) -> MarketSession {
        let (start, end) = match self {
            Market::Tw => (hm(9, 0), hm(13, 30)),
            Market::Us => (hm(9, 30), hm(16, 0)),
            Market::Hk => (hm(9, 30), hm(16, 0)),
            Market::Jp => (hm(9, 0), hm(15, 0)),
            Market::Cn => (hm(9, 30), hm(15, 0)),
            Market::Uk => (hm(8, 0), hm(16, 30)),
            Market::De => (hm(9, 0), hm(17, 30)),
            Market::Au => (hm(10, 0), hm(16, 0)),
            Market::In => (hm(9, 15), hm(15, 30)),
            Market::Ca => (hm(9, 30), hm(16, 0)),
        };
        MarketSession { start, end }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl MarketSession {
    pub fn minutes(&self) -> u16 {
        self.end - self.start
    }

    /// `H:MM` at every full and half hour inside the window
    pub fn axis_labels(&self) -> Vec<String> {
        (self.start / 60..=self.end / 60)
            .flat_map(|hour| [0u16, 30].map(|minute| (hour, minute)))
            .filter(|&(hour, minute)| (self.start..self.end).contains(&hm(hour, minute)))
            .map(|(hour, minute)| format!("{}:{:02}", hour, minute))
            .collect()
    }
}
