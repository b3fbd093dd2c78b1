use serde::Serialize;

use crate::error::SnapshotError;
use crate::ticker::Ticker;

/// Round to the 2-decimal wire resolution.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One sampling interval of upstream price data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Self-contained price summary for one ticker, built fresh every tick.
///
/// Fields are private so every instance has passed [`MarketSnapshot::new`]:
/// values are finite, rounded to 2 decimals, and `high`/`low` bound the
/// price series together with `open` and `latest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    ticker: Ticker,
    open: f64,
    high: f64,
    low: f64,
    latest: f64,
    yesterday_close: f64,
    prices: Vec<f64>,
}

impl MarketSnapshot {
    pub fn new(
        ticker: Ticker,
        open: f64,
        high: f64,
        low: f64,
        latest: f64,
        yesterday_close: f64,
        prices: Vec<f64>,
    ) -> Result<Self, SnapshotError> {
        // Rounding overflows to infinity for magnitudes near f64::MAX, so
        // finiteness is checked on the rounded values.
        let open = round2(open);
        let high = round2(high);
        let low = round2(low);
        let latest = round2(latest);
        let yesterday_close = round2(yesterday_close);
        let prices: Vec<f64> = prices.into_iter().map(round2).collect();

        for (name, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("latest", latest),
            ("yesterday_close", yesterday_close),
        ] {
            if !value.is_finite() {
                return Err(SnapshotError::NonFinite(name));
            }
        }
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(SnapshotError::NonFinite("prices"));
        }

        let (min, max) = prices
            .iter()
            .copied()
            .chain([open, latest])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            });
        if high < max {
            return Err(SnapshotError::HighBelowMax { high, max });
        }
        if low > min {
            return Err(SnapshotError::LowAboveMin { low, min });
        }

        Ok(Self {
            ticker,
            open,
            high,
            low,
            latest,
            yesterday_close,
            prices,
        })
    }

    /// Aggregate a session of bars: first open, extreme high/low, last close,
    /// and the close of every bar as the price series.
    pub fn from_bars(
        ticker: Ticker,
        bars: &[Bar],
        yesterday_close: f64,
    ) -> Result<Self, SnapshotError> {
        let (first, last) = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(SnapshotError::NoBars),
        };

        // Upstream bars are not always self-consistent, so the extremes also
        // cover opens and closes.
        let high = bars
            .iter()
            .flat_map(|b| [b.high, b.open, b.close])
            .fold(f64::NEG_INFINITY, f64::max);
        let low = bars
            .iter()
            .flat_map(|b| [b.low, b.open, b.close])
            .fold(f64::INFINITY, f64::min);
        let prices = bars.iter().map(|b| b.close).collect();

        Self::new(
            ticker,
            first.open,
            high,
            low,
            last.close,
            yesterday_close,
            prices,
        )
    }

    /// Same snapshot keeping only the newest `keep` samples. Bounds still hold
    /// because a subset of the series cannot exceed them.
    pub(crate) fn with_newest_prices(&self, keep: usize) -> Self {
        let skip = self.prices.len().saturating_sub(keep);
        Self {
            prices: self.prices[skip..].to_vec(),
            ..self.clone()
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn latest(&self) -> f64 {
        self.latest
    }

    pub fn yesterday_close(&self) -> f64 {
        self.yesterday_close
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn is_rounded(v: f64) -> bool {
        round2(v) == v
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(189.456), 189.46);
        assert_eq!(round2(189.454), 189.45);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(-1.005), -1.0);
    }

    #[test]
    fn test_new_rounds_every_field() {
        let s = MarketSnapshot::new(
            ticker("AAPL"),
            100.004,
            101.119,
            99.001,
            100.5049,
            98.7777,
            vec![100.004, 100.999, 100.5049],
        )
        .unwrap();

        assert_eq!(s.open(), 100.0);
        assert_eq!(s.high(), 101.12);
        assert_eq!(s.low(), 99.0);
        assert_eq!(s.latest(), 100.5);
        assert_eq!(s.yesterday_close(), 98.78);
        assert_eq!(s.prices(), &[100.0, 101.0, 100.5]);
    }

    #[test]
    fn test_new_rejects_high_below_series() {
        let err = MarketSnapshot::new(ticker("AAPL"), 10.0, 11.0, 9.0, 10.0, 10.0, vec![11.5])
            .unwrap_err();
        assert!(matches!(err, SnapshotError::HighBelowMax { .. }));
    }

    #[test]
    fn test_new_rejects_low_above_latest() {
        let err = MarketSnapshot::new(ticker("AAPL"), 10.0, 11.0, 9.0, 8.5, 10.0, vec![])
            .unwrap_err();
        assert!(matches!(err, SnapshotError::LowAboveMin { .. }));
    }

    #[test]
    fn test_new_rejects_nan() {
        let err = MarketSnapshot::new(ticker("AAPL"), f64::NAN, 11.0, 9.0, 10.0, 10.0, vec![])
            .unwrap_err();
        assert_eq!(err, SnapshotError::NonFinite("open"));

        let err =
            MarketSnapshot::new(ticker("AAPL"), 10.0, 11.0, 9.0, 10.0, 10.0, vec![f64::INFINITY])
                .unwrap_err();
        assert_eq!(err, SnapshotError::NonFinite("prices"));
    }

    #[test]
    fn test_new_rejects_values_that_overflow_when_rounded() {
        let err = MarketSnapshot::new(ticker("AAPL"), 1e307, 1e307, 9.0, 10.0, 10.0, vec![])
            .unwrap_err();
        assert_eq!(err, SnapshotError::NonFinite("open"));

        let err = MarketSnapshot::new(ticker("AAPL"), 10.0, 11.0, 9.0, 10.0, 10.0, vec![-1e307])
            .unwrap_err();
        assert_eq!(err, SnapshotError::NonFinite("prices"));
    }

    #[test]
    fn test_new_allows_empty_series() {
        let s = MarketSnapshot::new(ticker("AAPL"), 10.0, 10.0, 10.0, 10.0, 9.5, vec![]).unwrap();
        assert!(s.prices().is_empty());
    }

    #[test]
    fn test_from_bars_aggregates_session() {
        let bars = [
            Bar { open: 100.011, high: 100.8, low: 99.7, close: 100.5 },
            Bar { open: 100.5, high: 102.333, low: 100.1, close: 101.9 },
            Bar { open: 101.9, high: 102.0, low: 98.456, close: 99.0 },
        ];
        let s = MarketSnapshot::from_bars(ticker("msft"), &bars, 99.999).unwrap();

        assert_eq!(s.ticker().as_str(), "MSFT");
        assert_eq!(s.open(), 100.01);
        assert_eq!(s.high(), 102.33);
        assert_eq!(s.low(), 98.46);
        assert_eq!(s.latest(), 99.0);
        assert_eq!(s.yesterday_close(), 100.0);
        assert_eq!(s.prices(), &[100.5, 101.9, 99.0]);
    }

    #[test]
    fn test_from_bars_tolerates_inconsistent_bars() {
        // close above the bar's own high
        let bars = [Bar { open: 10.0, high: 10.2, low: 9.9, close: 10.4 }];
        let s = MarketSnapshot::from_bars(ticker("X"), &bars, 10.0).unwrap();
        assert_eq!(s.high(), 10.4);
    }

    #[test]
    fn test_from_bars_invariants_hold() {
        let mut bars = Vec::new();
        let mut price = 250.0_f64;
        for i in 0..390 {
            let step = ((i * 7919) % 13) as f64 / 10.0 - 0.6;
            let open = price;
            price += step;
            bars.push(Bar {
                open,
                high: open.max(price) + 0.013,
                low: open.min(price) - 0.017,
                close: price,
            });
        }
        let s = MarketSnapshot::from_bars(ticker("TSLA"), &bars, 249.876).unwrap();

        let max = s.prices().iter().copied().chain([s.open(), s.latest()]).fold(f64::MIN, f64::max);
        let min = s.prices().iter().copied().chain([s.open(), s.latest()]).fold(f64::MAX, f64::min);
        assert!(s.high() >= max);
        assert!(s.low() <= min);
        assert!(s.prices().iter().all(|p| is_rounded(*p)));
        assert!(is_rounded(s.yesterday_close()));
    }

    #[test]
    fn test_from_bars_empty() {
        assert_eq!(
            MarketSnapshot::from_bars(ticker("X"), &[], 1.0).unwrap_err(),
            SnapshotError::NoBars
        );
    }

    #[test]
    fn test_with_newest_prices() {
        let s = MarketSnapshot::new(ticker("X"), 1.0, 5.0, 1.0, 4.0, 1.0, vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(s.with_newest_prices(2).prices(), &[3.0, 4.0]);
        assert_eq!(s.with_newest_prices(10).prices(), s.prices());
        assert!(s.with_newest_prices(0).prices().is_empty());
    }
}
