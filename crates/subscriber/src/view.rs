//! Display fields derived from a snapshot: direction against yesterday's
//! close, a least-squares trend line and the session axis.

use std::fmt;

use tickercast_protocol::{round2, MarketSnapshot};

use crate::session::Market;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
            Direction::Flat => "-",
        }
    }
}

/// `y = intercept + slope * x` over sample indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    /// Ordinary least squares over `(i, prices[i])`. Needs two samples.
    pub fn fit(prices: &[f64]) -> Option<TrendLine> {
        if prices.len() < 2 {
            return None;
        }
        let n = prices.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = prices.iter().sum::<f64>() / n;

        let (sxy, sxx) = prices
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
                let dx = i as f64 - mean_x;
                (sxy + dx * (y - mean_y), sxx + dx * dx)
            });

        let slope = sxy / sxx;
        Some(TrendLine {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// One trend value per sample
    pub fn points(&self, len: usize) -> Vec<f64> {
        (0..len).map(|i| self.value_at(i as f64)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub snapshot: MarketSnapshot,
    pub direction: Direction,
    /// `latest - yesterday_close`, 2 decimals
    pub change: f64,
    pub trend: Option<TrendLine>,
    pub market: Market,
    pub axis_labels: Vec<String>,
}

impl SnapshotView {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        let change = round2(snapshot.latest() - snapshot.yesterday_close());
        let direction = if change > 0.0 {
            Direction::Up
        } else if change < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        };
        let market = Market::for_ticker(snapshot.ticker().as_str());

        Self {
            direction,
            change,
            trend: TrendLine::fit(snapshot.prices()),
            market,
            axis_labels: market.session().axis_labels(),
            snapshot,
        }
    }
}

impl fmt::Display for SnapshotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.snapshot;
        write!(
            f,
            "{} [{}] {:.2} {} ({:+.2})  open {:.2}  high {:.2}  low {:.2}  prev {:.2}  samples {}",
            s.ticker(),
            self.market,
            s.latest(),
            self.direction.arrow(),
            self.change,
            s.open(),
            s.high(),
            s.low(),
            s.yesterday_close(),
            s.prices().len(),
        )?;
        if let Some(trend) = &self.trend {
            write!(f, "  trend {:+.4}/min", trend.slope)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickercast_protocol::Ticker;

    fn snapshot(ticker: &str, latest: f64, yesterday_close: f64, prices: Vec<f64>) -> MarketSnapshot {
        MarketSnapshot::new(
            Ticker::parse(ticker).unwrap(),
            latest,
            1000.0,
            0.0,
            latest,
            yesterday_close,
            prices,
        )
        .unwrap()
    }

    #[test]
    fn test_trend_of_exact_line() {
        let trend = TrendLine::fit(&[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!((trend.slope - 2.0).abs() < 1e-9);
        assert!((trend.intercept - 1.0).abs() < 1e-9);
        assert!((trend.value_at(4.0) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_of_noisy_series() {
        // y = 10 + 0.5x with symmetric noise
        let prices = [10.1, 10.4, 11.1, 11.4, 12.1, 12.4];
        let trend = TrendLine::fit(&prices).unwrap();
        assert!(trend.slope > 0.4 && trend.slope < 0.6);
        assert_eq!(trend.points(prices.len()).len(), 6);
    }

    #[test]
    fn test_trend_needs_two_samples() {
        assert!(TrendLine::fit(&[]).is_none());
        assert!(TrendLine::fit(&[42.0]).is_none());
        assert_eq!(TrendLine::fit(&[5.0, 5.0]).unwrap().slope, 0.0);
    }

    #[test]
    fn test_direction() {
        let up = SnapshotView::new(snapshot("AAPL", 190.75, 189.1, vec![]));
        assert_eq!(up.direction, Direction::Up);
        assert_eq!(up.change, 1.65);

        let down = SnapshotView::new(snapshot("AAPL", 188.0, 189.1, vec![]));
        assert_eq!(down.direction, Direction::Down);
        assert_eq!(down.change, -1.1);

        let flat = SnapshotView::new(snapshot("AAPL", 189.1, 189.1, vec![]));
        assert_eq!(flat.direction, Direction::Flat);
    }

    #[test]
    fn test_view_uses_ticker_market() {
        let view = SnapshotView::new(snapshot("2330.TW", 600.0, 590.0, vec![598.0, 600.0]));
        assert_eq!(view.market, Market::Tw);
        assert_eq!(view.axis_labels.first().map(String::as_str), Some("9:00"));
        assert!(view.trend.is_some());

        let line = view.to_string();
        assert!(line.starts_with("2330.TW [TW] 600.00 ↑ (+10.00)"));
    }
}
