use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tickercast_protocol::{Bar, MarketSnapshot, Ticker};
use tracing::debug;

use crate::error::SourceError;
use crate::source::SnapshotSource;

const USER_AGENT: &str = concat!("tickercast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl Quote {
    /// Bars with every field present; gaps (null entries) are skipped.
    fn bars(&self) -> Vec<Bar> {
        self.open
            .iter()
            .zip(&self.high)
            .zip(&self.low)
            .zip(&self.close)
            .filter_map(|(((o, h), l), c)| {
                Some(Bar {
                    open: (*o)?,
                    high: (*h)?,
                    low: (*l)?,
                    close: (*c)?,
                })
            })
            .collect()
    }
}

/// Today's 1-minute bars plus the previous close from the Yahoo Finance
/// chart API.
pub struct YahooChartSource {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl YahooChartSource {
    /// `base_url` is normally `https://query1.finance.yahoo.com`
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| SourceError::Upstream(format!("invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::Upstream(format!(
                "invalid base URL: {}",
                base_url
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// The symbol is always one encoded path segment under the base path
    fn chart_url(&self, ticker: &Ticker) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Upstream("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker.as_str()]);
        Ok(url)
    }

    async fn chart(&self, ticker: &Ticker) -> Result<ChartResponse, SourceError> {
        let url = self.chart_url(ticker)?;
        debug!(url = %url, "GET chart");

        let resp = self
            .http
            .get(url)
            .query(&[("interval", "1m"), ("range", "1d")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    SourceError::Upstream(e.to_string())
                }
            })?;

        match resp.status() {
            s if s.is_success() => {}
            // Unknown symbols come back as 404 with a chart.error body
            StatusCode::NOT_FOUND => {
                return Err(SourceError::unavailable(ticker.as_str(), "symbol not found"));
            }
            s => return Err(SourceError::Upstream(format!("HTTP {}", s))),
        }

        resp.json::<ChartResponse>()
            .await
            .map_err(|e| SourceError::Upstream(format!("malformed chart response: {}", e)))
    }
}

#[async_trait]
impl SnapshotSource for YahooChartSource {
    async fn fetch(&self, ticker: &Ticker) -> Result<MarketSnapshot, SourceError> {
        let chart = self.chart(ticker).await?.chart;

        if let Some(err) = chart.error {
            return Err(SourceError::unavailable(
                ticker.as_str(),
                format!("{}: {}", err.code, err.description),
            ));
        }

        let result = chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| SourceError::unavailable(ticker.as_str(), "empty chart result"))?;

        let bars = result
            .indicators
            .quote
            .first()
            .map(Quote::bars)
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(SourceError::unavailable(
                ticker.as_str(),
                "no bars in current session",
            ));
        }

        let yesterday_close = result
            .meta
            .chart_previous_close
            .or(result.meta.previous_close)
            .ok_or_else(|| SourceError::unavailable(ticker.as_str(), "no previous close"))?;

        MarketSnapshot::from_bars(ticker.clone(), &bars, yesterday_close)
            .map_err(|e| SourceError::Upstream(format!("inconsistent chart data: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    async fn setup() -> (MockServer, YahooChartSource) {
        let server = MockServer::start().await;
        let source = YahooChartSource::new(server.uri(), Duration::from_millis(500)).unwrap();
        (server, source)
    }

    fn chart_body(previous_close: Option<f64>) -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "AAPL",
                        "currency": "USD",
                        "chartPreviousClose": previous_close,
                        "regularMarketPrice": 190.1
                    },
                    "timestamp": [1700000000, 1700000060, 1700000120],
                    "indicators": {
                        "quote": [{
                            "open":   [189.504, 190.0, null],
                            "high":   [190.2,   191.337, null],
                            "low":    [189.1,   189.9, null],
                            "close":  [190.0,   190.104, null],
                            "volume": [1000,    2000, null]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_builds_snapshot() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("interval", "1m"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(Some(188.756))))
            .mount(&server)
            .await;

        let s = source.fetch(&ticker("AAPL")).await.unwrap();
        assert_eq!(s.ticker().as_str(), "AAPL");
        assert_eq!(s.open(), 189.5);
        assert_eq!(s.high(), 191.34);
        assert_eq!(s.low(), 189.1);
        assert_eq!(s.latest(), 190.1);
        assert_eq!(s.yesterday_close(), 188.76);
        // null bar skipped
        assert_eq!(s.prices(), &[190.0, 190.1]);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_previous_close() {
        let (server, source) = setup().await;
        let mut body = chart_body(None);
        body["chart"]["result"][0]["meta"]["previousClose"] = serde_json::json!(187.0);

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let s = source.fetch(&ticker("AAPL")).await.unwrap();
        assert_eq!(s.yesterday_close(), 187.0);
    }

    #[tokio::test]
    async fn test_fetch_without_previous_close_is_unavailable() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(None)))
            .mount(&server)
            .await;

        let err = source.fetch(&ticker("AAPL")).await.unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_without_bars_is_unavailable() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": {
                    "result": [{
                        "meta": { "chartPreviousClose": 100.0 },
                        "indicators": { "quote": [{}] }
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let err = source.fetch(&ticker("AAPL")).await.unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_unavailable() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                }
            })))
            .mount(&server)
            .await;

        let err = source.fetch(&ticker("NOPE")).await.unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = source.fetch(&ticker("AAPL")).await.unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let err = source.fetch(&ticker("AAPL")).await.unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let (server, source) = setup().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chart_body(Some(100.0)))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = source.fetch(&ticker("AAPL")).await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout { timeout_ms: 500 }));
    }

    #[tokio::test]
    async fn test_symbol_stays_under_chart_path() {
        let server = MockServer::start().await;
        let source =
            YahooChartSource::new(format!("{}/proxy/", server.uri()), Duration::from_millis(500))
                .unwrap();

        Mock::given(method("GET"))
            .and(path("/proxy/v8/finance/chart/BRK-B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(Some(100.0))))
            .expect(1)
            .mount(&server)
            .await;

        let s = source.fetch(&ticker("brk-b")).await.unwrap();
        assert_eq!(s.ticker().as_str(), "BRK-B");
    }

    #[test]
    fn test_chart_url_is_one_segment_per_symbol() {
        let source =
            YahooChartSource::new("https://query1.finance.yahoo.com", Duration::from_secs(1))
                .unwrap();

        let url = source.chart_url(&ticker("2330.TW")).unwrap();
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments, ["v8", "finance", "chart", "2330.TW"]);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(YahooChartSource::new("not a url", Duration::from_secs(1)).is_err());
        assert!(YahooChartSource::new("mailto:quotes@example.com", Duration::from_secs(1)).is_err());
    }
}
