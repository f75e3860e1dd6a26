use super::{MarketDataSource, RatePoint};
use crate::analytics::PriceSeries;
use crate::errors::{AnalysisError, AnalysisResult};
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::Client;
use std::collections::BTreeMap;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance chart API client. All methods return Result, never panic.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .user_agent(USER_AGENT)
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_chart(&self, symbol: &str, query: &str) -> AnalysisResult<String> {
        let url = format!(
            "{}/v8/finance/chart/{}?{query}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        tracing::debug!(symbol = %symbol, url = %url, "fetching yahoo chart");

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::DataSource {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalysisResult<PriceSeries> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        let query = format!("period1={period1}&period2={period2}&interval=1d&events=history");

        let body = self.get_chart(symbol, &query).await?;
        let closes = parse_chart(&body)?;

        let points = closes
            .into_iter()
            .filter(|(d, _)| *d >= start && *d < end)
            .collect();
        let series = PriceSeries::new(symbol, points)?;

        tracing::info!(symbol = %symbol, observations = series.len(), "prices fetched");
        Ok(series)
    }

    async fn fetch_short_rate(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> AnalysisResult<Vec<RatePoint>> {
        let query = format!(
            "range={}&interval={}",
            urlencoding::encode(period),
            urlencoding::encode(interval)
        );
        let body = self.get_chart(symbol, &query).await?;
        let rates: Vec<RatePoint> = parse_chart(&body)?
            .into_iter()
            .map(|(date, yield_percent)| RatePoint { date, yield_percent })
            .collect();

        tracing::info!(symbol = %symbol, observations = rates.len(), "risk-free rate fetched");
        Ok(rates)
    }
}

// Chart response format (trimmed):
// {
//   "chart": {
//     "result": [{
//       "meta": { "symbol": "^GSPC", "gmtoffset": -14400 },
//       "timestamp": [1704205800, 1704292200],
//       "indicators": {
//         "quote": [{ "close": [4742.83, null] }],
//         "adjclose": [{ "adjclose": [4742.83, null] }]
//       }
//     }],
//     "error": null
//   }
// }

#[derive(serde::Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(serde::Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(serde::Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<ChartIndicators>,
}

#[derive(serde::Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(serde::Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Vec<ChartAdjClose>,
}

#[derive(serde::Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(serde::Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Extract (trading date, close) pairs from a chart response body.
///
/// The adjusted close is used when Yahoo provides one, else the raw close.
/// Timestamps are shifted by the exchange offset so each bar lands on its
/// local trading date. Null and non-finite closes are skipped. Output is
/// ascending with one value per date (the later bar wins).
pub fn parse_chart(body: &str) -> AnalysisResult<Vec<(NaiveDate, f64)>> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Parse(format!("yahoo chart: {e}")))?;

    if let Some(err) = resp.chart.error {
        return Err(AnalysisError::DataSource {
            status: 200,
            body: format!(
                "{}: {}",
                err.code.unwrap_or_default(),
                err.description.unwrap_or_default()
            ),
        });
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let offset = result.meta.as_ref().map(|m| m.gmtoffset).unwrap_or(0);
    let closes = result
        .indicators
        .map(|ind| {
            ind.adjclose
                .into_iter()
                .next()
                .map(|a| a.adjclose)
                .filter(|a| !a.is_empty())
                .or_else(|| ind.quote.into_iter().next().map(|q| q.close))
                .unwrap_or_default()
        })
        .unwrap_or_default();

    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else {
            continue;
        };
        let Some(dt) = DateTime::from_timestamp(ts + offset, 0) else {
            tracing::warn!(timestamp = ts, "skipping out-of-range timestamp");
            continue;
        };
        by_date.insert(dt.date_naive(), close);
    }

    Ok(by_date.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::series::day;

    // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC, New York offset.
    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{ "close": [185.64, 184.25, 181.91] }],
                    "adjclose": [{ "adjclose": [184.94, null, 181.22] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_prefers_adjusted_close() {
        let pts = parse_chart(BODY).unwrap();
        assert_eq!(pts, vec![(day(2024, 1, 2), 184.94), (day(2024, 1, 4), 181.22)]);
    }

    #[test]
    fn test_parse_falls_back_to_close() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"close":[10.5, 11.0]}]}}],"error":null}}"#;
        let pts = parse_chart(body).unwrap();
        assert_eq!(pts, vec![(day(2024, 1, 2), 10.5), (day(2024, 1, 3), 11.0)]);
    }

    #[test]
    fn test_gmtoffset_moves_date() {
        // 2024-01-03 02:00 UTC is still Jan 2 in New York.
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},
            "timestamp":[1704247200],
            "indicators":{"quote":[{"close":[1.0]}]}}],"error":null}}"#;
        assert_eq!(parse_chart(body).unwrap(), vec![(day(2024, 1, 2), 1.0)]);
    }

    #[test]
    fn test_empty_range_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn test_chart_error_surfaces() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart(body) {
            Err(AnalysisError::DataSource { body, .. }) => assert!(body.contains("delisted"), "body={body}"),
            other => panic!("expected DataSource error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(parse_chart("<html>"), Err(AnalysisError::Parse(_))));
    }
}
