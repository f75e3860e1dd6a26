use crate::analytics::lines::{security_characteristic_line, security_market_line, sml_points};
use crate::analytics::{MarketContext, Performance, PriceSeries};
use crate::pipeline::{Analysis, SymbolAnalysis, SymbolIssue};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

const PREVIEW_ROWS: usize = 5;

const BLUE: &str = "blue";
const GREEN: &str = "green";
const RED: &str = "red";

// ── Chart-ready payload types ──
//
// Every chart is a list of traces the dashboard can hand straight to its
// plotting library. Nothing here is computed; values come from `Analysis`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    Lines,
    Markers,
    MarkersText,
    Bar,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    /// Per-point colors, used by bar traces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace<X> {
    pub name: String,
    pub mode: TraceMode,
    pub x: Vec<X>,
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    pub style: TraceStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart<X> {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    pub traces: Vec<Trace<X>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Date(NaiveDate),
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Everything the dashboard renders for one request.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub request_id: Uuid,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub benchmark: String,
    /// Stocks admitted into the aligned table, in request order.
    pub tickers: Vec<String>,
    pub observations: usize,
    pub merged_preview: Table,
    pub prices: Chart<NaiveDate>,
    pub normalized: Chart<NaiveDate>,
    pub beta_table: Table,
    pub estimates: Vec<SymbolAnalysis>,
    pub scl: Vec<Chart<f64>>,
    /// Absent when no market context could be built.
    pub market: Option<MarketContext>,
    pub risk_free_rate_pct: Option<f64>,
    pub expected_table: Option<Table>,
    pub expected_vs_actual: Option<Chart<String>>,
    pub sml: Option<Chart<f64>>,
    pub issues: Vec<SymbolIssue>,
}

/// Two-decimal rounding used for every displayed table and bar value.
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn build_dashboard(analysis: &Analysis) -> Dashboard {
    let market = analysis.market;

    Dashboard {
        request_id: analysis.request.request_id,
        start: analysis.request.start,
        end: analysis.request.end,
        benchmark: analysis.request.benchmark.clone(),
        tickers: analysis.prices.stocks().iter().map(|s| s.symbol().to_string()).collect(),
        observations: analysis.returns.len(),
        merged_preview: merged_preview(analysis),
        prices: price_chart("Stock Prices", "Close", analysis.prices.stocks()),
        normalized: price_chart("Normalized Prices", "Growth of 1", &analysis.normalized),
        beta_table: beta_table(&analysis.symbols),
        estimates: analysis.symbols.clone(),
        scl: scl_charts(analysis),
        market,
        risk_free_rate_pct: market.map(|m| round2(m.risk_free_rate * 100.0)),
        expected_table: expected_table(&analysis.symbols),
        expected_vs_actual: expected_vs_actual(&analysis.symbols),
        sml: market.map(|m| sml_chart(&analysis.symbols, &m)),
        issues: analysis.issues.to_vec(),
    }
}

/// First aligned rows: date, every admitted stock, then the benchmark.
fn merged_preview(analysis: &Analysis) -> Table {
    let prices = &analysis.prices;
    let mut columns = vec!["Date".to_string()];
    columns.extend(prices.stocks().iter().map(|s| s.symbol().to_string()));
    columns.push(prices.benchmark().symbol().to_string());

    let rows = prices
        .dates()
        .iter()
        .enumerate()
        .take(PREVIEW_ROWS)
        .map(|(i, d)| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(Cell::Date(*d));
            row.extend(prices.stocks().iter().map(|s| Cell::Number(s.points()[i].1)));
            row.push(Cell::Number(prices.benchmark().points()[i].1));
            row
        })
        .collect();

    Table { columns, rows }
}

fn price_chart(title: &str, y_title: &str, series: &[PriceSeries]) -> Chart<NaiveDate> {
    Chart {
        title: title.to_string(),
        x_title: "Date".to_string(),
        y_title: y_title.to_string(),
        barmode: None,
        traces: series
            .iter()
            .map(|s| Trace {
                name: s.symbol().to_string(),
                mode: TraceMode::Lines,
                x: s.dates().collect(),
                y: s.values().collect(),
                text: None,
                style: TraceStyle::default(),
            })
            .collect(),
    }
}

fn beta_table(symbols: &[SymbolAnalysis]) -> Table {
    Table {
        columns: vec!["Stock".into(), "Beta Value".into()],
        rows: symbols
            .iter()
            .map(|s| vec![Cell::Text(s.symbol.clone()), Cell::Number(round2(s.estimate.beta))])
            .collect(),
    }
}

fn expected_table(symbols: &[SymbolAnalysis]) -> Option<Table> {
    let rows = symbols
        .iter()
        .map(|s| {
            s.expected_return
                .map(|e| vec![Cell::Text(s.symbol.clone()), Cell::Number(round2(e))])
        })
        .collect::<Option<Vec<_>>>()?;

    Some(Table {
        columns: vec!["Stock".into(), "Expected Return (CAPM)".into()],
        rows,
    })
}

fn scl_charts(analysis: &Analysis) -> Vec<Chart<f64>> {
    let benchmark = analysis.returns.benchmark();

    analysis
        .symbols
        .iter()
        .filter_map(|sym| {
            let stock = analysis.returns.stock(&sym.symbol)?;
            let (line_x, line_y): (Vec<f64>, Vec<f64>) =
                security_characteristic_line(&sym.estimate, benchmark).into_iter().unzip();

            Some(Chart {
                title: format!("Security Characteristic Line: {}", sym.symbol),
                x_title: format!("Market Return ({})", benchmark.symbol()),
                y_title: format!("{} Return", sym.symbol),
                barmode: None,
                traces: vec![
                    Trace {
                        name: "Daily Returns".into(),
                        mode: TraceMode::Markers,
                        x: benchmark.values().collect(),
                        y: stock.values().collect(),
                        text: None,
                        style: TraceStyle::default(),
                    },
                    Trace {
                        name: "SCL (Regression Line)".into(),
                        mode: TraceMode::Lines,
                        x: line_x,
                        y: line_y,
                        text: None,
                        style: TraceStyle { color: Some(RED), ..Default::default() },
                    },
                ],
            })
        })
        .collect()
}

fn expected_vs_actual(symbols: &[SymbolAnalysis]) -> Option<Chart<String>> {
    let mut names = Vec::with_capacity(symbols.len());
    let mut expected = Vec::with_capacity(symbols.len());
    let mut actual = Vec::with_capacity(symbols.len());
    let mut colors = Vec::with_capacity(symbols.len());

    for s in symbols {
        names.push(s.symbol.clone());
        expected.push(round2(s.expected_return?));
        actual.push(round2(s.actual_return));
        colors.push(match s.performance? {
            Performance::Outperformed => GREEN,
            Performance::Underperformed => RED,
        });
    }

    Some(Chart {
        title: "Expected Return (CAPM) vs Actual Return".into(),
        x_title: "Stock".into(),
        y_title: "Annual Return".into(),
        barmode: Some("group"),
        traces: vec![
            Trace {
                name: "Expected Return (CAPM)".into(),
                mode: TraceMode::Bar,
                x: names.clone(),
                y: expected,
                text: None,
                style: TraceStyle { color: Some(BLUE), ..Default::default() },
            },
            Trace {
                name: "Actual Return".into(),
                mode: TraceMode::Bar,
                x: names,
                y: actual,
                text: None,
                style: TraceStyle { colors: Some(colors), ..Default::default() },
            },
        ],
    })
}

fn sml_chart(symbols: &[SymbolAnalysis], market: &MarketContext) -> Chart<f64> {
    let betas: Vec<f64> = symbols.iter().map(|s| s.estimate.beta).collect();
    let line = security_market_line(&betas, market);
    let (marker_x, marker_y): (Vec<f64>, Vec<f64>) = sml_points(&betas, market).into_iter().unzip();

    Chart {
        title: "Security Market Line (SML)".into(),
        x_title: "Beta".into(),
        y_title: "Expected Return (CAPM)".into(),
        barmode: None,
        traces: vec![
            Trace {
                name: "Security Market Line".into(),
                mode: TraceMode::Lines,
                x: line.iter().map(|p| p.0).collect(),
                y: line.iter().map(|p| p.1).collect(),
                text: None,
                style: TraceStyle { color: Some(BLUE), dash: Some("dash"), width: Some(3), ..Default::default() },
            },
            Trace {
                name: "Stocks".into(),
                mode: TraceMode::MarkersText,
                x: marker_x,
                y: marker_y,
                text: Some(symbols.iter().map(|s| s.symbol.clone()).collect()),
                style: TraceStyle { color: Some(RED), ..Default::default() },
            },
        ],
    }
}
