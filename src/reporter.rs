use serde::Serialize;

use crate::format::{format_number, format_opt, super_long, to_thousands};
use crate::types::{
    Alert, CexStrategy, Channel, ChannelConfig, Futures, FuturesHistory, Spot, SpotHistory,
    WalletStrategy, WatchListItem,
};

/// How the CLI prints results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One JSON object per line on stdout.
    Json,
    /// Aligned plain-text table.
    Text,
}

/// A record printable as one table row.
pub trait TextRow {
    fn headers() -> &'static [&'static str];
    fn columns(&self) -> Vec<String>;
}

#[derive(Serialize)]
struct Line<'a, T: Serialize + ?Sized> {
    timestamp: String,
    kind: &'a str,
    data: &'a T,
}

/// Emit `data` as a single JSON line tagged with `kind`.
pub fn report_json<T: Serialize + ?Sized>(kind: &str, data: &T) {
    let line = Line {
        timestamp: chrono::Utc::now().to_rfc3339(),
        kind,
        data,
    };
    if let Ok(json) = serde_json::to_string(&line) {
        println!("{json}");
    }
}

/// Emit a list of records in the chosen mode.
pub fn report_rows<T: Serialize + TextRow>(mode: OutputMode, kind: &str, rows: &[T]) {
    match mode {
        OutputMode::Json => {
            for row in rows {
                report_json(kind, row);
            }
        }
        OutputMode::Text => {
            let cells: Vec<Vec<String>> = rows.iter().map(TextRow::columns).collect();
            print!("{}", render_table(T::headers(), &cells));
        }
    }
}

/// Emit a single value: JSON line, or pretty JSON in text mode.
pub fn report_value<T: Serialize + ?Sized>(mode: OutputMode, kind: &str, value: &T) {
    match mode {
        OutputMode::Json => report_json(kind, value),
        OutputMode::Text => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{json}");
            }
        }
    }
}

/// Left-aligned columns separated by two spaces.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = render_line(headers.iter().copied(), &widths);
    for row in rows {
        out.push_str(&render_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect::<Vec<_>>()
        .join("  ");
    format!("{}\n", line.trim_end())
}

fn flag(active: i32) -> String {
    if active == 1 { "on" } else { "off" }.to_string()
}

fn date(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

// ── Row impls ──────────────────────────────────────────────────────

impl TextRow for WatchListItem {
    fn headers() -> &'static [&'static str] {
        &["ID", "ADDRESS", "ALIAS", "SOURCE", "WATCHING"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            super_long(&self.listening_address, 6),
            self.address_alias.clone(),
            self.source.clone(),
            flag(self.is_active),
        ]
    }
}

impl TextRow for WalletStrategy {
    fn headers() -> &'static [&'static str] {
        &["ID", "NAME", "OPERATIONS", "MIN USD", "CHANNELS", "ACTIVE"]
    }

    fn columns(&self) -> Vec<String> {
        let channels = self
            .notification_channels
            .iter()
            .map(|c| c.channel_name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            self.id.to_string(),
            self.monitor_name.clone(),
            self.operation_type.clone(),
            to_thousands(&self.min_amount_usd.to_string()),
            channels,
            flag(self.is_active),
        ]
    }
}

impl TextRow for CexStrategy {
    fn headers() -> &'static [&'static str] {
        &["ID", "SOURCE", "ACTIVE", "SINCE"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.source.to_string(),
            flag(self.is_active),
            date(self.created_date),
        ]
    }
}

impl TextRow for Channel {
    fn headers() -> &'static [&'static str] {
        &["ID", "NAME", "TYPE", "TARGET", "ACTIVE"]
    }

    fn columns(&self) -> Vec<String> {
        let target = match self.config() {
            Some(ChannelConfig::Webhook { url, .. }) => url,
            Some(ChannelConfig::Telegram { chat_id }) => chat_id,
            None => "-".to_string(),
        };
        vec![
            self.id.to_string(),
            self.channel_name.clone(),
            format!("{:?}", self.channel_type).to_uppercase(),
            target,
            flag(self.is_active),
        ]
    }
}

impl TextRow for Spot {
    fn headers() -> &'static [&'static str] {
        &["SYMBOL", "SOURCE", "PRICE", "24H VOL", "MCAP", "24H %", "+2% DEPTH", "-2% DEPTH"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.symbol.clone(),
            self.data_source.clone(),
            format_opt(self.current_price, 8),
            format_opt(self.volume24h, 2),
            format_opt(self.market_cap, 2),
            self.price_change_percent24h
                .map(|p| format!("{}%", p.round_dp(2)))
                .unwrap_or_else(|| "-".to_string()),
            format_opt(self.depth2_ask, 2),
            format_opt(self.depth2_bid, 2),
        ]
    }
}

impl TextRow for Futures {
    fn headers() -> &'static [&'static str] {
        &["SYMBOL", "SOURCE", "INDEX", "24H VOL", "BASIS", "FUNDING", "INTERVAL", "OI"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.symbol.clone(),
            self.data_source.clone(),
            format_opt(self.index_price, 8),
            format_opt(self.volume24h, 2),
            format_opt(self.basis, 6),
            format_opt(self.last_funding_rate, 6),
            self.funding_interval_hours
                .map(|h| format!("{h}h"))
                .unwrap_or_else(|| "-".to_string()),
            format_opt(self.open_interest_usdt, 2),
        ]
    }
}

impl TextRow for SpotHistory {
    fn headers() -> &'static [&'static str] {
        &["TIME", "24H VOL", "+2% DEPTH", "-2% DEPTH", "+5% DEPTH", "-5% DEPTH"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            date(self.created_date),
            format_opt(self.volume24h, 2),
            format_opt(self.depth2_ask, 2),
            format_opt(self.depth2_bid, 2),
            format_opt(self.depth5_ask, 2),
            format_opt(self.depth5_bid, 2),
        ]
    }
}

impl TextRow for FuturesHistory {
    fn headers() -> &'static [&'static str] {
        &["TIME", "24H VOL", "BASIS", "FUNDING", "OI"]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            date(self.created_date),
            format_opt(self.volume24h, 2),
            format_opt(self.basis, 6),
            format_opt(self.last_funding_rate, 6),
            format_opt(self.open_interest_usdt, 2),
        ]
    }
}

impl TextRow for Alert {
    fn headers() -> &'static [&'static str] {
        &["ID", "TIME", "RISK", "ALERT"]
    }

    fn columns(&self) -> Vec<String> {
        let risk = serde_json::to_value(self.risk_level)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "-".to_string());
        vec![
            self.id.to_string(),
            date(self.created_date),
            risk,
            self.alert_content.clone(),
        ]
    }
}

/// Pagination footer for text output.
pub fn page_footer(page: u32, total_page: u32, total: u64) -> String {
    format!(
        "page {page}/{total_page} ({} total)",
        format_number(total.into(), 0)
    )
}
