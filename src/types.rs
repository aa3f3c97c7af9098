use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Envelope & paging ──────────────────────────────────────────────

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub msg: String,
}

/// One page of a server-side list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageList<T> {
    #[serde(default)]
    pub curr_page: u32,
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_page: u32,
    #[serde(default)]
    pub total_count: u64,
}

/// What callers keep from a [`PageList`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total: u64,
    pub total_page: u32,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
            total_page: 0,
        }
    }
}

impl<T> From<PageList<T>> for Page<T> {
    fn from(page: PageList<T>) -> Self {
        Self {
            list: page.list,
            total: page.total_count,
            total_page: page.total_page,
        }
    }
}

/// Request body for id-list deletions.
#[derive(Debug, Clone, Serialize)]
pub struct IdsRequest {
    pub ids: Vec<i64>,
}

/// `{sub: [...], unsub}` subscription toggle body.
#[derive(Debug, Clone, Serialize)]
pub struct SubRequest<T> {
    pub sub: Vec<T>,
    pub unsub: bool,
}

// ── System ─────────────────────────────────────────────────────────

/// CEX announcement sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArticleSource {
    Binance,
    Coinbase,
    #[serde(rename = "OKX")]
    Okx,
    Bybit,
    Kraken,
    Upbit,
}

impl ArticleSource {
    pub const ALL: [ArticleSource; 6] = [
        ArticleSource::Binance,
        ArticleSource::Coinbase,
        ArticleSource::Okx,
        ArticleSource::Bybit,
        ArticleSource::Kraken,
        ArticleSource::Upbit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArticleSource::Binance => "Binance",
            ArticleSource::Coinbase => "Coinbase",
            ArticleSource::Okx => "OKX",
            ArticleSource::Bybit => "Bybit",
            ArticleSource::Kraken => "Kraken",
            ArticleSource::Upbit => "Upbit",
        }
    }
}

impl fmt::Display for ArticleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArticleSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArticleSource::ALL
            .into_iter()
            .find(|src| src.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Telegram,
    Webhook,
}

/// `/sys/info` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SysConfig {
    #[serde(default)]
    pub article_sources: Vec<ArticleSource>,
    #[serde(default)]
    pub smart_address_types: Vec<String>,
    #[serde(default)]
    pub smart_address_sources: Vec<String>,
    #[serde(default)]
    pub channels: Vec<ChannelType>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub expiration_time: i64,
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoginChallenge {
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub address: String,
    pub sign_data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub address: String,
    pub uuid: String,
}

// ── Watch list ─────────────────────────────────────────────────────

/// An address to subscribe to, as sent to `/customer/subSmartAddr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartAddress {
    pub source: String,
    pub addr: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchListItem {
    pub id: i64,
    #[serde(default)]
    pub created_date: i64,
    #[serde(default)]
    pub updated_date: i64,
    #[serde(default)]
    pub customer_id: i64,
    pub listening_address: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub address_alias: String,
    #[serde(default)]
    pub is_active: i32,
    /// Local-only: alias edited but not yet saved.
    #[serde(default, skip_serializing)]
    pub is_edit: bool,
}

impl WatchListItem {
    pub fn active(&self) -> bool {
        self.is_active == 1
    }

    pub fn to_smart_address(&self) -> SmartAddress {
        SmartAddress {
            source: self.source.clone(),
            addr: self.listening_address.clone(),
            alias: self.address_alias.clone(),
        }
    }
}

// ── Strategies ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWalletStrategy {
    pub name: String,
    pub operations: Vec<String>,
    pub min_amount_usd: String,
    pub notify_channel_ids: Vec<i64>,
}

/// Partial update; unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWalletStrategy {
    pub strategy_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount_usd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_channel_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStrategy {
    pub id: i64,
    #[serde(default)]
    pub created_date: i64,
    #[serde(default)]
    pub monitor_name: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub min_amount_usd: Decimal,
    #[serde(default)]
    pub mainstream_only: i32,
    #[serde(default)]
    pub is_active: i32,
    #[serde(default)]
    pub notification_channels: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CexStrategy {
    pub id: i64,
    #[serde(default)]
    pub created_date: i64,
    pub source: ArticleSource,
    #[serde(default)]
    pub tag: Option<serde_json::Value>,
    #[serde(default)]
    pub is_active: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleSub {
    pub source: ArticleSource,
}

// ── Channels ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    #[serde(default)]
    pub created_date: i64,
    #[serde(default)]
    pub channel_name: String,
    pub channel_type: ChannelType,
    /// JSON-encoded [`ChannelConfig`].
    #[serde(default)]
    pub channel_config: String,
    #[serde(default)]
    pub is_active: i32,
}

impl Channel {
    pub fn config(&self) -> Option<ChannelConfig> {
        serde_json::from_str(&self.channel_config).ok()
    }
}

/// Destination config: webhook URL (+ optional auth header) or Telegram chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelConfig {
    Webhook {
        url: String,
        #[serde(rename = "Authorization", skip_serializing_if = "Option::is_none", default)]
        authorization: Option<String>,
    },
    Telegram {
        #[serde(rename = "chatId")]
        chat_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookChannel {
    pub channel_name: String,
    pub config: ChannelConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannel {
    pub channel_id: i64,
    pub channel_name: String,
    pub config: ChannelConfig,
    pub unsub: bool,
}

// ── Market data ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_order_by(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Body of `/token/spot/list` and `/token/futures/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CexListQuery {
    pub page_num: u32,
    pub page_size: u32,
    pub token: String,
    pub data_source: String,
    pub status: String,
    pub order_name: String,
    pub order_by: String,
}

impl Default for CexListQuery {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: crate::api::MARKET_PAGE_SIZE,
            token: String::new(),
            data_source: String::new(),
            status: String::new(),
            order_name: String::new(),
            order_by: SortDirection::Desc.as_order_by().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: i64,
    #[serde(default)]
    pub data_source: String,
    pub symbol: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub volume24h: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub price_change_percent24h: Option<Decimal>,
    #[serde(default)]
    pub depth2_ask: Option<Decimal>,
    #[serde(default)]
    pub depth2_bid: Option<Decimal>,
    #[serde(default)]
    pub depth5_ask: Option<Decimal>,
    #[serde(default)]
    pub depth5_bid: Option<Decimal>,
    #[serde(default)]
    pub liquidity_score: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Futures {
    pub id: i64,
    #[serde(default)]
    pub data_source: String,
    pub symbol: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub volume24h: Option<Decimal>,
    #[serde(default)]
    pub index_price: Option<Decimal>,
    #[serde(default)]
    pub basis: Option<Decimal>,
    #[serde(default)]
    pub last_funding_rate: Option<Decimal>,
    #[serde(default)]
    pub funding_interval_hours: Option<u32>,
    #[serde(default)]
    pub open_interest_usdt: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotHistory {
    pub id: i64,
    pub created_date: i64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub volume24h: Option<Decimal>,
    #[serde(default)]
    pub depth2_ask: Option<Decimal>,
    #[serde(default)]
    pub depth2_bid: Option<Decimal>,
    #[serde(default)]
    pub depth5_ask: Option<Decimal>,
    #[serde(default)]
    pub depth5_bid: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesHistory {
    pub id: i64,
    pub created_date: i64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub volume24h: Option<Decimal>,
    #[serde(default)]
    pub basis: Option<Decimal>,
    #[serde(default)]
    pub last_funding_rate: Option<Decimal>,
    #[serde(default)]
    pub open_interest_usdt: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    High,
    #[serde(rename = "U")]
    Unknown,
    #[default]
    #[serde(rename = "")]
    Any,
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(RiskLevel::Low),
            "M" | "MEDIUM" => Ok(RiskLevel::Medium),
            "H" | "HIGH" => Ok(RiskLevel::High),
            "U" | "UNKNOWN" => Ok(RiskLevel::Unknown),
            "" | "ANY" => Ok(RiskLevel::Any),
            other => Err(format!("unknown risk level {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListQuery {
    pub page_num: u32,
    pub page_size: u32,
    pub keywords: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    #[serde(default)]
    pub created_date: i64,
    #[serde(default)]
    pub alert_content: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_without_data() {
        let env: Envelope<Vec<i64>> =
            serde_json::from_value(json!({"code": 7, "msg": "nope"})).unwrap();
        assert_eq!(env.code, 7);
        assert!(env.data.is_none());
        assert_eq!(env.msg, "nope");
    }

    #[test]
    fn page_list_conversion() {
        let page: PageList<i64> = serde_json::from_value(json!({
            "currPage": 2, "list": [1, 2], "pageSize": 2, "totalPage": 4, "totalCount": 7
        }))
        .unwrap();
        let page: Page<i64> = page.into();
        assert_eq!(page.list, vec![1, 2]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_page, 4);
    }

    #[test]
    fn watch_item_from_server() {
        let item: WatchListItem = serde_json::from_value(json!({
            "createdDate": 1746018000000i64,
            "updatedDate": 1746018000000i64,
            "versionId": 3,
            "markDelete": "N",
            "id": 9,
            "customerId": 1,
            "customerGroupId": 1,
            "listeningAddress": "So1ana",
            "source": "Solana",
            "addressAlias": "whale",
            "isActive": 1
        }))
        .unwrap();
        assert!(item.active());
        assert!(!item.is_edit);
        assert_eq!(
            item.to_smart_address(),
            SmartAddress {
                source: "Solana".into(),
                addr: "So1ana".into(),
                alias: "whale".into()
            }
        );
    }

    #[test]
    fn spot_accepts_string_and_number_decimals() {
        let spot: Spot = serde_json::from_value(json!({
            "id": 1,
            "symbol": "BTCUSDT",
            "dataSource": "Binance",
            "currentPrice": "93032.3",
            "volume24h": 1637281910.5,
            "depth2Ask": "20904186.2"
        }))
        .unwrap();
        assert_eq!(spot.current_price, Some(dec!(93032.3)));
        assert_eq!(spot.depth2_ask, Some(dec!(20904186.2)));
        assert!(spot.volume24h.is_some());
        assert!(spot.market_cap.is_none());
    }

    #[test]
    fn channel_config_shapes() {
        let webhook: ChannelConfig =
            serde_json::from_str(r#"{"url":"https://hook","Authorization":"Bearer x"}"#).unwrap();
        assert_eq!(
            webhook,
            ChannelConfig::Webhook {
                url: "https://hook".into(),
                authorization: Some("Bearer x".into())
            }
        );
        let tg: ChannelConfig = serde_json::from_str(r#"{"chatId":"-100"}"#).unwrap();
        assert_eq!(tg, ChannelConfig::Telegram { chat_id: "-100".into() });

        let body = serde_json::to_value(ChannelConfig::Webhook {
            url: "u".into(),
            authorization: None,
        })
        .unwrap();
        assert_eq!(body, json!({"url": "u"}));
    }

    #[test]
    fn update_strategy_omits_unset_fields() {
        let update = UpdateWalletStrategy {
            strategy_id: 5,
            inactive: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            json!({"strategyId": 5, "inactive": true})
        );
    }

    #[test]
    fn article_source_names() {
        assert_eq!(serde_json::to_value(ArticleSource::Okx).unwrap(), json!("OKX"));
        assert_eq!("okx".parse::<ArticleSource>().unwrap(), ArticleSource::Okx);
        assert!("nyse".parse::<ArticleSource>().is_err());
    }

    #[test]
    fn risk_level_wire_names() {
        assert_eq!(serde_json::to_value(RiskLevel::Any).unwrap(), json!(""));
        assert_eq!(serde_json::to_value(RiskLevel::High).unwrap(), json!("H"));
        assert_eq!("medium".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
    }
}
