use serde_json::{Value, json};
use tracing::debug;

use crate::http::{ApiClient, ApiError, ApiResult};
use crate::types::{
    AddWalletStrategy, Alert, AlertListQuery, ArticleSource, ArticleSub, CexListQuery,
    CexStrategy, Channel, Futures, FuturesHistory, IdsRequest, LoginChallenge, LoginRequest,
    LoginResponse, Page, PageList, SmartAddress, Spot, SpotHistory, SubRequest, SysConfig,
    UpdateChannel, UpdateWalletStrategy, WalletStrategy, WatchListItem, WebhookChannel,
};

/// Rows per watch-list page.
pub const WATCH_LIST_PAGE_SIZE: u32 = 15;

/// Rows per spot / futures / alert page.
pub const MARKET_PAGE_SIZE: u32 = 5;

fn missing_data(what: &str) -> ApiError {
    ApiError::Transport(format!("{what}: response carried no data"))
}

// ── System & login ─────────────────────────────────────────────────

/// Fetch backend system configuration (sources, channel kinds, tags).
pub async fn get_sys_config(client: &ApiClient) -> ApiResult<Option<SysConfig>> {
    client.post_empty("/sys/info").await?.into_result()
}

/// Fetch the message the wallet must sign to log in.
pub async fn get_login_sign_message(client: &ApiClient) -> ApiResult<String> {
    let challenge: Option<LoginChallenge> = client.post_empty("/customer/info").await?.into_result()?;
    challenge
        .map(|c| c.data)
        .ok_or_else(|| missing_data("login message"))
}

/// Exchange address + signature for a session credential.
pub async fn do_login(client: &ApiClient, address: &str, sign_data: &str) -> ApiResult<LoginResponse> {
    let req = LoginRequest {
        address: address.to_string(),
        sign_data: sign_data.to_string(),
    };
    client.post_data("/customer/login", &req).await
}

// ── Watch list ─────────────────────────────────────────────────────

pub async fn get_watch_list(
    client: &ApiClient,
    page_num: u32,
    page_size: u32,
) -> ApiResult<Page<WatchListItem>> {
    let body = json!({ "pageNum": page_num, "pageSize": page_size });
    let page: Option<PageList<WatchListItem>> = client
        .post("/customer/listCustomerSubAddresses", &body)
        .await?;
    let page: Page<WatchListItem> = page.map(Into::into).unwrap_or_default();
    debug!("Fetched {} watch-list entries (page {page_num})", page.list.len());
    Ok(page)
}

/// Subscribe (or with `unsub`, unsubscribe) addresses. Also used to update
/// the alias of an existing entry.
pub async fn add_watch_items(client: &ApiClient, items: &[SmartAddress], unsub: bool) -> ApiResult<()> {
    let req = SubRequest {
        sub: items.to_vec(),
        unsub,
    };
    client.post_unit("/customer/subSmartAddr", &req).await
}

pub async fn delete_watch_item(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .post_unit("/customer/removeSmartAddr", &IdsRequest { ids: vec![id] })
        .await
}

// ── Strategies ─────────────────────────────────────────────────────

pub async fn get_wallet_strategies(client: &ApiClient) -> ApiResult<Vec<WalletStrategy>> {
    let list: Option<Vec<WalletStrategy>> = client
        .post_empty("/customer/listCustomerTradeStrategy")
        .await?
        .into_result()?;
    let list = list.unwrap_or_default();
    debug!("Fetched {} wallet strategies", list.len());
    Ok(list)
}

/// CEX announcement sources the user is subscribed to.
pub async fn get_cex_strategies(client: &ApiClient) -> ApiResult<Vec<CexStrategy>> {
    let list: Option<Vec<CexStrategy>> = client
        .post_empty("/customer/listCustomerSubArticleTypes")
        .await?
        .into_result()?;
    let list = list.unwrap_or_default();
    debug!("Fetched {} cex strategies", list.len());
    Ok(list)
}

pub async fn add_wallet_strategy(client: &ApiClient, strategy: &AddWalletStrategy) -> ApiResult<()> {
    client
        .post_unit("/customer/addCustomerTradeStrategy", strategy)
        .await
}

pub async fn update_wallet_strategy(
    client: &ApiClient,
    strategy: &UpdateWalletStrategy,
) -> ApiResult<()> {
    client
        .post_unit("/customer/updateCustomerTradeStrategy", strategy)
        .await
}

pub async fn delete_wallet_strategy(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .post_unit("/customer/removeCustomerTradeStrategy", &IdsRequest { ids: vec![id] })
        .await
}

/// Subscribe to (or with `unsub`, drop) announcements from a CEX.
pub async fn subscribe_cex(client: &ApiClient, source: ArticleSource, unsub: bool) -> ApiResult<()> {
    let req = SubRequest {
        sub: vec![ArticleSub { source }],
        unsub,
    };
    client.post_unit("/customer/subArticle", &req).await
}

// ── Channels ───────────────────────────────────────────────────────

pub async fn get_channels(client: &ApiClient) -> ApiResult<Vec<Channel>> {
    let list: Option<Vec<Channel>> = client
        .post_empty("/customer/listCustomerChannels")
        .await?
        .into_result()?;
    let list = list.unwrap_or_default();
    debug!("Fetched {} channels", list.len());
    Ok(list)
}

pub async fn add_webhook_channel(client: &ApiClient, channel: &WebhookChannel) -> ApiResult<()> {
    client.post_unit("/customer/addApiChannels", channel).await
}

/// Create a Telegram channel; returns the new channel id.
pub async fn add_telegram_channel(client: &ApiClient, channel_name: &str) -> ApiResult<String> {
    let id: Option<Value> = client
        .post("/customer/addTgChannels", &json!({ "channelName": channel_name }))
        .await?;
    match id {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(missing_data("telegram channel id")),
    }
}

pub async fn update_channel(client: &ApiClient, channel: &UpdateChannel) -> ApiResult<()> {
    client
        .post_unit("/customer/updateNotificationChannels", channel)
        .await
}

/// Ask the backend to push a test message through a bound Telegram channel.
pub async fn test_telegram_send(client: &ApiClient, channel_id: &str) -> ApiResult<()> {
    client
        .post_unit("/customer/tgSendTest", &json!({ "id": channel_id }))
        .await
}

pub async fn delete_channel(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .post_unit("/customer/removeNotificationChannels", &IdsRequest { ids: vec![id] })
        .await
}

// ── Market data ────────────────────────────────────────────────────

pub async fn get_spot_list(client: &ApiClient, query: &CexListQuery) -> ApiResult<Page<Spot>> {
    let page: Option<PageList<Spot>> = client.post("/token/spot/list", query).await?;
    Ok(page.map(Into::into).unwrap_or_default())
}

pub async fn get_futures_list(client: &ApiClient, query: &CexListQuery) -> ApiResult<Page<Futures>> {
    let page: Option<PageList<Futures>> = client.post("/token/futures/list", query).await?;
    Ok(page.map(Into::into).unwrap_or_default())
}

pub async fn get_spot_history(
    client: &ApiClient,
    symbol: &str,
    data_source: &str,
) -> ApiResult<Vec<SpotHistory>> {
    let list: Option<Vec<SpotHistory>> = client
        .post_query(
            "/token/spot/history/list",
            &[("symbol", symbol), ("dataSource", data_source)],
        )
        .await?
        .into_result()?;
    Ok(list.unwrap_or_default())
}

pub async fn get_futures_history(
    client: &ApiClient,
    symbol: &str,
    data_source: &str,
) -> ApiResult<Vec<FuturesHistory>> {
    let list: Option<Vec<FuturesHistory>> = client
        .post_query(
            "/token/futures/history/list",
            &[("symbol", symbol), ("dataSource", data_source)],
        )
        .await?
        .into_result()?;
    Ok(list.unwrap_or_default())
}

pub async fn get_alert_list(client: &ApiClient, query: &AlertListQuery) -> ApiResult<Page<Alert>> {
    let page: Option<PageList<Alert>> = client.post("/token/alert/list", query).await?;
    Ok(page.map(Into::into).unwrap_or_default())
}
