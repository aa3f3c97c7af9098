use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::api::{self, MARKET_PAGE_SIZE, WATCH_LIST_PAGE_SIZE};
use crate::http::{ApiClient, ApiResult};
use crate::token::{self, TokenError};
use crate::types::{
    AddWalletStrategy, Alert, AlertListQuery, ArticleSource, CexListQuery, CexStrategy, Channel,
    Futures, FuturesHistory, Page, RiskLevel, SmartAddress, SortDirection, Spot, SpotHistory,
    UpdateChannel, UpdateWalletStrategy, WalletStrategy, WatchListItem, WebhookChannel,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Hands out increasing tickets so only the latest response for a list is kept.
///
/// A refresh takes a ticket before sending; when its response arrives it is
/// applied only if no newer refresh has been issued in the meantime.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

/// Pagination state tracked per list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub total: u64,
    pub total_page: u32,
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            page: 1,
            total: 0,
            total_page: 0,
        }
    }
}

// ── Watch list ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct WatchListState {
    list: Vec<WatchListItem>,
    /// Next page `get_list(true)` will request.
    next_page: u32,
    total: u64,
}

/// Subscribed wallet addresses.
pub struct WatchListStore {
    client: Arc<ApiClient>,
    state: Mutex<WatchListState>,
    seq: RequestSequencer,
}

impl WatchListStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(WatchListState {
                next_page: 1,
                ..Default::default()
            }),
            seq: RequestSequencer::default(),
        }
    }

    pub fn list(&self) -> Vec<WatchListItem> {
        lock(&self.state).list.clone()
    }

    pub fn total(&self) -> u64 {
        lock(&self.state).total
    }

    pub fn item(&self, id: i64) -> Option<WatchListItem> {
        lock(&self.state).list.iter().find(|i| i.id == id).cloned()
    }

    /// Fetch the first page, or with `load_more` append the next one.
    pub async fn get_list(&self, load_more: bool) -> ApiResult<()> {
        let page_num = if load_more {
            lock(&self.state).next_page
        } else {
            1
        };
        let ticket = self.seq.issue();
        let page = api::get_watch_list(&self.client, page_num, WATCH_LIST_PAGE_SIZE).await?;
        if !self.seq.is_current(ticket) {
            debug!("dropping stale watch-list page {page_num}");
            return Ok(());
        }

        let mut state = lock(&self.state);
        if load_more {
            state.list.extend(page.list);
        } else {
            state.list = page.list;
        }
        state.next_page = page_num + 1;
        state.total = page.total;
        Ok(())
    }

    /// Subscribe addresses (or unsubscribe with `unsub`), then refresh.
    pub async fn add_items(&self, items: &[SmartAddress], unsub: bool) -> ApiResult<()> {
        api::add_watch_items(&self.client, items, unsub).await?;
        info!("{} {} address(es)", if unsub { "unsubscribed" } else { "subscribed" }, items.len());
        self.get_list(false).await
    }

    /// Flip an entry between watching and paused.
    pub async fn toggle_item(&self, item: &WatchListItem) -> ApiResult<()> {
        self.add_items(&[item.to_smart_address()], item.active()).await
    }

    pub async fn delete_item(&self, id: i64) -> ApiResult<()> {
        api::delete_watch_item(&self.client, id).await?;
        self.get_list(false).await
    }

    /// Edit an alias locally; nothing is sent until [`save_alias`](Self::save_alias).
    pub fn set_alias(&self, id: i64, alias: &str) -> bool {
        let mut state = lock(&self.state);
        match state.list.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.address_alias = alias.to_string();
                item.is_edit = true;
                true
            }
            None => false,
        }
    }

    /// Persist a locally edited alias. No-op if the entry was not edited.
    pub async fn save_alias(&self, id: i64) -> ApiResult<()> {
        let Some(item) = self.item(id).filter(|i| i.is_edit) else {
            return Ok(());
        };
        api::add_watch_items(&self.client, &[item.to_smart_address()], !item.active()).await?;
        if let Some(item) = lock(&self.state).list.iter_mut().find(|i| i.id == id) {
            item.is_edit = false;
        }
        Ok(())
    }
}

// ── Strategies ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StrategyState {
    wallet: Vec<WalletStrategy>,
    cex: Vec<CexStrategy>,
}

/// Wallet-behaviour alert rules and CEX announcement subscriptions.
pub struct StrategyStore {
    client: Arc<ApiClient>,
    state: Mutex<StrategyState>,
}

impl StrategyStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(StrategyState::default()),
        }
    }

    pub fn wallet_strategies(&self) -> Vec<WalletStrategy> {
        lock(&self.state).wallet.clone()
    }

    pub fn cex_strategies(&self) -> Vec<CexStrategy> {
        lock(&self.state).cex.clone()
    }

    pub fn reset(&self) {
        lock(&self.state).wallet.clear();
    }

    pub async fn get_wallet_strategies(&self) -> ApiResult<()> {
        let list = api::get_wallet_strategies(&self.client).await?;
        lock(&self.state).wallet = list;
        Ok(())
    }

    pub async fn get_cex_strategies(&self) -> ApiResult<()> {
        let list = api::get_cex_strategies(&self.client).await?;
        lock(&self.state).cex = list;
        Ok(())
    }

    pub async fn add_wallet_strategy(&self, strategy: &AddWalletStrategy) -> ApiResult<()> {
        api::add_wallet_strategy(&self.client, strategy).await?;
        info!("added wallet strategy {}", strategy.name);
        self.get_wallet_strategies().await
    }

    pub async fn update_wallet_strategy(&self, strategy: &UpdateWalletStrategy) -> ApiResult<()> {
        api::update_wallet_strategy(&self.client, strategy).await?;
        self.get_wallet_strategies().await
    }

    pub async fn delete_wallet_strategy(&self, id: i64) -> ApiResult<()> {
        api::delete_wallet_strategy(&self.client, id).await?;
        self.get_wallet_strategies().await
    }

    pub async fn subscribe_cex(&self, source: ArticleSource, unsub: bool) -> ApiResult<()> {
        api::subscribe_cex(&self.client, source, unsub).await?;
        self.get_cex_strategies().await
    }
}

// ── Channels ───────────────────────────────────────────────────────

/// Notification destinations.
pub struct ChannelStore {
    client: Arc<ApiClient>,
    channels: Mutex<Vec<Channel>>,
}

impl ChannelStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            channels: Mutex::new(Vec::new()),
        }
    }

    pub fn channels(&self) -> Vec<Channel> {
        lock(&self.channels).clone()
    }

    pub fn set_channels(&self, channels: Vec<Channel>) {
        *lock(&self.channels) = channels;
    }

    pub async fn get_channels(&self) -> ApiResult<()> {
        let list = api::get_channels(&self.client).await?;
        self.set_channels(list);
        Ok(())
    }

    pub async fn add_webhook_channel(&self, channel: &WebhookChannel) -> ApiResult<()> {
        api::add_webhook_channel(&self.client, channel).await?;
        self.get_channels().await
    }

    /// Create a Telegram channel and return its id, for building the bind token.
    pub async fn add_telegram_channel(&self, channel_name: &str) -> ApiResult<String> {
        let id = api::add_telegram_channel(&self.client, channel_name).await?;
        self.get_channels().await?;
        Ok(id)
    }

    pub async fn update_channel(&self, channel: &UpdateChannel) -> ApiResult<()> {
        api::update_channel(&self.client, channel).await?;
        self.get_channels().await
    }

    pub async fn delete_channel(&self, id: i64) -> ApiResult<()> {
        api::delete_channel(&self.client, id).await?;
        self.get_channels().await
    }

    pub async fn test_telegram(&self, channel_id: &str) -> ApiResult<()> {
        api::test_telegram_send(&self.client, channel_id).await
    }

    /// Bind token for `channel_id` under the current session credential.
    pub fn telegram_token(&self, channel_id: &str) -> Result<String, TokenError> {
        let credential = self.client.session().credential();
        token::make_notification_token(&credential, channel_id)
    }
}

// ── Market data ────────────────────────────────────────────────────

/// Filter shared by the spot and futures tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CexFilter {
    pub token_name: String,
    pub exchange: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortInfo {
    pub field: String,
    pub direction: Option<SortDirection>,
}

/// One server-paged, sortable table.
#[derive(Debug)]
pub struct Table<T> {
    pub loading: bool,
    pub rows: Vec<T>,
    pub page_info: PageInfo,
    pub sort: SortInfo,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            loading: true,
            rows: Vec::new(),
            page_info: PageInfo::default(),
            sort: SortInfo::default(),
        }
    }
}

impl<T: Clone> Table<T> {
    pub fn snapshot(&self) -> (Vec<T>, PageInfo) {
        (self.rows.clone(), self.page_info)
    }
}

#[derive(Debug, Default)]
struct MarketState {
    filter: CexFilter,
    spot: Table<Spot>,
    futures: Table<Futures>,
    alerts: Vec<Alert>,
    alert_page: PageInfo,
}

/// CEX spot/futures listings and token alerts.
pub struct MarketStore {
    client: Arc<ApiClient>,
    state: Mutex<MarketState>,
    spot_seq: RequestSequencer,
    futures_seq: RequestSequencer,
    alert_seq: RequestSequencer,
}

impl MarketStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(MarketState::default()),
            spot_seq: RequestSequencer::default(),
            futures_seq: RequestSequencer::default(),
            alert_seq: RequestSequencer::default(),
        }
    }

    pub fn filter(&self) -> CexFilter {
        lock(&self.state).filter.clone()
    }

    /// Replace the filter; both tables go back to page 1.
    pub fn set_filter(&self, filter: CexFilter) {
        let mut state = lock(&self.state);
        state.filter = filter;
        state.spot.page_info.page = 1;
        state.futures.page_info.page = 1;
    }

    pub fn set_spot_page(&self, page: u32) {
        lock(&self.state).spot.page_info.page = page.max(1);
    }

    pub fn set_futures_page(&self, page: u32) {
        lock(&self.state).futures.page_info.page = page.max(1);
    }

    pub fn set_spot_sort(&self, field: &str, direction: Option<SortDirection>) {
        let mut state = lock(&self.state);
        state.spot.sort = SortInfo {
            field: field.to_string(),
            direction,
        };
        state.spot.page_info.page = 1;
    }

    pub fn set_futures_sort(&self, field: &str, direction: Option<SortDirection>) {
        let mut state = lock(&self.state);
        state.futures.sort = SortInfo {
            field: field.to_string(),
            direction,
        };
        state.futures.page_info.page = 1;
    }

    pub fn spot(&self) -> (Vec<Spot>, PageInfo) {
        lock(&self.state).spot.snapshot()
    }

    pub fn futures(&self) -> (Vec<Futures>, PageInfo) {
        lock(&self.state).futures.snapshot()
    }

    pub fn spot_loading(&self) -> bool {
        lock(&self.state).spot.loading
    }

    pub fn futures_loading(&self) -> bool {
        lock(&self.state).futures.loading
    }

    pub fn alerts(&self) -> (Vec<Alert>, PageInfo) {
        let state = lock(&self.state);
        (state.alerts.clone(), state.alert_page)
    }

    /// Query for the current filter, sort and page of a table.
    fn query(filter: &CexFilter, page: u32, sort: &SortInfo) -> CexListQuery {
        let (order_name, order_by) = match sort.direction {
            Some(direction) if !sort.field.is_empty() => (sort.field.clone(), direction),
            _ => (String::new(), SortDirection::Desc),
        };
        CexListQuery {
            page_num: page,
            page_size: MARKET_PAGE_SIZE,
            token: filter.token_name.clone(),
            data_source: filter.exchange.clone(),
            status: filter.status.clone(),
            order_name,
            order_by: order_by.as_order_by().to_string(),
        }
    }

    pub fn spot_query(&self) -> CexListQuery {
        let state = lock(&self.state);
        Self::query(&state.filter, state.spot.page_info.page, &state.spot.sort)
    }

    pub fn futures_query(&self) -> CexListQuery {
        let state = lock(&self.state);
        Self::query(&state.filter, state.futures.page_info.page, &state.futures.sort)
    }

    pub async fn get_spot_list(&self) -> ApiResult<()> {
        let query = self.spot_query();
        let ticket = self.spot_seq.issue();
        lock(&self.state).spot.loading = true;
        let result = api::get_spot_list(&self.client, &query).await;
        if !self.spot_seq.is_current(ticket) {
            debug!("dropping stale spot page {}", query.page_num);
            return result.map(|_| ());
        }
        let mut state = lock(&self.state);
        state.spot.loading = false;
        apply_page(&mut state.spot, result?);
        Ok(())
    }

    pub async fn get_futures_list(&self) -> ApiResult<()> {
        let query = self.futures_query();
        let ticket = self.futures_seq.issue();
        lock(&self.state).futures.loading = true;
        let result = api::get_futures_list(&self.client, &query).await;
        if !self.futures_seq.is_current(ticket) {
            debug!("dropping stale futures page {}", query.page_num);
            return result.map(|_| ());
        }
        let mut state = lock(&self.state);
        state.futures.loading = false;
        apply_page(&mut state.futures, result?);
        Ok(())
    }

    pub async fn get_alert_list(&self, page: u32, keywords: &str, risk_level: RiskLevel) -> ApiResult<()> {
        let query = AlertListQuery {
            page_num: page.max(1),
            page_size: MARKET_PAGE_SIZE,
            keywords: keywords.to_string(),
            risk_level,
        };
        let ticket = self.alert_seq.issue();
        let page = api::get_alert_list(&self.client, &query).await?;
        if !self.alert_seq.is_current(ticket) {
            debug!("dropping stale alert page {}", query.page_num);
            return Ok(());
        }
        let mut state = lock(&self.state);
        state.alert_page = PageInfo {
            page: query.page_num,
            total: page.total,
            total_page: page.total_page,
        };
        state.alerts = page.list;
        Ok(())
    }

    pub async fn spot_history(&self, symbol: &str, data_source: &str) -> ApiResult<Vec<SpotHistory>> {
        api::get_spot_history(&self.client, symbol, data_source).await
    }

    pub async fn futures_history(
        &self,
        symbol: &str,
        data_source: &str,
    ) -> ApiResult<Vec<FuturesHistory>> {
        api::get_futures_history(&self.client, symbol, data_source).await
    }
}

fn apply_page<T>(table: &mut Table<T>, page: Page<T>) {
    table.rows = page.list;
    table.page_info.total = page.total;
    table.page_info.total_page = page.total_page;
}
