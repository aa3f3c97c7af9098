//! monitor: command-line client for the wallet and CEX monitoring backend.
//!
//! Reads `config.toml` (optional), restores the persisted session from the
//! storage file and runs one subcommand. Results go to stdout as aligned text
//! or, with `--json`, one JSON object per line. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};

use wallet_monitor::address::{Chain, check_address, dedup_by_addr, parse_address_lines};
use wallet_monitor::auth::{self, LoginOutcome, MessageSigner, Wallet};
use wallet_monitor::config::{AppConfig, CONFIG_PATH};
use wallet_monitor::format::super_long;
use wallet_monitor::http::{ApiClient, ApiError};
use wallet_monitor::notice::{Notifier, TracingNotifier};
use wallet_monitor::reporter::{self, OutputMode};
use wallet_monitor::session::SessionStore;
use wallet_monitor::state::{ChannelStore, CexFilter, MarketStore, StrategyStore, WatchListStore};
use wallet_monitor::storage::Storage;
use wallet_monitor::sys::{Lang, SysStore};
use wallet_monitor::token;
use wallet_monitor::types::{
    AddWalletStrategy, ArticleSource, ChannelConfig, RiskLevel, SortDirection, UpdateChannel,
    UpdateWalletStrategy, WatchListItem, WebhookChannel,
};

#[derive(Parser)]
#[command(name = "monitor", about = "Wallet and CEX monitoring client")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign the login challenge with the configured key and store the session
    Login {
        /// Chain of the configured key (evm, solana); defaults to account.chain
        #[arg(long)]
        chain: Option<Chain>,
    },
    /// Forget the stored session
    Logout,
    /// Show the current address and whether it is signed in
    Whoami,
    /// Fetch and cache backend system configuration
    Sys,
    /// Show or set the interface language (en, cn)
    Lang { lang: Option<Lang> },
    /// Watched wallet addresses
    Watch {
        #[command(subcommand)]
        cmd: WatchCmd,
    },
    /// Wallet alert strategies and CEX announcement subscriptions
    Strategy {
        #[command(subcommand)]
        cmd: StrategyCmd,
    },
    /// Notification channels
    Channel {
        #[command(subcommand)]
        cmd: ChannelCmd,
    },
    /// CEX market data and token alerts
    Market {
        #[command(subcommand)]
        cmd: MarketCmd,
    },
}

#[derive(Subcommand)]
enum WatchCmd {
    /// List watched addresses
    List {
        /// Keep loading pages until the whole list is fetched
        #[arg(long)]
        all: bool,
    },
    /// Watch one address, or every `address [alias]` line of a file
    Add {
        address: Option<String>,
        alias: Option<String>,
        #[arg(long, conflicts_with = "address")]
        file: Option<PathBuf>,
    },
    /// Pause or resume watching an entry
    Toggle { id: i64 },
    /// Stop watching an entry
    Delete { id: i64 },
    /// Rename an entry
    Alias { id: i64, alias: String },
}

#[derive(Subcommand)]
enum StrategyCmd {
    /// List wallet strategies
    List,
    /// Create a wallet strategy
    Add {
        name: String,
        /// Operations to alert on, comma separated (e.g. buy,sell)
        #[arg(long, value_delimiter = ',', required = true)]
        operations: Vec<String>,
        /// Minimum trade size in USD
        #[arg(long, default_value = "0")]
        min_usd: String,
        /// Channel ids to notify, comma separated
        #[arg(long, value_delimiter = ',')]
        channels: Vec<i64>,
    },
    /// Change fields of a wallet strategy
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_delimiter = ',')]
        operations: Option<Vec<String>>,
        #[arg(long)]
        min_usd: Option<String>,
        #[arg(long, value_delimiter = ',')]
        channels: Option<Vec<i64>>,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Delete a wallet strategy
    Delete { id: i64 },
    /// List CEX announcement subscriptions
    Cex,
    /// Subscribe to (or with --unsub, drop) a CEX's announcements
    Subscribe {
        source: ArticleSource,
        #[arg(long)]
        unsub: bool,
    },
}

#[derive(Subcommand)]
enum ChannelCmd {
    /// List notification channels
    List,
    /// Add a webhook channel
    AddWebhook {
        name: String,
        url: String,
        /// Value sent in the webhook's Authorization header
        #[arg(long)]
        authorization: Option<String>,
    },
    /// Add a Telegram channel and print its bind link
    AddTelegram { name: String },
    /// Rename a channel, change its target or switch it off
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        authorization: Option<String>,
        #[arg(long)]
        disable: bool,
    },
    /// Delete a channel
    Delete { id: i64 },
    /// Send a test message through a Telegram channel
    Test { id: String },
    /// Print the Telegram bind token and links for a channel
    Token { id: String },
}

#[derive(clap::Args)]
struct TableArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Token name filter
    #[arg(long, default_value = "")]
    token: String,
    /// Exchange filter
    #[arg(long, default_value = "")]
    exchange: String,
    #[arg(long, default_value = "")]
    status: String,
    /// Column to sort by
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, requires = "sort")]
    asc: bool,
}

#[derive(Subcommand)]
enum MarketCmd {
    /// Spot listings
    Spot(TableArgs),
    /// Futures listings
    Futures(TableArgs),
    /// Spot and futures listings side by side
    Overview(TableArgs),
    /// Historical snapshots for one symbol
    History {
        symbol: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        futures: bool,
    },
    /// Token risk alerts
    Alerts {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "")]
        keywords: String,
        #[arg(long, default_value = "")]
        risk: RiskLevel,
    },
}

struct App {
    config: AppConfig,
    client: Arc<ApiClient>,
    sys: SysStore,
    mode: OutputMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let app = App::open(&cli.config, cli.json)?;

    match app.run(cli.command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // expired sessions were already announced by the client
            match e.downcast_ref::<ApiError>() {
                Some(ApiError::SessionExpired { .. } | ApiError::Cancelled) => {}
                Some(api_err) => app.client.notifier().error(&api_err.message()),
                None => {}
            }
            Err(e)
        }
    }
}

impl App {
    fn open(config_path: &Path, json: bool) -> Result<Self> {
        let config = AppConfig::load_or_default(config_path)?;
        debug!("api base {}", config.api.base_url);

        let storage = Arc::new(Storage::open(&config.storage.path));
        let session = Arc::new(SessionStore::new(storage.clone()));
        restore_address(&config, &session);

        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        let client = Arc::new(ApiClient::new(&config.api, session, notifier)?);
        Ok(Self {
            config,
            client,
            sys: SysStore::new(storage),
            mode: if json { OutputMode::Json } else { OutputMode::Text },
        })
    }

    fn wallet(&self, chain: Chain) -> Result<Wallet> {
        let key = self
            .config
            .account
            .private_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("no private key configured, run setup-account first")?;
        Wallet::from_key(chain, key)
    }

    fn require_auth(&self) -> Result<()> {
        if !self.client.session().has_auth() {
            bail!("not signed in, run `monitor login` first");
        }
        Ok(())
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { chain } => {
                self.login(chain.unwrap_or(self.config.account.chain)).await
            }
            Command::Logout => {
                self.client.sign_out()?;
                self.client.notifier().success("Signed out");
                Ok(())
            }
            Command::Whoami => {
                let session = self.client.session();
                let credential = session.credential();
                reporter::report_value(
                    self.mode,
                    "whoami",
                    &json!({
                        "address": session.address(),
                        "signedIn": session.has_auth(),
                        "credential": super_long(&credential, 4),
                    }),
                );
                Ok(())
            }
            Command::Sys => {
                let config = self.sys.refresh(&self.client).await?;
                reporter::report_value(self.mode, "sys", &config);
                Ok(())
            }
            Command::Lang { lang } => {
                if let Some(lang) = lang {
                    self.sys.set_lang(lang)?;
                }
                let lang = self.sys.lang();
                reporter::report_value(
                    self.mode,
                    "lang",
                    &json!({ "lang": lang.code(), "label": lang.label() }),
                );
                Ok(())
            }
            Command::Watch { cmd } => {
                self.require_auth()?;
                self.watch(cmd).await
            }
            Command::Strategy { cmd } => {
                self.require_auth()?;
                self.strategy(cmd).await
            }
            Command::Channel { cmd } => {
                self.require_auth()?;
                self.channel(cmd).await
            }
            Command::Market { cmd } => {
                self.require_auth()?;
                self.market(cmd).await
            }
        }
    }

    async fn login(&self, chain: Chain) -> Result<()> {
        let wallet = self.wallet(chain)?;
        let outcome = auth::ensure_login(&self.client, &wallet).await?;
        match outcome {
            LoginOutcome::AlreadyAuthenticated => {
                self.client.notifier().info("Already signed in");
            }
            LoginOutcome::LoggedIn => self.client.notifier().success("Signed in"),
        }
        reporter::report_value(
            self.mode,
            "login",
            &json!({
                "address": wallet.address(),
                "chain": wallet.chain().to_string(),
                "signedIn": self.client.session().has_auth(),
            }),
        );
        Ok(())
    }

    // ── Watch list ─────────────────────────────────────────────────

    async fn watch(&self, cmd: WatchCmd) -> Result<()> {
        let store = WatchListStore::new(self.client.clone());
        match cmd {
            WatchCmd::List { all } => {
                store.get_list(false).await?;
                while all && (store.list().len() as u64) < store.total() {
                    let before = store.list().len();
                    store.get_list(true).await?;
                    if store.list().len() == before {
                        break;
                    }
                }
                reporter::report_rows(self.mode, "watch", &store.list());
                if self.mode == OutputMode::Text {
                    println!("{} of {} shown", store.list().len(), store.total());
                }
            }
            WatchCmd::Add { address, alias, file } => {
                let input = match (file, address) {
                    (Some(file), _) => std::fs::read_to_string(&file)
                        .with_context(|| format!("failed to read {}", file.display()))?,
                    (None, Some(address)) => {
                        check_address(&address, Chain::Solana)?;
                        format!("{address} {}", alias.unwrap_or_default())
                    }
                    (None, None) => bail!("give an address or --file"),
                };
                let items = dedup_by_addr(parse_address_lines(&input));
                if items.is_empty() {
                    bail!("no valid Solana addresses found");
                }
                store.add_items(&items, false).await?;
                self.client
                    .notifier()
                    .success(&format!("Watching {} address(es)", items.len()));
                reporter::report_rows(self.mode, "watch", &store.list());
            }
            WatchCmd::Toggle { id } => {
                let item = find_watch_item(&store, id).await?;
                store.toggle_item(&item).await?;
                let verb = if item.active() { "Paused" } else { "Resumed" };
                self.client.notifier().success(&format!("{verb} {}", item.listening_address));
            }
            WatchCmd::Delete { id } => {
                store.delete_item(id).await?;
                self.client.notifier().success("Deleted");
            }
            WatchCmd::Alias { id, alias } => {
                find_watch_item(&store, id).await?;
                store.set_alias(id, &alias);
                store.save_alias(id).await?;
                self.client.notifier().success("Alias saved");
            }
        }
        Ok(())
    }

    // ── Strategies ─────────────────────────────────────────────────

    async fn strategy(&self, cmd: StrategyCmd) -> Result<()> {
        let store = StrategyStore::new(self.client.clone());
        match cmd {
            StrategyCmd::List => {
                store.get_wallet_strategies().await?;
                reporter::report_rows(self.mode, "strategy", &store.wallet_strategies());
            }
            StrategyCmd::Add {
                name,
                operations,
                min_usd,
                channels,
            } => {
                let strategy = AddWalletStrategy {
                    name,
                    operations,
                    min_amount_usd: min_usd,
                    notify_channel_ids: channels,
                };
                store.add_wallet_strategy(&strategy).await?;
                self.client.notifier().success("Strategy added");
                reporter::report_rows(self.mode, "strategy", &store.wallet_strategies());
            }
            StrategyCmd::Update {
                id,
                name,
                operations,
                min_usd,
                channels,
                enable,
                disable,
            } => {
                let update = UpdateWalletStrategy {
                    strategy_id: id,
                    name,
                    operations,
                    min_amount_usd: min_usd,
                    notify_channel_ids: channels,
                    inactive: match (enable, disable) {
                        (true, _) => Some(false),
                        (_, true) => Some(true),
                        _ => None,
                    },
                };
                store.update_wallet_strategy(&update).await?;
                self.client.notifier().success("Strategy updated");
            }
            StrategyCmd::Delete { id } => {
                store.delete_wallet_strategy(id).await?;
                self.client.notifier().success("Strategy deleted");
            }
            StrategyCmd::Cex => {
                store.get_cex_strategies().await?;
                reporter::report_rows(self.mode, "cex", &store.cex_strategies());
            }
            StrategyCmd::Subscribe { source, unsub } => {
                store.subscribe_cex(source, unsub).await?;
                let verb = if unsub { "Unsubscribed from" } else { "Subscribed to" };
                self.client.notifier().success(&format!("{verb} {source}"));
                reporter::report_rows(self.mode, "cex", &store.cex_strategies());
            }
        }
        Ok(())
    }

    // ── Channels ───────────────────────────────────────────────────

    async fn channel(&self, cmd: ChannelCmd) -> Result<()> {
        let store = ChannelStore::new(self.client.clone());
        match cmd {
            ChannelCmd::List => {
                store.get_channels().await?;
                reporter::report_rows(self.mode, "channel", &store.channels());
            }
            ChannelCmd::AddWebhook {
                name,
                url,
                authorization,
            } => {
                let channel = WebhookChannel {
                    channel_name: name,
                    config: ChannelConfig::Webhook { url, authorization },
                };
                store.add_webhook_channel(&channel).await?;
                self.client.notifier().success("Channel added");
            }
            ChannelCmd::AddTelegram { name } => {
                let id = store.add_telegram_channel(&name).await?;
                info!("created telegram channel {id}");
                self.print_bind_info(&store, &id)?;
            }
            ChannelCmd::Update {
                id,
                name,
                url,
                authorization,
                disable,
            } => {
                store.get_channels().await?;
                let current = store
                    .channels()
                    .into_iter()
                    .find(|c| c.id == id)
                    .with_context(|| format!("no channel with id {id}"))?;
                let config = match current.config() {
                    Some(ChannelConfig::Webhook {
                        url: old_url,
                        authorization: old_auth,
                    }) => ChannelConfig::Webhook {
                        url: url.unwrap_or(old_url),
                        authorization: authorization.or(old_auth),
                    },
                    Some(telegram @ ChannelConfig::Telegram { .. }) => {
                        if url.is_some() || authorization.is_some() {
                            bail!("telegram channels have no url or authorization");
                        }
                        telegram
                    }
                    None => bail!("channel {id} has an unreadable config"),
                };
                let update = UpdateChannel {
                    channel_id: id,
                    channel_name: name.unwrap_or(current.channel_name),
                    config,
                    unsub: disable,
                };
                store.update_channel(&update).await?;
                self.client.notifier().success("Channel updated");
            }
            ChannelCmd::Delete { id } => {
                store.delete_channel(id).await?;
                self.client.notifier().success("Channel deleted");
            }
            ChannelCmd::Test { id } => {
                store.test_telegram(&id).await?;
                self.client.notifier().success("Test message sent");
            }
            ChannelCmd::Token { id } => self.print_bind_info(&store, &id)?,
        }
        Ok(())
    }

    fn print_bind_info(&self, store: &ChannelStore, channel_id: &str) -> Result<()> {
        let tg_token = store.telegram_token(channel_id)?;
        let (link, command) = match self.config.telegram.bot_name.as_deref() {
            Some(bot) => (
                Some(token::telegram_start_link(bot, &tg_token)),
                Some(token::telegram_bind_command(bot, &tg_token)),
            ),
            None => (None, None),
        };
        reporter::report_value(
            self.mode,
            "telegram",
            &json!({
                "channelId": channel_id,
                "token": tg_token,
                "link": link,
                "groupCommand": command,
            }),
        );
        Ok(())
    }

    // ── Market data ────────────────────────────────────────────────

    async fn market(&self, cmd: MarketCmd) -> Result<()> {
        let store = MarketStore::new(self.client.clone());
        match cmd {
            MarketCmd::Spot(args) => {
                apply_table_args(&store, &args);
                store.get_spot_list().await?;
                let (rows, page) = store.spot();
                reporter::report_rows(self.mode, "spot", &rows);
                self.footer(page.page, page.total_page, page.total);
            }
            MarketCmd::Futures(args) => {
                apply_table_args(&store, &args);
                store.get_futures_list().await?;
                let (rows, page) = store.futures();
                reporter::report_rows(self.mode, "futures", &rows);
                self.footer(page.page, page.total_page, page.total);
            }
            MarketCmd::Overview(args) => {
                apply_table_args(&store, &args);
                futures_util::try_join!(store.get_spot_list(), store.get_futures_list())?;
                reporter::report_rows(self.mode, "spot", &store.spot().0);
                reporter::report_rows(self.mode, "futures", &store.futures().0);
            }
            MarketCmd::History {
                symbol,
                source,
                futures,
            } => {
                if futures {
                    let rows = store.futures_history(&symbol, &source).await?;
                    reporter::report_rows(self.mode, "futures_history", &rows);
                } else {
                    let rows = store.spot_history(&symbol, &source).await?;
                    reporter::report_rows(self.mode, "spot_history", &rows);
                }
            }
            MarketCmd::Alerts {
                page,
                keywords,
                risk,
            } => {
                store.get_alert_list(page, &keywords, risk).await?;
                let (rows, page) = store.alerts();
                reporter::report_rows(self.mode, "alert", &rows);
                self.footer(page.page, page.total_page, page.total);
            }
        }
        Ok(())
    }

    fn footer(&self, page: u32, total_page: u32, total: u64) {
        if self.mode == OutputMode::Text {
            println!("{}", reporter::page_footer(page, total_page, total));
        }
    }
}

/// Pick the address whose stored session to resume.
///
/// The configured key's address wins; without a key, a single stored
/// session is resumed as-is.
fn restore_address(config: &AppConfig, session: &SessionStore) {
    let from_key = config
        .account
        .private_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .and_then(|k| Wallet::from_key(config.account.chain, k).ok())
        .map(|w| w.address());
    let address = from_key.or_else(|| {
        let info = session.user_info()?;
        match info.len() {
            1 => info.into_keys().next(),
            _ => None,
        }
    });
    if let Some(address) = address {
        if session.resume(&address) {
            debug!("resumed session for {address}");
        }
    }
}

async fn find_watch_item(store: &WatchListStore, id: i64) -> Result<WatchListItem> {
    store.get_list(false).await?;
    loop {
        if let Some(item) = store.item(id) {
            return Ok(item);
        }
        let before = store.list().len();
        if before as u64 >= store.total() {
            bail!("no watched address with id {id}");
        }
        store.get_list(true).await?;
        if store.list().len() == before {
            bail!("no watched address with id {id}");
        }
    }
}

fn apply_table_args(store: &MarketStore, args: &TableArgs) {
    store.set_filter(CexFilter {
        token_name: args.token.clone(),
        exchange: args.exchange.clone(),
        status: args.status.clone(),
    });
    if let Some(field) = &args.sort {
        let direction = if args.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };
        store.set_spot_sort(field, Some(direction));
        store.set_futures_sort(field, Some(direction));
    }
    store.set_spot_page(args.page);
    store.set_futures_page(args.page);
}
