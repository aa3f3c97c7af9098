//! Backend HTTP client.
//!
//! Every call is a JSON `POST` carrying `Authorization: Bearer <credential>`
//! taken from the [`SessionStore`] at send time. All in-flight calls share
//! one [`CancellationToken`]; when the backend reports the credential as
//! expired the token is cancelled, the session is cleared and a single
//! notice is shown for the whole burst of failures.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::debounce::DebouncedFlag;
use crate::notice::Notifier;
use crate::session::SessionStore;
use crate::types::Envelope;

/// Code reported for failures that never produced an envelope.
pub const TRANSPORT_ERROR_CODE: i64 = -1;

const SESSION_EXPIRED_NOTICE: &str = "Login expired, please sign in again";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Network failure, timeout, or a body that is not an envelope.
    #[error("{0}")]
    Transport(String),
    /// Non-zero envelope code other than the session-expired one.
    #[error("{msg}")]
    Domain { code: i64, msg: String },
    /// The backend rejected the credential.
    #[error("session expired")]
    SessionExpired { code: i64 },
    /// Aborted because a sibling request expired the session.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Envelope-style code for this error.
    pub fn code(&self) -> i64 {
        match self {
            ApiError::Transport(_) | ApiError::Cancelled => TRANSPORT_ERROR_CODE,
            ApiError::Domain { code, .. } | ApiError::SessionExpired { code } => *code,
        }
    }

    /// Text to show the user.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// `Ok(data)` for code 0 (data may be absent), `Domain` otherwise.
    pub fn into_result(self) -> ApiResult<Option<T>> {
        if self.code == 0 {
            Ok(self.data)
        } else {
            Err(ApiError::Domain {
                code: self.code,
                msg: self.msg,
            })
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    session_expired_code: i64,
    pending: Mutex<Option<CancellationToken>>,
    invalidation: DebouncedFlag,
}

impl ApiClient {
    pub fn new(
        config: &ApiConfig,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Url::parse(&config.base_url)
            .with_context(|| format!("invalid api base url {}", config.base_url))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            notifier,
            session_expired_code: config.session_expired_code,
            pending: Mutex::new(None),
            invalidation: DebouncedFlag::new(Duration::from_millis(config.notice_debounce_ms)),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_expired_code(&self) -> i64 {
        self.session_expired_code
    }

    /// POST `body` and return the raw envelope.
    pub async fn post_envelope<T, B>(&self, path: &str, body: &B) -> ApiResult<Envelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Transport(format!("failed to encode request: {e}")))?;
        self.execute(path, &[], Some(body)).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<T>> {
        self.execute(path, &[], None).await
    }

    /// POST without a body, parameters in the query string.
    pub async fn post_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<Envelope<T>> {
        self.execute(path, query, None).await
    }

    /// POST and unwrap the envelope; `Ok(None)` means success without data.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_envelope(path, body).await?.into_result()
    }

    /// POST where a successful response must carry data.
    pub async fn post_data<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post(path, body)
            .await?
            .ok_or_else(|| ApiError::Transport(format!("{path}: response carried no data")))
    }

    /// POST where only success matters.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        self.post::<Value, B>(path, body).await.map(|_| ())
    }

    /// Cancel every in-flight request without touching the session.
    pub fn cancel_pending(&self) {
        let token = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(token) = token {
            debug!("cancelling pending requests");
            token.cancel();
        }
    }

    /// Sign out: abort in-flight requests and forget address + credential.
    pub fn sign_out(&self) -> Result<()> {
        self.cancel_pending();
        self.session.disconnect()
    }

    /// Drop the session after the backend rejected it.
    ///
    /// Runs at most once per debounce window: the first caller cancels the
    /// pending group, clears the session and shows the notice; later callers
    /// in the same window do nothing. Returns whether this call did the work.
    pub fn invalidate_session(&self) -> bool {
        if !self.invalidation.trigger() {
            return false;
        }
        warn!("backend rejected session credential, signing out");
        self.cancel_pending();
        if let Err(e) = self.session.update_user_info(None) {
            warn!("failed to clear stored credential: {e:#}");
        }
        self.notifier.error(SESSION_EXPIRED_NOTICE);
        true
    }

    /// Token the next request registers against; replaced once cancelled.
    fn pending_token(&self) -> CancellationToken {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        match pending.as_ref() {
            Some(token) if !token.is_cancelled() => token.clone(),
            _ => {
                let token = CancellationToken::new();
                *pending = Some(token.clone());
                token
            }
        }
    }

    /// `Bearer <credential>`; logged-out calls send `Bearer ` with an empty credential.
    fn authorization(&self) -> String {
        format!("Bearer {}", self.session.credential())
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| ApiError::Transport(format!("invalid url {raw}: {e}")))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> ApiResult<Envelope<T>> {
        let url = self.url(path)?;
        let token = self.pending_token();

        let mut request = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.authorization());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("POST {path}");
        let (status, bytes) = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("POST {path} cancelled");
                return Err(ApiError::Cancelled);
            }
            res = send(request) => res.map_err(|e| {
                debug!("POST {path} failed: {e}");
                ApiError::Transport(e.to_string())
            })?,
        };

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session();
            return Err(ApiError::SessionExpired {
                code: self.session_expired_code,
            });
        }

        let raw: Envelope<Value> = match serde_json::from_slice(&bytes) {
            Ok(env) => env,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Transport(format!("request failed with status {status}")));
            }
            Err(e) => return Err(ApiError::Transport(format!("invalid response body: {e}"))),
        };
        debug!("POST {path} -> code {}", raw.code);

        if raw.code == self.session_expired_code {
            self.invalidate_session();
            return Err(ApiError::SessionExpired { code: raw.code });
        }
        if raw.code != 0 {
            return Ok(Envelope {
                code: raw.code,
                data: None,
                msg: raw.msg,
            });
        }

        let data = match raw.data {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| {
                ApiError::Transport(format!("unexpected response data for {path}: {e}"))
            })?),
        };
        Ok(Envelope {
            code: raw.code,
            data,
            msg: raw.msg,
        })
    }
}

async fn send(request: reqwest::RequestBuilder) -> reqwest::Result<(StatusCode, Vec<u8>)> {
    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    Ok((status, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{NoticeLevel, RecordingNotifier};
    use crate::storage::Storage;

    fn client(notifier: Arc<RecordingNotifier>) -> ApiClient {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9/api/".to_string(),
            ..ApiConfig::default()
        };
        let session = Arc::new(SessionStore::new(Arc::new(Storage::in_memory())));
        ApiClient::new(&config, session, notifier).unwrap()
    }

    #[test]
    fn authorization_header_follows_session() {
        let c = client(Arc::new(RecordingNotifier::default()));
        assert_eq!(c.authorization(), "Bearer ");
        c.session().update_address("0xabc").unwrap();
        c.session().update_user_info(Some("uuid-1")).unwrap();
        assert_eq!(c.authorization(), "Bearer uuid-1");
        c.session().update_user_info(None).unwrap();
        assert_eq!(c.authorization(), "Bearer ");
    }

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::Transport("x".into()).code(), -1);
        assert_eq!(ApiError::Cancelled.code(), -1);
        assert_eq!(ApiError::Domain { code: 12, msg: "bad".into() }.code(), 12);
        assert_eq!(ApiError::SessionExpired { code: 501 }.code(), 501);
        assert_eq!(ApiError::Domain { code: 12, msg: "bad".into() }.message(), "bad");
    }

    #[test]
    fn envelope_into_result() {
        let ok: Envelope<i64> = Envelope { code: 0, data: Some(3), msg: String::new() };
        assert_eq!(ok.into_result(), Ok(Some(3)));

        let empty: Envelope<i64> = Envelope { code: 0, data: None, msg: String::new() };
        assert_eq!(empty.into_result(), Ok(None));

        let rejected: Envelope<i64> = Envelope { code: 3, data: None, msg: "dup".into() };
        assert_eq!(
            rejected.into_result(),
            Err(ApiError::Domain { code: 3, msg: "dup".into() })
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        let session = Arc::new(SessionStore::new(Arc::new(Storage::in_memory())));
        assert!(ApiClient::new(&config, session, Arc::new(RecordingNotifier::default())).is_err());
    }

    #[test]
    fn joins_paths_onto_base() {
        let c = client(Arc::new(RecordingNotifier::default()));
        assert_eq!(c.base_url(), "http://127.0.0.1:9/api");
        assert_eq!(
            c.url("/customer/info").unwrap().as_str(),
            "http://127.0.0.1:9/api/customer/info"
        );
        assert_eq!(
            c.url("token/spot/history/list").unwrap().as_str(),
            "http://127.0.0.1:9/api/token/spot/history/list"
        );
    }

    #[test]
    fn pending_token_is_shared_until_cancelled() {
        let c = client(Arc::new(RecordingNotifier::default()));
        let a = c.pending_token();
        let b = c.pending_token();
        c.cancel_pending();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());

        let fresh = c.pending_token();
        assert!(!fresh.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_is_debounced() {
        let notifier = Arc::new(RecordingNotifier::default());
        let c = client(notifier.clone());
        c.session().update_address("0xabc").unwrap();
        c.session().update_user_info(Some("uuid-1")).unwrap();
        let token = c.pending_token();

        assert!(c.invalidate_session());
        assert!(!c.invalidate_session());
        assert!(token.is_cancelled());
        assert_eq!(c.session().credential(), "");
        assert_eq!(notifier.count(NoticeLevel::Error), 1);

        tokio::time::advance(Duration::from_millis(2_000)).await;
        assert!(c.invalidate_session());
        assert_eq!(notifier.count(NoticeLevel::Error), 2);
    }

    #[test]
    fn sign_out_clears_session() {
        let c = client(Arc::new(RecordingNotifier::default()));
        c.session().update_address("0xabc").unwrap();
        c.session().update_user_info(Some("uuid-1")).unwrap();
        let token = c.pending_token();
        c.sign_out().unwrap();
        assert!(token.is_cancelled());
        assert_eq!(c.session().address(), "");
        assert!(!c.session().has_auth());
    }
}
