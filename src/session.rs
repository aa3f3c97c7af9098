use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use tracing::{debug, info};

use crate::storage::{Storage, USER_INFO_KEY};

/// Persisted credential map: lower-cased wallet address → credential.
pub type UserInfo = HashMap<String, String>;

#[derive(Debug, Default)]
struct SessionState {
    address: String,
    user_info: Option<UserInfo>,
}

/// Current wallet address and its session credential.
///
/// Shared between the HTTP client (reads the credential per request, clears
/// it on invalidation) and whatever drives login/logout.
pub struct SessionStore {
    storage: Arc<Storage>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Restore the persisted credential map; the address starts empty.
    pub fn new(storage: Arc<Storage>) -> Self {
        let user_info = storage.get::<UserInfo>(USER_INFO_KEY);
        Self {
            storage,
            state: RwLock::new(SessionState {
                address: String::new(),
                user_info,
            }),
        }
    }

    pub fn address(&self) -> String {
        self.read().address.clone()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.read().user_info.clone()
    }

    /// Credential for the current address, or `""` when there is none.
    pub fn credential(&self) -> String {
        let state = self.read();
        credential_for(&state, &state.address)
            .unwrap_or_default()
            .to_string()
    }

    /// Credential stored for `address`, regardless of the current address.
    pub fn credential_for(&self, address: &str) -> Option<String> {
        credential_for(&self.read(), address).map(str::to_string)
    }

    /// Whether the current address has a credential.
    pub fn has_auth(&self) -> bool {
        let state = self.read();
        !state.address.is_empty() && credential_for(&state, &state.address).is_some()
    }

    /// Switch to `address`. A different address drops the credential.
    pub fn update_address(&self, address: &str) -> Result<()> {
        {
            let mut state = self.write();
            if state.address == address {
                return Ok(());
            }
            debug!("session address {} -> {}", state.address, address);
            state.address = address.to_string();
        }
        self.update_user_info(None)
    }

    /// Adopt `address` if a credential for it is already stored.
    ///
    /// Used on reconnect so a persisted session is picked up without a new
    /// login. Returns `false`, leaving state untouched, when none is stored.
    pub fn resume(&self, address: &str) -> bool {
        let mut state = self.write();
        if credential_for(&state, address).is_none() {
            return false;
        }
        state.address = address.to_string();
        true
    }

    /// Store `credential` for the current address, replacing any previous
    /// entry. `None` or an empty credential logs out.
    pub fn update_user_info(&self, credential: Option<&str>) -> Result<()> {
        let mut state = self.write();
        match credential.filter(|c| !c.is_empty()) {
            None => {
                self.storage.remove(USER_INFO_KEY)?;
                state.user_info = None;
                Ok(())
            }
            Some(credential) => {
                let mut info = UserInfo::new();
                info.insert(state.address.to_lowercase(), credential.to_string());
                self.storage.set(USER_INFO_KEY, &info)?;
                info!("stored session credential for {}", state.address);
                state.user_info = Some(info);
                Ok(())
            }
        }
    }

    /// Forget both the address and its credential.
    pub fn disconnect(&self) -> Result<()> {
        self.write().address.clear();
        self.update_user_info(None)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn credential_for<'a>(state: &'a SessionState, address: &str) -> Option<&'a str> {
    if address.is_empty() {
        return None;
    }
    state
        .user_info
        .as_ref()?
        .get(&address.to_lowercase())
        .map(String::as_str)
}
