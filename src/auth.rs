use std::str::FromStr;

use anyhow::{Context, Result, bail};
use ed25519_dalek::Signer as _;
use polymarket_client_sdk::auth::{LocalSigner, Signer};
use tracing::info;

use crate::address::Chain;
use crate::api;
use crate::http::ApiClient;

/// Concrete signer type produced by `LocalSigner::from_str`.
pub type PrivateKeySigner = LocalSigner<k256::ecdsa::SigningKey>;

/// Something that can sign the backend's login challenge for one address.
pub trait MessageSigner {
    /// Address the signature will recover to, as sent to `/customer/login`.
    fn address(&self) -> String;

    /// Signature over `message`, encoded the way the backend expects.
    fn sign(&self, message: &str) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// EVM wallet backed by a local private key; signs with EIP-191 personal_sign.
pub struct LocalWallet {
    signer: PrivateKeySigner,
}

impl LocalWallet {
    /// Parse a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .context("invalid private key, expected hex-encoded (with or without 0x prefix)")?;
        Ok(Self { signer })
    }
}

impl MessageSigner for LocalWallet {
    fn address(&self) -> String {
        self.signer.address().to_string()
    }

    async fn sign(&self, message: &str) -> Result<String> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .context("failed to sign login message")?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

/// Solana keypair; signs the raw message bytes with ed25519.
pub struct SolanaWallet {
    key: ed25519_dalek::SigningKey,
}

impl SolanaWallet {
    /// Parse a Solana secret key.
    ///
    /// Accepts the base58 text wallets export (64-byte keypair or 32-byte
    /// seed) or the JSON byte array written by `solana-keygen`.
    pub fn from_secret_key(secret: &str) -> Result<Self> {
        let secret = secret.trim();
        let bytes = if secret.starts_with('[') {
            serde_json::from_str::<Vec<u8>>(secret).context("invalid keypair byte array")?
        } else {
            bs58::decode(secret)
                .into_vec()
                .context("invalid secret key, expected base58")?
        };
        let key = match bytes.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                ed25519_dalek::SigningKey::from_bytes(&seed)
            }
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(&bytes);
                ed25519_dalek::SigningKey::from_keypair_bytes(&keypair)
                    .context("keypair public half does not match its secret")?
            }
            n => bail!("secret key must be 32 or 64 bytes, got {n}"),
        };
        Ok(Self { key })
    }
}

impl MessageSigner for SolanaWallet {
    fn address(&self) -> String {
        bs58::encode(self.key.verifying_key().to_bytes()).into_string()
    }

    /// Lower-case hex of the 64-byte signature, no `0x` prefix.
    async fn sign(&self, message: &str) -> Result<String> {
        Ok(hex::encode(self.key.sign(message.as_bytes()).to_bytes()))
    }
}

/// Either kind of login wallet, picked by the configured chain.
pub enum Wallet {
    Evm(LocalWallet),
    Solana(SolanaWallet),
}

impl Wallet {
    pub fn from_key(chain: Chain, key: &str) -> Result<Self> {
        Ok(match chain {
            Chain::Evm => Wallet::Evm(LocalWallet::from_private_key(key)?),
            Chain::Solana => Wallet::Solana(SolanaWallet::from_secret_key(key)?),
        })
    }

    pub fn chain(&self) -> Chain {
        match self {
            Wallet::Evm(_) => Chain::Evm,
            Wallet::Solana(_) => Chain::Solana,
        }
    }
}

impl MessageSigner for Wallet {
    fn address(&self) -> String {
        match self {
            Wallet::Evm(w) => w.address(),
            Wallet::Solana(w) => w.address(),
        }
    }

    async fn sign(&self, message: &str) -> Result<String> {
        match self {
            Wallet::Evm(w) => w.sign(message).await,
            Wallet::Solana(w) => w.sign(message).await,
        }
    }
}

/// Outcome of [`ensure_login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A credential for the address was already stored.
    AlreadyAuthenticated,
    /// Challenge signed and a new credential stored.
    LoggedIn,
}

/// Make sure the session holds a credential for the signer's address.
///
/// Runs the challenge → sign → login exchange only when no credential is
/// stored for the address, so calling it on every connect is harmless.
pub async fn ensure_login<S: MessageSigner>(client: &ApiClient, signer: &S) -> Result<LoginOutcome> {
    let address = signer.address();
    let session = client.session();

    if session.resume(&address) {
        return Ok(LoginOutcome::AlreadyAuthenticated);
    }

    login(client, signer).await?;
    Ok(LoginOutcome::LoggedIn)
}

/// Unconditionally run the login exchange for the signer's address.
///
/// The session switches to the signer's address before the credential is
/// stored, so the credential is always keyed by the address that signed.
pub async fn login<S: MessageSigner>(client: &ApiClient, signer: &S) -> Result<()> {
    let address = signer.address();
    client.session().update_address(&address)?;
    let message = api::get_login_sign_message(client)
        .await
        .context("failed to fetch login message")?;
    let signature = signer.sign(&message).await?;
    let res = api::do_login(client, &address, &signature)
        .await
        .context("login rejected")?;
    client.session().update_user_info(Some(&res.uuid))?;
    info!("logged in as {address}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test vector key (hardhat account #0).
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    // RFC 8032 section 7.1, test 1.
    const ED_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const ED_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    const ED_EMPTY_SIG: &str = "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b";

    fn ed_bytes(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap()
    }

    // ── EVM ────────────────────────────────────────────────────────

    #[test]
    fn local_wallet_address() {
        let wallet = LocalWallet::from_private_key(TEST_KEY).unwrap();
        assert_eq!(
            wallet.address().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn rejects_garbage_key() {
        assert!(LocalWallet::from_private_key("not-a-key").is_err());
    }

    #[tokio::test]
    async fn signature_is_65_bytes_hex() {
        let wallet = LocalWallet::from_private_key(TEST_KEY).unwrap();
        let sig = wallet.sign("hello").await.unwrap();
        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 2 + 130);
        assert_eq!(sig, wallet.sign("hello").await.unwrap());
    }

    // ── Solana ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn solana_seed_signs_rfc8032_vector() {
        let seed = bs58::encode(ed_bytes(ED_SEED)).into_string();
        let wallet = SolanaWallet::from_secret_key(&seed).unwrap();
        assert_eq!(
            wallet.address(),
            bs58::encode(ed_bytes(ED_PUBLIC)).into_string()
        );
        let sig = wallet.sign("").await.unwrap();
        assert_eq!(sig, ED_EMPTY_SIG);
        assert!(!sig.starts_with("0x"));
    }

    #[test]
    fn solana_keypair_formats_agree() {
        let mut keypair = ed_bytes(ED_SEED);
        keypair.extend(ed_bytes(ED_PUBLIC));

        let from_b58 =
            SolanaWallet::from_secret_key(&bs58::encode(&keypair).into_string()).unwrap();
        let from_json =
            SolanaWallet::from_secret_key(&serde_json::to_string(&keypair).unwrap()).unwrap();
        assert_eq!(from_b58.address(), from_json.address());
        assert_eq!(
            from_b58.address(),
            bs58::encode(ed_bytes(ED_PUBLIC)).into_string()
        );
    }

    #[test]
    fn solana_rejects_bad_keys() {
        assert!(SolanaWallet::from_secret_key("0OIl").is_err());
        assert!(SolanaWallet::from_secret_key(&bs58::encode([1u8; 16]).into_string()).is_err());

        // public half belonging to another key
        let mut keypair = ed_bytes(ED_SEED);
        keypair.extend([7u8; 32]);
        assert!(SolanaWallet::from_secret_key(&bs58::encode(&keypair).into_string()).is_err());
    }

    #[test]
    fn wallet_picks_signer_by_chain() {
        let evm = Wallet::from_key(Chain::Evm, TEST_KEY).unwrap();
        assert_eq!(evm.chain(), Chain::Evm);
        assert!(evm.address().starts_with("0x"));

        let seed = bs58::encode(ed_bytes(ED_SEED)).into_string();
        let sol = Wallet::from_key(Chain::Solana, &seed).unwrap();
        assert_eq!(sol.chain(), Chain::Solana);
        assert!(crate::address::is_valid_address(&sol.address(), Chain::Solana));

        assert!(Wallet::from_key(Chain::Solana, TEST_KEY).is_err());
    }
}
