//! Compact notification tokens.
//!
//! A session credential is a UUID. For the Telegram bot it is shrunk to the
//! base58 form of its 16 raw bytes and wrapped as `VC<base58>I<channel id>`,
//! short enough for a `/start` deep-link payload.

use thiserror::Error;
use uuid::Uuid;

use crate::TELEGRAM_LINK_BASE;

const TOKEN_PREFIX: &str = "VC";
const CHANNEL_SEPARATOR: char = 'I';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("expected 32 hex digits, got {0:?}")]
    MalformedUuid(String),
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("decoded {0} bytes, expected 16")]
    WrongLength(usize),
    #[error("malformed notification token {0:?}")]
    MalformedToken(String),
}

/// Base58-encode the 16 bytes of a UUID (hyphens optional).
pub fn compress(uuid: &str) -> Result<String, TokenError> {
    let hex_digits: String = uuid.chars().filter(|c| *c != '-').collect();
    if hex_digits.len() != 32 {
        return Err(TokenError::MalformedUuid(uuid.to_string()));
    }
    let bytes =
        hex::decode(&hex_digits).map_err(|_| TokenError::MalformedUuid(uuid.to_string()))?;
    Ok(bs58::encode(bytes).into_string())
}

/// Inverse of [`compress`]: returns lower-case 8-4-4-4-12 UUID text.
pub fn decompress(token: &str) -> Result<String, TokenError> {
    let bytes = bs58::decode(token)
        .into_vec()
        .map_err(|e| TokenError::Base58(e.to_string()))?;
    let uuid = Uuid::from_slice(&bytes).map_err(|_| TokenError::WrongLength(bytes.len()))?;
    Ok(uuid.hyphenated().to_string())
}

/// `VC` + compressed credential + `I` + channel id.
pub fn make_notification_token(uuid: &str, channel_id: &str) -> Result<String, TokenError> {
    Ok(format!(
        "{TOKEN_PREFIX}{}{CHANNEL_SEPARATOR}{channel_id}",
        compress(uuid)?
    ))
}

/// Split a notification token back into `(uuid, channel_id)`.
///
/// The base58 alphabet has no `I`, so the first `I` after the prefix is
/// always the separator.
pub fn parse_notification_token(token: &str) -> Result<(String, String), TokenError> {
    let malformed = || TokenError::MalformedToken(token.to_string());
    let body = token.strip_prefix(TOKEN_PREFIX).ok_or_else(malformed)?;
    let (compressed, channel_id) = body.split_once(CHANNEL_SEPARATOR).ok_or_else(malformed)?;
    if compressed.is_empty() || channel_id.is_empty() {
        return Err(malformed());
    }
    Ok((decompress(compressed)?, channel_id.to_string()))
}

/// Deep link that opens a private chat with the bot and sends `/start <token>`.
pub fn telegram_start_link(bot_name: &str, token: &str) -> String {
    format!("{TELEGRAM_LINK_BASE}/{bot_name}?start={token}")
}

/// Command to paste into a group chat after adding the bot to it.
pub fn telegram_bind_command(bot_name: &str, token: &str) -> String {
    format!("@{bot_name} /bind {token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "01234567-89ab-cdef-0123-456789abcdef";

    // ── compress / decompress ──────────────────────────────────────

    #[test]
    fn compress_is_stable() {
        let first = compress(SAMPLE).unwrap();
        assert_eq!(first, compress(SAMPLE).unwrap());
        assert!(first.len() <= 22);
        assert!(!first.contains('-'));
    }

    #[test]
    fn compress_ignores_hyphen_placement() {
        let plain = SAMPLE.replace('-', "");
        assert_eq!(compress(&plain).unwrap(), compress(SAMPLE).unwrap());
    }

    #[test]
    fn round_trip_random_uuids() {
        for _ in 0..64 {
            let u = Uuid::new_v4().hyphenated().to_string();
            assert_eq!(decompress(&compress(&u).unwrap()).unwrap(), u);
        }
    }

    #[test]
    fn round_trip_leading_zero_bytes() {
        let u = "00000000-0000-0000-0000-0000000000ff";
        let compressed = compress(u).unwrap();
        assert!(compressed.starts_with("11111111"));
        assert_eq!(decompress(&compressed).unwrap(), u);
    }

    #[test]
    fn compress_rejects_malformed() {
        assert!(matches!(compress(""), Err(TokenError::MalformedUuid(_))));
        assert!(matches!(
            compress("01234567-89ab-cdef-0123-456789abcde"),
            Err(TokenError::MalformedUuid(_))
        ));
        assert!(matches!(
            compress("0123456z-89ab-cdef-0123-456789abcdef"),
            Err(TokenError::MalformedUuid(_))
        ));
    }

    #[test]
    fn decompress_rejects_bad_input() {
        assert!(matches!(decompress("0OIl"), Err(TokenError::Base58(_))));
        assert!(matches!(decompress("2g"), Err(TokenError::WrongLength(_))));
    }

    // ── notification tokens ────────────────────────────────────────

    #[test]
    fn notification_token_shape() {
        let token = make_notification_token(SAMPLE, "42").unwrap();
        assert_eq!(token, format!("VC{}I42", compress(SAMPLE).unwrap()));
    }

    #[test]
    fn notification_token_is_injective_over_inputs() {
        let other = "fedcba98-7654-3210-fedc-ba9876543210";
        let a = make_notification_token(SAMPLE, "1").unwrap();
        assert_eq!(a, make_notification_token(SAMPLE, "1").unwrap());
        assert_ne!(a, make_notification_token(SAMPLE, "2").unwrap());
        assert_ne!(a, make_notification_token(other, "1").unwrap());
    }

    #[test]
    fn parse_recovers_inputs() {
        let token = make_notification_token(SAMPLE, "1337").unwrap();
        let (uuid, channel) = parse_notification_token(&token).unwrap();
        assert_eq!(uuid, SAMPLE);
        assert_eq!(channel, "1337");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_notification_token("XX123I4").is_err());
        assert!(parse_notification_token("VCabc").is_err());
        assert!(parse_notification_token("VCI4").is_err());
    }

    #[test]
    fn telegram_links() {
        assert_eq!(
            telegram_start_link("AlertBot", "VCxI1"),
            "https://t.me/AlertBot?start=VCxI1"
        );
        assert_eq!(telegram_bind_command("AlertBot", "VCxI1"), "@AlertBot /bind VCxI1");
    }
}
