//! Transport token codec.
//!
//! A token is the lowercase hex of the UTF-8 text `"{date}${KEY}"`, where
//! `date` is `DD_MM_YYYY`. It is obfuscation only: anyone can decode it. The
//! gate is enforced by the caller (same local day + key still allowed).

use super::clock::Clock;
use chrono::NaiveDate;

/// Separator between the date and the key in the decoded text.
const SEPARATOR: char = '$';

/// Date layout embedded in tokens.
const TOKEN_DATE_FORMAT: &str = "%d_%m_%Y";

/// Why a token could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has odd length ({0})")]
    OddLength(usize),
    #[error("token contains non-hex characters")]
    InvalidHex,
    #[error("token bytes are not valid UTF-8")]
    InvalidUtf8,
    #[error("token must contain exactly one '$' separator")]
    MissingSeparator,
}

/// The `(date, key)` pair carried by a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub date: String,
    pub key: String,
}

/// Encode `date` and the upper-cased `key` into a transport token.
pub fn encode(date: &str, key: &str) -> String {
    let text = format!("{date}{SEPARATOR}{}", key.to_uppercase());
    hex::encode(text.as_bytes())
}

/// Reverse [`encode`].
pub fn decode(token: &str) -> Result<DecodedToken, TokenError> {
    if token.len() % 2 != 0 {
        return Err(TokenError::OddLength(token.len()));
    }
    let bytes = hex::decode(token).map_err(|_| TokenError::InvalidHex)?;
    let text = String::from_utf8(bytes).map_err(|_| TokenError::InvalidUtf8)?;

    let mut parts = text.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(key), None) => Ok(DecodedToken {
            date: date.to_string(),
            key: key.to_string(),
        }),
        _ => Err(TokenError::MissingSeparator),
    }
}

/// Render a calendar date as `DD_MM_YYYY`.
pub fn format_token_date(date: NaiveDate) -> String {
    date.format(TOKEN_DATE_FORMAT).to_string()
}

/// Parse a `DD_MM_YYYY` date as embedded in tokens.
pub fn parse_token_date(date: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date, TOKEN_DATE_FORMAT)
}

/// Token for `key` valid on the clock's current local date.
pub fn mint_for_today(clock: &dyn Clock, key: &str) -> String {
    encode(&format_token_date(clock.today()), key)
}
