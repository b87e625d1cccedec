use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use url::Url;

pub const RESET_PASSWORD_SCHEME: &str = "waterbilling";
pub const RESET_PASSWORD_HOST: &str = "reset-password";

#[derive(Debug, Error, PartialEq)]
pub enum DeepLinkError {
    #[error("failed to parse deep link: {0}")]
    InvalidUrl(String),
    #[error("not a reset-password link")]
    UnrecognizedLink,
    #[error("deep link is missing the `{0}` parameter")]
    MissingParameter(&'static str),
    #[error("reset token is not valid: {0}")]
    InvalidToken(String),
}

/// Payload of `waterbilling://reset-password?token=..&email=..`. The token
/// is kept exactly as carried in the link (url-safe base64); it is decoded
/// only when the reset request is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetPasswordLink {
    pub token: String,
    pub email: String,
}

pub fn parse_reset_password_link(raw: &str) -> Result<ResetPasswordLink, DeepLinkError> {
    let url = Url::parse(raw).map_err(|error| DeepLinkError::InvalidUrl(error.to_string()))?;

    if url.scheme() != RESET_PASSWORD_SCHEME || url.host_str() != Some(RESET_PASSWORD_HOST) {
        return Err(DeepLinkError::UnrecognizedLink);
    }

    let mut token = None;
    let mut email = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" => token = Some(value.into_owned()),
            "email" => email = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(ResetPasswordLink {
        token: token
            .filter(|value| !value.is_empty())
            .ok_or(DeepLinkError::MissingParameter("token"))?,
        email: email
            .filter(|value| !value.is_empty())
            .ok_or(DeepLinkError::MissingParameter("email"))?,
    })
}

/// Reverses the url-safe transport encoding applied to reset tokens: `-` and
/// `_` back to `+` and `/`, padding restored, then standard base64 to UTF-8.
pub fn decode_reset_token(encoded: &str) -> Result<String, DeepLinkError> {
    let mut standard: String = encoded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    let bytes = STANDARD
        .decode(standard.as_bytes())
        .map_err(|error| DeepLinkError::InvalidToken(error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| DeepLinkError::InvalidToken(error.to_string()))
}

/// Transport encoding for reset tokens, the inverse of [`decode_reset_token`].
pub fn encode_reset_token(token: &str) -> String {
    STANDARD
        .encode(token.as_bytes())
        .chars()
        .filter(|c| *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}
