//! Refresh-token cookie handling.
//!
//! The refresh token travels only in a durable `HttpOnly` cookie; handlers
//! never accept it from a request body or header.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

use super::state::AuthConfig;

const REFRESH_COOKIE_NAME: &str = "buildmart_refresh";

/// Build a secure `HttpOnly` cookie carrying the refresh token.
pub(super) fn refresh_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.refresh_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = config.refresh_cookie_secure();
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_refresh_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.refresh_cookie_secure();
    let mut cookie =
        format!("{REFRESH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the refresh token out of the request's cookie header, if present.
pub(super) fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == REFRESH_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("http://127.0.0.1:5500".to_string())
    }

    #[test]
    fn refresh_cookie_sets_http_only_and_max_age() {
        let cookie = refresh_cookie(&config(), "tok").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("buildmart_refresh=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn https_frontend_adds_secure_attribute() {
        let config = AuthConfig::new("https://shop.buildmart.dev".to_string());
        let cookie = refresh_cookie(&config, "tok").unwrap();
        assert!(cookie.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_zeroes_max_age() {
        let cookie = clear_refresh_cookie(&config()).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("buildmart_refresh=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn extract_refresh_token_finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; buildmart_refresh=tok; lang=en"),
        );
        assert_eq!(extract_refresh_token(&headers), Some("tok".to_string()));
    }

    #[test]
    fn extract_refresh_token_none_when_missing_or_empty() {
        let headers = HeaderMap::new();
        assert_eq!(extract_refresh_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("buildmart_refresh="));
        assert_eq!(extract_refresh_token(&headers), None);
    }
}
