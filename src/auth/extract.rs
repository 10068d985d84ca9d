//! Locate the session token on an inbound request.

use axum::http::{header, HeaderMap};

/// Return the session token, preferring the cookie over the bearer header.
/// Empty values count as absent.
pub fn extract_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    from_cookies(headers, cookie_name).or_else(|| from_bearer(headers))
}

fn from_cookies<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}

fn from_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(cookie_name: &str) -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", cookie_name)
}
