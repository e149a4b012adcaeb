use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;

const BEARER_PREFIX: &str = "Bearer ";

/// One place a token may be carried on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    /// Named header; `Authorization` values use the `Bearer` scheme.
    Header(String),
    /// Query string parameter.
    Query(String),
    /// Cookie name.
    Cookie(String),
}

/// Parse a lookup specification like
/// `"header: Authorization, query: token, cookie: jwt"`. Order in the
/// string is the precedence order tried at extraction time; malformed
/// entries are skipped.
pub fn parse_token_lookup(spec: &str) -> Vec<TokenLookup> {
    spec.split(',')
        .filter_map(|entry| {
            let (kind, name) = entry.split_once(':')?;
            let name = name.trim().to_string();
            if name.is_empty() {
                return None;
            }
            match kind.trim() {
                "header" => Some(TokenLookup::Header(name)),
                "query" => Some(TokenLookup::Query(name)),
                "cookie" => Some(TokenLookup::Cookie(name)),
                _ => None,
            }
        })
        .collect()
}

/// Try each configured transport in order and return the first token found.
pub fn extract_token(
    lookup: &[TokenLookup],
    headers: &HeaderMap,
    query: Option<&str>,
) -> Option<String> {
    lookup.iter().find_map(|source| match source {
        TokenLookup::Header(name) => from_header(headers, name),
        TokenLookup::Query(name) => from_query(query?, name),
        TokenLookup::Cookie(name) => from_cookie(headers, name),
    })
}

fn from_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
        value.strip_prefix(BEARER_PREFIX).map(str::to_string)
    } else {
        Some(value.to_string())
    }
}

fn from_query(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

fn from_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name && !value.is_empty()).then(|| value.to_string())
    })
}
