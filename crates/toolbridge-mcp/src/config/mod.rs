//! Setting resolution: explicit flag, then environment, then default.

pub const ENV_HTTP_ADDR: &str = "TOOLBRIDGE_HTTP_ADDR";
pub const ENV_TOKEN: &str = "TOOLBRIDGE_TOKEN";
pub const ENV_LOG: &str = "TOOLBRIDGE_LOG";

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3100";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Listen address for the HTTP transport.
pub fn resolve_http_addr(explicit: Option<&str>) -> String {
    resolve(explicit, ENV_HTTP_ADDR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string())
}

/// Bearer token. No default: absent means auth is off.
pub fn resolve_token(explicit: Option<&str>) -> Option<String> {
    resolve(explicit, ENV_TOKEN)
}

/// Log filter used when `RUST_LOG` is unset.
pub fn resolve_log_level(explicit: Option<&str>) -> String {
    resolve(explicit, ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn resolve(explicit: Option<&str>, var: &str) -> Option<String> {
    if let Some(value) = explicit {
        return Some(value.to_string());
    }

    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
