//! User-agent heuristics
//!
//! Not a reliable signal on its own; the probe only uses it to tighten the
//! low-tier thresholds.

const MOBILE_TOKENS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "webos",
    "blackberry",
    "iemobile",
    "opera mini",
];

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_TOKENS.iter().any(|token| ua.contains(token))
}

/// A user agent describing the native host, so native and browser hosts go
/// through the same heuristic.
pub fn native_user_agent() -> String {
    let platform = match std::env::consts::OS {
        "android" => "Linux; Android",
        "ios" => "iPhone; CPU iPhone OS",
        "macos" => "Macintosh",
        "windows" => "Windows NT",
        other => other,
    };
    format!("prism/{} ({})", env!("CARGO_PKG_VERSION"), platform)
}
