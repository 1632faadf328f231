//! User agent selection for outbound requests.

use rand::prelude::*;

/// Sent when no pool is configured.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "webmention/",
    env!("CARGO_PKG_VERSION"),
    " (+https://www.w3.org/TR/webmention/)"
);

/// Pick a random user agent from the configured pool, or the default.
pub fn pick_user_agent(pool: Option<&[String]>) -> String {
    let mut rng = thread_rng();

    match pool.and_then(|agents| agents.choose(&mut rng)) {
        Some(agent) => agent.clone(),
        None => DEFAULT_USER_AGENT.to_string(),
    }
}

/// Build standard headers for HTTP requests.
pub fn build_headers(user_agent: &str) -> Vec<(String, String)> {
    vec![
        ("User-Agent".to_string(), user_agent.to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8".to_string(),
        ),
    ]
}
