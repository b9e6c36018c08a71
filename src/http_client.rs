use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = concat!("matchday/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. Every upstream, gist and bot call goes through it,
/// so each call is bounded by the same fixed timeout.
pub fn http_client() -> Result<&'static Client, reqwest::Error> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
    })
}
