use thiserror::Error;

/// Network or HTTP failure talking to the fixture provider.
#[derive(Debug, Error)]
pub enum UpstreamFetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid upstream json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upstream client unavailable: {0}")]
    Client(String),
}

/// One upstream record that cannot be turned into a `Fixture`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("record is not a json object")]
    NotAnObject,

    #[error("record has no usable fixture id")]
    MissingId,

    #[error("fixture {id} has no team names")]
    MissingTeams { id: String },
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("state store http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel rejected message: http {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}
