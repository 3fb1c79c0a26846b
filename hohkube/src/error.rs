use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("context not found: for {0}")]
    ContextNotFound(String),

    #[error("cluster not found: for {0}")]
    ClusterNotFound(String),

    #[error("user not found: for {0}")]
    UserNotFound(String),

    #[error("Server URL not found: no server configured for cluster {0}")]
    ServerNotFound(String),

    #[error("Unable to parse server URL {url}: {source}")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unknown format for server URL: for {0}")]
    UnknownUrlFormat(String),

    #[error("No Token found: for {0}")]
    NoToken(String),

    #[error("Reading token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Opening kube config {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parsing kube config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("HOME is not set, cannot locate the kube directory")]
    NoHome,
}
