use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Kubeconfig(#[from] hohkube::Error),

    /// Bad command line usage; the shell adds a pointer to `--help`.
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Invalid(String),

    #[error("unable to create request: {0}")]
    Request(String),

    #[error("got error: {0}")]
    Http(#[from] ureq::Error),

    #[error("response status not HTTP OK: {0}")]
    StatusNotOk(u16),

    #[error("unable to read response body: {0}")]
    Body(#[source] ureq::Error),

    #[error("unable to get objects from the body: {0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    JsonPath(#[from] crate::jsonpath::JsonPathError),

    #[error("sorting is not supported on mixed Table and non-Table object lists")]
    MixedSort,

    #[error("couldn't find any field with path {path:?} in the list of objects")]
    SortFieldNotFound { path: String },

    #[error("table row {row} has no embedded object to sort by, request it with includeObject=Object")]
    RowWithoutObject { row: usize },

    #[error(
        "unable to match a printer suitable for the output format {0:?}, allowed formats are: custom-columns,json,jsonpath,name,wide,yaml"
    )]
    UnknownOutputFormat(String),

    #[error("unexpected custom-columns spec: {0}, expected <header>:<json-path-expr>")]
    CustomColumnsSpec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Several printer failures, reported together.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Aggregate(Vec<Error>),
}

impl Error {
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to unmarshall json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode: Object 'Kind' is missing in '{0}'")]
    MissingKind(String),

    #[error("failed to decode: {0}")]
    NotAnObject(String),

    #[error("failed to decode Table: {0}")]
    Table(#[source] serde_json::Error),
}
