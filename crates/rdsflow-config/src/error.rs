use rdsflow_cloud::NetworkKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Instance document not found. Checked:\n\
        - --config <path> or the RDS_CONFIG environment variable\n\
        - current directory: rds.yaml, rds.yml\n\
        - <config dir>/rdsflow/rds.yaml"
    )]
    InstanceFileNotFound,

    #[error("Configuration file {0} does not exist")]
    FileMissing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid instance document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Instance document is missing '{0}'")]
    MissingField(&'static str),

    #[error("Instance document names neither a {kind} id nor a {kind} name")]
    MissingNetwork { kind: NetworkKind },

    #[error("Unsupported identity API version '{0}' (only 3 is supported)")]
    UnsupportedIdentityVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
