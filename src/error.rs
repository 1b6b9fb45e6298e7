// Library error type. The application and binary layers wrap it in anyhow.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed tree document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed tree attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed tree document: {0}")]
    Document(String),

    #[error("parser exited with status {status:?} on {}", path.display())]
    ParserFailed {
        path: PathBuf,
        status: Option<i32>,
        diagnostics: Vec<String>,
    },

    #[error("parser '{program}' could not be started: {source}")]
    ParserUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("optimizer exceeded {0} steps")]
    StepLimit(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
