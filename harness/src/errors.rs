use std::string::FromUtf8Error;
use thiserror::Error;

/// Failures of the harness itself, as opposed to failures of the tests it runs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error when writing {0}")]
    IoError(#[from] std::io::Error),
    #[error("Error serializing XML report {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("Error serializing JSON report {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Captured output is not valid UTF-8 {0}")]
    Utf8Error(#[from] FromUtf8Error),
    #[error("Unable to build a pool of {threads} threads for class dispatch. Error = `{message}`")]
    ThreadPoolError { threads: usize, message: String },
    #[error("Unable to spawn a watchdog worker for `{test}`. Error = `{source}`")]
    SpawnError {
        test: String,
        #[source]
        source: std::io::Error,
    },
    #[error("The path `{0}` does not exist")]
    FileNotFoundError(String),
    #[error("{0}")]
    IllegalArguments(String),
}

pub type Result<T> = std::result::Result<T, Error>;
