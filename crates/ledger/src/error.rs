//! Errors raised by the file adapters.
//!
//! Every variant carries the path involved. At the port boundary a
//! [`LedgerError`] becomes [`PipelineError::Ledger`], named after the file.

use std::path::{Path, PathBuf};
use thiserror::Error;

use pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is missing required columns: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("YAML error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("{} is not a YAML mapping", path.display())]
    NotAMapping { path: PathBuf },

    #[error("{} has no front matter block", path.display())]
    MissingFrontMatter { path: PathBuf },
}

impl LedgerError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Csv { path, .. }
            | Self::MissingColumns { path, .. }
            | Self::Yaml { path, .. }
            | Self::AlreadyExists { path }
            | Self::NotAMapping { path }
            | Self::MissingFrontMatter { path } => path,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<LedgerError> for PipelineError {
    fn from(err: LedgerError) -> Self {
        let name = err
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| err.path().display().to_string());
        PipelineError::ledger(name, err.to_string())
    }
}
