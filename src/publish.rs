//! Publishers: where a finished recap goes.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::core::document::RecapDocument;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("IO error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}

/// Where and how a document was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Path written, or a label such as `stdout`.
    pub location: String,
    pub bytes: usize,
}

/// Accepts a finished recap document.
pub trait Publisher {
    fn publish(&mut self, document: &RecapDocument) -> Result<PublishReceipt, PublishError>;
}

/// Writes the HTML rendering to a file in an output directory. The file is
/// replaced in one step, so readers never see a partial page.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    dir: PathBuf,
    file_name: String,
}

impl DirectoryPublisher {
    pub fn new(dir: impl Into<PathBuf>, file_name: &str) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.to_string(),
        }
    }

    pub fn target(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PublishError + '_ {
    move |source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&mut self, document: &RecapDocument) -> Result<PublishReceipt, PublishError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let path = self.target();
        let html = document.to_html();
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, html.as_bytes()).map_err(io_error(&tmp))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_error(&path)(e));
        }
        info!(path = %path.display(), bytes = html.len(), "published recap");
        Ok(PublishReceipt {
            location: path.display().to_string(),
            bytes: html.len(),
        })
    }
}

/// Writes the plain-text rendering to any writer; the CLI uses it with
/// stdout for dry runs.
pub struct TextPublisher<W: Write> {
    out: W,
    label: String,
}

impl<W: Write> TextPublisher<W> {
    pub fn new(out: W, label: &str) -> Self {
        Self {
            out,
            label: label.to_string(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TextPublisher<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), "stdout")
    }
}

impl<W: Write> Publisher for TextPublisher<W> {
    fn publish(&mut self, document: &RecapDocument) -> Result<PublishReceipt, PublishError> {
        let text = document.to_text();
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(PublishReceipt {
            location: self.label.clone(),
            bytes: text.len(),
        })
    }
}
