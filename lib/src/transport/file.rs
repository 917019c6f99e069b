use super::{Payload, Transport};
use crate::errors::TransportError;
use chrono::Utc;
use log::info;
use oxigraph::io::RdfFormat;
use std::path::{Path, PathBuf};

/// Serves one local file. PUT keeps a timestamped copy of the previous version.
pub struct FileTransport {
    path: PathBuf,
    format: RdfFormat,
    old_version: Option<PathBuf>,
}

fn format_for(path: &Path) -> RdfFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ttl") => RdfFormat::Turtle,
        Some("n3") => RdfFormat::N3,
        Some("nt") => RdfFormat::NTriples,
        Some("xml") | Some("rdf") | Some("owl") => RdfFormat::RdfXml,
        Some(other) => RdfFormat::from_extension(other).unwrap_or(RdfFormat::RdfXml),
        None => RdfFormat::RdfXml,
    }
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let path = path.into();
        if !path.exists() {
            return Err(TransportError::Io(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let format = format_for(&path);
        Ok(FileTransport {
            path,
            format,
            old_version: None,
        })
    }

    pub fn with_format(mut self, format: RdfFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn old_version(&self) -> Option<&Path> {
        self.old_version.as_deref()
    }

    fn backup_path(&self) -> PathBuf {
        let now = Utc::now().format("%Y%m%d-%H%M%S");
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("backup");
        let name = match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}.{}", stem, now, ext),
            None => format!("{}_{}", stem, now),
        };
        self.path.with_file_name(name)
    }

    /// Restores the file written before the last PUT.
    pub fn revert_to_old_version(&mut self) -> Result<bool, TransportError> {
        let Some(old) = self.old_version.take() else {
            return Ok(false);
        };
        info!("Reverting {} to version before last save", self.path.display());
        std::fs::copy(&old, &self.path)?;
        std::fs::remove_file(&old)?;
        Ok(true)
    }
}

impl Transport for FileTransport {
    fn fetch(&mut self, _iri: &str) -> Result<Payload, TransportError> {
        let bytes = std::fs::read(&self.path)?;
        Ok(Payload::new(bytes, self.format))
    }

    fn store(&mut self, _iri: &str, payload: &Payload) -> Result<(), TransportError> {
        if self.path.exists() {
            let backup = self.backup_path();
            std::fs::copy(&self.path, &backup)?;
            self.old_version = Some(backup);
        }
        std::fs::write(&self.path, &payload.bytes)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FileTransport"
    }

    fn revert(&mut self) -> Result<bool, TransportError> {
        self.revert_to_old_version()
    }
}
