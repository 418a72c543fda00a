pub mod downloader;
pub mod provisioner;

use std::path::{Path, PathBuf};

use url::Url;

pub use downloader::ModelDownloader;
pub use provisioner::{ModelLoader, ModelProvisioner};

#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Model download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Downloaded model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Failed to load model: {0}")]
    Load(String),
}

/// Where the model artifact comes from and where its cached copy lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    url: Url,
    dir: PathBuf,
    file_name: String,
    sha256: Option<String>,
}

impl ModelSource {
    /// Returns `None` when the URL path has no last segment to name the file.
    pub fn new(url: Url, dir: PathBuf, sha256: Option<String>) -> Option<Self> {
        let file_name = Self::file_name_of(&url)?;
        Some(Self {
            url,
            dir,
            file_name,
            sha256,
        })
    }

    pub fn file_name_of(url: &Url) -> Option<String> {
        url.path_segments()?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    /// Keras HDF5 exports cannot be loaded by libtorch; a TorchScript export
    /// of the same network is needed instead.
    pub fn is_keras_artifact(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("h5"))
    }

    pub fn local_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}
