use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::{debug, info};
use reqwest::Client;
use sha2::{Digest, Sha256};
use shared::ProvisionStatus;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::sync::watch;
use url::Url;

use super::ProvisioningError;

pub const CHUNK_SIZE: usize = 8192;

pub struct ModelDownloader {
    client: Client,
}

impl ModelDownloader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Streams `url` into `file_path`, publishing progress on `status`.
    ///
    /// The body lands in a `.part` sibling first and is renamed once the
    /// stream ends (and the digest matches, when one is given), so a broken
    /// transfer never occupies the final path. The `.part` file is left
    /// behind on failure.
    pub async fn download_file(
        &self,
        url: &Url,
        file_path: &Path,
        expected_sha256: Option<&str>,
        status: &watch::Sender<ProvisionStatus>,
    ) -> Result<u64, ProvisioningError> {
        let part_path = part_path(file_path);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        let total_size = response.content_length();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(&part_path).await?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        status.send_replace(ProvisionStatus::Downloading {
            bytes: 0,
            total: total_size,
        });

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            status.send_replace(ProvisionStatus::Downloading {
                bytes: downloaded,
                total: total_size,
            });
        }

        writer.flush().await?;
        drop(writer);
        debug!("Wrote {} bytes to {}", downloaded, part_path.display());

        if let Some(expected) = expected_sha256 {
            let actual = sha256_file(&part_path).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ProvisioningError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        tokio::fs::rename(&part_path, file_path).await?;
        info!("Downloaded {} bytes to {}", downloaded, file_path.display());

        Ok(downloaded)
    }
}

impl Default for ModelDownloader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn part_path(file_path: &Path) -> PathBuf {
    let mut name = file_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

pub async fn sha256_file(file_path: &Path) -> Result<String, ProvisioningError> {
    let mut file = File::open(file_path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    #[test]
    fn part_path_keeps_extension() {
        assert_eq!(
            part_path(Path::new("models/best_model.pt")),
            PathBuf::from("models/best_model.pt.part")
        );
    }

    #[actix_web::test]
    async fn streams_body_to_file_and_reports_progress() {
        let body = vec![7u8; CHUNK_SIZE * 3 + 17];
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/best_model.pt")
            .with_status(200)
            .with_body(body.clone())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("best_model.pt");
        let url = Url::parse(&format!("{}/best_model.pt", server.url())).unwrap();
        let (status, rx) = watch::channel(ProvisionStatus::Pending);

        let written = ModelDownloader::new()
            .download_file(&url, &target, Some(&digest_of(&body)), &status)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&target).unwrap(), body);
        assert!(!part_path(&target).exists());
        assert_eq!(
            *rx.borrow(),
            ProvisionStatus::Downloading {
                bytes: body.len() as u64,
                total: Some(body.len() as u64),
            }
        );
    }

    #[actix_web::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/best_model.pt")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("best_model.pt");
        let url = Url::parse(&format!("{}/best_model.pt", server.url())).unwrap();
        let (status, _rx) = watch::channel(ProvisionStatus::Pending);

        let result = ModelDownloader::new()
            .download_file(&url, &target, None, &status)
            .await;

        assert!(matches!(result, Err(ProvisioningError::Http(_))));
        assert!(!target.exists());
    }

    #[actix_web::test]
    async fn checksum_mismatch_keeps_final_path_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/best_model.pt")
            .with_body("truncated")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("best_model.pt");
        let url = Url::parse(&format!("{}/best_model.pt", server.url())).unwrap();
        let (status, _rx) = watch::channel(ProvisionStatus::Pending);
        let expected = digest_of(b"the real model");

        let result = ModelDownloader::new()
            .download_file(&url, &target, Some(&expected), &status)
            .await;

        assert!(matches!(
            result,
            Err(ProvisioningError::ChecksumMismatch { .. })
        ));
        assert!(!target.exists());
        assert!(part_path(&target).exists());
    }

    #[actix_web::test]
    async fn missing_model_dir_is_created() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/best_model.pt")
            .with_body("torchscript bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cache/models/best_model.pt");
        let url = Url::parse(&format!("{}/best_model.pt", server.url())).unwrap();
        let (status, _rx) = watch::channel(ProvisionStatus::Pending);

        ModelDownloader::new()
            .download_file(&url, &target, None, &status)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"torchscript bytes");
    }
}
