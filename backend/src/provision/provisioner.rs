use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use shared::ProvisionStatus;
use tokio::sync::{OnceCell, watch};

use super::{ModelDownloader, ModelSource, ProvisioningError};
use crate::inference::ModelHandle;

/// Turns a model file on disk into a ready classifier. Called on a
/// blocking thread.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModelHandle, ProvisioningError>;
}

pub struct ModelProvisioner {
    source: ModelSource,
    downloader: ModelDownloader,
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<ModelHandle>,
    status: watch::Sender<ProvisionStatus>,
}

impl ModelProvisioner {
    pub fn new(source: ModelSource, loader: impl ModelLoader + 'static) -> Self {
        let (status, _) = watch::channel(ProvisionStatus::Pending);
        Self {
            source,
            downloader: ModelDownloader::new(),
            loader: Arc::new(loader),
            model: OnceCell::new(),
            status,
        }
    }

    pub fn status(&self) -> ProvisionStatus {
        self.status.borrow().clone()
    }

    /// Returns the process-wide model, downloading and loading it on the
    /// first call. Concurrent first callers share one initialization; a
    /// failed attempt leaves nothing cached.
    pub async fn get_model(&self) -> Result<ModelHandle, ProvisioningError> {
        self.model
            .get_or_try_init(|| async {
                self.provision().await.inspect_err(|e| {
                    error!("Model provisioning failed: {}", e);
                    self.status.send_replace(ProvisionStatus::Failed {
                        reason: e.to_string(),
                    });
                })
            })
            .await
            .cloned()
    }

    async fn provision(&self) -> Result<ModelHandle, ProvisioningError> {
        let path = self.source.local_path();

        if !tokio::fs::try_exists(&path).await? {
            info!("Downloading model from {}", self.source.url());
            self.downloader
                .download_file(self.source.url(), &path, self.source.sha256(), &self.status)
                .await?;
        }

        self.status.send_replace(ProvisionStatus::Loading);
        let loader = Arc::clone(&self.loader);
        let load_path = path.clone();
        let model = tokio::task::spawn_blocking(move || loader.load(&load_path))
            .await
            .map_err(|e| ProvisioningError::Load(e.to_string()))??;

        info!("Loaded model from {}", path.display());
        self.status.send_replace(ProvisionStatus::Ready);

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::testing::{CountingLoader, FixedClassifier};
    use std::sync::atomic::Ordering;
    use url::Url;

    fn provisioner_for(
        url: &str,
        dir: &Path,
    ) -> (ModelProvisioner, Arc<std::sync::atomic::AtomicUsize>) {
        let source = ModelSource::new(Url::parse(url).unwrap(), dir.to_path_buf(), None).unwrap();
        let loader = CountingLoader::new(FixedClassifier::new(vec![0.7, 0.2, 0.1]));
        let loads = loader.loads();
        (ModelProvisioner::new(source, loader), loads)
    }

    #[actix_web::test]
    async fn downloads_once_and_reuses_the_handle() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/best_model.pt")
            .with_body("torchscript bytes")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (provisioner, loads) =
            provisioner_for(&format!("{}/best_model.pt", server.url()), dir.path());
        assert_eq!(provisioner.status(), ProvisionStatus::Pending);

        let first = provisioner.get_model().await.unwrap();
        let second = provisioner.get_model().await.unwrap();

        mock.assert_async().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(provisioner.status(), ProvisionStatus::Ready);
        assert_eq!(
            std::fs::read(dir.path().join("best_model.pt")).unwrap(),
            b"torchscript bytes"
        );
    }

    #[actix_web::test]
    async fn concurrent_first_calls_share_one_download() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/best_model.pt")
            .with_body("torchscript bytes")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (provisioner, loads) =
            provisioner_for(&format!("{}/best_model.pt", server.url()), dir.path());

        let (a, b) = futures::join!(provisioner.get_model(), provisioner.get_model());

        mock.assert_async().await;
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn existing_file_is_never_fetched() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/best_model.pt")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("best_model.pt"), b"cached").unwrap();
        let (provisioner, loads) =
            provisioner_for(&format!("{}/best_model.pt", server.url()), dir.path());

        provisioner.get_model().await.unwrap();

        mock.assert_async().await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn failed_download_reports_status_and_caches_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/best_model.pt")
            .with_status(503)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (provisioner, loads) =
            provisioner_for(&format!("{}/best_model.pt", server.url()), dir.path());

        let result = provisioner.get_model().await;

        assert!(matches!(result, Err(ProvisioningError::Http(_))));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(matches!(provisioner.status(), ProvisionStatus::Failed { .. }));
        assert!(!dir.path().join("best_model.pt").exists());
    }

    #[actix_web::test]
    async fn corrupted_cached_model_fails_to_load() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/best_model.pt")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("best_model.pt"), b"corrupt").unwrap();
        let (provisioner, loads) =
            provisioner_for(&format!("{}/best_model.pt", server.url()), dir.path());

        let result = provisioner.get_model().await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ProvisioningError::Load(_))));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(matches!(provisioner.status(), ProvisionStatus::Failed { .. }));
    }

    #[actix_web::test]
    async fn failed_attempt_can_be_retried() {
        let mut server = mockito::Server::new_async().await;
        let unavailable = server
            .mock("GET", "/best_model.pt")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (provisioner, loads) =
            provisioner_for(&format!("{}/best_model.pt", server.url()), dir.path());

        assert!(provisioner.get_model().await.is_err());
        unavailable.assert_async().await;
        unavailable.remove_async().await;

        let available = server
            .mock("GET", "/best_model.pt")
            .with_body("torchscript bytes")
            .expect(1)
            .create_async()
            .await;

        provisioner.get_model().await.unwrap();

        available.assert_async().await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(provisioner.status(), ProvisionStatus::Ready);
    }
}
