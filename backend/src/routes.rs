use std::path::PathBuf;

use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde::Serialize;

use crate::config::Settings;
use crate::imaging::DecodeError;
use crate::pages;
use crate::pipeline::{self, Classification, PipelineError};
use crate::provision::{ModelProvisioner, ProvisioningError};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("No image was uploaded")]
    MissingUpload,
    #[error("Upload exceeds the {0} byte limit")]
    TooLarge(usize),
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Model is unavailable: {0}")]
    ModelUnavailable(#[from] ProvisioningError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Classification worker failed")]
    Blocking,
}

impl ResponseError for ClassifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClassifyError::MissingUpload | ClassifyError::Upload(_) => StatusCode::BAD_REQUEST,
            ClassifyError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifyError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClassifyError::Pipeline(PipelineError::Decode(DecodeError::UnsupportedFormat(_))) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ClassifyError::Pipeline(PipelineError::Decode(_)) => StatusCode::BAD_REQUEST,
            ClassifyError::Pipeline(_) | ClassifyError::Blocking => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: PathBuf) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/classify").route(web::post().to(classify_page)))
        .service(web::resource("/api/classify").route(web::post().to(classify_api)))
        .service(web::resource("/api/status").route(web::get().to(status)))
        .service(Files::new("/static", static_dir));
}

async fn index(provisioner: web::Data<ModelProvisioner>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(pages::render_index(&provisioner.status()))
}

async fn status(provisioner: web::Data<ModelProvisioner>) -> HttpResponse {
    HttpResponse::Ok().json(provisioner.status())
}

async fn classify_page(
    provisioner: web::Data<ModelProvisioner>,
    settings: web::Data<Settings>,
    payload: Multipart,
) -> HttpResponse {
    match handle_upload(&provisioner, &settings, payload).await {
        Ok(classification) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(pages::render_result(&classification)),
        Err(e) => HttpResponse::build(e.status_code())
            .content_type("text/html; charset=utf-8")
            .body(pages::render_error(&e.to_string())),
    }
}

async fn classify_api(
    provisioner: web::Data<ModelProvisioner>,
    settings: web::Data<Settings>,
    payload: Multipart,
) -> Result<HttpResponse, ClassifyError> {
    let classification = handle_upload(&provisioner, &settings, payload).await?;
    let response = classification
        .report
        .to_response(classification.id, classification.rotation.degrees());
    Ok(HttpResponse::Ok().json(response))
}

async fn handle_upload(
    provisioner: &ModelProvisioner,
    settings: &Settings,
    payload: Multipart,
) -> Result<Classification, ClassifyError> {
    let image_data = read_upload(payload, settings.max_upload_bytes)
        .await
        .inspect_err(|e| warn!("Rejected upload: {}", e))?;
    let model = provisioner.get_model().await?;

    let result = web::block(move || pipeline::run(model.as_ref(), &image_data))
        .await
        .map_err(|_| ClassifyError::Blocking)?;

    match result {
        Ok(classification) => {
            info!(
                "[{}] Classified upload (rotation {} degrees): {:?}",
                classification.id,
                classification.rotation.degrees(),
                classification.report.predictions()
            );
            Ok(classification)
        }
        Err(e) => {
            error!("Classification failed while {}: {}", e.stage(), e);
            Err(e.into())
        }
    }
}

/// Reads the first non-empty file field of a multipart form; plain form
/// fields are skipped.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Vec<u8>, ClassifyError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ClassifyError::Upload(e.to_string()))?
    {
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some();
        if !is_file {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ClassifyError::Upload(e.to_string()))?;
            }
            continue;
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ClassifyError::Upload(e.to_string()))?;
            if image_data.len() + data.len() > limit {
                return Err(ClassifyError::TooLarge(limit));
            }
            image_data.extend_from_slice(&data);
        }
        if !image_data.is_empty() {
            return Ok(image_data);
        }
    }
    Err(ClassifyError::MissingUpload)
}
