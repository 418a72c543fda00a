mod config;
mod imaging;
mod inference;
mod pages;
mod pipeline;
mod provision;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::Settings;
use inference::TorchLoader;
use provision::ModelProvisioner;
use routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let settings = Settings::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let source = settings.model_source().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!(
        "Model artifact {} ({}) from {}",
        source.file_name(),
        source.local_path().display(),
        source.url()
    );
    if source.is_keras_artifact() {
        log::warn!(
            "{} looks like a Keras HDF5 file; the libtorch backend only loads TorchScript. \
             Point MODEL_URL at a TorchScript export of the model.",
            source.file_name()
        );
    }
    let provisioner = web::Data::new(ModelProvisioner::new(source, TorchLoader));

    if settings.preload_model {
        if let Err(e) = provisioner.get_model().await {
            log::error!("Failed to preload model at startup: {}", e);
            return Err(std::io::Error::other(format!(
                "Model loading failed: {}",
                e
            )));
        }
    } else {
        log::info!("Model will be provisioned on the first upload");
    }

    let bind_address = settings.listen_address();
    let static_dir = settings.static_dir.clone();
    let settings = web::Data::new(settings);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(provisioner.clone())
            .app_data(settings.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
