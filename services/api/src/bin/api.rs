//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        BedrockImageAdapter, BedrockTextAdapter, PollyTtsAdapter, S3BlobStore,
        TranscribeSstAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        rest::ApiDoc,
        router,
        state::{AppState, Ports},
    },
};
use aws_config::{BehaviorVersion, Region};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // Storage settings that are missing only fail the calls that need them.
    for problem in config.diagnostics() {
        error!("{}", problem);
    }

    // --- 2. Load AWS Credentials & Build Clients ---
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;
    info!(region = %config.aws_region, "AWS configuration loaded");

    let bedrock_client = aws_sdk_bedrockruntime::Client::new(&sdk_config);

    // --- 3. Initialize Service Adapters ---
    let ports = Ports {
        store: Arc::new(S3BlobStore::new(
            aws_sdk_s3::Client::new(&sdk_config),
            config.s3_bucket_name.clone(),
            config.s3_url_expiration,
        )),
        speech: Arc::new(PollyTtsAdapter::new(aws_sdk_polly::Client::new(&sdk_config))),
        text: Arc::new(BedrockTextAdapter::new(
            bedrock_client.clone(),
            config.bedrock_text_model_id.clone(),
        )),
        images: Arc::new(BedrockImageAdapter::new(
            bedrock_client,
            config.bedrock_image_model_id.clone(),
        )),
        transcription: Arc::new(TranscribeSstAdapter::new(
            aws_sdk_transcribe::Client::new(&sdk_config),
            reqwest::Client::new(),
        )),
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), ports));

    // --- 5. Create the Web Router ---
    let allowed_origin = config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ALLOWED_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
