use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use talent_match::config::{LoggingSettings, Settings};
use talent_match::core::{reference_snapshot, train_pipeline, DriftDetector, FeatureEngineer, MatchError, Matcher};
use talent_match::routes::{self, AppState};
use talent_match::services::{ArtifactStore, Dataset, DatasetError, StoreError};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Errors that abort startup
#[derive(Debug, Error)]
enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),
}

impl From<StartupError> for std::io::Error {
    fn from(err: StartupError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

/// Load the dataset, writing the demonstration sample when none exists
fn load_dataset(settings: &Settings) -> Result<Dataset, StartupError> {
    let dir = &settings.storage.data_dir;
    if !Dataset::exists(dir) {
        warn!("No dataset found in {}, creating sample data", dir.display());
        Dataset::write_sample(dir)?;
    }
    Ok(Dataset::load(dir)?)
}

/// Restore or train the model and prepare the drift baseline
fn bootstrap(
    settings: &Settings,
    store: &ArtifactStore,
    dataset: &Dataset,
) -> Result<(Matcher, FeatureEngineer, DriftDetector), StartupError> {
    let mut engineer = FeatureEngineer::new((&settings.labels).into(), settings.model.domain_keywords());
    let mut matcher = Matcher::new((&settings.model).into());
    let mut drift = DriftDetector::new(settings.monitoring.drift_threshold).with_entries(store.load_monitoring()?);

    let reference = if store.has_model() {
        store.load_matcher(&mut matcher)?;
        engineer.set_normalizer(store.load_normalizer()?);
        info!("Models loaded successfully");

        let rows = engineer.create_features(dataset.jobs(), dataset.candidates(), dataset.applications());
        if rows.is_empty() {
            None
        } else {
            Some(reference_snapshot(&matcher, engineer.transform_rows(&rows)?)?)
        }
    } else {
        info!("No saved model found, training from {}", settings.storage.data_dir.display());
        let outcome = train_pipeline(
            &mut engineer,
            &mut matcher,
            dataset.jobs(),
            dataset.candidates(),
            dataset.applications(),
        )?;
        store.save_matcher(&matcher)?;
        store.save_normalizer(engineer.normalizer())?;
        Some(outcome.reference)
    };

    match reference {
        Some(reference) => {
            drift.set_reference(&reference.features)?;
            drift.set_reference_predictions(&reference.predictions)?;
        }
        None => warn!("No training data available; drift detection has no reference"),
    }

    Ok((matcher, engineer, drift))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing(&LoggingSettings::default());
            error!("Failed to load configuration: {}", e);
            return Err(StartupError::from(e).into());
        }
    };

    init_tracing(&settings.logging);
    info!("Starting Talent Match service...");

    let store = ArtifactStore::new(&settings.storage.artifacts_dir);
    let dataset = load_dataset(&settings).unwrap_or_else(|e| {
        warn!("Dataset unavailable ({}), dataset lookups will return 404", e);
        Dataset::default()
    });

    let (matcher, engineer, drift) = match bootstrap(&settings, &store, &dataset) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Error loading models: {}", e);
            warn!("Serving without a trained model; predictions will return 503");
            let engineer = FeatureEngineer::new((&settings.labels).into(), settings.model.domain_keywords());
            let drift = DriftDetector::new(settings.monitoring.drift_threshold);
            (Matcher::new((&settings.model).into()), engineer, drift)
        }
    };

    let app_state = AppState {
        matcher: Arc::new(matcher),
        engineer: Arc::new(engineer),
        dataset: Arc::new(dataset),
        drift: Arc::new(tokio::sync::Mutex::new(drift)),
        store: Some(Arc::new(store)),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
