use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use haulage_engine::api::{self, ApiState};
use haulage_engine::config::{AppConfig, LogConfig};
use haulage_engine::rates::RateTable;
use haulage_engine::store::{
    FallbackingRepository, FileRepository, MemoryRepository, OverrideService,
};

fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json() {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    init_tracing(&LogConfig::from_env());
    let app_config = AppConfig::from_env();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!(error = %err, "Could not load .env");
        }
    }

    let data_dir = app_config.store.data_dir();
    info!(data_dir = %data_dir.display(), "Haulage engine starting");

    let repository = FallbackingRepository::new(
        Arc::new(FileRepository::new(data_dir.clone())),
        Arc::new(MemoryRepository::new()),
    );
    let overrides = Arc::new(OverrideService::new(repository, RateTable::standard()));
    let state = ApiState::new(overrides, app_config.allocator.allocator_config());

    if let Err(err) = api::start_api_server(app_config.api.clone(), state).await {
        error!(error = %err, "API server terminated with an error");
        std::process::exit(1);
    }
}
