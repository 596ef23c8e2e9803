use std::sync::Arc;

use statutory_engine::api::{AppState, create_router};
use statutory_engine::config::{ConfigLoader, ServerSettings};
use statutory_engine::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = ServerSettings::from_env()?;
    init_logging(settings.log_format);

    tracing::info!(
        config_dir = %settings.config_dir.display(),
        bind_addr = %settings.bind_addr,
        "Starting statutory engine"
    );

    let book = match ConfigLoader::load(&settings.config_dir) {
        Ok(book) => book,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load statutory rules");
            return Err(e.into());
        }
    };

    let app = create_router(AppState::new(Arc::new(book)));
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(bind_addr = %settings.bind_addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}
