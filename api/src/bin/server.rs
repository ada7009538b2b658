use std::error::Error;
use std::sync::Arc;

use api::profile::default_scorer;
use scoring::server::{AppState, initialize_executable, initialize_tracing, run_api};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting scoring service...");
    dotenvy::dotenv().ok();
    let config = initialize_executable()?;
    initialize_tracing(&config.api.log_level);
    let state = AppState::new(config.common.project_name.clone(), Arc::new(default_scorer()));
    run_api(config.api, state).await
}
