use keygate::{GateConfig, GateError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), GateError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GateConfig::from_env()?;
    keygate::server::serve(config).await
}
