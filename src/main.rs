use tracing_subscriber::EnvFilter;

use tasklist::{web, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tasklist=info")),
        )
        .init();

    let config = Config::from_env();
    web::serve(config).await
}
