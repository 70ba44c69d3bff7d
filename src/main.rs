use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env is optional; a missing file is fine, a missing key is not
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = voxquery::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
