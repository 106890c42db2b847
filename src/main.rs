use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("homesale=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = homesale::api::Cli::parse();
    if let Err(e) = homesale::api::run(cli).await {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
