/**
 * Boardsync Server Entry Point
 *
 * Loads configuration, initializes tracing and serves the realtime router
 * until Ctrl-C, then drains the publish queue before exiting.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = boardsync::backend::server::load_config()?;

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let addr = config.socket_addr()?;
    let (app, tasks) = boardsync::backend::server::create_app(config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[Server] Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("[Server] Could not listen for shutdown signal: {}", e);
            }
            tracing::info!("[Server] Shutdown signal received");
        })
        .await?;

    let processed = tasks.shutdown().await;
    tracing::info!("[Server] Stopped after fanning out {} instruction(s)", processed);
    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin boardsync-server --features ssr");
    std::process::exit(1);
}
