// src/main.rs
use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use warp::Filter;

use dcf_dashboard::config::Config;
use dcf_dashboard::routes;
use dcf_dashboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = Config::from_env();
    info!("Using PORT: {}", config.port);

    // Bind to 0.0.0.0 for container hosts
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let state = AppState::build(config).await?;

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(state).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
