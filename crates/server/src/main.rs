use std::net::SocketAddr;

use anyhow::Context;
use server::{AppState, app, fixtures::Fixtures};
use tracing::info;
use utils::log::init_tracing;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info,server=debug");

    let fixtures = match std::env::var("ADMIN_MOCK_FIXTURES") {
        Ok(path) => Fixtures::load(&path).with_context(|| format!("loading fixtures from {path}"))?,
        Err(_) => Fixtures::sample().context("building sample fixtures")?,
    };

    let addr: SocketAddr = std::env::var("ADMIN_MOCK_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("ADMIN_MOCK_ADDR must be host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("mock admin backend listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(AppState::new(fixtures))).await?;
    Ok(())
}
