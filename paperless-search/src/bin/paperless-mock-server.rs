use std::net::SocketAddr;
use std::str::FromStr;

use paperless_search::mock::{
    MOCK_PASSWORD, MOCK_TOKEN, MOCK_USERNAME, MockData, MockPaperlessServer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8000".to_string());
    let addr = SocketAddr::from_str(&addr)?;
    let handle = MockPaperlessServer::start(addr, MockData::sample()).await?;
    handle.require_auth(true);
    println!(
        "mock paperless server listening on {} (token: {MOCK_TOKEN}, basic auth: {MOCK_USERNAME}/{MOCK_PASSWORD})",
        handle.base_url()
    );
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    Ok(())
}
