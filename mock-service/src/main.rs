use mock_service::{MockConfig, MockState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=info,tower_http=warn")
        .init();

    let addr: SocketAddr = std::env::var("MOCK_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;
    let state = Arc::new(MockState::new(MockConfig::default()));

    tokio::spawn(tps_measure_task(state.clone()));
    mock_service::run(addr, state).await
}

async fn tps_measure_task(state: Arc<MockState>) {
    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let total = state.requests();
        info!("{} TPS", total - last);
        last = total;
    }
}
