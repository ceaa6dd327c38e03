use mock_service::{MockConfig, MockHandle};
use std::net::{SocketAddr, TcpListener};
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_env_filter("stampede=debug,mock_service=info")
            .with_test_writer()
            .init();
    });
}

pub fn mock(config: MockConfig) -> MockHandle {
    init();
    mock_service::spawn(config).unwrap()
}

/// A localhost address nothing listens on yet.
#[allow(unused)]
pub fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
