//! Telemetry relay binary.
//!
//! Starts the WebSocket relay with structured logging and graceful shutdown
//! on SIGTERM/SIGINT.

use std::net::SocketAddr;
use talkmeter_relay::{config, hub::RelayHub, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let location = talkmeter_runtime::resolve_config_path("TALKMETER_CONFIG_PATH", "talkmeter.toml");

    let config = config::load_config(Some(&location.path))
        .expect("failed to load configuration, the relay cannot start without valid config");

    talkmeter_runtime::init_tracing(&config.logging.level, config.logging.json);

    tracing::info!(
        source = location.source.as_str(),
        path = %location.path,
        "resolved startup configuration path"
    );

    let hub = RelayHub::new().with_welcome_message(config.relay.welcome_message.clone());
    let state = AppState {
        hub,
        outbound_buffer: config.relay.outbound_buffer,
    };
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting talkmeter relay");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address, is another process using this port?");

    talkmeter_relay::serve(listener, state, talkmeter_runtime::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("talkmeter relay shut down");
}
