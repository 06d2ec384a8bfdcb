use culinary_client::logger::*;
use culinary_client::settings::*;
use culinary_client::stub_service::{self, StubState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

const DEMO_USER: (&str, &str) = ("demo", "Demo123!");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = StubCli::parse();

    let logger = Logger::new_bootstrap();

    let settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig {
        filter: settings.log.filter.clone(),
    })?;

    let state = Arc::new(StubState::new(settings.stub.polls_until_complete));
    state.register(DEMO_USER.0, "demo@example.com", DEMO_USER.1)?;

    let address: SocketAddr = settings.stub.address.parse()?;
    let (bound, server) = stub_service::bind(state, address, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not listen for ctrl-c: {e}");
        }
    })?;
    info!(%bound, username = DEMO_USER.0, password = DEMO_USER.1, "stub service listening");

    server.await;
    info!("stub service stopped");
    Ok(())
}
