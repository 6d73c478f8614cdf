//! Webhook listener command: `adw serve`.

use anyhow::Result;
use std::sync::Arc;

use adw::config::AdwConfig;
use adw::orchestrator::{BackgroundDispatcher, Orchestrator};
use adw::phases::Collaborators;
use adw::server::{ServerConfig, start_server};

pub async fn cmd_serve(config: AdwConfig, host: String, port: u16) -> Result<bool> {
    let secret = std::env::var("GITHUB_WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.is_empty());

    let deps = Collaborators::connect(config)?;
    let orchestrator = Arc::new(Orchestrator::new(deps));
    let dispatcher = Arc::new(BackgroundDispatcher::new(orchestrator));

    let served = start_server(ServerConfig { host, port, secret }, dispatcher.clone()).await;

    // Cycles already acquired must reach release before the runtime goes away
    let pending = dispatcher.in_flight();
    if pending > 0 {
        println!("Waiting for {} in-flight cycle(s) to finish...", pending);
    }
    dispatcher.drain().await;

    served?;
    Ok(true)
}
