use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use browserpilot_client::BrowserPilotClient;
use gemini_client::GeminiClient;
use hypeloop_common::Config;
use hypeloop_engine::content::{PostComposer, UniformTemplates};
use hypeloop_engine::dispatcher::BatchDispatcher;
use hypeloop_engine::scheduler::{CycleConfig, CycleScheduler};
use hypeloop_engine::store::StateStore;
use hypeloop_engine::traits::{Actuator, Generator, PilotActuator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hypeloop=info".parse()?))
        .init();

    let run_id = uuid::Uuid::new_v4();
    info!(%run_id, "Hypeloop engine starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pilot = BrowserPilotClient::new(&config.pilot_url, config.pilot_token.as_deref());
    let actuator: Arc<dyn Actuator> = Arc::new(PilotActuator::new(
        pilot,
        &config.username,
        &config.password,
        config.email_or_phone.as_deref(),
    ));

    let composer = config.gemini_api_key.as_deref().map(|key| {
        let generator: Arc<dyn Generator> =
            Arc::new(GeminiClient::new(key, &config.gemini_model));
        PostComposer::new(generator, &config.target_account)
    });
    if composer.is_none() {
        info!("GEMINI_API_KEY not set, publishing phase disabled");
    }

    let selector = Arc::new(UniformTemplates::stock(&config.target_account));
    let dispatcher = BatchDispatcher::new(
        actuator.clone(),
        selector,
        config.batch_size,
        Duration::from_secs(config.min_reply_delay_secs),
        Duration::from_secs(config.max_reply_delay_secs),
    );

    let store = StateStore::new(&config.data_dir);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current phase");
            let _ = shutdown_tx.send(true);
        }
    });

    let scheduler = CycleScheduler::new(
        actuator,
        composer,
        dispatcher,
        store,
        CycleConfig::from_config(&config),
        config.max_replies_per_day,
        shutdown_rx,
    );

    let stats = scheduler.run().await?;
    info!(%run_id, "Hypeloop engine stopped. {stats}");
    Ok(())
}
