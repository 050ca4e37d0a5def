use std::sync::Arc;

use trip_planner::bot::BotRunner;
use trip_planner::channels::{Channel, CliChannel, TelegramChannel};
use trip_planner::config::PlannerConfig;
use trip_planner::conversation::ConversationEngine;
use trip_planner::providers::{
    AviasalesProvider, ProviderDispatcher, ProviderKind, YandexRaspProvider,
};
use trip_planner::session::{SessionStore, spawn_eviction_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PlannerConfig::from_env()?;

    // ── Providers ────────────────────────────────────────────────────────
    let mut dispatcher = ProviderDispatcher::new(config.provider_timeout);
    if let Some(token) = config.aviasales_token.clone() {
        dispatcher.register(
            ProviderKind::Flights,
            Arc::new(AviasalesProvider::new(token, config.result_limit)),
        );
    }
    if let Some(key) = config.yandex_rasp_key.clone() {
        dispatcher.register(
            ProviderKind::Rail,
            Arc::new(YandexRaspProvider::new(key, config.result_limit)),
        );
    }
    let configured = dispatcher.configured();
    let provider_timeout = dispatcher.timeout();

    // ── Sessions ─────────────────────────────────────────────────────────
    let store = SessionStore::new();
    let _sweeper = spawn_eviction_task(
        Arc::clone(&store),
        config.sweep_interval,
        config.session_idle_timeout,
    );

    let engine = ConversationEngine::new(store, Arc::new(dispatcher));

    // ── Channel ──────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.telegram_token.clone() {
        Some(token) => Arc::new(TelegramChannel::new(
            token,
            config.telegram_allowed_users.clone(),
        )),
        None => Arc::new(CliChannel::new()),
    };
    channel.health_check().await?;

    eprintln!("🧳 Trip Planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channel: {}", channel.name());
    eprintln!("   Providers: {configured:?} (timeout {provider_timeout:?})");
    if channel.name() == "cli" {
        eprintln!("   Type /start to begin, :summary to press the summary button.\n");
    }

    BotRunner::new(engine, channel).run().await?;
    Ok(())
}
