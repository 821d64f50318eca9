//! `pulsegate-runtime` — the composition root that wires every core
//! crate into one running process: the scheduler/wake/executor trio, the
//! channel bridges configured in `pulsegate.toml`, and the admin HTTP
//! surface, following `skynet_gateway`'s `main.rs` (load config, build
//! `AppState`, serve). Everything this binary constructs is a standalone
//! default for an external collaborator the spec describes as a trait
//! (SPEC_FULL.md §0); a production deployment swaps these for real
//! storage/runner backends without touching the core crates.

mod app;
mod context;
mod control;
mod events;
mod http;
mod rebuilder;
mod registry;
mod rpc;
mod runner;
mod typing;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{error, info, warn};

use pulsegate_channels::{
    ChannelManager, CredentialWatcher, InboundPipeline, PipelineConfig, RpcListener,
};
use pulsegate_commands::CommandRouter;
use pulsegate_core::{AgentId, PulsegateConfig};
use pulsegate_discord::{DiscordChannel, DiscordFormatter};
use pulsegate_eventbus::{EventBus, InMemoryPubSub, PubSub};
use pulsegate_protocol::methods::CREDENTIALS_CHANGED;
use pulsegate_scheduler::{ConcurrencyGate, PulseExecutor, Scheduler};
use pulsegate_sessions::SessionManager;
use pulsegate_signal::{SignalChannel, SignalFormatter};
use pulsegate_telegram::{TelegramChannel, TelegramFormatter, TelegramTyping};
use pulsegate_wake::{InMemoryCounterStore, WakeGate, WakeGateConfig, WakeSubsystem};
use pulsegate_whatsapp::{LidMap, WhatsAppChannel, WhatsAppFormatter};

use app::AppState;
use control::RuntimeSessionControl;
use events::{EventBusPulsePublisher, LoggingPulseObserver};
use rebuilder::LoggingAdapterRebuilder;
use registry::InMemorySessionRegistry;
use rpc::GenericRpcHandler;
use runner::{EchoRunnerBridge, EchoSessionRunner};
use typing::{NullReadReceipts, NullTypingIndicator};

/// `/context`'s reported window when no real model client is wired
/// (spec §4.9); the standalone runner has no provider to ask.
const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;

fn sibling_db_path(base: &str, suffix: &str) -> String {
    match base.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{suffix}.{ext}"),
        None => format!("{base}-{suffix}"),
    }
}

fn open_db(path: &str) -> anyhow::Result<Connection> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsegate_runtime=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("PULSEGATE_CONFIG_PATH").ok();
    let config = PulsegateConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        PulsegateConfig::default()
    });

    // ── Ambient infra: event bus, pub/sub, shared counter store ────────
    let event_bus = Arc::new(EventBus::new());
    let pubsub: Arc<dyn PubSub> = Arc::new(InMemoryPubSub::new());
    let counter_store = Arc::new(InMemoryCounterStore::new());

    // ── Scheduler / Concurrency Gate / Pulse Executor (spec §4.1-4.3) ──
    let scheduler_conn = open_db(&sibling_db_path(&config.database.path, "scheduler"))?;
    let scheduler = Arc::new(Scheduler::new(scheduler_conn, config.scheduler.conflict_window_minutes)?);
    scheduler.auto_assign_offsets()?;

    let registry = Arc::new(InMemorySessionRegistry::new(config.scheduler.max_concurrent_pulse_sessions));
    let gate = Arc::new(ConcurrencyGate::new(registry.clone(), config.scheduler.max_consecutive_skips));
    let events_publisher = Arc::new(EventBusPulsePublisher::new(event_bus.clone()));
    let pulse_observer = Arc::new(LoggingPulseObserver);
    let executor = Arc::new(PulseExecutor::new(
        scheduler.clone(),
        gate,
        registry.clone(),
        Arc::new(context::NullContextProvider),
        None::<Arc<dyn pulsegate_scheduler::MemoryConsolidator>>,
        Arc::new(EchoSessionRunner),
        Some(pulse_observer as Arc<dyn pulsegate_scheduler::PulseObserver>),
        Some(events_publisher as Arc<dyn pulsegate_scheduler::PulseEventPublisher>),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(executor.clone().run(shutdown_rx));

    // ── Wake subsystem (spec §4.4) ─────────────────────────────────────
    let wake_gate = Arc::new(WakeGate::new(
        counter_store.clone(),
        registry,
        WakeGateConfig {
            cooldown_seconds: config.wake.cooldown_seconds,
            max_wakes_per_day: config.wake.max_wakes_per_day as i64,
            max_wakes_per_pair_per_day: config.wake.max_wakes_per_pair_per_day as i64,
            counter_ttl_hours: config.wake.counter_ttl_hours,
        },
    ));
    let wake_subsystem = Arc::new(WakeSubsystem::new(wake_gate, executor.clone()));
    tokio::spawn(wake_subsystem.run(pubsub.clone()));

    // ── Sessions, routing, command dispatcher (spec §3, §4.9) ──────────
    let sessions = Arc::new(SessionManager::new(open_db(&config.database.path)?)?);
    let control = Arc::new(RuntimeSessionControl::new(sessions.clone(), DEFAULT_CONTEXT_WINDOW));
    let commands = Arc::new(CommandRouter::new(control));
    let runner_bridge = Arc::new(EchoRunnerBridge::new(sessions.clone()));

    // ── Credential hot-reload listener (spec §4.8) ─────────────────────
    let credential_watcher = Arc::new(CredentialWatcher::new(Arc::new(LoggingAdapterRebuilder)));
    tokio::spawn(credential_watcher.run(pubsub.clone()));
    info!(subject = CREDENTIALS_CHANGED, "credential hot-reload listener running");

    // ── Channel bridges (spec §4.8) ────────────────────────────────────
    let channel_manager = Arc::new(RwLock::new(ChannelManager::new()));
    let mut whatsapp_handle: Option<Arc<WhatsAppChannel>> = None;
    let mut rpc_tasks = Vec::new();

    if let Some(tg) = &config.channels.telegram {
        let (tx, mut rx) = mpsc::channel(256);
        let channel_for_manager = TelegramChannel::new(tg.bot_token.clone(), tx.clone());
        channel_manager.write().await.register(Box::new(channel_for_manager));

        // A dedicated instance drives the long-polling dispatcher; the one
        // registered above is used for outbound send/status via the RPC
        // surface and the health endpoint.
        let dispatcher_channel = Arc::new(TelegramChannel::new(tg.bot_token.clone(), tx));
        tokio::spawn(async move {
            if let Err(e) = connect_and_run_telegram(dispatcher_channel).await {
                error!(error = %e, "telegram dispatcher exited");
            }
        });

        let pipeline = Arc::new(
            InboundPipeline::new(
                sessions.clone(),
                commands.clone(),
                Arc::new(TelegramTyping::new(teloxide::Bot::new(tg.bot_token.clone()))),
                runner_bridge.clone() as Arc<dyn pulsegate_channels::SessionRunnerBridge>,
                Arc::new(TelegramFormatter),
                PipelineConfig {
                    allow_all: config.channels.allow_all,
                    sticky_ttl_minutes: config.channels.sticky_ttl_minutes,
                    channel_default_agent: tg.default_agent_id.clone().map(AgentId::new),
                    fallback_agent: tg.default_agent_id.clone().map(AgentId::new),
                },
            )
            .with_read_receipts(Arc::new(NullReadReceipts)),
        );
        spawn_inbound_loop("telegram", channel_manager.clone(), pipeline, rx);
        rpc_tasks.push(spawn_rpc_listener("telegram", channel_manager.clone(), pubsub.clone()));
        info!("telegram channel configured");
    }

    if let Some(dc) = &config.channels.discord {
        let (tx, rx) = mpsc::channel(256);
        let channel = DiscordChannel::new(dc.bot_token.clone(), tx);
        channel_manager.write().await.register(Box::new(channel));

        let pipeline = Arc::new(InboundPipeline::new(
            sessions.clone(),
            commands.clone(),
            Arc::new(NullTypingIndicator),
            runner_bridge.clone() as Arc<dyn pulsegate_channels::SessionRunnerBridge>,
            Arc::new(DiscordFormatter),
            PipelineConfig {
                allow_all: config.channels.allow_all,
                sticky_ttl_minutes: config.channels.sticky_ttl_minutes,
                channel_default_agent: dc.default_agent_id.clone().map(AgentId::new),
                fallback_agent: dc.default_agent_id.clone().map(AgentId::new),
            },
        ));
        spawn_inbound_loop("discord", channel_manager.clone(), pipeline, rx);
        rpc_tasks.push(spawn_rpc_listener("discord", channel_manager.clone(), pubsub.clone()));
        info!("discord channel configured");
    }

    if let Some(wa) = &config.channels.whatsapp {
        let (tx, rx) = mpsc::channel(256);
        let lid_map = Arc::new(LidMap::new(open_db(&sibling_db_path(&config.database.path, "whatsapp-lid"))?)?);
        let channel = WhatsAppChannel::new(wa.base_url.clone(), wa.access_token.clone(), wa.phone_number_id.clone(), lid_map.clone(), tx.clone());
        channel_manager.write().await.register(Box::new(channel));

        // A second instance serves webhook deliveries directly (spec
        // §4.8: WhatsApp is push-delivered over HTTP, not a socket the
        // adapter's own `connect` owns), sharing the inbound channel and
        // LID map with the registered instance above.
        let webhook_channel = Arc::new(WhatsAppChannel::new(wa.base_url.clone(), wa.access_token.clone(), wa.phone_number_id.clone(), lid_map, tx));
        whatsapp_handle = Some(webhook_channel);

        let pipeline = Arc::new(InboundPipeline::new(
            sessions.clone(),
            commands.clone(),
            Arc::new(NullTypingIndicator),
            runner_bridge.clone() as Arc<dyn pulsegate_channels::SessionRunnerBridge>,
            Arc::new(WhatsAppFormatter),
            PipelineConfig {
                allow_all: config.channels.allow_all,
                sticky_ttl_minutes: config.channels.sticky_ttl_minutes,
                channel_default_agent: wa.default_agent_id.clone().map(AgentId::new),
                fallback_agent: wa.default_agent_id.clone().map(AgentId::new),
            },
        ));
        spawn_inbound_loop("whatsapp", channel_manager.clone(), pipeline, rx);
        rpc_tasks.push(spawn_rpc_listener("whatsapp", channel_manager.clone(), pubsub.clone()));
        info!("whatsapp channel configured");
    }

    if let Some(sig) = &config.channels.signal {
        let (tx, rx) = mpsc::channel(256);
        let channel = SignalChannel::new(sig.base_url.clone(), sig.account.clone(), tx);
        channel_manager.write().await.register(Box::new(channel));

        let pipeline = Arc::new(InboundPipeline::new(
            sessions.clone(),
            commands.clone(),
            Arc::new(NullTypingIndicator),
            runner_bridge.clone() as Arc<dyn pulsegate_channels::SessionRunnerBridge>,
            Arc::new(SignalFormatter),
            PipelineConfig {
                allow_all: config.channels.allow_all,
                sticky_ttl_minutes: config.channels.sticky_ttl_minutes,
                channel_default_agent: sig.default_agent_id.clone().map(AgentId::new),
                fallback_agent: sig.default_agent_id.clone().map(AgentId::new),
            },
        ));
        spawn_inbound_loop("signal", channel_manager.clone(), pipeline, rx);
        rpc_tasks.push(spawn_rpc_listener("signal", channel_manager.clone(), pubsub.clone()));
        info!("signal channel configured");
    }

    channel_manager.write().await.connect_all().await;

    // ── Admin HTTP surface ──────────────────────────────────────────────
    let app_state = Arc::new(AppState {
        channels: channel_manager.clone(),
        whatsapp: whatsapp_handle,
        events: event_bus.clone(),
    });
    let router = app::build_router(app_state);
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!("pulsegate-runtime listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tokio::select! {
        result = axum::serve(listener, router) => {
            if let Err(e) = result {
                error!(error = %e, "http server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    channel_manager.write().await.disconnect_all().await;
    Ok(())
}

async fn connect_and_run_telegram(channel: Arc<TelegramChannel>) -> anyhow::Result<()> {
    // `connect`/`disconnect` take `&mut self` only to satisfy the shared
    // `Channel` trait signature; the body is interior-mutability only, so
    // a short-lived exclusive borrow obtained before sharing is enough.
    let mut owned = match Arc::try_unwrap(channel) {
        Ok(c) => c,
        Err(_) => anyhow::bail!("telegram dispatcher channel already shared"),
    };
    pulsegate_channels::Channel::connect(&mut owned).await?;
    owned.run_dispatcher().await;
    Ok(())
}

fn spawn_inbound_loop(
    channel_name: &'static str,
    manager: Arc<RwLock<ChannelManager>>,
    pipeline: Arc<InboundPipeline>,
    mut rx: mpsc::Receiver<pulsegate_channels::InboundMessage>,
) {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let manager = manager.read().await;
            let Some(channel) = manager.get(channel_name) else {
                warn!(channel = channel_name, "inbound message for unregistered channel, dropping");
                continue;
            };
            if let Err(e) = pipeline.handle(channel, message).await {
                warn!(channel = channel_name, error = %e, "inbound pipeline error");
            }
        }
    });
}

fn spawn_rpc_listener(
    channel_name: &'static str,
    manager: Arc<RwLock<ChannelManager>>,
    pubsub: Arc<dyn PubSub>,
) -> tokio::task::JoinHandle<()> {
    let handler = Arc::new(GenericRpcHandler::new(channel_name, manager));
    let listener = Arc::new(RpcListener::new(channel_name, handler));
    tokio::spawn(listener.run(pubsub))
}
