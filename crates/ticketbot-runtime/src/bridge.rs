//! Wires the Slack ingress, the event queue and the reaction worker together.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use ticketbot_slack::SlackApi;
use ticketbot_tracker::TicketCreator;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::event_processor::{ProcessorConfig, ReactionTicketProcessor};
use crate::event_queue::{event_queue, run_event_worker, WorkerSummary};
use crate::ingress::{build_ingress_router, IngressConfig, IngressState};
use crate::routing_table::RoutingTable;

#[derive(Debug, Clone)]
pub struct ReactionBridgeConfig {
    /// `host:port` the HTTP server binds.
    pub bind: String,
    pub ingress: IngressConfig,
    pub processor: ProcessorConfig,
    pub event_queue_capacity: usize,
}

/// A ready-to-serve router plus the worker consuming what it enqueues.
pub struct ReactionBridge {
    bot_user_id: String,
    router: Router,
    worker: JoinHandle<WorkerSummary>,
}

impl ReactionBridge {
    /// Learns the bot identity and spawns the worker. Fails if Slack auth fails.
    pub async fn build(
        config: &ReactionBridgeConfig,
        slack: Arc<dyn SlackApi>,
        tracker: Arc<dyn TicketCreator>,
        routing: Arc<RoutingTable>,
    ) -> Result<Self> {
        let bot_user_id = slack
            .resolve_bot_user_id()
            .await
            .context("failed to authenticate with slack")?;
        info!(
            bot_user_id = %bot_user_id,
            routes = routing.len(),
            trigger = %config.ingress.trigger_emoji,
            "slack authentication succeeded"
        );

        let (sender, receiver) = event_queue(config.event_queue_capacity);
        let processor = ReactionTicketProcessor::new(
            config.processor.clone(),
            Arc::clone(&slack),
            tracker,
            routing,
            bot_user_id.clone(),
        );
        let worker = tokio::spawn(run_event_worker(processor, receiver));

        let state = IngressState::new(config.ingress.clone(), bot_user_id.clone(), sender, slack);
        Ok(Self {
            bot_user_id,
            router: build_ingress_router(Arc::new(state)),
            worker,
        })
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    /// The worker exits once the router and all its clones are dropped.
    pub fn into_parts(self) -> (Router, JoinHandle<WorkerSummary>) {
        (self.router, self.worker)
    }
}

/// Serves the bridge until Ctrl-C, then drains the queue.
pub async fn run_reaction_bridge(
    config: ReactionBridgeConfig,
    slack: Arc<dyn SlackApi>,
    tracker: Arc<dyn TicketCreator>,
    routing: Arc<RoutingTable>,
) -> Result<()> {
    let bind_addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}': expected host:port", config.bind))?;
    let bridge = ReactionBridge::build(&config, slack, tracker, routing).await?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind ticketbot on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve ticketbot listen address")?;
    info!(addr = %local_addr, "ticketbot listening");

    let (router, worker) = bridge.into_parts();
    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    info!("http server stopped; draining queued reactions");
    let summary = worker.await.context("reaction worker panicked")?;
    info!(
        processed = summary.processed,
        created = summary.created,
        "ticketbot shut down"
    );
    serve_result.context("ticketbot server exited unexpectedly")
}
