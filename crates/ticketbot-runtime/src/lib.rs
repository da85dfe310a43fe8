//! Reaction-to-ticket runtime for ticketbot.
//!
//! The axum ingress filters Slack webhooks down to trigger reactions and hands
//! them to a bounded queue. A single worker owns the processor and its caches,
//! which keeps the completed-marker check free of races.

pub mod bridge;
pub mod event_error;
pub mod event_processor;
pub mod event_queue;
pub mod ingress;
pub mod message_cache;
pub mod reaction_event;
pub mod routing_table;

pub use bridge::{run_reaction_bridge, ReactionBridge, ReactionBridgeConfig};
pub use event_error::EventError;
pub use event_processor::{
    render_ticket_body, render_ticket_browse_url, render_ticket_reply, render_ticket_title,
    EventOutcome, ProcessorConfig, ReactionTicketProcessor, DEFAULT_COMPLETED_EMOJI,
    DEFAULT_ERROR_EMOJI, DEFAULT_MESSAGE_CACHE_TTL_MS, DEFAULT_WORKING_EMOJI,
    TICKET_TITLE_MAX_CHARS,
};
pub use event_queue::{
    event_queue, run_event_worker, EventReceiver, EventSender, QueueClosed, WorkerSummary,
    DEFAULT_EVENT_QUEUE_CAPACITY,
};
pub use ingress::{
    build_ingress_router, IngressConfig, IngressError, IngressState, DEFAULT_MENTION_REPLY,
    HEALTH_ENDPOINT, ROOT_BANNER, SLACK_EVENTS_ENDPOINT,
};
pub use message_cache::{MessageCache, MessageKey};
pub use reaction_event::{ReactionEvent, MESSAGE_ITEM_TYPE};
pub use routing_table::{RoutingError, RoutingTable};
