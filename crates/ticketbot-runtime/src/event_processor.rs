//! Reaction event processor: turns one accepted trigger reaction into a ticket.
//!
//! Every event runs the same sequence. Status reactions are updated first,
//! then the user, route, and message are resolved. The completed marker is
//! checked before anything is filed, and the outcome is reported back into
//! Slack. Status-reaction and reply failures are logged and never abort the
//! event. The processor is owned by the single queue worker, so its caches
//! need no locking.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use ticketbot_core::current_unix_timestamp_ms;
use ticketbot_slack::{SlackApi, SlackMessage, SlackUserProfile};
use ticketbot_tracker::TicketCreator;
use tracing::{debug, error, info, warn};

use crate::event_error::EventError;
use crate::message_cache::{MessageCache, MessageKey};
use crate::reaction_event::ReactionEvent;
use crate::routing_table::RoutingTable;

mod ticket_render_helpers;

pub use ticket_render_helpers::{
    render_ticket_body, render_ticket_browse_url, render_ticket_reply, render_ticket_title,
    TICKET_TITLE_MAX_CHARS,
};

pub const DEFAULT_WORKING_EMOJI: &str = "hourglass_flowing_sand";
pub const DEFAULT_ERROR_EMOJI: &str = "x";
pub const DEFAULT_COMPLETED_EMOJI: &str = "+1";
pub const DEFAULT_MESSAGE_CACHE_TTL_MS: u64 = 5_000;

#[derive(Debug, Clone)]
/// Status reaction names and link settings used while processing events.
pub struct ProcessorConfig {
    pub working_emoji: String,
    pub error_emoji: String,
    pub completed_emoji: String,
    pub browse_base_url: String,
    pub message_cache_ttl_ms: u64,
}

impl ProcessorConfig {
    pub fn new(browse_base_url: impl Into<String>) -> Self {
        Self {
            working_emoji: DEFAULT_WORKING_EMOJI.to_string(),
            error_emoji: DEFAULT_ERROR_EMOJI.to_string(),
            completed_emoji: DEFAULT_COMPLETED_EMOJI.to_string(),
            browse_base_url: browse_base_url.into(),
            message_cache_ttl_ms: DEFAULT_MESSAGE_CACHE_TTL_MS,
        }
    }
}

#[derive(Debug)]
pub enum EventOutcome {
    TicketCreated { ticket_key: String },
    /// The bot's completed marker was already present; nothing was filed.
    AlreadyFiled,
    Failed(EventError),
}

#[derive(Debug)]
enum FilingStep {
    AlreadyFiled,
    Created {
        ticket_key: String,
        reply_thread_ts: String,
    },
}

pub struct ReactionTicketProcessor {
    config: ProcessorConfig,
    slack: Arc<dyn SlackApi>,
    tracker: Arc<dyn TicketCreator>,
    routing: Arc<RoutingTable>,
    bot_user_id: String,
    users: HashMap<String, SlackUserProfile>,
    messages: MessageCache,
}

impl ReactionTicketProcessor {
    pub fn new(
        config: ProcessorConfig,
        slack: Arc<dyn SlackApi>,
        tracker: Arc<dyn TicketCreator>,
        routing: Arc<RoutingTable>,
        bot_user_id: impl Into<String>,
    ) -> Self {
        let messages = MessageCache::new(config.message_cache_ttl_ms);
        Self {
            config,
            slack,
            tracker,
            routing,
            bot_user_id: bot_user_id.into(),
            users: HashMap::new(),
            messages,
        }
    }

    /// Runs one event to completion. Never panics on backend failures.
    pub async fn handle_event(&mut self, event: &ReactionEvent) -> EventOutcome {
        info!(
            channel = %event.item_channel,
            ts = %event.item_ts,
            user = %event.reacting_user_id,
            reaction = %event.reaction_name,
            "handling ticket reaction"
        );
        self.enter_pending(event).await;

        let outcome = match self.file_ticket(event).await {
            Ok(FilingStep::AlreadyFiled) => {
                info!(
                    channel = %event.item_channel,
                    ts = %event.item_ts,
                    "ticket already filed for message; skipping"
                );
                EventOutcome::AlreadyFiled
            }
            Ok(FilingStep::Created {
                ticket_key,
                reply_thread_ts,
            }) => {
                self.report_success(event, &ticket_key, &reply_thread_ts)
                    .await;
                EventOutcome::TicketCreated { ticket_key }
            }
            Err(failure) => {
                self.report_failure(event, &failure).await;
                EventOutcome::Failed(failure)
            }
        };

        self.remove_status_reaction(&self.config.working_emoji, event)
            .await;
        outcome
    }

    async fn enter_pending(&mut self, event: &ReactionEvent) {
        let key = MessageKey::new(&event.item_channel, &event.item_ts);
        if self.messages.invalidate(&key) {
            debug!(channel = %key.channel, ts = %key.ts, "cleared cached message");
        }
        self.remove_status_reaction(&self.config.error_emoji, event)
            .await;
        self.add_status_reaction(&self.config.working_emoji, event)
            .await;
    }

    async fn file_ticket(&mut self, event: &ReactionEvent) -> Result<FilingStep, EventError> {
        let profile = self.resolve_user(&event.reacting_user_id).await?;
        let email = profile.email.ok_or_else(|| EventError::MissingEmail {
            user_id: event.reacting_user_id.clone(),
        })?;
        let project = self
            .routing
            .project_for_email(&email)
            .map(ToOwned::to_owned)
            .ok_or_else(|| EventError::UnroutedUser {
                email: email.clone(),
            })?;
        debug!(%email, %project, "resolved ticket project");

        let message = self
            .fetch_message(&event.item_channel, &event.item_ts)
            .await
            .map_err(|error| EventError::MessageFetch {
                channel: event.item_channel.clone(),
                ts: event.item_ts.clone(),
                reason: format!("{error:#}"),
            })?;

        if message.has_reaction_from(&self.config.completed_emoji, &self.bot_user_id) {
            return Ok(FilingStep::AlreadyFiled);
        }

        let reply_thread_ts = message.reply_thread_ts().to_string();
        let permalink = self
            .slack
            .permalink(&message.channel, &message.ts)
            .await
            .map_err(|error| EventError::Permalink {
                channel: message.channel.clone(),
                ts: message.ts.clone(),
                reason: format!("{error:#}"),
            })?;

        let title = render_ticket_title(&message.text);
        let body = render_ticket_body(&permalink, &message.text);
        let ticket_key = self
            .tracker
            .create_ticket(&project, &title, &body)
            .await
            .map_err(|source| EventError::TicketCreation {
                project: project.clone(),
                source,
            })?;

        Ok(FilingStep::Created {
            ticket_key,
            reply_thread_ts,
        })
    }

    async fn resolve_user(&mut self, user_id: &str) -> Result<SlackUserProfile, EventError> {
        if let Some(profile) = self.users.get(user_id) {
            return Ok(profile.clone());
        }
        let profile =
            self.slack
                .user_profile(user_id)
                .await
                .map_err(|error| EventError::UserLookup {
                    user_id: user_id.to_string(),
                    reason: format!("{error:#}"),
                })?;
        self.users.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    pub(crate) async fn fetch_message(&mut self, channel: &str, ts: &str) -> Result<SlackMessage> {
        let key = MessageKey::new(channel, ts);
        if let Some(message) = self.messages.get(&key, current_unix_timestamp_ms()) {
            debug!(channel, ts, "message cache hit");
            return Ok(message);
        }
        let message = self.lookup_message(channel, ts).await?;
        self.messages
            .insert(key, message.clone(), current_unix_timestamp_ms());
        Ok(message)
    }

    async fn lookup_message(&self, channel: &str, ts: &str) -> Result<SlackMessage> {
        let history = self.slack.conversation_history(channel, ts).await?;
        let Some(first) = history.into_iter().next() else {
            bail!("message response is empty");
        };
        if first.ts == ts {
            return Ok(first);
        }
        // Thread replies are absent from channel history.
        self.slack
            .conversation_replies(channel, ts)
            .await?
            .into_iter()
            .find(|message| message.ts == ts)
            .ok_or_else(|| anyhow!("message {ts} not found in {channel}"))
    }

    async fn report_success(&self, event: &ReactionEvent, ticket_key: &str, reply_thread_ts: &str) {
        info!(
            channel = %event.item_channel,
            ts = %event.item_ts,
            ticket = ticket_key,
            "ticket created"
        );
        self.add_status_reaction(&self.config.completed_emoji, event)
            .await;
        let reply = render_ticket_reply(ticket_key, &self.config.browse_base_url);
        if let Err(error) = self
            .slack
            .post_message(&event.item_channel, &reply, Some(reply_thread_ts))
            .await
        {
            error!(
                channel = %event.item_channel,
                ticket = ticket_key,
                error = %format!("{error:#}"),
                "failed to post ticket reply"
            );
        }
    }

    async fn report_failure(&mut self, event: &ReactionEvent, failure: &EventError) {
        error!(
            channel = %event.item_channel,
            ts = %event.item_ts,
            user = %event.reacting_user_id,
            kind = failure.kind(),
            error = %error_chain(failure),
            "failed to handle ticket reaction"
        );
        self.add_status_reaction(&self.config.error_emoji, event)
            .await;

        let Some(text) = failure.user_message() else {
            return;
        };
        let thread_ts = match self.fetch_message(&event.item_channel, &event.item_ts).await {
            Ok(message) => Some(message.reply_thread_ts().to_string()),
            Err(error) => {
                warn!(
                    channel = %event.item_channel,
                    error = %format!("{error:#}"),
                    "could not resolve reply thread; replying in channel"
                );
                None
            }
        };
        if let Err(error) = self
            .slack
            .post_ephemeral(
                &event.item_channel,
                &event.reacting_user_id,
                &text,
                thread_ts.as_deref(),
            )
            .await
        {
            warn!(
                channel = %event.item_channel,
                user = %event.reacting_user_id,
                error = %format!("{error:#}"),
                "failed to post ephemeral failure reply"
            );
        }
    }

    async fn add_status_reaction(&self, name: &str, event: &ReactionEvent) {
        if let Err(error) = self
            .slack
            .add_reaction(name, &event.item_channel, &event.item_ts)
            .await
        {
            warn!(
                reaction = name,
                channel = %event.item_channel,
                ts = %event.item_ts,
                error = %format!("{error:#}"),
                "failed to add status reaction"
            );
        }
    }

    async fn remove_status_reaction(&self, name: &str, event: &ReactionEvent) {
        if let Err(error) = self
            .slack
            .remove_reaction(name, &event.item_channel, &event.item_ts)
            .await
        {
            debug!(
                reaction = name,
                channel = %event.item_channel,
                ts = %event.item_ts,
                error = %format!("{error:#}"),
                "failed to remove status reaction"
            );
        }
    }
}

fn error_chain(error: &dyn StdError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
