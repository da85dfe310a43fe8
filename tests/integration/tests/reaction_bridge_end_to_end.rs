use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use ticketbot_runtime::{
    IngressConfig, ProcessorConfig, ReactionBridge, ReactionBridgeConfig, RoutingTable,
    WorkerSummary,
};
use ticketbot_slack::{
    SlackApi, SlackApiClient, SlackApiClientConfig, SlackMessage, SlackMessageReaction,
    SlackUserProfile,
};
use ticketbot_tracker::{
    JiraClientConfig, JiraTicketClient, TicketCreator, TrackerError,
};
use tokio::sync::Mutex as AsyncMutex;
use tower::ServiceExt;

const BOT_USER_ID: &str = "UBOT";
const TRIGGER: &str = "create-ticket";

#[derive(Debug, Clone, PartialEq, Eq)]
struct PostedReply {
    channel: String,
    text: String,
    thread_ts: Option<String>,
    ephemeral_user: Option<String>,
}

/// In-memory Slack workspace whose reactions reflect what the bot adds.
struct FakeWorkspace {
    emails: HashMap<String, String>,
    messages: AsyncMutex<Vec<SlackMessage>>,
    replies: AsyncMutex<Vec<PostedReply>>,
    history_calls: AtomicUsize,
}

impl FakeWorkspace {
    fn new(messages: Vec<SlackMessage>) -> Self {
        Self {
            emails: HashMap::from([
                ("U1".to_string(), "alice@example.com".to_string()),
                ("U2".to_string(), "carol@example.com".to_string()),
            ]),
            messages: AsyncMutex::new(messages),
            replies: AsyncMutex::new(Vec::new()),
            history_calls: AtomicUsize::new(0),
        }
    }

    async fn message(&self, ts: &str) -> SlackMessage {
        self.messages
            .lock()
            .await
            .iter()
            .find(|message| message.ts == ts)
            .cloned()
            .expect("message exists")
    }

    async fn replies(&self) -> Vec<PostedReply> {
        self.replies.lock().await.clone()
    }
}

fn message(ts: &str, thread_ts: Option<&str>, text: &str) -> SlackMessage {
    SlackMessage {
        channel: "C1".to_string(),
        ts: ts.to_string(),
        thread_ts: thread_ts.map(ToOwned::to_owned),
        text: text.to_string(),
        reactions: Vec::new(),
    }
}

fn is_thread_root(message: &SlackMessage) -> bool {
    message
        .thread_ts
        .as_deref()
        .map_or(true, |thread_ts| thread_ts == message.ts)
}

#[async_trait]
impl SlackApi for FakeWorkspace {
    async fn resolve_bot_user_id(&self) -> Result<String> {
        Ok(BOT_USER_ID.to_string())
    }

    async fn user_profile(&self, user_id: &str) -> Result<SlackUserProfile> {
        let email = self
            .emails
            .get(user_id)
            .ok_or_else(|| anyhow!("slack users.info failed: user_not_found"))?;
        Ok(SlackUserProfile {
            user_id: user_id.to_string(),
            email: Some(email.clone()),
        })
    }

    async fn conversation_history(
        &self,
        channel: &str,
        latest_ts: &str,
    ) -> Result<Vec<SlackMessage>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let messages = self.messages.lock().await;
        Ok(messages
            .iter()
            .filter(|message| message.channel == channel && is_thread_root(message))
            .filter(|message| message.ts.as_str() <= latest_ts)
            .max_by(|left, right| left.ts.cmp(&right.ts))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn conversation_replies(&self, channel: &str, ts: &str) -> Result<Vec<SlackMessage>> {
        let messages = self.messages.lock().await;
        let Some(target) = messages.iter().find(|message| message.ts == ts) else {
            bail!("slack conversations.replies failed: thread_not_found");
        };
        let root = target.reply_thread_ts().to_string();
        Ok(messages
            .iter()
            .filter(|message| message.channel == channel && message.reply_thread_ts() == root)
            .cloned()
            .collect())
    }

    async fn permalink(&self, channel: &str, ts: &str) -> Result<String> {
        Ok(format!(
            "https://acme.slack.com/archives/{channel}/p{}",
            ts.replace('.', "")
        ))
    }

    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> Result<()> {
        self.replies.lock().await.push(PostedReply {
            channel: channel.to_string(),
            text: text.to_string(),
            thread_ts: thread_ts.map(ToOwned::to_owned),
            ephemeral_user: None,
        });
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user_id: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()> {
        self.replies.lock().await.push(PostedReply {
            channel: channel.to_string(),
            text: text.to_string(),
            thread_ts: thread_ts.map(ToOwned::to_owned),
            ephemeral_user: Some(user_id.to_string()),
        });
        Ok(())
    }

    async fn add_reaction(&self, name: &str, channel: &str, ts: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|message| message.channel == channel && message.ts == ts)
            .ok_or_else(|| anyhow!("slack reactions.add failed: message_not_found"))?;
        match message.reactions.iter_mut().find(|entry| entry.name == name) {
            Some(entry) if entry.users.iter().any(|user| user == BOT_USER_ID) => {
                bail!("slack reactions.add failed: already_reacted")
            }
            Some(entry) => entry.users.push(BOT_USER_ID.to_string()),
            None => message.reactions.push(SlackMessageReaction {
                name: name.to_string(),
                users: vec![BOT_USER_ID.to_string()],
            }),
        }
        Ok(())
    }

    async fn remove_reaction(&self, name: &str, channel: &str, ts: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|message| message.channel == channel && message.ts == ts)
            .ok_or_else(|| anyhow!("slack reactions.remove failed: message_not_found"))?;
        let Some(entry) = message.reactions.iter_mut().find(|entry| entry.name == name) else {
            bail!("slack reactions.remove failed: no_reaction");
        };
        let before = entry.users.len();
        entry.users.retain(|user| user != BOT_USER_ID);
        if entry.users.len() == before {
            bail!("slack reactions.remove failed: no_reaction");
        }
        message.reactions.retain(|entry| !entry.users.is_empty());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FiledTicket {
    project: String,
    title: String,
    body: String,
}

struct ScriptedTracker {
    failures: AsyncMutex<VecDeque<TrackerError>>,
    filed: AsyncMutex<Vec<FiledTicket>>,
}

impl ScriptedTracker {
    fn new() -> Self {
        Self::with_failures(Vec::new())
    }

    fn with_failures(failures: Vec<TrackerError>) -> Self {
        Self {
            failures: AsyncMutex::new(VecDeque::from(failures)),
            filed: AsyncMutex::new(Vec::new()),
        }
    }

    async fn filed(&self) -> Vec<FiledTicket> {
        self.filed.lock().await.clone()
    }
}

#[async_trait]
impl TicketCreator for ScriptedTracker {
    async fn create_ticket(
        &self,
        project: &str,
        title: &str,
        body: &str,
    ) -> Result<String, TrackerError> {
        if let Some(failure) = self.failures.lock().await.pop_front() {
            return Err(failure);
        }
        let mut filed = self.filed.lock().await;
        filed.push(FiledTicket {
            project: project.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(format!("{project}-{}", filed.len()))
    }
}

fn bridge_config() -> ReactionBridgeConfig {
    ReactionBridgeConfig {
        bind: "127.0.0.1:0".to_string(),
        ingress: IngressConfig::new(TRIGGER),
        processor: ProcessorConfig::new("https://jira.example.com"),
        event_queue_capacity: 2,
    }
}

fn reaction_webhook(user: &str, ts: &str) -> Value {
    json!({
        "type": "event_callback",
        "event": {
            "type": "reaction_added",
            "user": user,
            "reaction": TRIGGER,
            "item": {"type": "message", "channel": "C1", "ts": ts},
            "event_ts": "999.1"
        }
    })
}

async fn deliver(router: &Router, payload: &Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/slack")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request");
    let response = router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

async fn run_deliveries(
    slack: Arc<dyn SlackApi>,
    tracker: Arc<dyn TicketCreator>,
    payloads: &[Value],
) -> WorkerSummary {
    let routing = RoutingTable::parse("alice@example.com=OPS", None).expect("routing");
    let bridge = ReactionBridge::build(&bridge_config(), slack, tracker, Arc::new(routing))
        .await
        .expect("bridge");
    let (router, worker) = bridge.into_parts();
    for payload in payloads {
        deliver(&router, payload).await;
    }
    drop(router);
    worker.await.expect("worker joins")
}

#[tokio::test]
async fn integration_reaction_files_ticket_and_marks_message_completed() {
    let workspace = Arc::new(FakeWorkspace::new(vec![message(
        "100.1",
        None,
        "Build failed\nsee logs",
    )]));
    let tracker = Arc::new(ScriptedTracker::new());

    let summary = run_deliveries(
        workspace.clone(),
        tracker.clone(),
        &[reaction_webhook("U1", "100.1")],
    )
    .await;

    assert_eq!(summary.created, 1);
    assert_eq!(
        tracker.filed().await,
        vec![FiledTicket {
            project: "OPS".to_string(),
            title: "Build failed".to_string(),
            body: "From slack: https://acme.slack.com/archives/C1/p1001\n\nBuild failed\nsee logs"
                .to_string(),
        }]
    );
    assert_eq!(
        workspace.replies().await,
        vec![PostedReply {
            channel: "C1".to_string(),
            text: "I've created your jira ticket OPS-1: https://jira.example.com/browse/OPS-1"
                .to_string(),
            thread_ts: Some("100.1".to_string()),
            ephemeral_user: None,
        }]
    );
    let marked = workspace.message("100.1").await;
    assert!(marked.has_reaction_from("+1", BOT_USER_ID));
    assert!(!marked.has_reaction_from("hourglass_flowing_sand", BOT_USER_ID));
    assert!(!marked.has_reaction_from("x", BOT_USER_ID));
}

#[tokio::test]
async fn integration_replayed_and_duplicate_deliveries_file_one_ticket() {
    let workspace = Arc::new(FakeWorkspace::new(vec![message(
        "100.1",
        None,
        "Build failed\nsee logs",
    )]));
    let tracker = Arc::new(ScriptedTracker::new());
    let delivery = reaction_webhook("U1", "100.1");

    let summary = run_deliveries(
        workspace.clone(),
        tracker.clone(),
        &[delivery.clone(), delivery.clone(), delivery],
    )
    .await;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(tracker.filed().await.len(), 1);
    assert_eq!(workspace.replies().await.len(), 1);
    assert_eq!(workspace.history_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn integration_unrouted_user_gets_ephemeral_notice_and_no_ticket() {
    let workspace = Arc::new(FakeWorkspace::new(vec![message("100.1", None, "Disk full")]));
    let tracker = Arc::new(ScriptedTracker::new());

    let summary = run_deliveries(
        workspace.clone(),
        tracker.clone(),
        &[reaction_webhook("U2", "100.1")],
    )
    .await;

    assert_eq!(summary.failed, 1);
    assert!(tracker.filed().await.is_empty());
    let replies = workspace.replies().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].ephemeral_user.as_deref(), Some("U2"));
    assert_eq!(
        replies[0].text,
        "Email carol@example.com is not configured in USER_JIRA_PAIRS"
    );
    let marked = workspace.message("100.1").await;
    assert!(marked.has_reaction_from("x", BOT_USER_ID));
    assert!(!marked.has_reaction_from("+1", BOT_USER_ID));
}

#[tokio::test]
async fn integration_thread_reply_is_answered_in_thread_root() {
    let workspace = Arc::new(FakeWorkspace::new(vec![
        message("100.0", Some("100.0"), "Deploys are flaky"),
        message("100.2", Some("100.0"), "Staging deploy stuck\nsince noon"),
    ]));
    let tracker = Arc::new(ScriptedTracker::new());

    run_deliveries(
        workspace.clone(),
        tracker.clone(),
        &[reaction_webhook("U1", "100.2")],
    )
    .await;

    assert_eq!(tracker.filed().await[0].title, "Staging deploy stuck");
    let replies = workspace.replies().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].thread_ts.as_deref(), Some("100.0"));
    assert!(workspace
        .message("100.2")
        .await
        .has_reaction_from("+1", BOT_USER_ID));
}

#[tokio::test]
async fn integration_long_first_line_is_hard_truncated() {
    let long_line = "a".repeat(150);
    let workspace = Arc::new(FakeWorkspace::new(vec![message(
        "100.1",
        None,
        &format!("{long_line}\nsecond line"),
    )]));
    let tracker = Arc::new(ScriptedTracker::new());

    run_deliveries(
        workspace.clone(),
        tracker.clone(),
        &[reaction_webhook("U1", "100.1")],
    )
    .await;

    let filed = tracker.filed().await;
    assert_eq!(filed[0].title.chars().count(), 100);
    assert!(filed[0].body.ends_with(&format!("{long_line}\nsecond line")));
}

#[tokio::test]
async fn integration_tracker_failure_can_be_retried_by_reacting_again() {
    let workspace = Arc::new(FakeWorkspace::new(vec![message("100.1", None, "Build failed")]));
    let tracker = Arc::new(ScriptedTracker::with_failures(vec![TrackerError::HttpStatus {
        status: 503,
        body: "jira is down".to_string(),
    }]));
    let delivery = reaction_webhook("U1", "100.1");

    let summary = run_deliveries(
        workspace.clone(),
        tracker.clone(),
        &[delivery.clone(), delivery],
    )
    .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);
    let replies = workspace.replies().await;
    assert_eq!(replies.len(), 2);
    assert_eq!(
        replies[0].text,
        "There was an error creating the jira ticket."
    );
    assert_eq!(replies[0].ephemeral_user.as_deref(), Some("U1"));
    assert!(!replies[0].text.contains("jira is down"));
    assert!(replies[1].text.contains("OPS-1"));
    let marked = workspace.message("100.1").await;
    assert!(marked.has_reaction_from("+1", BOT_USER_ID));
    assert!(!marked.has_reaction_from("x", BOT_USER_ID));
}

#[tokio::test]
async fn integration_wire_level_bridge_talks_to_slack_and_jira_apis() {
    let slack_server = MockServer::start();
    let jira_server = MockServer::start();

    slack_server.mock(|when, then| {
        when.method(POST).path("/auth.test");
        then.status(200)
            .json_body(json!({"ok": true, "user_id": BOT_USER_ID}));
    });
    slack_server.mock(|when, then| {
        when.method(GET).path("/users.info").query_param("user", "U1");
        then.status(200).json_body(json!({
            "ok": true,
            "user": {"id": "U1", "profile": {"email": "Alice@Example.com"}}
        }));
    });
    slack_server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.history")
            .query_param("channel", "C1")
            .query_param("latest", "100.1");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [{"type": "message", "ts": "100.1", "text": "Build failed\nsee logs"}]
        }));
    });
    slack_server.mock(|when, then| {
        when.method(GET).path("/chat.getPermalink");
        then.status(200).json_body(json!({
            "ok": true,
            "permalink": "https://acme.slack.com/archives/C1/p1001"
        }));
    });
    let reactions_added = slack_server.mock(|when, then| {
        when.method(POST).path("/reactions.add");
        then.status(200).json_body(json!({"ok": true}));
    });
    slack_server.mock(|when, then| {
        when.method(POST).path("/reactions.remove");
        then.status(200)
            .json_body(json!({"ok": false, "error": "no_reaction"}));
    });
    let reply = slack_server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("OPS-42")
            .body_includes("\"thread_ts\":\"100.1\"");
        then.status(200).json_body(json!({"ok": true, "ts": "100.9"}));
    });
    let create_issue = jira_server.mock(|when, then| {
        when.method(POST)
            .path("/rest/api/2/issue")
            .header_exists("authorization")
            .json_body(json!({
                "fields": {
                    "project": {"key": "OPS"},
                    "summary": "Build failed",
                    "description": "From slack: https://acme.slack.com/archives/C1/p1001\n\nBuild failed\nsee logs",
                    "issuetype": {"name": "Task"}
                }
            }));
        then.status(201)
            .json_body(json!({"id": "10042", "key": "OPS-42"}));
    });

    let slack = SlackApiClient::new(SlackApiClientConfig {
        api_base: slack_server.base_url(),
        bot_token: "xoxb-test".to_string(),
        request_timeout_ms: 2_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
    })
    .expect("slack client");
    let jira = JiraTicketClient::new(JiraClientConfig {
        api_base: jira_server.base_url(),
        username: "bot@example.com".to_string(),
        token: "jira-token".to_string(),
        issue_type: "Task".to_string(),
        request_timeout_ms: 2_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
    })
    .expect("jira client");

    let summary = run_deliveries(
        Arc::new(slack),
        Arc::new(jira),
        &[reaction_webhook("U1", "100.1")],
    )
    .await;

    assert_eq!(summary.created, 1);
    create_issue.assert_calls(1);
    reply.assert_calls(1);
    reactions_added.assert_calls(2);
}
