use clap::Parser;
use ticketbot_runtime::{
    IngressConfig, ProcessorConfig, ReactionBridgeConfig, DEFAULT_COMPLETED_EMOJI,
    DEFAULT_ERROR_EMOJI, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_MENTION_REPLY,
    DEFAULT_MESSAGE_CACHE_TTL_MS, DEFAULT_WORKING_EMOJI,
};
use ticketbot_slack::SlackApiClientConfig;
use ticketbot_tracker::{JiraClientConfig, DEFAULT_JIRA_ISSUE_TYPE};

use crate::CliLogFormat;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "ticketbot",
    about = "Files Jira tickets for Slack messages marked with a trigger reaction",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "TICKETBOT_BIND",
        default_value = "0.0.0.0",
        help = "Interface address the webhook server binds"
    )]
    pub bind: String,

    #[arg(
        long,
        short = 'p',
        env = "TICKETBOT_PORT",
        default_value_t = 8080,
        help = "Port the webhook server listens on"
    )]
    pub port: u16,

    #[arg(
        long = "log-level",
        env = "TICKETBOT_LOG_LEVEL",
        default_value = "info",
        help = "Default tracing level when RUST_LOG is unset"
    )]
    pub log_level: String,

    #[arg(
        long = "log-format",
        env = "TICKETBOT_LOG_FORMAT",
        value_enum,
        default_value = "text",
        help = "Log output format"
    )]
    pub log_format: CliLogFormat,

    #[arg(
        long,
        short = 'e',
        env = "TICKETBOT_EMOJI",
        default_value = "create-jira-ticket",
        help = "Reaction name that triggers ticket creation"
    )]
    pub emoji: String,

    #[arg(
        long = "completed-emoji",
        env = "TICKETBOT_COMPLETED_EMOJI",
        default_value = DEFAULT_COMPLETED_EMOJI,
        help = "Reaction the bot adds once a ticket exists; also marks messages as already filed"
    )]
    pub completed_emoji: String,

    #[arg(
        long = "working-emoji",
        env = "TICKETBOT_WORKING_EMOJI",
        default_value = DEFAULT_WORKING_EMOJI,
        help = "Reaction shown while a reaction is being processed"
    )]
    pub working_emoji: String,

    #[arg(
        long = "error-emoji",
        env = "TICKETBOT_ERROR_EMOJI",
        default_value = DEFAULT_ERROR_EMOJI,
        help = "Reaction shown when ticket filing fails"
    )]
    pub error_emoji: String,

    #[arg(
        long = "slack-token",
        short = 's',
        env = "TICKETBOT_SLACK_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_token: String,

    #[arg(
        long = "slack-verification-token",
        short = 'f',
        env = "TICKETBOT_SLACK_VERIFICATION_TOKEN",
        hide_env_values = true,
        help = "Legacy Events API verification token compared against payload tokens"
    )]
    pub slack_verification_token: Option<String>,

    #[arg(
        long = "slack-signing-secret",
        env = "TICKETBOT_SLACK_SIGNING_SECRET",
        hide_env_values = true,
        help = "Signing secret used to verify X-Slack-Signature headers"
    )]
    pub slack_signing_secret: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "TICKETBOT_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "jira-url",
        env = "TICKETBOT_JIRA_URL",
        required_unless_present = "jira_dry_run",
        help = "Jira base URL used for the REST API"
    )]
    pub jira_url: Option<String>,

    #[arg(
        long = "jira-username",
        env = "TICKETBOT_JIRA_USERNAME",
        required_unless_present = "jira_dry_run",
        help = "Jira account used for basic auth"
    )]
    pub jira_username: Option<String>,

    #[arg(
        long = "jira-token",
        env = "TICKETBOT_JIRA_TOKEN",
        hide_env_values = true,
        required_unless_present = "jira_dry_run",
        help = "Jira API token used for basic auth"
    )]
    pub jira_token: Option<String>,

    #[arg(
        long = "jira-browse-url",
        env = "TICKETBOT_JIRA_BROWSE_URL",
        help = "Base URL for ticket links in replies (defaults to --jira-url)"
    )]
    pub jira_browse_url: Option<String>,

    #[arg(
        long = "jira-issue-type",
        env = "TICKETBOT_JIRA_ISSUE_TYPE",
        default_value = DEFAULT_JIRA_ISSUE_TYPE,
        help = "Issue type name for created tickets"
    )]
    pub jira_issue_type: String,

    #[arg(
        long = "jira-dry-run",
        env = "TICKETBOT_JIRA_DRY_RUN",
        default_value_t = false,
        help = "Log tickets instead of creating them in Jira"
    )]
    pub jira_dry_run: bool,

    #[arg(
        long = "user-jira-pairs",
        short = 'u',
        env = "TICKETBOT_USER_JIRA_PAIRS",
        default_value = "",
        help = "Comma-separated email=PROJECT routes, e.g. alice@example.com=OPS,bob=WEB"
    )]
    pub user_jira_pairs: String,

    #[arg(
        long = "default-email-domain",
        env = "TICKETBOT_DEFAULT_EMAIL_DOMAIN",
        help = "Domain appended to bare usernames in --user-jira-pairs"
    )]
    pub default_email_domain: Option<String>,

    #[arg(
        long = "message-cache-ttl-ms",
        env = "TICKETBOT_MESSAGE_CACHE_TTL_MS",
        default_value_t = DEFAULT_MESSAGE_CACHE_TTL_MS,
        help = "How long fetched messages are reused for duplicate deliveries"
    )]
    pub message_cache_ttl_ms: u64,

    #[arg(
        long = "event-queue-capacity",
        env = "TICKETBOT_EVENT_QUEUE_CAPACITY",
        default_value_t = DEFAULT_EVENT_QUEUE_CAPACITY,
        value_parser = parse_positive_usize,
        help = "Reactions buffered ahead of the worker before webhook handlers wait"
    )]
    pub event_queue_capacity: usize,

    #[arg(
        long = "request-timeout-ms",
        env = "TICKETBOT_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for Slack and Jira HTTP requests"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "TICKETBOT_RETRY_MAX_ATTEMPTS",
        default_value_t = 1,
        value_parser = parse_positive_usize,
        help = "Attempts per HTTP request; 1 disables retries on 429/5xx"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "TICKETBOT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay between HTTP retries"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "mention-reply",
        env = "TICKETBOT_MENTION_REPLY",
        default_value = DEFAULT_MENTION_REPLY,
        help = "Threaded reply posted when the bot is mentioned; empty disables"
    )]
    pub mention_reply: String,
}

impl Cli {
    pub fn listen_addr(&self) -> String {
        let host = self.bind.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        }
    }

    pub fn browse_base_url(&self) -> String {
        self.jira_browse_url
            .as_deref()
            .or(self.jira_url.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn slack_client_config(&self) -> SlackApiClientConfig {
        SlackApiClientConfig {
            api_base: self.slack_api_base.clone(),
            bot_token: self.slack_token.clone(),
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
        }
    }

    pub fn jira_client_config(&self) -> JiraClientConfig {
        JiraClientConfig {
            api_base: self.jira_url.clone().unwrap_or_default(),
            username: self.jira_username.clone().unwrap_or_default(),
            token: self.jira_token.clone().unwrap_or_default(),
            issue_type: self.jira_issue_type.clone(),
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
        }
    }

    pub fn bridge_config(&self) -> ReactionBridgeConfig {
        ReactionBridgeConfig {
            bind: self.listen_addr(),
            ingress: IngressConfig {
                trigger_emoji: self.emoji.clone(),
                verification_token: non_empty(self.slack_verification_token.as_deref()),
                signing_secret: non_empty(self.slack_signing_secret.as_deref()),
                mention_reply: self.mention_reply.clone(),
            },
            processor: ProcessorConfig {
                working_emoji: self.working_emoji.clone(),
                error_emoji: self.error_emoji.clone(),
                completed_emoji: self.completed_emoji.clone(),
                browse_base_url: self.browse_base_url(),
                message_cache_ttl_ms: self.message_cache_ttl_ms,
            },
            event_queue_capacity: self.event_queue_capacity,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
