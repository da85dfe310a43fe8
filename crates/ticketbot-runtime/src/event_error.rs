use thiserror::Error;
use ticketbot_tracker::TrackerError;

const TICKET_CREATION_FAILED_MESSAGE: &str = "There was an error creating the jira ticket.";
const MISSING_EMAIL_MESSAGE: &str = "Unable to get user info";

#[derive(Debug, Error)]
/// Terminal failures of a single reaction event.
pub enum EventError {
    #[error("failed to look up slack user {user_id}: {reason}")]
    UserLookup { user_id: String, reason: String },
    /// Usually the bot token lacks the `users:read.email` scope.
    #[error("slack user {user_id} has no email address")]
    MissingEmail { user_id: String },
    #[error("email {email} is not configured in USER_JIRA_PAIRS")]
    UnroutedUser { email: String },
    #[error("failed to fetch message {channel}/{ts}: {reason}")]
    MessageFetch {
        channel: String,
        ts: String,
        reason: String,
    },
    #[error("failed to fetch permalink for {channel}/{ts}: {reason}")]
    Permalink {
        channel: String,
        ts: String,
        reason: String,
    },
    #[error("failed to create ticket in project {project}")]
    TicketCreation {
        project: String,
        #[source]
        source: TrackerError,
    },
}

impl EventError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserLookup { .. } => "user_lookup",
            Self::MissingEmail { .. } => "missing_email",
            Self::UnroutedUser { .. } => "unrouted_user",
            Self::MessageFetch { .. } => "message_fetch",
            Self::Permalink { .. } => "permalink",
            Self::TicketCreation { .. } => "ticket_creation",
        }
    }

    /// Text safe to show the reacting user, if this failure has any.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::UnroutedUser { email } => {
                Some(format!("Email {email} is not configured in USER_JIRA_PAIRS"))
            }
            Self::MissingEmail { .. } => Some(MISSING_EMAIL_MESSAGE.to_string()),
            Self::TicketCreation { .. } => Some(TICKET_CREATION_FAILED_MESSAGE.to_string()),
            Self::UserLookup { .. } | Self::MessageFetch { .. } | Self::Permalink { .. } => None,
        }
    }
}
