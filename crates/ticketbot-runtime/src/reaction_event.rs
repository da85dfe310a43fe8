use ticketbot_slack::ReactionAddedEvent;

/// Item type the bridge files tickets for.
pub const MESSAGE_ITEM_TYPE: &str = "message";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A trigger reaction accepted by the ingress and consumed once by the worker.
pub struct ReactionEvent {
    pub reacting_user_id: String,
    pub reaction_name: String,
    pub item_channel: String,
    pub item_ts: String,
    pub item_type: String,
}

impl ReactionEvent {
    /// Keeps only message reactions with `trigger_emoji` from someone other than the bot.
    pub fn accept(
        event: ReactionAddedEvent,
        trigger_emoji: &str,
        bot_user_id: &str,
    ) -> Option<Self> {
        if event.user == bot_user_id
            || event.reaction != trigger_emoji
            || event.item.item_type != MESSAGE_ITEM_TYPE
            || event.item.channel.is_empty()
            || event.item.ts.is_empty()
        {
            return None;
        }
        Some(Self {
            reacting_user_id: event.user,
            reaction_name: event.reaction,
            item_channel: event.item.channel,
            item_ts: event.item.ts,
            item_type: event.item.item_type,
        })
    }
}
