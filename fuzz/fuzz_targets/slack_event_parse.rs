#![no_main]

use libfuzzer_sys::fuzz_target;
use ticketbot_runtime::{ReactionEvent, MESSAGE_ITEM_TYPE};
use ticketbot_slack::{parse_slack_event_payload, SlackCallbackEvent, SlackEventPayload};

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = parse_slack_event_payload(data) else {
        return;
    };
    if let SlackEventPayload::EventCallback {
        event: SlackCallbackEvent::ReactionAdded(reaction),
        ..
    } = payload
    {
        let trigger = reaction.reaction.clone();
        if let Some(accepted) = ReactionEvent::accept(reaction, &trigger, "UBOT") {
            assert_eq!(accepted.item_type, MESSAGE_ITEM_TYPE);
            assert_ne!(accepted.reacting_user_id, "UBOT");
            assert!(!accepted.item_channel.is_empty());
            assert!(!accepted.item_ts.is_empty());
        }
    }
});
