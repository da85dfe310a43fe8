#![no_main]

use libfuzzer_sys::fuzz_target;
use ticketbot_runtime::RoutingTable;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(table) = RoutingTable::parse(&raw, Some("example.com")) {
        for pair in raw.split(',') {
            let Some((email, _)) = pair.split_once('=') else {
                continue;
            };
            let email = email.trim();
            if email.contains('@') {
                assert!(table.project_for_email(email).is_some());
            }
        }
    }
});
