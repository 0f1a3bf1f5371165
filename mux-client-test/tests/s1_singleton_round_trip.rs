//! Specification §8, scenario S1 — singleton round trip.
//!
//! `concurrency_max = 4`; submit one create-accounts packet with two
//! accounts (`data_size = 256`, event size 128). Expect: `status = ok`;
//! single dispatch; no batching.

use std::time::Duration;

use mux_client_core::{Operation, PacketStatus};
use mux_client_test::{submit, test_context};

#[test]
fn singleton_round_trip() {
    let (ctx, handle, log) = test_context(4);

    let data = [7u8; 256]; // two accounts at event_size 128
    unsafe { submit(&ctx, Operation::CreateAccounts, &data, 1) };

    let completed = log.wait_for_tag(1, Duration::from_secs(2));
    assert_eq!(completed.status, PacketStatus::Ok);

    let dispatches = handle.dispatch_log();
    assert_eq!(dispatches.len(), 1, "exactly one dispatch, no batching");
    assert_eq!(dispatches[0].operation, Operation::CreateAccounts);
    assert_eq!(dispatches[0].body_len, 256);
}
