//! Specification §8, scenario S5 — validation failures.
//!
//! An unknown operation code, a zero `data_size`, and an over-large
//! `data_size` must each complete locally with the matching status and
//! never reach the dispatcher.

use std::time::Duration;

use mux_client_core::{MAX_MESSAGE_BODY, Operation, PacketStatus};
use mux_client_test::{submit, test_context};

#[test]
fn unknown_operation_is_rejected() {
    let (ctx, handle, log) = test_context(4);
    let data = [0u8; 1];
    let packet = ctx.acquire().expect("pool has room");
    unsafe {
        (*packet).operation_code = 250; // names no known request variant
        (*packet).data = data.as_ptr();
        (*packet).data_size = data.len() as u32;
        (*packet).user_tag = 1;
        ctx.submit(packet);
    }
    let completed = log.wait_for_tag(1, Duration::from_secs(2));
    assert_eq!(completed.status, PacketStatus::InvalidOperation);
    assert!(handle.dispatch_log().is_empty());
}

#[test]
fn zero_data_size_is_rejected() {
    let (ctx, handle, log) = test_context(4);
    unsafe { submit(&ctx, Operation::LookupAccounts, &[], 2) };
    let completed = log.wait_for_tag(2, Duration::from_secs(2));
    assert_eq!(completed.status, PacketStatus::InvalidDataSize);
    assert!(handle.dispatch_log().is_empty());
}

#[test]
fn oversized_data_is_rejected() {
    let (ctx, handle, log) = test_context(4);
    // LookupAccounts' event size is 16; pick the smallest multiple of it
    // that still exceeds the max message body.
    let event_size = Operation::LookupAccounts.event_size() as usize;
    let too_big = MAX_MESSAGE_BODY + event_size;
    let data = vec![0u8; too_big];
    unsafe { submit(&ctx, Operation::LookupAccounts, &data, 3) };
    let completed = log.wait_for_tag(3, Duration::from_secs(2));
    assert_eq!(completed.status, PacketStatus::TooMuchData);
    assert!(handle.dispatch_log().is_empty());
}
