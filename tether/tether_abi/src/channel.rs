//! Bounded `i64` channels for compiled code.
//!
//! Channels are shared: any thread holding a handle may send, receive, or
//! close. Blocking calls never hold the handle table lock; they work on
//! their own reference to the channel, so a concurrent release cannot pull
//! the channel out from under a blocked caller.

use log::warn;
use std::os::raw::c_int;
use std::sync::Arc;
use tether_concurrency::Channel;
use tether_core::HandleError;

use crate::runtime::runtime;

/// Resolve a raw handle to a reference on the channel, logging rejects
fn lookup(op: &str, ch: u64) -> Result<Arc<Channel<i64>>, HandleError> {
    runtime().channels.get_cloned_raw(ch).map_err(|e| {
        warn!("{}: {}", op, e);
        e
    })
}

/// Create a channel holding up to `capacity` values.
///
/// A capacity of zero or less is treated as 1. Returns 0 if the buffer
/// cannot be allocated.
#[no_mangle]
pub extern "C" fn tether_channel_new(capacity: i64) -> u64 {
    let capacity = usize::try_from(capacity).unwrap_or(1);

    let channel = match Channel::try_new(capacity) {
        Ok(channel) => Arc::new(channel),
        Err(e) => {
            warn!("tether_channel_new: capacity {}: {}", capacity, e);
            return 0;
        }
    };

    match runtime().channels.insert(channel) {
        Ok(handle) => handle.into_raw(),
        Err(e) => {
            warn!("tether_channel_new: {}", e);
            0
        }
    }
}

/// Append `value`, blocking while the channel is full and open.
///
/// If the channel is closed, or becomes closed while waiting, the value is
/// discarded.
#[no_mangle]
pub extern "C" fn tether_channel_send(ch: u64, value: i64) {
    if let Ok(channel) = lookup("tether_channel_send", ch) {
        // A rejected value is dropped by contract.
        let _ = channel.send(value);
    }
}

/// Take the oldest value, blocking while the channel is empty and open.
///
/// Returns 0 once the channel is closed and drained, or for an invalid
/// handle. Use [`tether_channel_receive_tagged`] to tell a sent 0 apart from
/// those cases.
#[no_mangle]
pub extern "C" fn tether_channel_receive(ch: u64) -> i64 {
    lookup("tether_channel_receive", ch)
        .ok()
        .and_then(|channel| channel.receive())
        .unwrap_or(0)
}

/// Take the oldest value into `*out`, blocking while the channel is empty
/// and open.
///
/// Returns 1 if a value was written. Returns 0, leaving `*out` untouched,
/// once the channel is closed and drained, for an invalid handle, or when
/// `out` is null.
///
/// # Safety
/// `out` must be null or valid for a write of one `i64`.
#[no_mangle]
pub unsafe extern "C" fn tether_channel_receive_tagged(ch: u64, out: *mut i64) -> c_int {
    if out.is_null() {
        warn!("tether_channel_receive_tagged: null output pointer");
        return 0;
    }

    let Ok(channel) = lookup("tether_channel_receive_tagged", ch) else {
        return 0;
    };

    match channel.receive() {
        Some(value) => {
            unsafe { out.write(value) };
            1
        }
        None => 0,
    }
}

/// Close the channel and wake every blocked sender and receiver.
///
/// Closing twice is harmless. Buffered values can still be received.
#[no_mangle]
pub extern "C" fn tether_channel_close(ch: u64) {
    if let Ok(channel) = lookup("tether_channel_close", ch) {
        channel.close();
    }
}

/// Returns 1 if at least one value is buffered. Never blocks.
#[no_mangle]
pub extern "C" fn tether_channel_has_data(ch: u64) -> c_int {
    lookup("tether_channel_has_data", ch)
        .map(|channel| c_int::from(channel.has_data()))
        .unwrap_or(0)
}

/// Returns 1 if the channel is closed. Never blocks.
///
/// An invalid handle reports 1: nothing can be sent to or received from it.
#[no_mangle]
pub extern "C" fn tether_channel_is_closed(ch: u64) -> c_int {
    lookup("tether_channel_is_closed", ch)
        .map(|channel| c_int::from(channel.is_closed()))
        .unwrap_or(1)
}

/// Invalidate the handle.
///
/// The channel is not closed. Threads already blocked on it keep their own
/// reference and finish normally; the buffer is freed when the last of them
/// returns.
#[no_mangle]
pub extern "C" fn tether_channel_release(ch: u64) {
    if let Err(e) = runtime().channels.remove_raw(ch) {
        warn!("tether_channel_release: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_capacity_is_raised() {
        for capacity in [0, -1, i64::MIN] {
            let ch = tether_channel_new(capacity);
            assert_ne!(ch, 0);
            assert_eq!(lookup("test", ch).unwrap().capacity(), 1);
            tether_channel_release(ch);
        }
    }

    #[test]
    fn test_invalid_handle_defaults() {
        for ch in [0, 1, u64::MAX] {
            tether_channel_send(ch, 5);
            tether_channel_close(ch);
            tether_channel_release(ch);
            assert_eq!(tether_channel_receive(ch), 0);
            assert_eq!(tether_channel_has_data(ch), 0);
            assert_eq!(tether_channel_is_closed(ch), 1);

            let mut out = 9;
            assert_eq!(unsafe { tether_channel_receive_tagged(ch, &mut out) }, 0);
            assert_eq!(out, 9);
        }
    }

    #[test]
    fn test_null_out_pointer() {
        let ch = tether_channel_new(1);
        tether_channel_send(ch, 3);

        assert_eq!(
            unsafe { tether_channel_receive_tagged(ch, std::ptr::null_mut()) },
            0
        );
        // The value was not consumed.
        assert_eq!(tether_channel_has_data(ch), 1);

        tether_channel_release(ch);
    }
}
