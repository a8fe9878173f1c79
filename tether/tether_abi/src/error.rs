//! Side-channel error reporting for compiled code.
//!
//! A callee signals failure by writing a non-zero code; the caller checks
//! after the call returns. Codes are per thread.

use std::os::raw::c_int;
use tether_concurrency::error_slot;

/// Overwrite the calling thread's error code.
#[no_mangle]
pub extern "C" fn tether_set_error(code: i64) {
    error_slot::set_error(code);
}

/// Return the calling thread's error code and reset it to 0.
#[no_mangle]
pub extern "C" fn tether_get_error() -> i64 {
    error_slot::get_error()
}

/// Returns 1 if the calling thread's error code is non-zero. Does not clear it.
#[no_mangle]
pub extern "C" fn tether_has_error() -> c_int {
    c_int::from(error_slot::has_error())
}

/// Reset the calling thread's error code to 0.
#[no_mangle]
pub extern "C" fn tether_clear_error() {
    error_slot::clear_error();
}
