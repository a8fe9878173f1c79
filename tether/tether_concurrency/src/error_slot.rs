//! Per-thread side-channel error state.
//!
//! Compiled code signals soft failures without changing a function's
//! return type: the callee writes a non-zero code into its thread's error
//! slot, and the call site checks the slot after the call. Zero means "no
//! error".
//!
//! Each thread's slot is an explicit [`ErrorSlot`] looked up by thread
//! identity in a process-wide table. A slot only ever holds the state of the
//! thread that claimed it, and a thread never observes another thread's
//! code.
//!
//! ```
//! use tether_concurrency::error_slot::{get_error, has_error, set_error};
//!
//! set_error(404);
//! assert!(has_error());
//! assert_eq!(get_error(), 404);
//! assert_eq!(get_error(), 0);
//! ```

use once_cell::sync::Lazy;
use std::cell::Cell;
use std::fmt;
use std::num::NonZeroI64;
use std::thread::{self, ThreadId};
use thread_local::ThreadLocal;

/// The "no error" sentinel
pub const NO_ERROR: i64 = 0;

/// Slots for every thread that has touched its error state
static ERROR_SLOTS: Lazy<ThreadLocal<ErrorSlot>> = Lazy::new(ThreadLocal::new);

/// One thread's error state.
///
/// Obtained with [`ErrorSlot::current`]. The slot is not `Sync`, so a
/// reference to it cannot leave the thread that owns it.
pub struct ErrorSlot {
    owner: Cell<Option<ThreadId>>,
    code: Cell<i64>,
}

impl ErrorSlot {
    fn vacant() -> Self {
        Self {
            owner: Cell::new(None),
            code: Cell::new(NO_ERROR),
        }
    }

    /// The calling thread's slot.
    pub fn current() -> &'static ErrorSlot {
        let slot = ERROR_SLOTS.get_or(ErrorSlot::vacant);
        slot.claim();
        slot
    }

    /// Take ownership for the calling thread.
    ///
    /// Table entries outlive their threads and are handed to new threads, so
    /// a slot last owned by someone else starts over at zero.
    fn claim(&self) {
        let me = thread::current().id();
        if self.owner.get() != Some(me) {
            self.owner.set(Some(me));
            self.code.set(NO_ERROR);
        }
    }

    /// Overwrite the current code
    pub fn set(&self, code: i64) {
        self.code.set(code);
    }

    /// Return the current code and reset it to zero
    pub fn take(&self) -> i64 {
        self.code.replace(NO_ERROR)
    }

    /// Return the current code, if any, and reset it to zero
    pub fn take_code(&self) -> Option<NonZeroI64> {
        NonZeroI64::new(self.take())
    }

    /// Return the current code without clearing it
    pub fn peek(&self) -> i64 {
        self.code.get()
    }

    /// Whether a non-zero code is present, without clearing it
    pub fn is_set(&self) -> bool {
        self.peek() != NO_ERROR
    }

    /// Reset the code to zero
    pub fn clear(&self) {
        self.code.set(NO_ERROR);
    }
}

impl fmt::Debug for ErrorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSlot")
            .field("owner", &self.owner.get())
            .field("code", &self.code.get())
            .finish()
    }
}

/// Overwrite the calling thread's error code.
pub fn set_error(code: i64) {
    ErrorSlot::current().set(code);
}

/// Return the calling thread's error code and reset it to zero.
pub fn get_error() -> i64 {
    ErrorSlot::current().take()
}

/// Whether the calling thread has a non-zero error code.
pub fn has_error() -> bool {
    ErrorSlot::current().is_set()
}

/// Reset the calling thread's error code to zero.
pub fn clear_error() {
    ErrorSlot::current().clear();
}
