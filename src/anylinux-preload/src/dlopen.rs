//! Library load gate.
//!
//! Requests whose name matches `ANYLINUX_DO_NOT_LOAD_LIBS` fail exactly like
//! a missing library: null handle and a pending `dlerror()` message. Many
//! callers format `dlerror()` straight after a null return, so the gate
//! provokes a genuine loader failure before reporting the block.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr;

use anylinux_env::LibraryBlocklist;

use crate::launcher::LibraryLoader;

/// Name that no system provides; opening it sets the loader's error state.
pub const BLOCKED_SENTINEL: &CStr = c"/anylinux_blocked_lib_that_does_not_exist.so";

/// Open `name` through `loader` unless `blocklist` forbids it.
///
/// # Safety
/// `name` must be null or a NUL-terminated string.
pub unsafe fn gate<L: LibraryLoader>(
    loader: &L,
    blocklist: &LibraryBlocklist,
    name: *const c_char,
    flags: c_int,
) -> *mut c_void {
    if name.is_null() {
        tracing::debug!("dlopen pass-through: (NULL)");
        // SAFETY: a null name asks for the main program handle.
        return unsafe { loader.open(name, flags) };
    }

    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let requested = unsafe { CStr::from_ptr(name) };
    let requested_name = requested.to_string_lossy();

    if let Some(pattern) = blocklist.find_match(requested.to_bytes()) {
        tracing::debug!(
            "Blocked dlopen of '{}' (matched ANYLINUX_DO_NOT_LOAD_LIBS pattern '{}')",
            requested_name,
            pattern.as_str()
        );
        // SAFETY: the sentinel is a valid C string.
        let handle = unsafe { loader.open(BLOCKED_SENTINEL.as_ptr(), libc::RTLD_NOW) };
        if !handle.is_null() {
            tracing::warn!("Sentinel library unexpectedly loaded; releasing it");
            // SAFETY: `handle` was just returned by this loader.
            unsafe { loader.close(handle) };
        }
        return ptr::null_mut();
    }

    tracing::debug!("dlopen pass-through: {}", requested_name);
    // SAFETY: forwarded unchanged.
    unsafe { loader.open(name, flags) }
}

#[cfg(not(test))]
mod exports {
    use std::ffi::{c_char, c_int, c_void};
    use std::ptr;

    use anylinux_env::LibraryBlocklist;

    use super::gate;
    use crate::launcher::RealLibraryLoader;

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn dlopen(filename: *const c_char, flags: c_int) -> *mut c_void {
        crate::initialize();
        let loader = match RealLibraryLoader::dlopen() {
            Ok(loader) => loader,
            Err(e) => {
                tracing::debug!("Error getting original dlopen symbol: {}", e);
                return ptr::null_mut();
            }
        };
        // SAFETY: arguments come straight from the C caller.
        unsafe { gate(&loader, &LibraryBlocklist::from_env(), filename, flags) }
    }
}
