//! Lookup of the next definition of an interposed symbol.
//!
//! Each [`NextSymbol`] resolves through `dlsym(RTLD_NEXT, ..)` the first time
//! it is needed and keeps the pointer for the rest of the process. Failed
//! lookups are not cached: a library loaded later with `RTLD_GLOBAL` may
//! still provide the symbol.

use std::ffi::{CStr, c_void};
use std::sync::OnceLock;

/// Failure to find the real implementation of an interposed function.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("could not resolve next `{symbol}`: {reason}")]
    NotFound { symbol: &'static str, reason: String },
}

/// Lazily resolved pointer to the next definition of `name`.
///
/// `F` must be an `extern "C"` function pointer type matching the symbol.
pub struct NextSymbol<F> {
    name: &'static CStr,
    slot: OnceLock<F>,
}

impl<F: Copy> NextSymbol<F> {
    pub const fn new(name: &'static CStr) -> Self {
        Self {
            name,
            slot: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name.to_str().unwrap_or("?")
    }

    /// Return the resolved function, resolving it on first use.
    pub fn get(&self) -> Result<F, ResolveError> {
        const {
            assert!(std::mem::size_of::<F>() == std::mem::size_of::<*mut c_void>());
        }

        if let Some(f) = self.slot.get() {
            return Ok(*f);
        }

        let ptr = lookup_next(self.name).ok_or_else(|| ResolveError::NotFound {
            symbol: self.name(),
            reason: last_dl_error(),
        })?;

        // SAFETY: `F` is a function pointer of the same size as `ptr`, and the
        // declaration site pairs it with the symbol's C prototype.
        let f = unsafe { std::mem::transmute_copy::<*mut c_void, F>(&ptr) };

        // Two threads racing here store the same address; either one wins.
        Ok(*self.slot.get_or_init(|| f))
    }
}

fn lookup_next(name: &CStr) -> Option<*mut c_void> {
    // SAFETY: `name` is NUL-terminated; RTLD_NEXT is a valid pseudo-handle.
    let ptr = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) };
    if ptr.is_null() { None } else { Some(ptr) }
}

/// Text of the calling thread's pending `dlerror()`, if any.
pub(crate) fn last_dl_error() -> String {
    // SAFETY: dlerror returns null or a thread-local NUL-terminated string
    // that stays valid until the next dl* call on this thread.
    unsafe {
        let msg = libc::dlerror();
        if msg.is_null() {
            "symbol not found".to_string()
        } else {
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }
}
