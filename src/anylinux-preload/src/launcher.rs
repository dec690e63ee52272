//! Capabilities standing in for the real libc entry points.
//!
//! The interposers never call a resolved pointer directly; they obtain a
//! [`RealProcessLauncher`] or [`RealLibraryLoader`] first, and resolution
//! failure is an explicit error the caller must handle.

use std::ffi::{c_char, c_int, c_void};

use crate::resolver::{NextSymbol, ResolveError};

/// Prototype shared by `execve(2)` and `execvpe(3)`.
pub type ExecFn =
    unsafe extern "C" fn(*const c_char, *const *const c_char, *const *const c_char) -> c_int;

/// Prototype of `dlopen(3)`.
pub type DlopenFn = unsafe extern "C" fn(*const c_char, c_int) -> *mut c_void;

static NEXT_EXECVE: NextSymbol<ExecFn> = NextSymbol::new(c"execve");
static NEXT_EXECVPE: NextSymbol<ExecFn> = NextSymbol::new(c"execvpe");
static NEXT_DLOPEN: NextSymbol<DlopenFn> = NextSymbol::new(c"dlopen");

/// Something that replaces the current process image.
pub trait ProcessLauncher {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Perform the call. Returns `-1` with `errno` set on failure, like the
    /// underlying libc function.
    ///
    /// # Safety
    /// `file` must be null or NUL-terminated; `argv` and `envp` must be null
    /// or null-terminated arrays of NUL-terminated strings.
    unsafe fn launch(
        &self,
        file: *const c_char,
        argv: *const *const c_char,
        envp: *const *const c_char,
    ) -> c_int;
}

/// Something that opens shared objects.
pub trait LibraryLoader {
    /// Open `name` (null for the main program) with `flags`.
    ///
    /// # Safety
    /// `name` must be null or a NUL-terminated string.
    unsafe fn open(&self, name: *const c_char, flags: c_int) -> *mut c_void;

    /// Release a handle returned by [`open`](Self::open).
    ///
    /// # Safety
    /// `handle` must come from a successful `open` on this loader.
    unsafe fn close(&self, handle: *mut c_void) -> c_int;
}

/// The next `execve` or `execvpe` in symbol search order.
#[derive(Clone, Copy)]
pub struct RealProcessLauncher {
    name: &'static str,
    func: ExecFn,
}

impl RealProcessLauncher {
    pub fn execve() -> Result<Self, ResolveError> {
        Self::resolve(&NEXT_EXECVE)
    }

    pub fn execvpe() -> Result<Self, ResolveError> {
        Self::resolve(&NEXT_EXECVPE)
    }

    fn resolve(symbol: &'static NextSymbol<ExecFn>) -> Result<Self, ResolveError> {
        Ok(Self {
            name: symbol.name(),
            func: symbol.get()?,
        })
    }
}

impl ProcessLauncher for RealProcessLauncher {
    fn name(&self) -> &'static str {
        self.name
    }

    unsafe fn launch(
        &self,
        file: *const c_char,
        argv: *const *const c_char,
        envp: *const *const c_char,
    ) -> c_int {
        // SAFETY: forwarded from the caller's contract.
        unsafe { (self.func)(file, argv, envp) }
    }
}

/// The next `dlopen` in symbol search order.
#[derive(Clone, Copy)]
pub struct RealLibraryLoader {
    func: DlopenFn,
}

impl RealLibraryLoader {
    pub fn dlopen() -> Result<Self, ResolveError> {
        Ok(Self {
            func: NEXT_DLOPEN.get()?,
        })
    }
}

impl LibraryLoader for RealLibraryLoader {
    unsafe fn open(&self, name: *const c_char, flags: c_int) -> *mut c_void {
        // SAFETY: forwarded from the caller's contract.
        unsafe { (self.func)(name, flags) }
    }

    unsafe fn close(&self, handle: *mut c_void) -> c_int {
        // SAFETY: forwarded from the caller's contract; dlclose is not interposed.
        unsafe { libc::dlclose(handle) }
    }
}
