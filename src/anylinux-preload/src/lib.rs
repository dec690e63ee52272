//! `LD_PRELOAD` interposer for portable application bundles.
//!
//! Loaded into a bundled program, `libanylinux.so` wraps the `exec*` family,
//! `dlopen` and `bindtextdomain` so that:
//! - programs outside the bundle start with bundle search paths stripped
//!   from their environment, and with the user's real home and XDG
//!   directories restored
//! - libraries named in `ANYLINUX_DO_NOT_LOAD_LIBS` fail to load the same
//!   way a missing library does
//! - gettext catalogs resolve to the bundled locale directory
//!
//! The environment policy itself lives in [`anylinux_env`].

#![cfg(target_os = "linux")]

mod errno;

pub mod argv0;
pub mod dlopen;
pub mod exec;
pub mod launcher;
pub mod logging;
pub mod resolver;
pub mod textdomain;

#[cfg(test)]
mod test_support;

use std::sync::Once;

use anylinux_env::ProcessEnv;

pub use exec::{ExecEnv, exec_common, intercept};
pub use launcher::{LibraryLoader, ProcessLauncher, RealLibraryLoader, RealProcessLauncher};
pub use resolver::{NextSymbol, ResolveError};

static INIT: Once = Once::new();

/// Process-wide setup: logging and the captured `TEXTDOMAINDIR`.
///
/// Runs once at load time and is called again at the top of every
/// interposed function, since a host may reach one before the library's
/// constructors have run. Repeated calls are no-ops.
pub fn initialize() {
    INIT.call_once(|| {
        logging::init();
        textdomain::capture_override(&ProcessEnv);
        tracing::debug!("library loaded (pid {})", std::process::id());
    });
}

#[cfg(not(test))]
#[ctor::ctor]
fn load_time_init() {
    initialize();
}
