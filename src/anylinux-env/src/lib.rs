//! Environment and library-load policy for portable application bundles.
//!
//! This crate holds the host-independent half of the `anylinux` interposer:
//! - classifying launch targets as inside or outside the bundle
//! - stripping bundle-only search paths from an external child's environment
//! - restoring the user's real home and XDG directories
//! - matching `dlopen` requests against a glob denylist
//!
//! The C ABI entry points live in the `anylinux-preload` crate.

pub mod blocklist;
pub mod bundle;
pub mod config;
pub mod denylist;
pub mod error;
pub mod restore;
pub mod sanitize;


pub use blocklist::{BlockPattern, LibraryBlocklist};
pub use bundle::{
    BundleRoot, Classification, FORCED_EXTERNAL_PROGRAMS, LaunchPolicy, basename, classify,
    forced_external, launch_policy,
};
pub use config::{
    APPDIR_VAR, DEBUG_VAR, DO_NOT_LOAD_LIBS_VAR, EnvStore, MemoryEnv, OVERRIDE_ARGV0_VAR,
    ProcessEnv, Settings, TEXTDOMAINDIR_VAR, debug_enabled,
};
pub use denylist::{LEAKY_ENV_VARS, is_leaky_env_var};
pub use error::{EnvError, EnvResult};
pub use restore::{RestoreReport, SHADOW_DIR_VARS, restore_dirs};
pub use sanitize::{EnvEntry, leaks_bundle_path, sanitize, split_entry};
