//! Glob denylist for `dlopen` requests.
//!
//! `ANYLINUX_DO_NOT_LOAD_LIBS` holds colon-separated shell patterns. A request
//! is blocked when any pattern matches either the basename or the full name
//! that was passed to the loader. Matching is `fnmatch(3)` with no flags:
//! `*` crosses `/`, leading dots are not special, `[^..]` and `[!..]` both
//! negate, and a backslash escapes the next character.

use std::ffi::{CStr, CString};

use crate::bundle::basename;
use crate::config::{EnvStore, ProcessEnv, Settings};

/// One token of the blocklist.
#[derive(Debug, Clone)]
pub struct BlockPattern {
    source: String,
    compiled: CString,
}

impl BlockPattern {
    /// Returns `None` for a token that cannot be passed to C (interior NUL).
    pub fn new(token: &str) -> Option<Self> {
        match CString::new(token) {
            Ok(compiled) => Some(Self {
                source: token.to_string(),
                compiled,
            }),
            Err(_) => {
                tracing::debug!("Skipping blocklist pattern with a NUL byte");
                None
            }
        }
    }

    /// The pattern as written in the blocklist.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &CStr) -> bool {
        // SAFETY: both arguments are valid NUL-terminated strings.
        unsafe { libc::fnmatch(self.compiled.as_ptr(), candidate.as_ptr(), 0) == 0 }
    }
}

/// Parsed `ANYLINUX_DO_NOT_LOAD_LIBS`.
#[derive(Debug, Clone, Default)]
pub struct LibraryBlocklist {
    patterns: Vec<BlockPattern>,
}

impl LibraryBlocklist {
    /// Parse a colon-separated list, skipping empty tokens.
    pub fn parse(spec: &str) -> Self {
        let patterns = spec
            .split(':')
            .filter(|token| !token.is_empty())
            .filter_map(BlockPattern::new)
            .collect();
        Self { patterns }
    }

    /// Parse the list currently configured in `store`.
    pub fn load(store: &impl EnvStore) -> Self {
        Settings::load(store)
            .blocked_libraries
            .map(|spec| Self::parse(&spec))
            .unwrap_or_default()
    }

    /// Parse the list currently configured in the process environment.
    pub fn from_env() -> Self {
        Self::load(&ProcessEnv)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[BlockPattern] {
        &self.patterns
    }

    /// Returns the first pattern matching `name` or its basename.
    pub fn find_match(&self, name: &[u8]) -> Option<&BlockPattern> {
        if self.patterns.is_empty() {
            return None;
        }
        // Names handed over by the loader never hold a NUL.
        let full = CString::new(name).ok()?;
        let base = CString::new(basename(name)).ok()?;

        self.patterns
            .iter()
            .find(|p| p.matches(&base) || p.matches(&full))
    }

    pub fn is_blocked(&self, name: &[u8]) -> bool {
        self.find_match(name).is_some()
    }
}
