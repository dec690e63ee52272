//! Bundle root handling and launch-target classification.
//!
//! A launch target is *internal* when its path lies under the bundle root and
//! *external* otherwise. External targets get a sanitized environment so that
//! search paths pointing into the bundle do not leak into host programs.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

/// Programs that always get a sanitized environment, even when shipped inside
/// the bundle, because they hand off to host applications.
pub const FORCED_EXTERNAL_PROGRAMS: &[&str] = &["xdg-open", "gio-launch-desktop"];

/// Absolute path of the portable bundle's mount or install directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleRoot(Vec<u8>);

impl BundleRoot {
    /// Wrap a raw `APPDIR` value. Returns `None` for an empty value.
    pub fn new(value: impl Into<OsString>) -> Option<Self> {
        let bytes = value.into().into_vec();
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether `haystack` contains this root anywhere.
    pub fn is_contained_in(&self, haystack: &[u8]) -> bool {
        haystack.windows(self.0.len()).any(|w| w == self.0.as_slice())
    }
}

/// Where a launch target lives relative to the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Internal,
    External,
}

/// Environment policy chosen for a single launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPolicy {
    /// Pass the caller's environment through untouched.
    Inherit,
    /// The target is outside the bundle.
    SanitizeExternal,
    /// The target is inside the bundle but is a known hand-off helper.
    SanitizeForced(&'static str),
}

impl LaunchPolicy {
    pub fn sanitizes(&self) -> bool {
        !matches!(self, LaunchPolicy::Inherit)
    }
}

/// Classify `target` against `root`.
///
/// With no root everything is internal. Otherwise the target is internal when
/// the two byte strings agree over the length of the shorter one, so a
/// parent of the root (or an empty path) also counts as internal.
pub fn classify(root: Option<&BundleRoot>, target: &[u8]) -> Classification {
    let Some(root) = root else {
        tracing::debug!(
            "APPDIR not set; treating {} as internal process",
            String::from_utf8_lossy(target)
        );
        return Classification::Internal;
    };

    let len = target.len().min(root.0.len());
    let classification = if target[..len] == root.0[..len] {
        Classification::Internal
    } else {
        Classification::External
    };

    tracing::debug!(
        "Process '{}' is {} (APPDIR={})",
        String::from_utf8_lossy(target),
        match classification {
            Classification::Internal => "INTERNAL",
            Classification::External => "EXTERNAL",
        },
        String::from_utf8_lossy(&root.0)
    );
    classification
}

/// Final path component of `path`, or the whole input if it has no `/`.
pub fn basename(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| b == b'/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Returns the forced-external program name that `filename` refers to, if any.
pub fn forced_external(filename: &[u8]) -> Option<&'static str> {
    let base = basename(filename);
    FORCED_EXTERNAL_PROGRAMS
        .iter()
        .copied()
        .find(|name| name.as_bytes() == base)
}

/// Decide the environment policy for one launch.
///
/// `resolved` is the canonical target path when available, else the raw one;
/// `filename` is the path exactly as the caller passed it, which is what the
/// forced-external check looks at.
pub fn launch_policy(root: Option<&BundleRoot>, resolved: &[u8], filename: &[u8]) -> LaunchPolicy {
    if classify(root, resolved) == Classification::External {
        return LaunchPolicy::SanitizeExternal;
    }
    // Without a root the sanitizer is a no-op anyway.
    if root.is_none() {
        return LaunchPolicy::Inherit;
    }
    match forced_external(filename) {
        Some(name) => LaunchPolicy::SanitizeForced(name),
        None => LaunchPolicy::Inherit,
    }
}
