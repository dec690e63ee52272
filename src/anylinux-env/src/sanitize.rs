//! Child environment sanitization.
//!
//! Removes denylisted variables whose value still points into the bundle.
//! A variable the user set to something unrelated to the bundle is kept, so
//! the check is containment of the bundle root anywhere in the value rather
//! than equality.

use std::borrow::Cow;
use std::ffi::{CStr, CString};

use crate::bundle::BundleRoot;
use crate::denylist::is_leaky_env_var;
use crate::error::EnvResult;

/// One `NAME=VALUE` entry of an environment block.
pub trait EnvEntry {
    fn entry_bytes(&self) -> &[u8];
}

impl EnvEntry for &CStr {
    fn entry_bytes(&self) -> &[u8] {
        self.to_bytes()
    }
}

impl EnvEntry for CString {
    fn entry_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl EnvEntry for &str {
    fn entry_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl EnvEntry for String {
    fn entry_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl EnvEntry for &[u8] {
    fn entry_bytes(&self) -> &[u8] {
        self
    }
}

impl EnvEntry for Vec<u8> {
    fn entry_bytes(&self) -> &[u8] {
        self
    }
}

/// Split an entry at its first `=`. Entries without one have no value.
pub fn split_entry(entry: &[u8]) -> (&[u8], Option<&[u8]>) {
    match entry.iter().position(|&b| b == b'=') {
        Some(idx) => (&entry[..idx], Some(&entry[idx + 1..])),
        None => (entry, None),
    }
}

/// Whether `entry` must be withheld from an external child.
pub fn leaks_bundle_path(entry: &[u8], root: &BundleRoot) -> bool {
    match split_entry(entry) {
        (name, Some(value)) => is_leaky_env_var(name) && root.is_contained_in(value),
        (_, None) => false,
    }
}

/// Build the environment for an external child.
///
/// Without a bundle root the input is returned borrowed, never copied.
/// Otherwise a new sequence is returned holding every entry except the
/// leaking ones, in their original order.
///
/// # Errors
/// [`EnvError::Alloc`](crate::EnvError::Alloc) if the copy cannot be
/// allocated; the caller decides whether to fall back to the original.
pub fn sanitize<'a, E>(env: &'a [E], root: Option<&BundleRoot>) -> EnvResult<Cow<'a, [E]>>
where
    E: EnvEntry + Clone,
{
    let Some(root) = root else {
        tracing::debug!("APPDIR is NOT set!");
        return Ok(Cow::Borrowed(env));
    };
    tracing::debug!("APPDIR is set: {}", String::from_utf8_lossy(root.as_bytes()));

    let mut kept = Vec::new();
    kept.try_reserve_exact(env.len())?;

    for entry in env {
        let bytes = entry.entry_bytes();
        if leaks_bundle_path(bytes, root) {
            let (name, value) = split_entry(bytes);
            tracing::debug!(
                "Unset {} (value: {})",
                String::from_utf8_lossy(name),
                String::from_utf8_lossy(value.unwrap_or_default())
            );
            continue;
        }
        kept.push(entry.clone());
    }

    tracing::debug!(
        "Child environment has {} variables (Parent {})",
        kept.len(),
        env.len()
    );
    Ok(Cow::Owned(kept))
}
