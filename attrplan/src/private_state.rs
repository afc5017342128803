//! Provider private state: opaque bytes that a provider remembers between
//! plan and apply, keyed by provider-chosen names.
//!
//! On the wire the whole store is a single blob: a JSON object from key to
//! the base64 encoding of the stored bytes. Keys starting with `.` belong to
//! the framework. They survive a round trip through [`PrivateState`] but
//! cannot be read or written through the provider-facing methods.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use base64::engine::{general_purpose::STANDARD, Engine};

use crate::diag::{Diagnostic, Diagnostics};

pub const FRAMEWORK_KEY_PREFIX: char = '.';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateState {
    provider: BTreeMap<String, Vec<u8>>,
    framework: BTreeMap<String, Vec<u8>>,
}

/// Check that `key` may be used by a provider
pub fn validate_key(key: &str) -> Option<Diagnostic> {
    if key.is_empty() {
        return Some(Diagnostic::error(
            "Restricted Resource Private State Namespace",
            "Using an empty key for private state is not allowed.",
        ));
    }
    if key.starts_with(FRAMEWORK_KEY_PREFIX) {
        return Some(Diagnostic::error(
            "Restricted Resource Private State Namespace",
            format!(
                "Using a period ('{}') as a prefix for a key used in private state is not allowed.\n\n\
                 The key {:?} is invalid. Please check the key you are supplying does not use a \
                 period ('{}') as a prefix.",
                FRAMEWORK_KEY_PREFIX, key, FRAMEWORK_KEY_PREFIX
            ),
        ));
    }
    None
}

impl PrivateState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// No provider keys and no framework keys
    pub fn is_empty(&self) -> bool {
        self.provider.is_empty() && self.framework.is_empty()
    }

    /// The bytes stored under `key`. An absent key is `None`; a key set to
    /// empty bytes is `Some(&[])`.
    pub fn get_key(&self, key: &str) -> Option<&[u8]> {
        self.provider.get(key).map(|v| v.as_slice())
    }

    /// Store `value` under `key`. Invalid keys are reported as error
    /// diagnostics and leave the store unchanged.
    pub fn set_key(&mut self, key: &str, value: impl Into<Vec<u8>>) -> Diagnostics {
        if let Some(d) = validate_key(key) {
            return d.into();
        }
        self.provider.insert(key.to_string(), value.into());
        Diagnostics::new()
    }

    pub fn remove_key(&mut self, key: &str) -> Option<Vec<u8>> {
        self.provider.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.provider.keys().map(|k| k.as_str())
    }

    /// Encode the store as a wire blob. The empty store encodes as no bytes at all.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let encoded: BTreeMap<&str, String> = self
            .framework
            .iter()
            .chain(self.provider.iter())
            .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
            .collect();
        serde_json::to_vec(&encoded).context("could not serialize private state")
    }

    /// Decode a wire blob. No bytes decode to the empty store.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self::empty());
        }
        let encoded: BTreeMap<String, String> =
            serde_json::from_slice(bytes).context("private state is not a JSON object of strings")?;
        let mut r = Self::empty();
        for (k, v) in encoded {
            if k.is_empty() {
                bail!("private state contains an empty key");
            }
            let v = STANDARD
                .decode(v.as_bytes())
                .with_context(|| format!("private state value for key {:?} is not base64", k))?;
            if k.starts_with(FRAMEWORK_KEY_PREFIX) {
                r.framework.insert(k, v);
            } else {
                r.provider.insert(k, v);
            }
        }
        Ok(r)
    }
}
