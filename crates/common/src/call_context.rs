//! Per-call metadata.
//!
//! A [`CallContext`] is the ordered set of ASCII key/value pairs that arrived
//! with a single call. Keys are stored lowercased, matching how HTTP/2 and gRPC
//! transmit them, and a repeated key keeps its last value. Binary (`-bin`)
//! entries are not carried.
//!
//! The context is owned by exactly one call. It is built when the call arrives,
//! borrowed by the interceptor and handler, and dropped when the call ends.

use crate::credential::{Credential, AUTHORIZATION_METADATA_KEY};
use crate::propagation::PropagationError;
use indexmap::IndexMap;
use std::fmt;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, KeyAndValueRef, MetadataMap};

/// Ordered, case-insensitive metadata for one call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    entries: IndexMap<String, String>,
}

impl CallContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. The key is lowercased.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Value for `key`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Remove and return the value for `key`.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(&key.to_ascii_lowercase())
    }

    /// The credential carried under `authorization`, if present.
    #[must_use]
    pub fn authorization(&self) -> Option<Credential> {
        self.get(AUTHORIZATION_METADATA_KEY).map(Credential::new)
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capture the ASCII headers of an inbound HTTP/2 request.
    ///
    /// Header values that are not visible ASCII are skipped.
    #[must_use]
    pub fn from_headers(headers: &http::HeaderMap) -> Self {
        let mut ctx = Self::new();
        for (name, value) in headers {
            if name.as_str().ends_with("-bin") {
                continue;
            }
            if let Ok(value) = value.to_str() {
                ctx.insert(name.as_str(), value);
            }
        }
        ctx
    }

    /// Capture the ASCII entries of a tonic metadata map.
    #[must_use]
    pub fn from_metadata(metadata: &MetadataMap) -> Self {
        let mut ctx = Self::new();
        for entry in metadata.iter() {
            if let KeyAndValueRef::Ascii(key, value) = entry {
                if let Ok(value) = value.to_str() {
                    ctx.insert(key.as_str(), value);
                }
            }
        }
        ctx
    }

    /// Write every entry into outbound metadata, replacing existing keys.
    ///
    /// # Errors
    ///
    /// Returns `PropagationError::InvalidMetadata` if a key or value cannot be
    /// represented as ASCII gRPC metadata.
    pub fn apply_to(&self, metadata: &mut MetadataMap) -> Result<(), PropagationError> {
        for (key, value) in &self.entries {
            let key = AsciiMetadataKey::from_bytes(key.as_bytes())
                .map_err(|_| PropagationError::InvalidMetadata(key.clone()))?;
            if !is_visible_ascii(value) {
                return Err(PropagationError::InvalidMetadata(key.to_string()));
            }
            let value = AsciiMetadataValue::try_from(value.as_str())
                .map_err(|_| PropagationError::InvalidMetadata(key.to_string()))?;
            metadata.insert(key, value);
        }
        Ok(())
    }
}

/// True when `value` is visible ASCII or space, the only bytes a receiver
/// reads back through `to_str()`.
pub(crate) fn is_visible_ascii(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_graphic() || b == b' ')
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            if key == AUTHORIZATION_METADATA_KEY {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}
