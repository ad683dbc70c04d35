//! Typed identifiers for blocks, polls, and poll options.
//!
//! All ID types are opaque strings on the wire. Freshly minted IDs are UUIDv7
//! rendered as 32 hex characters (time-ordered, globally unique), but any
//! non-empty string loaded from storage is accepted so that documents written
//! by older editors keep their identity. The `short()` form is for logs only.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A block identifier. Stable for the lifetime of the block, never reused.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

/// A poll identifier, independent of the document that embeds the poll.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(String);

/// A poll option identifier, unique within one poll.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Mint a new time-ordered ID (UUIDv7, simple hex form).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7().as_simple().to_string())
            }

            /// Wrap an existing identifier string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters, for display only.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }

            /// Check if this is the empty ID.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(BlockId, "BlockId");
impl_typed_id!(PollId, "PollId");
impl_typed_id!(OptionId, "OptionId");
