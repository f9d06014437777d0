//! Newtype IDs for catalog entities and the id generator.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a BannerId where a ProductId is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Check whether the ID is blank.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(BannerId);
define_id!(DealId);

/// Timestamp-derived id source owned by one catalog instance.
///
/// Ids are milliseconds since the Unix epoch rendered in decimal. Every id
/// handed out is strictly greater than the previous one, so two creates in
/// the same millisecond still get distinct ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    /// Create a generator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next id.
    pub fn next_id(&self) -> String {
        self.next_after(now_millis()).to_string()
    }

    /// Produce the next id that is not rejected by `taken`.
    ///
    /// Used to step past ids written by other tabs into the same collection.
    pub fn next_unused(&self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let candidate = self.next_id();
            if !taken(&candidate) {
                return candidate;
            }
        }
    }

    fn next_after(&self, now: u64) -> u64 {
        let mut current = self.last.load(Ordering::SeqCst);
        loop {
            let next = if now > current { now } else { current + 1 };
            match self
                .last
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
