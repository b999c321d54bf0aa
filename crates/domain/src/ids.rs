use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a generated id, matching the host's own document ids.
const GENERATED_ID_LENGTH: usize = 16;

macro_rules! define_id {
    ($name:ident) => {
        /// Opaque document id assigned by the host (e.g. "dQw4w9WgXcQ12345").
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// A fresh random id, for documents built outside the host.
            pub fn new() -> Self {
                let mut id = Uuid::new_v4().simple().to_string();
                id.truncate(GENERATED_ID_LENGTH);
                Self(id)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Documents the host owns
define_id!(ActorId);
define_id!(ItemId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_ids_round_trip_as_plain_strings() {
        let id: ItemId = serde_json::from_str("\"dQw4w9WgXcQ12345\"").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ12345");
        assert_eq!(id.to_string(), "dQw4w9WgXcQ12345");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"dQw4w9WgXcQ12345\"");
    }

    #[test]
    fn test_generated_ids_look_like_host_ids() {
        let first = ActorId::new();
        let second = ActorId::new();
        assert_eq!(first.as_str().len(), GENERATED_ID_LENGTH);
        assert!(first.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
