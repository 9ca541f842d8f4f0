//! Instance and session identifiers.
//!
//! Both IDs are 8 lowercase hex characters. Neither may contain `-`:
//! multiplexer session names are `hjk-<instance>-<session>` and the parser
//! splits on the first `-` after the prefix, which is only unambiguous when
//! the instance ID itself is hyphen-free.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix for all multiplexer sessions owned by headjack.
pub const MUX_PREFIX: &str = "hjk-";

const HEX: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

const ID_LEN: usize = 8;

fn generate_hex_id() -> String {
    nanoid::nanoid!(ID_LEN, &HEX)
}

fn is_well_formed(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

macro_rules! hex_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random 8-hex-char ID.
            pub fn generate() -> Self {
                Self(generate_hex_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True if the ID is 8 lowercase hex characters.
            pub fn is_well_formed(&self) -> bool {
                is_well_formed(&self.0)
            }

            /// True if the ID can appear inside a mux session name.
            pub fn is_parseable(&self) -> bool {
                !self.0.is_empty() && !self.0.contains('-')
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

hex_id! {
    /// Unique identifier for an instance (a branch's worktree + container).
    pub struct InstanceId;
}

hex_id! {
    /// Identifier for a session, unique within its instance.
    pub struct SessionId;
}

/// Build the namespaced multiplexer session name for an (instance, session)
/// pair: `hjk-<instance>-<session>`.
pub fn mux_name(instance: &InstanceId, session: &SessionId) -> String {
    format!("{}{}-{}", MUX_PREFIX, instance, session)
}

/// Parse a multiplexer session name back into its (instance, session) pair.
///
/// Returns `None` for names that don't carry the `hjk-` prefix or don't have
/// both non-empty components. Splits on the first `-` after the prefix, so
/// session IDs containing `-` would be ambiguous; such IDs are refused at
/// catalog load instead of guessed at here.
pub fn parse_mux_name(name: &str) -> Option<(InstanceId, SessionId)> {
    let rest = name.strip_prefix(MUX_PREFIX)?;
    let (instance, session) = rest.split_once('-')?;
    if instance.is_empty() || session.is_empty() {
        return None;
    }
    Some((InstanceId::from(instance), SessionId::from(session)))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
