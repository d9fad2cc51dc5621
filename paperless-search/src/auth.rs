//! Credentials for the Paperless REST api
//!
//! Paperless accepts either HTTP basic auth (username/password) or a
//! token header `Authorization: Token <key>`. A token takes precedence
//! when both are configured.

use std::fmt;

use reqwest::{RequestBuilder, header::AUTHORIZATION};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

/// A string that is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(fmt_masked(!self.is_empty()))
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// secrets round-trip through the host's config store as plain strings
impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

fn fmt_masked(present: bool) -> &'static str {
    if present { "Some(MASKED)" } else { "None" }
}

/// Authentication attached to every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication header is sent.
    #[default]
    None,
    /// HTTP basic auth
    Basic { username: String, password: Secret },
    /// `Authorization: Token <key>`
    Token(Secret),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Credentials::None"),
            Self::Basic { username, password } => f
                .debug_struct("Credentials::Basic")
                .field("username", username)
                .field("password", password)
                .finish(),
            Self::Token(token) => f
                .debug_tuple("Credentials::Token")
                .field(token)
                .finish(),
        }
    }
}

impl Credentials {
    /// Picks the credential kind from raw settings values.
    /// A non-empty token wins; otherwise a non-empty username selects basic auth.
    pub fn from_parts(token: &Secret, username: &str, password: &Secret) -> Self {
        if !token.is_empty() {
            Self::Token(token.clone())
        } else if !username.is_empty() {
            Self::Basic {
                username: username.to_string(),
                password: password.clone(),
            }
        } else {
            Self::None
        }
    }

    pub fn has_creds(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => builder,
            Self::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose()))
            }
            Self::Token(token) => builder.header(AUTHORIZATION, format!("Token {}", token.expose())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_wins_over_basic() {
        let creds = Credentials::from_parts(&"abc".into(), "alice", &"pw".into());
        assert_eq!(creds, Credentials::Token("abc".into()));
    }

    #[test]
    fn test_basic_when_no_token() {
        let creds = Credentials::from_parts(&Secret::default(), "alice", &"pw".into());
        assert!(matches!(creds, Credentials::Basic { ref username, .. } if username == "alice"));
        assert!(creds.has_creds());
    }

    #[test]
    fn test_none_when_empty() {
        let creds = Credentials::from_parts(&Secret::default(), "", &"pw".into());
        assert_eq!(creds, Credentials::None);
        assert!(!creds.has_creds());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = Credentials::from_parts(&Secret::default(), "alice", &"hunter2".into());
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("alice"));
        assert!(dbg.contains("MASKED"));
        assert!(!dbg.contains("hunter2"));

        let token = format!("{:?}", Credentials::Token("s3cret".into()));
        assert!(!token.contains("s3cret"));
    }

    #[test]
    fn test_token_header() {
        let client = reqwest::Client::new();
        let req = Credentials::Token("k3y".into())
            .apply(client.get("http://localhost/api/"))
            .build()
            .expect("build request");
        assert_eq!(
            req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Token k3y")
        );
    }
}
