//! Artifactory Authentication
//!
//! Requests authenticate with HTTP basic auth or an API key header.
//! Credentials never appear in `Debug` output or logs.

use reqwest::RequestBuilder;
use std::fmt;

/// Header carrying an Artifactory API key
pub const API_KEY_HEADER: &str = "X-JFrog-Art-Api";

/// Credentials attached to every request
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Anonymous,
    Basic {
        username: String,
        password: Option<String>,
    },
    ApiKey(String),
}

impl Credentials {
    /// Pick credentials from the resolved settings; an API key wins over a password
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            return Self::ApiKey(key);
        }
        match username.filter(|u| !u.is_empty()) {
            Some(username) => Self::Basic { username, password },
            None => Self::Anonymous,
        }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Anonymous => request,
            Self::Basic { username, password } => request.basic_auth(username, password.as_deref()),
            Self::ApiKey(key) => request.header(API_KEY_HEADER, key),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_takes_precedence() {
        let creds = Credentials::from_parts(
            Some("admin".to_string()),
            Some("password".to_string()),
            Some("AKCp5".to_string()),
        );
        assert_eq!(creds, Credentials::ApiKey("AKCp5".to_string()));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let creds = Credentials::from_parts(Some(String::new()), None, Some(String::new()));
        assert_eq!(creds, Credentials::Anonymous);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = Credentials::from_parts(Some("admin".to_string()), Some("hunter2".to_string()), None);
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(format!("{:?}", Credentials::ApiKey("secret".to_string())), "ApiKey(***)");
    }
}
