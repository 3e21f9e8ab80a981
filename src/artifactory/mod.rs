//! Artifactory API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Basic and API-key credentials
//! - [`client`] - Main Artifactory client, implements the provisioning `RegistryApi`
//! - [`http`] - HTTP utilities for REST API calls
//! - [`security`] - LDAP configuration, group listing and API keys
//!
//! # Example
//!
//! ```ignore
//! use artprov::artifactory::{auth::Credentials, client::ArtifactoryClient, http::DEFAULT_TIMEOUT};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = Credentials::from_parts(Some("admin".into()), Some("password".into()), None);
//!     let client = ArtifactoryClient::new("http://localhost:8081", "artifactory", credentials, DEFAULT_TIMEOUT)?;
//!     let repo = client.http.get(&client.api_url("repositories/libs-local")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod security;
