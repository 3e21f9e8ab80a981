//! Artifactory security operations outside the generic resource kinds
//!
//! LDAP configuration, LDAP group import and API key management.

use super::client::ArtifactoryClient;
use super::http::ApiError;
use crate::provision::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_yaml::{Mapping, Value as Yaml};

/// Message reported when every requested LDAP group already exists
pub const GROUPS_ALREADY_IMPORTED: &str = "Groups already imported";

// =============================================================================
// Groups
// =============================================================================

/// Group as listed by `api/security/groups`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    #[serde(default)]
    pub uri: String,
}

/// List every group known to Artifactory
pub async fn list_groups(client: &ArtifactoryClient) -> Result<Vec<GroupSummary>, ApiError> {
    let response = client.http.get(&client.api_url("security/groups")).await?;

    let groups = match response {
        Value::Array(_) => serde_json::from_value(response)?,
        _ => Vec::new(),
    };
    Ok(groups)
}

// =============================================================================
// LDAP
// =============================================================================

/// One LDAP setting with its group synchronisation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapSetting {
    pub name: String,
    pub url: String,
    pub search_filter: String,
    #[serde(default)]
    pub search_base: String,
    pub manager_dn: String,
    pub manager_password: String,
    pub email_attribute: String,
    pub group_name: String,
    pub group_search_base: String,
    pub group_name_attribute: String,
    pub group_member_attribute: String,
    pub group_filter: String,
    pub description_attribute: String,
}

impl LdapSetting {
    /// Configuration patch document for `api/system/configuration`
    pub fn to_configuration_patch(&self) -> Yaml {
        let search = mapping([
            ("searchFilter", self.search_filter.as_str().into()),
            ("searchBase", self.search_base.as_str().into()),
            ("searchSubTree", true.into()),
            ("managerDn", self.manager_dn.as_str().into()),
            ("managerPassword", self.manager_password.as_str().into()),
        ]);
        let ldap = mapping([
            ("key", self.name.as_str().into()),
            ("enableIntegration", true.into()),
            ("ldapUrl", self.url.as_str().into()),
            ("search", search),
            ("autoCreateUser", true.into()),
            ("emailAttribute", self.email_attribute.as_str().into()),
        ]);
        let group = mapping([
            ("name", self.group_name.as_str().into()),
            ("enabledLdap", self.name.as_str().into()),
            ("groupBaseDn", self.group_search_base.as_str().into()),
            ("groupNameAttribute", self.group_name_attribute.as_str().into()),
            ("groupMemberAttribute", self.group_member_attribute.as_str().into()),
            ("subTree", true.into()),
            ("filter", self.group_filter.as_str().into()),
            ("descriptionAttribute", self.description_attribute.as_str().into()),
            ("strategy", "STATIC".into()),
        ]);

        mapping([(
            "security",
            mapping([
                ("ldapSettings", mapping([(self.name.as_str(), ldap)])),
                ("ldapGroupSettings", mapping([(self.group_name.as_str(), group)])),
            ]),
        )])
    }
}

fn mapping<const N: usize>(entries: [(&str, Yaml); N]) -> Yaml {
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(Yaml::String(key.to_string()), value);
    }
    Yaml::Mapping(map)
}

/// Write an LDAP setting into the system configuration
///
/// The configuration is patched unconditionally, so the outcome is always
/// `changed`.
pub async fn configure_ldap(client: &ArtifactoryClient, setting: &LdapSetting) -> Result<Outcome, ApiError> {
    tracing::info!("Configuring LDAP setting {}", setting.name);
    let url = client.api_url("system/configuration");
    let response = client
        .http
        .patch_yaml(&url, &setting.to_configuration_patch())
        .await?;

    Ok(Outcome::changed(response_message(
        &response,
        format!("LDAP setting {} configured", setting.name),
    )))
}

/// Import an LDAP group list as Artifactory groups
///
/// Nothing is posted when every group already exists. Otherwise the whole
/// list is imported in one request.
pub async fn import_ldap_groups(
    client: &ArtifactoryClient,
    ldap_group_name: &str,
    groups: &[String],
) -> Result<Outcome, ApiError> {
    let existing = list_groups(client).await?;
    let missing = groups
        .iter()
        .filter(|g| !existing.iter().any(|e| &e.name == *g))
        .count();

    if missing == 0 {
        tracing::info!("All {} LDAP groups already present", groups.len());
        return Ok(Outcome::unchanged(GROUPS_ALREADY_IMPORTED));
    }

    tracing::info!(
        "Importing {} LDAP groups from {} ({} missing)",
        groups.len(),
        ldap_group_name,
        missing
    );
    let body = json!({
        "ldapGroupSettings": {"name": ldap_group_name},
        "importGroups": groups
            .iter()
            .map(|name| json!({"groupName": name}))
            .collect::<Vec<_>>(),
    });
    let url = client.site_url("ui/ldap/groups/import");
    let response = client.http.post(&url, Some(&body)).await?;

    Ok(Outcome::changed(response_message(
        &response,
        format!("Imported LDAP groups: {}", groups.join(", ")),
    )))
}

// =============================================================================
// API keys
// =============================================================================

/// API key of the authenticated user, if one exists
pub async fn get_api_key(client: &ArtifactoryClient) -> Result<Option<String>, ApiError> {
    let response = client.http.get(&client.api_url("security/apiKey")).await?;
    Ok(api_key_of(&response))
}

/// Create an API key for the authenticated user
///
/// Artifactory generates the key unless `api_key` supplies one.
pub async fn create_api_key(client: &ArtifactoryClient, api_key: Option<&str>) -> Result<Outcome, ApiError> {
    let body = match api_key.filter(|k| !k.is_empty()) {
        Some(key) => json!({"apiKey": key}),
        None => json!({}),
    };
    let response = client
        .http
        .post(&client.api_url("security/apiKey"), Some(&body))
        .await?;

    let key = api_key_of(&response)
        .or_else(|| api_key.map(str::to_string))
        .unwrap_or_default();
    Ok(Outcome::changed(key))
}

/// Revoke the authenticated user's API key, or `user`'s when given
pub async fn revoke_api_key(client: &ArtifactoryClient, user: Option<&str>) -> Result<Outcome, ApiError> {
    let user = user.filter(|u| !u.is_empty());
    let url = match user {
        Some(user) => client.api_url(&format!("security/apiKey/{}", urlencoding::encode(user))),
        None => client.api_url("security/apiKey"),
    };
    let response = client.http.delete(&url).await?;

    let fallback = match user {
        Some(user) => format!("API key of {} revoked", user),
        None => "API key revoked".to_string(),
    };
    Ok(Outcome::changed(response_message(&response, fallback)))
}

fn api_key_of(response: &Value) -> Option<String> {
    response
        .get("apiKey")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Server confirmation text when it sent one, else `fallback`
fn response_message(response: &Value, fallback: String) -> String {
    match response {
        Value::String(text) if !text.is_empty() => text.clone(),
        _ => {
            tracing::debug!("Response: {}", response);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting() -> LdapSetting {
        LdapSetting {
            name: "corp".to_string(),
            url: "ldap://ldap.example.com:389/DC=example,DC=com".to_string(),
            search_filter: "(&(objectClass=Person)(sAMAccountName={0}))".to_string(),
            manager_dn: "svc".to_string(),
            manager_password: "secret".to_string(),
            email_attribute: "mail".to_string(),
            group_name: "corp-groups".to_string(),
            group_search_base: "OU=Groups".to_string(),
            group_name_attribute: "cn".to_string(),
            group_member_attribute: "member".to_string(),
            group_filter: "(objectClass=group)".to_string(),
            description_attribute: "name".to_string(),
            ..LdapSetting::default()
        }
    }

    #[test]
    fn test_ldap_patch_layout() {
        let patch = setting().to_configuration_patch();
        let ldap = &patch["security"]["ldapSettings"]["corp"];
        assert_eq!(ldap["ldapUrl"].as_str(), Some("ldap://ldap.example.com:389/DC=example,DC=com"));
        assert_eq!(ldap["search"]["managerDn"].as_str(), Some("svc"));
        assert_eq!(ldap["search"]["searchBase"].as_str(), Some(""));

        let group = &patch["security"]["ldapGroupSettings"]["corp-groups"];
        assert_eq!(group["enabledLdap"].as_str(), Some("corp"));
        assert_eq!(group["groupBaseDn"].as_str(), Some("OU=Groups"));
    }

    #[test]
    fn test_api_key_of() {
        assert_eq!(api_key_of(&json!({"apiKey": "AKC"})), Some("AKC".to_string()));
        assert_eq!(api_key_of(&json!({})), None);
        assert_eq!(api_key_of(&json!({"apiKey": ""})), None);
    }

    #[test]
    fn test_response_message_prefers_server_text() {
        assert_eq!(response_message(&json!("OK"), "fallback".to_string()), "OK");
        assert_eq!(response_message(&Value::Null, "fallback".to_string()), "fallback");
    }
}
