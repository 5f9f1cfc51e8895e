//! Directory API wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A Workspace user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub primary_email: String,
    #[serde(default)]
    pub name: UserName,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub org_unit_path: Option<String>,
    #[serde(default)]
    pub last_login_time: Option<String>,
    #[serde(default)]
    pub creation_time: Option<String>,
}

/// One page of users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUserPage {
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Listing parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    pub page_token: Option<String>,
    pub max_results: Option<u32>,
    /// Directory search syntax, e.g. `email:jane*`.
    pub query: Option<String>,
}

/// Body for creating a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDirectoryUser {
    pub primary_email: String,
    pub name: UserName,
    pub password: String,
    pub change_password_at_next_login: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_unit_path: Option<String>,
}

/// Google's error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorBody {
    pub error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoogleErrorDetail {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_directory_user_from_api() {
        let user: DirectoryUser = serde_json::from_value(json!({
            "id": "1045",
            "primaryEmail": "jane@example.com",
            "name": { "givenName": "Jane", "familyName": "Doe", "fullName": "Jane Doe" },
            "suspended": true,
            "orgUnitPath": "/Staff"
        }))
        .unwrap();

        assert_eq!(user.primary_email, "jane@example.com");
        assert_eq!(user.name.given_name, "Jane");
        assert!(user.suspended);
        assert!(!user.is_admin);
    }

    #[test]
    fn test_new_user_serializes_camel_case() {
        let body = serde_json::to_value(NewDirectoryUser {
            primary_email: "new@example.com".to_owned(),
            name: UserName {
                given_name: "New".to_owned(),
                family_name: "Hire".to_owned(),
                full_name: None,
            },
            password: "temporary-password".to_owned(),
            change_password_at_next_login: true,
            org_unit_path: None,
        })
        .unwrap();

        assert_eq!(body["primaryEmail"], "new@example.com");
        assert_eq!(body["changePasswordAtNextLogin"], true);
        assert!(body.get("orgUnitPath").is_none());
        assert!(body["name"].get("fullName").is_none());
    }
}
