use serde::{Deserialize, Serialize};

use crate::backend::AuthUser;

// Stored under `users/{uid}` and embedded as the author of posts and comments.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    /// Fields a sign-in is allowed to overwrite. Never touches `admin`.
    pub fn profile_write(auth: &AuthUser, default_photo_url: &str) -> ProfileWrite {
        ProfileWrite {
            uid: auth.uid.clone(),
            display_name: auth.display_name.clone().unwrap_or_default(),
            photo_url: auth
                .photo_url
                .clone()
                .unwrap_or_else(|| default_photo_url.to_string()),
        }
    }
}

impl From<AuthUser> for User {
    fn from(auth: AuthUser) -> Self {
        Self {
            uid: auth.uid,
            display_name: auth.display_name.unwrap_or_default(),
            photo_url: auth.photo_url.unwrap_or_default(),
            admin: false,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileWrite {
    pub uid: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_admin_flag_reads_as_false() {
        let user: User = serde_json::from_value(json!({
            "uid": "u1",
            "displayName": "Ada",
            "photoURL": "https://example.com/a.png"
        }))
        .unwrap();
        assert!(!user.admin);
        assert_eq!(user.photo_url, "https://example.com/a.png");
    }

    #[test]
    fn profile_write_falls_back_to_placeholder_photo() {
        let auth = AuthUser {
            uid: "u1".into(),
            email: None,
            display_name: Some("Ada".into()),
            photo_url: None,
        };
        let write = User::profile_write(&auth, "https://placeholder");
        assert_eq!(
            serde_json::to_value(write).unwrap(),
            json!({ "uid": "u1", "displayName": "Ada", "photoURL": "https://placeholder" })
        );
    }
}
