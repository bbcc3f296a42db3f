pub mod tracing;

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::stores::query::SearchOrdering;
use crate::stores::reader::ListingPolicy;

pub const PLACEHOLDER_PHOTO_URL: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/a/ad/Placeholder_no_text.svg/150px-Placeholder_no_text.svg.png";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub server: ServerCfg,
    pub log: LogCfg,
    pub feed: FeedCfg,
    pub storage: StorageCfg,
    pub identity: IdentityCfg,
    pub session: SessionCfg,
    pub templates: TemplatesCfg,
    pub seed: SeedCfg,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerCfg {
    pub addr: String,
    pub static_dir: String,
    /// Extra origins allowed to call the server cross-site.
    pub cors_origins: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogCfg {
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    pub http_requests: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeedCfg {
    pub page_size: usize,
    pub search_ordering: SearchOrdering,
    pub listing_policy: ListingPolicy,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StorageCfg {
    pub image_prefix: String,
    pub image_extension: String,
    pub image_content_type: String,
    pub public_base_url: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct IdentityCfg {
    pub default_photo_url: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionCfg {
    pub cookie_name: String,
    /// How long a sign-in waits for the session listener to publish the new state.
    pub settle_timeout_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TemplatesCfg {
    pub dir: String,
    pub watch: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SeedCfg {
    pub admin: Option<SeedAccount>,
    pub subjects: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SeedAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            static_dir: "./dist/".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for LogCfg {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            http_requests: true,
        }
    }
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self {
            page_size: 10,
            search_ordering: SearchOrdering::default(),
            listing_policy: ListingPolicy::default(),
        }
    }
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            image_prefix: "postImages".to_string(),
            image_extension: "jpeg".to_string(),
            image_content_type: "image/jpeg".to_string(),
            public_base_url: "/media".to_string(),
        }
    }
}

impl StorageCfg {
    /// Object key of a post's image, e.g. `postImages/{id}.jpeg`.
    pub fn image_key(&self, post_id: &str) -> String {
        format!(
            "{}/{}.{}",
            self.image_prefix, post_id, self.image_extension
        )
    }
}

impl Default for IdentityCfg {
    fn default() -> Self {
        Self {
            default_photo_url: PLACEHOLDER_PHOTO_URL.to_string(),
        }
    }
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            cookie_name: "readthat_session".to_string(),
            settle_timeout_ms: 2_000,
        }
    }
}

impl SessionCfg {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

impl Default for TemplatesCfg {
    fn default() -> Self {
        Self {
            dir: "templates".to_string(),
            watch: false,
        }
    }
}

impl AppCfg {
    /// Defaults, then `appsettings.json` (if present), then `APP_` environment
    /// variables. Nested keys use `__`, e.g. `APP_FEED__PAGE_SIZE=20`.
    pub fn load(settings: impl AsRef<Path>) -> figment::error::Result<Self> {
        Figment::from(Serialized::defaults(AppCfg::default()))
            .merge(Json::file(settings.as_ref()))
            .merge(Env::prefixed("APP_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_without_settings_file() {
        Jail::expect_with(|_jail| {
            let cfg = AppCfg::load("appsettings.json")?;
            assert_eq!(cfg, AppCfg::default());
            assert_eq!(cfg.feed.page_size, 10);
            assert_eq!(cfg.feed.listing_policy, ListingPolicy::FailFast);
            assert_eq!(cfg.feed.search_ordering, SearchOrdering::Recency);
            Ok(())
        });
    }

    #[test]
    fn settings_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "appsettings.json",
                r#"{
                    "server": { "addr": "127.0.0.1:8080" },
                    "feed": { "page_size": 5, "search_ordering": "title_descending" },
                    "seed": { "subjects": ["rust", "cooking"] }
                }"#,
            )?;
            jail.set_env("APP_FEED__PAGE_SIZE", "25");
            jail.set_env("APP_FEED__LISTING_POLICY", "best_effort");

            let cfg = AppCfg::load("appsettings.json")?;
            assert_eq!(cfg.server.addr, "127.0.0.1:8080");
            assert_eq!(cfg.feed.page_size, 25);
            assert_eq!(cfg.feed.search_ordering, SearchOrdering::TitleDescending);
            assert_eq!(cfg.feed.listing_policy, ListingPolicy::BestEffort);
            assert_eq!(cfg.seed.subjects, vec!["rust", "cooking"]);
            assert_eq!(cfg.session.cookie_name, "readthat_session");
            Ok(())
        });
    }

    #[test]
    fn image_key_follows_naming_convention() {
        assert_eq!(StorageCfg::default().image_key("abc"), "postImages/abc.jpeg");
    }
}
