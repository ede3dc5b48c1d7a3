use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::media::MediaStrategy;

/// Layered settings: defaults, then `appsettings.{toml,json,yaml}` (or an
/// explicit file), then `STOREFRONT__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub media: MediaSettings,
    pub admin: AdminSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory holding the storefront and admin HTML/CSS/JS, if served here.
    pub static_dir: Option<PathBuf>,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub products_file: String,
    pub config_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: PathBuf::from("data"),
            products_file: "products.json".to_string(),
            config_file: "config.json".to_string(),
        }
    }
}

impl StorageSettings {
    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(&self.config_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub strategy: MediaStrategy,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        MediaSettings {
            strategy: MediaStrategy::Inline,
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub username: String,
    /// Argon2 PHC string; produce one with `storefront hash-password`.
    /// Empty disables login.
    pub password_hash: String,
    pub session_ttl_secs: i64,
}

impl Default for AdminSettings {
    fn default() -> Self {
        AdminSettings {
            username: "admin".to_string(),
            password_hash: String::new(),
            session_ttl_secs: 8 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Keys accepted for `featured` and `subpages`.
    pub brands: Vec<String>,
    pub placeholder_image: String,
    pub default_hero_title: String,
    pub default_hero_text: String,
    pub default_hero_button_text: String,
    pub max_subpage_images: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            brands: vec!["richard".to_string(), "patek".to_string(), "rolex".to_string()],
            placeholder_image: "https://placehold.co/300x200/1a1a1a/ffffff?text=Product+Image"
                .to_string(),
            default_hero_title: "Default Title".to_string(),
            default_hero_text: "Default Description".to_string(),
            default_hero_button_text: "Shop Now".to_string(),
            max_subpage_images: 64,
        }
    }
}

impl CatalogSettings {
    pub fn is_brand(&self, key: &str) -> bool {
        self.brands.iter().any(|brand| brand == key)
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path),
            None => File::with_name("appsettings").required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("STOREFRONT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
