pub mod auth;
pub mod catalog;
pub mod error;
pub mod media;
pub mod models;
pub mod multipart;
pub mod routes;
pub mod settings;
pub mod site;
pub mod store;

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::auth::SessionStore;
use crate::catalog::Catalog;
use crate::error::ApiResult;
use crate::media::MediaStore;
use crate::settings::Settings;
use crate::site::Site;
use crate::store::JsonDocument;

/// Shared state handed to every handler.
pub struct AppState {
    pub settings: Settings,
    pub catalog: Catalog,
    pub site: Site,
    pub sessions: SessionStore,
}

impl AppState {
    /// Opens (and if needed creates) both documents and the uploads directory.
    pub async fn init(settings: Settings) -> ApiResult<Self> {
        let media = Arc::new(MediaStore::new(
            settings.media.strategy,
            settings.media.uploads_dir.clone(),
        ));
        tokio::fs::create_dir_all(media.uploads_dir()).await?;

        let products = JsonDocument::open(settings.storage.products_path()).await?;
        let config = JsonDocument::open(settings.storage.config_path()).await?;
        info!(
            products = %products.path().display(),
            config = %config.path().display(),
            media = ?media.strategy(),
            "storage ready"
        );

        Ok(AppState {
            catalog: Catalog::new(
                products,
                Arc::clone(&media),
                settings.catalog.placeholder_image.clone(),
            ),
            site: Site::new(config, media, settings.catalog.clone()),
            sessions: SessionStore::new(Duration::seconds(settings.admin.session_ttl_secs)),
            settings,
        })
    }
}
