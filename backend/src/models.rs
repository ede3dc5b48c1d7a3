use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    pub image: String,
    pub date_added: DateTime<Utc>,
}

/// One entry of the homepage video banner.
///
/// Keys written by other tools are kept in `extra` so a rewrite never drops them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlide {
    #[serde(default)]
    pub video: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub button_text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial slide update. Keys other than the four named ones land in `extra`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlidePatch {
    pub video: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub button_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HeroSlide {
    /// Shallow merge: only the keys present in `patch` change.
    pub fn apply(&mut self, patch: HeroSlidePatch) {
        if let Some(video) = patch.video {
            self.video = video;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(button_text) = patch.button_text {
            self.button_text = button_text;
        }
        self.extra.extend(patch.extra);
    }
}

/// The `config.json` document.
///
/// `null` entries are gaps left by index-addressed writes; they are kept as-is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SiteConfig {
    #[serde(default)]
    pub hero: Vec<Option<HeroSlide>>,
    #[serde(default)]
    pub featured: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub subpages: BTreeMap<String, Vec<Option<String>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Hero,
    Featured,
    Subpages,
}

impl FromStr for Section {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hero" => Ok(Section::Hero),
            "featured" => Ok(Section::Featured),
            "subpages" => Ok(Section::Subpages),
            other => Err(ApiError::InvalidInput(format!("unknown upload section '{}'", other))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub message: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        StatusResponse {
            success: true,
            message: message.into(),
        }
    }
}
