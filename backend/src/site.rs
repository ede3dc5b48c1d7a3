use std::sync::Arc;

use serde_json::Map;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::media::{MediaKind, MediaStore, UploadedFile};
use crate::models::{HeroSlide, HeroSlidePatch, Section, SiteConfig};
use crate::multipart::MultipartForm;
use crate::settings::CatalogSettings;
use crate::store::JsonDocument;

/// Text fields of a new hero slide; blanks fall back to the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct HeroSlideFields {
    pub title: Option<String>,
    pub text: Option<String>,
    pub button_text: Option<String>,
}

impl HeroSlideFields {
    pub fn from_form(form: &MultipartForm) -> Self {
        HeroSlideFields {
            title: form.text("heroTitle").map(str::to_string),
            text: form.text("heroText").map(str::to_string),
            button_text: form.text("heroButtonText").map(str::to_string),
        }
    }
}

/// Where an uploaded file lands in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// `None` appends a new slide.
    Hero { index: Option<usize> },
    Featured { brand: String },
    Subpage { brand: String, index: usize },
}

impl UploadTarget {
    pub fn from_form(form: &MultipartForm) -> ApiResult<Self> {
        let section: Section = form
            .text("section")
            .ok_or_else(|| ApiError::InvalidInput("section is required".to_string()))?
            .parse()?;
        let index = form.text("index").map(parse_index).transpose()?;
        let brand = || {
            form.text("subpage")
                .map(str::to_string)
                .ok_or_else(|| ApiError::InvalidInput("subpage is required".to_string()))
        };
        match section {
            Section::Hero => Ok(UploadTarget::Hero { index }),
            Section::Featured => Ok(UploadTarget::Featured { brand: brand()? }),
            Section::Subpages => Ok(UploadTarget::Subpage {
                brand: brand()?,
                index: index
                    .ok_or_else(|| ApiError::InvalidInput("index is required".to_string()))?,
            }),
        }
    }

    fn required_kind(&self) -> MediaKind {
        match self {
            UploadTarget::Hero { .. } => MediaKind::Video,
            UploadTarget::Featured { .. } | UploadTarget::Subpage { .. } => MediaKind::Image,
        }
    }
}

fn parse_index(raw: &str) -> ApiResult<usize> {
    raw.parse()
        .map_err(|_| ApiError::InvalidInput(format!("'{}' is not a valid index", raw)))
}

impl SiteConfig {
    /// The slide at `index`; a gap counts as missing.
    pub fn slide_mut(&mut self, index: usize) -> ApiResult<&mut HeroSlide> {
        self.hero
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or_else(|| hero_not_found(index))
    }

    pub fn has_slide(&self, index: usize) -> bool {
        matches!(self.hero.get(index), Some(Some(_)))
    }

    /// Removes the entry at `index`, gap or slide, shifting later entries down.
    pub fn remove_slide(&mut self, index: usize) -> ApiResult<Option<HeroSlide>> {
        if index >= self.hero.len() {
            return Err(hero_not_found(index));
        }
        Ok(self.hero.remove(index))
    }

    pub fn set_featured(&mut self, brand: &str, reference: String) {
        self.featured.insert(brand.to_string(), Some(reference));
    }

    /// Writes `subpages[brand][index]`, padding the brand's list with gaps.
    pub fn set_subpage_image(&mut self, brand: &str, index: usize, reference: String) {
        let images = self.subpages.entry(brand.to_string()).or_default();
        if images.len() <= index {
            images.resize(index + 1, None);
        }
        images[index] = Some(reference);
    }
}

fn hero_not_found(index: usize) -> ApiError {
    ApiError::NotFound(format!("hero slide {} not found", index))
}

/// Operations on `config.json`: hero slides, featured brands and subpage images.
pub struct Site {
    config: JsonDocument<SiteConfig>,
    media: Arc<MediaStore>,
    catalog: CatalogSettings,
}

impl Site {
    pub fn new(config: JsonDocument<SiteConfig>, media: Arc<MediaStore>, catalog: CatalogSettings) -> Self {
        Site {
            config,
            media,
            catalog,
        }
    }

    pub async fn config(&self) -> ApiResult<SiteConfig> {
        self.config.read().await
    }

    pub async fn list_hero(&self) -> ApiResult<Vec<Option<HeroSlide>>> {
        Ok(self.config.read().await?.hero)
    }

    /// Appends a slide. A video file is required.
    pub async fn add_hero_slide(
        &self,
        fields: HeroSlideFields,
        file: Option<UploadedFile>,
    ) -> ApiResult<HeroSlide> {
        let file = file
            .ok_or_else(|| ApiError::InvalidInput("a video file is required for a new hero slide".to_string()))?;
        file.require(MediaKind::Video)?;
        let video = self.media.store(&file).await?;
        self.append_slide(fields, video).await
    }

    pub async fn update_hero_slide(&self, index: usize, patch: HeroSlidePatch) -> ApiResult<HeroSlide> {
        self.config
            .update(|config| {
                let slide = config.slide_mut(index)?;
                slide.apply(patch);
                Ok(slide.clone())
            })
            .await
    }

    pub async fn delete_hero_slide(&self, index: usize) -> ApiResult<Option<HeroSlide>> {
        self.config
            .update(|config| config.remove_slide(index))
            .await
    }

    /// Stores `file` and writes its reference into the targeted section.
    pub async fn upload(
        &self,
        target: UploadTarget,
        fields: HeroSlideFields,
        file: Option<UploadedFile>,
    ) -> ApiResult<String> {
        let file = file.ok_or_else(|| ApiError::InvalidInput("no file uploaded".to_string()))?;
        file.require(target.required_kind())?;
        self.check_target(&target).await?;

        let reference = self.media.store(&file).await?;
        debug!(?target, bytes = file.bytes.len(), "routing upload");

        match target {
            UploadTarget::Hero { index: None } => {
                self.append_slide(fields, reference.clone()).await?;
            }
            UploadTarget::Hero { index: Some(index) } => {
                let video = reference.clone();
                self.config
                    .update(|config| {
                        config.slide_mut(index)?.video = video;
                        Ok(())
                    })
                    .await?;
            }
            UploadTarget::Featured { brand } => {
                let image = reference.clone();
                self.config
                    .update(|config| {
                        config.set_featured(&brand, image);
                        Ok(())
                    })
                    .await?;
            }
            UploadTarget::Subpage { brand, index } => {
                let image = reference.clone();
                self.config
                    .update(|config| {
                        config.set_subpage_image(&brand, index, image);
                        Ok(())
                    })
                    .await?;
            }
        }
        Ok(reference)
    }

    async fn append_slide(&self, fields: HeroSlideFields, video: String) -> ApiResult<HeroSlide> {
        let slide = HeroSlide {
            video,
            title: fields
                .title
                .unwrap_or_else(|| self.catalog.default_hero_title.clone()),
            text: fields
                .text
                .unwrap_or_else(|| self.catalog.default_hero_text.clone()),
            button_text: fields
                .button_text
                .unwrap_or_else(|| self.catalog.default_hero_button_text.clone()),
            extra: Map::new(),
        };
        self.config
            .update(|config| {
                config.hero.push(Some(slide.clone()));
                Ok(())
            })
            .await?;
        Ok(slide)
    }

    /// Rejects bad targets before any bytes are stored.
    async fn check_target(&self, target: &UploadTarget) -> ApiResult<()> {
        match target {
            UploadTarget::Hero { index: Some(index) } => {
                if !self.config.read().await?.has_slide(*index) {
                    return Err(hero_not_found(*index));
                }
            }
            UploadTarget::Hero { index: None } => {}
            UploadTarget::Featured { brand } => self.check_brand(brand)?,
            UploadTarget::Subpage { brand, index } => {
                self.check_brand(brand)?;
                if *index >= self.catalog.max_subpage_images {
                    return Err(ApiError::InvalidInput(format!(
                        "subpage index must be below {}",
                        self.catalog.max_subpage_images
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_brand(&self, brand: &str) -> ApiResult<()> {
        if self.catalog.is_brand(brand) {
            Ok(())
        } else {
            Err(ApiError::InvalidInput(format!("unknown brand '{}'", brand)))
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::media::MediaStrategy;

    async fn site(dir: &TempDir) -> Site {
        let config = JsonDocument::open(dir.path().join("config.json"))
            .await
            .unwrap();
        let media = Arc::new(MediaStore::new(MediaStrategy::Disk, dir.path().join("uploads")));
        Site::new(config, media, CatalogSettings::default())
    }

    fn file(content_type: &str) -> UploadedFile {
        UploadedFile {
            field: "file".into(),
            filename: "clip".into(),
            content_type: content_type.into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn subpage_writes_pad_with_gaps() {
        let mut config = SiteConfig::default();
        config.set_subpage_image("rolex", 2, "c.png".into());
        assert_eq!(config.subpages["rolex"], vec![None, None, Some("c.png".to_string())]);
        config.set_subpage_image("rolex", 0, "a.png".into());
        assert_eq!(config.subpages["rolex"][0].as_deref(), Some("a.png"));
        assert_eq!(config.subpages["rolex"].len(), 3);
    }

    #[test]
    fn upload_target_parsing() {
        let form = MultipartForm::default()
            .with_field("section", "subpages")
            .with_field("subpage", "patek")
            .with_field("index", "3");
        assert_eq!(
            UploadTarget::from_form(&form).unwrap(),
            UploadTarget::Subpage { brand: "patek".into(), index: 3 }
        );

        let hero = MultipartForm::default().with_field("section", "hero");
        assert_eq!(UploadTarget::from_form(&hero).unwrap(), UploadTarget::Hero { index: None });

        let missing_index = MultipartForm::default()
            .with_field("section", "subpages")
            .with_field("subpage", "patek");
        assert!(UploadTarget::from_form(&missing_index).is_err());

        let bad_index = MultipartForm::default()
            .with_field("section", "hero")
            .with_field("index", "-1");
        assert!(UploadTarget::from_form(&bad_index).is_err());
    }

    #[tokio::test]
    async fn add_hero_slide_requires_video_and_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let site = site(&dir).await;

        let missing = site.add_hero_slide(HeroSlideFields::default(), None).await;
        assert!(matches!(missing, Err(ApiError::InvalidInput(_))));
        let image = site
            .add_hero_slide(HeroSlideFields::default(), Some(file("image/png")))
            .await;
        assert!(matches!(image, Err(ApiError::InvalidInput(_))));

        let fields = HeroSlideFields {
            title: Some("Royal Oak".into()),
            ..Default::default()
        };
        let slide = site.add_hero_slide(fields, Some(file("video/mp4"))).await.unwrap();
        assert_eq!(slide.title, "Royal Oak");
        assert_eq!(slide.text, "Default Description");
        assert_eq!(slide.button_text, "Shop Now");
        assert!(slide.video.starts_with("uploads/"));
        assert_eq!(site.list_hero().await.unwrap(), vec![Some(slide)]);
    }

    #[tokio::test]
    async fn hero_index_bounds() {
        let dir = TempDir::new().unwrap();
        let site = site(&dir).await;
        site.add_hero_slide(HeroSlideFields::default(), Some(file("video/mp4")))
            .await
            .unwrap();

        let patch = HeroSlidePatch {
            title: Some("X".into()),
            ..Default::default()
        };
        assert!(matches!(
            site.update_hero_slide(1, patch.clone()).await,
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(site.update_hero_slide(0, patch).await.unwrap().title, "X");
        assert!(matches!(site.delete_hero_slide(1).await, Err(ApiError::NotFound(_))));
        site.delete_hero_slide(0).await.unwrap();
        assert!(site.list_hero().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gaps_in_hero_are_missing_slides() {
        let dir = TempDir::new().unwrap();
        let site = site(&dir).await;
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"hero":[null,{"video":"v.mp4","title":"T"}],"featured":{"rolex":null},"subpages":{}}"#,
        )
        .unwrap();

        let hero = site.list_hero().await.unwrap();
        assert_eq!(hero[0], None);
        assert_eq!(hero[1].as_ref().unwrap().title, "T");

        let patch = HeroSlidePatch {
            title: Some("X".into()),
            ..Default::default()
        };
        assert!(matches!(site.update_hero_slide(0, patch.clone()).await, Err(ApiError::NotFound(_))));
        let gap_upload = site
            .upload(
                UploadTarget::Hero { index: Some(0) },
                HeroSlideFields::default(),
                Some(file("video/mp4")),
            )
            .await;
        assert!(matches!(gap_upload, Err(ApiError::NotFound(_))));
        assert_eq!(site.update_hero_slide(1, patch).await.unwrap().title, "X");

        site.upload(
            UploadTarget::Featured { brand: "patek".into() },
            HeroSlideFields::default(),
            Some(file("image/png")),
        )
        .await
        .unwrap();
        let config = site.config().await.unwrap();
        assert_eq!(config.featured["rolex"], None);
        assert!(config.featured["patek"].is_some());
        assert_eq!(config.hero[0], None);

        assert_eq!(site.delete_hero_slide(0).await.unwrap(), None);
        assert_eq!(site.list_hero().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_routes_by_section() {
        let dir = TempDir::new().unwrap();
        let site = site(&dir).await;

        let featured = site
            .upload(
                UploadTarget::Featured { brand: "rolex".into() },
                HeroSlideFields::default(),
                Some(file("image/png")),
            )
            .await
            .unwrap();
        let subpage = site
            .upload(
                UploadTarget::Subpage { brand: "patek".into(), index: 1 },
                HeroSlideFields::default(),
                Some(file("image/webp")),
            )
            .await
            .unwrap();
        let appended = site
            .upload(
                UploadTarget::Hero { index: None },
                HeroSlideFields::default(),
                Some(file("video/mp4")),
            )
            .await
            .unwrap();
        let replaced = site
            .upload(
                UploadTarget::Hero { index: Some(0) },
                HeroSlideFields::default(),
                Some(file("video/webm")),
            )
            .await
            .unwrap();

        let config = site.config().await.unwrap();
        assert_eq!(config.featured["rolex"], Some(featured));
        assert_eq!(config.subpages["patek"], vec![None, Some(subpage)]);
        assert_ne!(appended, replaced);
        assert_eq!(config.hero.len(), 1);
        let slide = config.hero[0].as_ref().unwrap();
        assert_eq!(slide.video, replaced);
        assert_eq!(slide.title, "Default Title");
    }

    #[tokio::test]
    async fn upload_rejects_bad_targets_without_writing() {
        let dir = TempDir::new().unwrap();
        let site = site(&dir).await;
        let cases = vec![
            (UploadTarget::Hero { index: None }, "image/png"),
            (UploadTarget::Featured { brand: "rolex".into() }, "video/mp4"),
            (UploadTarget::Featured { brand: "omega".into() }, "image/png"),
            (UploadTarget::Subpage { brand: "rolex".into(), index: 64 }, "image/png"),
        ];
        for (target, mime) in cases {
            let result = site
                .upload(target, HeroSlideFields::default(), Some(file(mime)))
                .await;
            assert!(matches!(result, Err(ApiError::InvalidInput(_))));
        }
        let out_of_range = site
            .upload(
                UploadTarget::Hero { index: Some(0) },
                HeroSlideFields::default(),
                Some(file("video/mp4")),
            )
            .await;
        assert!(matches!(out_of_range, Err(ApiError::NotFound(_))));
        assert_eq!(site.config().await.unwrap(), SiteConfig::default());
        assert!(!dir.path().join("uploads").exists());
    }
}
