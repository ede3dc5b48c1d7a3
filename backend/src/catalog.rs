use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::media::{MediaKind, MediaStore, UploadedFile};
use crate::models::Product;
use crate::multipart::MultipartForm;
use crate::store::JsonDocument;

/// Validated product form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image: Option<String>,
}

impl ProductFields {
    pub fn from_form(form: &MultipartForm) -> ApiResult<Self> {
        let name = form
            .text("name")
            .ok_or_else(|| ApiError::InvalidInput("Product name cannot be empty".to_string()))?;
        let price = form
            .text("price")
            .ok_or_else(|| ApiError::InvalidInput("Product price is required".to_string()))?;
        Ok(ProductFields {
            name: name.to_string(),
            description: form.text("description").unwrap_or_default().to_string(),
            price: parse_price(price)?,
            category: form.text("category").unwrap_or_default().to_string(),
            image: form.text("image").map(str::to_string),
        })
    }
}

/// Parses a decimal price; rejects anything that is not a finite, non-negative number.
pub fn parse_price(raw: &str) -> ApiResult<f64> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("'{}' is not a valid price", raw)))?;
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "price must be a non-negative number, got '{}'",
            raw
        )));
    }
    Ok(price)
}

/// CRUD over `products.json`.
pub struct Catalog {
    products: JsonDocument<Vec<Product>>,
    media: Arc<MediaStore>,
    placeholder_image: String,
}

impl Catalog {
    pub fn new(
        products: JsonDocument<Vec<Product>>,
        media: Arc<MediaStore>,
        placeholder_image: impl Into<String>,
    ) -> Self {
        Catalog {
            products,
            media,
            placeholder_image: placeholder_image.into(),
        }
    }

    pub async fn list(&self) -> ApiResult<Vec<Product>> {
        self.products.read().await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Product> {
        self.products
            .read()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(
        &self,
        fields: ProductFields,
        file: Option<UploadedFile>,
    ) -> ApiResult<Product> {
        let image = match self.upload_image(file.as_ref()).await? {
            Some(reference) => reference,
            None => fields
                .image
                .unwrap_or_else(|| self.placeholder_image.clone()),
        };
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: fields.name,
            description: fields.description,
            price: fields.price,
            category: fields.category,
            image,
            date_added: Utc::now(),
        };
        self.products
            .update(|products| {
                products.push(product.clone());
                Ok(())
            })
            .await?;
        Ok(product)
    }

    pub async fn update(
        &self,
        id: &str,
        fields: ProductFields,
        file: Option<UploadedFile>,
    ) -> ApiResult<Product> {
        // Checked up front so a rejected update never leaves an orphaned upload.
        self.get(id).await?;
        let uploaded = self.upload_image(file.as_ref()).await?;

        self.products
            .update(|products| {
                let product = products
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| not_found(id))?;
                product.name = fields.name;
                product.description = fields.description;
                product.price = fields.price;
                product.category = fields.category;
                if let Some(image) = uploaded.or(fields.image) {
                    product.image = image;
                }
                Ok(product.clone())
            })
            .await
    }

    /// Removes the product if present. Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        self.products
            .update(|products| {
                let before = products.len();
                products.retain(|p| p.id != id);
                Ok(products.len() != before)
            })
            .await
    }

    async fn upload_image(&self, file: Option<&UploadedFile>) -> ApiResult<Option<String>> {
        let Some(file) = file else {
            return Ok(None);
        };
        file.require(MediaKind::Image)?;
        let reference = self.media.store(file).await?;
        debug!(
            field = %file.field,
            filename = %file.filename,
            bytes = file.bytes.len(),
            "product image stored"
        );
        Ok(Some(reference))
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("product '{}' not found", id))
}
