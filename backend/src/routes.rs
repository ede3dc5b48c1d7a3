use std::path::PathBuf;

use actix_files::{Files, NamedFile};
use actix_multipart::Multipart;
use actix_web::error::{JsonPayloadError, PathError};
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use tracing::{info, warn};

use crate::auth::{self, AdminSession};
use crate::catalog::ProductFields;
use crate::error::{ApiError, ApiResult};
use crate::models::{HeroSlidePatch, LoginRequest, LoginResponse, StatusResponse, UploadResponse};
use crate::multipart::MultipartForm;
use crate::settings::Settings;
use crate::site::{HeroSlideFields, UploadTarget};
use crate::AppState;

/// Registers the JSON API under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(web::resource("/api/config").route(web::get().to(get_config)))
        .service(
            web::resource("/api/products")
                .route(web::get().to(get_products))
                .route(web::post().to(create_product)),
        )
        .service(
            web::resource("/api/products/{id}")
                .route(web::get().to(get_product))
                .route(web::put().to(update_product))
                .route(web::delete().to(delete_product)),
        )
        .service(
            web::resource("/api/hero")
                .route(web::get().to(get_hero))
                .route(web::post().to(create_hero_slide)),
        )
        .service(
            web::resource("/api/hero/{index}")
                .route(web::put().to(update_hero_slide))
                .route(web::delete().to(delete_hero_slide)),
        )
        .service(web::resource("/api/upload").route(web::post().to(upload)))
        .service(web::resource("/api/admin/login").route(web::post().to(login)))
        .service(web::resource("/api/admin/logout").route(web::post().to(logout)));
}

/// Serves disk uploads and, when configured, the storefront/admin pages.
///
/// Must be registered after [`configure`]: the static mount catches `/`.
pub fn configure_files(settings: &Settings) -> impl FnOnce(&mut web::ServiceConfig) {
    let uploads_dir = settings.media.uploads_dir.clone();
    let static_dir = settings.server.static_dir.clone();
    move |cfg: &mut web::ServiceConfig| {
        cfg.service(Files::new("/uploads", uploads_dir));
        if let Some(static_dir) = static_dir {
            cfg.service(web::resource("/admin").route(web::get().to(page(static_dir.join("admin.html")))))
                .service(
                    web::resource("/admin-login")
                        .route(web::get().to(page(static_dir.join("admin-login.html")))),
                )
                .service(web::resource("/login").route(web::get().to(|| async {
                    HttpResponse::Found()
                        .insert_header((header::LOCATION, "/admin-login"))
                        .finish()
                })))
                .service(Files::new("/", static_dir).index_file("index.html"));
        }
    }
}

fn page(
    path: PathBuf,
) -> impl Fn() -> futures::future::LocalBoxFuture<'static, std::io::Result<NamedFile>> + Clone + 'static {
    move || {
        let path = path.clone();
        Box::pin(async move { NamedFile::open_async(path).await })
    }
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidInput(format!("invalid JSON body: {}", err)).into()
}

/// Path segments here are ids and indices; one that doesn't parse names nothing.
fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    ApiError::NotFound(format!("{} not found: {}", req.path(), err)).into()
}

async fn read_form(state: &AppState, payload: Multipart) -> ApiResult<MultipartForm> {
    MultipartForm::read(payload, state.settings.media.max_upload_bytes).await
}

async fn get_config(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.site.config().await?))
}

async fn get_products(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.list().await?))
}

async fn get_product(state: web::Data<AppState>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.catalog.get(&id).await?))
}

async fn create_product(
    state: web::Data<AppState>,
    _admin: AdminSession,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = read_form(&state, payload).await?;
    let fields = ProductFields::from_form(&form)?;
    let product = state.catalog.create(fields, form.take_file()).await?;
    info!(product_id = %product.id, name = %product.name, "product created");
    Ok(HttpResponse::Created().json(product))
}

async fn update_product(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = read_form(&state, payload).await?;
    let fields = ProductFields::from_form(&form)?;
    let product = state.catalog.update(&id, fields, form.take_file()).await?;
    info!(product_id = %product.id, "product updated");
    Ok(HttpResponse::Ok().json(product))
}

async fn delete_product(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let removed = state.catalog.delete(&id).await?;
    info!(product_id = %id, removed, "product deleted");
    Ok(HttpResponse::Ok().json(StatusResponse::ok("Product deleted successfully")))
}

async fn get_hero(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.site.list_hero().await?))
}

async fn create_hero_slide(
    state: web::Data<AppState>,
    _admin: AdminSession,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = read_form(&state, payload).await?;
    let fields = HeroSlideFields::from_form(&form);
    let slide = state.site.add_hero_slide(fields, form.take_file()).await?;
    info!(title = %slide.title, "hero slide added");
    Ok(HttpResponse::Created().json(slide))
}

async fn update_hero_slide(
    state: web::Data<AppState>,
    _admin: AdminSession,
    index: web::Path<usize>,
    patch: web::Json<HeroSlidePatch>,
) -> ApiResult<HttpResponse> {
    let index = index.into_inner();
    let slide = state.site.update_hero_slide(index, patch.into_inner()).await?;
    info!(index, "hero slide updated");
    Ok(HttpResponse::Ok().json(slide))
}

async fn delete_hero_slide(
    state: web::Data<AppState>,
    _admin: AdminSession,
    index: web::Path<usize>,
) -> ApiResult<HttpResponse> {
    let index = index.into_inner();
    state.site.delete_hero_slide(index).await?;
    info!(index, "hero slide deleted");
    Ok(HttpResponse::Ok().json(StatusResponse::ok("Hero slide deleted successfully")))
}

async fn upload(
    state: web::Data<AppState>,
    _admin: AdminSession,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = read_form(&state, payload).await?;
    let target = UploadTarget::from_form(&form)?;
    let fields = HeroSlideFields::from_form(&form);
    let path = state.site.upload(target.clone(), fields, form.take_file()).await?;
    info!(?target, "file uploaded");
    Ok(HttpResponse::Ok().json(UploadResponse {
        success: true,
        message: "File uploaded!".to_string(),
        path,
    }))
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let admin = &state.settings.admin;
    if body.username != admin.username || !auth::verify_password(&body.password, &admin.password_hash) {
        warn!(username = %body.username, "rejected admin login");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }
    let session = state.sessions.issue();
    info!(expires_at = %session.expires_at, "admin logged in");
    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        token: session.token,
        message: "Login successful".to_string(),
        expires_in: state.sessions.ttl().num_seconds(),
    }))
}

async fn logout(state: web::Data<AppState>, admin: AdminSession) -> ApiResult<HttpResponse> {
    state.sessions.revoke(&admin.token);
    info!("admin logged out");
    Ok(HttpResponse::Ok().json(StatusResponse::ok("Logged out")))
}
