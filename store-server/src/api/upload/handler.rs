//! Image Upload Handler
//!
//! Handles image staging for product and category forms.
//! Accepts PNG/JPEG/WebP, converts everything to JPG.

use axum::Json;
use axum::extract::{Multipart, Path as UrlPath, State};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::utils::AppResponse;
use crate::utils::ok;
use crate::{AppError, ServerState};

/// Maximum file size (5MB)
pub(super) const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Maximum pictures per request
pub(super) const MAX_PICTURES: usize = 20;

/// MIME allow-list
const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Resources that may receive uploads
const ALLOWED_RESOURCES: &[&str] = &["products", "categories"];

/// JPEG quality (85% keeps photos presentable while controlling size)
const JPEG_QUALITY: u8 = 85;

/// Upload response: staged paths for the follow-up JSON request
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// `{resource}/{file}.jpg`, present when a thumbnail field was sent
    pub thumbnail: Option<String>,
    pub pictures: Vec<String>,
}

/// Calculate SHA256 hash of data
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Find existing file by content hash
fn find_file_by_hash(resource_dir: &Path, hash: &str) -> Option<String> {
    let hash_dir = resource_dir.join("by_hash");
    if !hash_dir.exists() {
        return None;
    }

    // Hash directory uses first 2 chars as subdir (e.g., "ab/abc123...")
    let prefix = &hash[..2];
    let hash_path = hash_dir.join(format!("{}/{}", prefix, hash));

    if hash_path.exists()
        && let Ok(target) = fs::read_link(&hash_path)
    {
        return target.file_name().map(|s| s.to_string_lossy().to_string());
    }
    None
}

/// Create hash-based symlink for deduplication
fn create_hash_symlink(resource_dir: &Path, hash: &str, filename: &str) -> Result<(), AppError> {
    let hash_dir = resource_dir.join("by_hash");
    let prefix = &hash[..2];
    let hash_subdir = hash_dir.join(prefix);
    fs::create_dir_all(&hash_subdir)
        .map_err(|e| AppError::internal(format!("Failed to create hash dir: {}", e)))?;

    let hash_path = hash_subdir.join(hash);
    let target_path = PathBuf::from("../../").join(filename);

    symlink::symlink_auto(&target_path, &hash_path)
        .map_err(|e| AppError::internal(format!("Failed to create symlink: {}", e)))?;

    Ok(())
}

/// Decode and re-encode as JPG with the configured quality
fn process_and_compress_image(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::validation(format!("Invalid image: {}", e)))?;

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let rgb_img = img.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
        rgb_img
            .write_with_encoder(encoder)
            .map_err(|e| AppError::internal(format!("Failed to compress image: {}", e)))?;
    }

    Ok(buffer)
}

/// Validate one uploaded file against size and MIME allow-list
fn validate_image(field_name: &str, content_type: Option<&str>, data: &[u8]) -> Result<(), AppError> {
    if data.is_empty() {
        return Err(AppError::validation(format!("{field_name}: empty file")));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::validation(format!(
            "{field_name}: file too large, maximum is {}MB",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }

    let mime = content_type
        .ok_or_else(|| AppError::validation(format!("{field_name}: missing content type")))?;
    if !ALLOWED_MIME.contains(&mime) {
        return Err(AppError::validation(format!(
            "{field_name}: unsupported type '{}', allowed: {}",
            mime,
            ALLOWED_MIME.join(", ")
        )));
    }

    Ok(())
}

/// 压缩、去重并落盘一个文件，返回 `{resource}/{file}.jpg`
fn stage_file(resource_dir: &Path, resource: &str, data: &[u8]) -> Result<String, AppError> {
    let compressed = process_and_compress_image(data)?;
    let file_hash = calculate_hash(&compressed);

    if let Some(existing) = find_file_by_hash(resource_dir, &file_hash) {
        tracing::info!(
            resource = %resource,
            existing_file = %existing,
            "Duplicate image detected, reusing staged file"
        );
        return Ok(format!("{}/{}", resource, existing));
    }

    let new_filename = format!("{}.jpg", Uuid::new_v4());
    let file_path = resource_dir.join(&new_filename);

    fs::write(&file_path, &compressed)
        .map_err(|e| AppError::internal(format!("Failed to save file: {}", e)))?;
    create_hash_symlink(resource_dir, &file_hash, &new_filename)?;

    tracing::info!(
        resource = %resource,
        filename = %new_filename,
        size = %compressed.len(),
        hash = %file_hash,
        "Image staged"
    );

    Ok(format!("{}/{}", resource, new_filename))
}

/// POST /api/upload/{resource} - 图片上传
///
/// 接受 multipart 字段 `thumbnail` (最多 1 个) 和 `pictures`
/// (最多 20 个)，返回落盘后的路径
pub async fn upload(
    State(state): State<ServerState>,
    UrlPath(resource): UrlPath<String>,
    mut multipart: Multipart,
) -> Result<Json<AppResponse<UploadResponse>>, AppError> {
    if !ALLOWED_RESOURCES.contains(&resource.as_str()) {
        return Err(AppError::validation(format!(
            "Unknown upload resource '{}', allowed: {}",
            resource,
            ALLOWED_RESOURCES.join(", ")
        )));
    }

    let resource_dir = state.uploads_dir().join(&resource);
    fs::create_dir_all(&resource_dir)
        .map_err(|e| AppError::internal(format!("Failed to create upload directory: {}", e)))?;

    let mut thumbnail: Option<String> = None;
    let mut pictures: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());

        match field_name.as_str() {
            "thumbnail" => {
                if thumbnail.is_some() {
                    return Err(AppError::validation(
                        "Only one thumbnail is allowed per request",
                    ));
                }
                let data = field.bytes().await?;
                validate_image("thumbnail", content_type.as_deref(), &data)?;
                thumbnail = Some(stage_file(&resource_dir, &resource, &data)?);
            }
            "pictures" => {
                if pictures.len() >= MAX_PICTURES {
                    return Err(AppError::validation(format!(
                        "At most {} pictures are allowed per request",
                        MAX_PICTURES
                    )));
                }
                let data = field.bytes().await?;
                validate_image("pictures", content_type.as_deref(), &data)?;
                pictures.push(stage_file(&resource_dir, &resource, &data)?);
            }
            other => {
                return Err(AppError::validation(format!(
                    "Unexpected field '{}', expected 'thumbnail' or 'pictures'",
                    other
                )));
            }
        }
    }

    if thumbnail.is_none() && pictures.is_empty() {
        return Err(AppError::validation(
            "No files found. Send 'thumbnail' and/or 'pictures' fields",
        ));
    }

    Ok(ok(UploadResponse {
        thumbnail,
        pictures,
    }))
}
