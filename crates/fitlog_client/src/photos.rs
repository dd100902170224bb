//! Weekly progress photos: object paths, legacy URL handling and the
//! upload / list / delete flows over a [`FitnessBackend`].

use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Url;

use crate::dates::week_start_key;
use crate::{FitLogError, FitnessBackend, SignedPhoto, WeeklyPhoto};

/// `<user>/<week_start>-<millis>.<ext>`; the extension comes from the uploaded file name.
pub fn photo_object_path(user_id: &str, week_start: &str, unix_millis: i64, file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    format!("{user_id}/{week_start}-{unix_millis}.{ext}")
}

/// Storage path for a stored photo reference.
///
/// Older rows hold a full public or signed URL
/// (`.../object/public/<bucket>/<path>`, `.../object/sign/<bucket>/<path>?token=..`);
/// those map to the part after the bucket segment. Anything else is already a path.
pub fn storage_path(reference: &str, bucket: &str) -> String {
    if !(reference.starts_with("http://") || reference.starts_with("https://")) {
        return reference.to_string();
    }
    let Ok(url) = Url::parse(reference) else {
        tracing::warn!(reference, "failed to parse photo url");
        return reference.to_string();
    };
    let Some(segments) = url.path_segments() else {
        return reference.to_string();
    };
    let segments: Vec<&str> = segments.collect();
    match segments.iter().position(|s| *s == bucket) {
        Some(idx) if idx + 1 < segments.len() => segments[idx + 1..].join("/"),
        _ => reference.to_string(),
    }
}

pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "heic" => "image/heic",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

/// Photo operations for one user.
#[derive(Clone)]
pub struct PhotoLibrary {
    backend: Arc<dyn FitnessBackend>,
    bucket: String,
    signed_url_ttl_secs: u64,
}

impl PhotoLibrary {
    pub fn new(backend: Arc<dyn FitnessBackend>, bucket: impl Into<String>, signed_url_ttl_secs: u64) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            signed_url_ttl_secs,
        }
    }

    /// Store the image and record it against the week containing `today`.
    pub async fn upload(
        &self,
        user_id: &str,
        today: NaiveDate,
        unix_millis: i64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<WeeklyPhoto, FitLogError> {
        if bytes.is_empty() {
            return Err(FitLogError::InvalidInput("photo is empty".into()));
        }
        let week_start = week_start_key(today);
        let path = photo_object_path(user_id, &week_start, unix_millis, file_name);
        let stored = self
            .backend
            .upload_object(&path, bytes, content_type_for(file_name))
            .await?;
        tracing::info!(user_id, %week_start, path = %stored, "uploaded progress photo");
        self.backend
            .insert_weekly_photo(user_id, &week_start, &stored)
            .await
    }

    /// All photos, newest week first, each with a time-limited display URL.
    ///
    /// When signing fails the stored reference is used as the URL.
    pub async fn list_with_urls(&self, user_id: &str) -> Result<Vec<SignedPhoto>, FitLogError> {
        let photos = self.backend.list_weekly_photos(user_id).await?;
        let mut signed = Vec::with_capacity(photos.len());
        for photo in photos {
            let path = storage_path(&photo.image_url, &self.bucket);
            let signed_url = match self
                .backend
                .create_signed_url(&path, self.signed_url_ttl_secs)
                .await
            {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(photo_id = %photo.id, error = %e, "signing photo url failed");
                    photo.image_url.clone()
                }
            };
            signed.push(SignedPhoto { photo, signed_url });
        }
        Ok(signed)
    }

    /// Remove the stored object, then the row.
    pub async fn delete(&self, user_id: &str, photo: &WeeklyPhoto) -> Result<(), FitLogError> {
        let path = storage_path(&photo.image_url, &self.bucket);
        self.backend.remove_objects(&[path]).await?;
        self.backend.delete_weekly_photo(user_id, &photo.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_uses_week_and_extension() {
        assert_eq!(
            photo_object_path("u1", "2026-03-02", 1772400000000, "front.PNG"),
            "u1/2026-03-02-1772400000000.png"
        );
        assert_eq!(
            photo_object_path("u1", "2026-03-02", 5, "no_extension"),
            "u1/2026-03-02-5.jpg"
        );
    }

    #[test]
    fn storage_path_passes_plain_paths_through() {
        assert_eq!(storage_path("u1/2026-03-02-5.png", "progress-photos"), "u1/2026-03-02-5.png");
    }

    #[test]
    fn storage_path_extracts_from_public_and_signed_urls() {
        let public = "https://abc.supabase.co/storage/v1/object/public/progress-photos/u1/a.png";
        assert_eq!(storage_path(public, "progress-photos"), "u1/a.png");
        let signed =
            "https://abc.supabase.co/storage/v1/object/sign/progress-photos/u1/b.jpg?token=xyz";
        assert_eq!(storage_path(signed, "progress-photos"), "u1/b.jpg");
    }

    #[test]
    fn storage_path_keeps_unrecognised_urls() {
        let other = "https://cdn.example.com/images/u1/a.png";
        assert_eq!(storage_path(other, "progress-photos"), other);
    }

    #[test]
    fn content_type_defaults_to_jpeg() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("scan"), "image/jpeg");
    }
}
