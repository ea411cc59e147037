//! Admission and storage of donation photos.

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo_types::StoredImage;
use crate::{error::AppError, storage::StorageClient};

pub const MAX_IMAGES: usize = 3;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    fn from_mime(ct: &str) -> Option<Self> {
        match ct.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Both the declared MIME type and the filename extension must be allowed.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Result<Self, AppError> {
        let by_mime = content_type.and_then(Self::from_mime);
        let by_name = file_name.and_then(Self::from_file_name);
        match (by_mime, by_name) {
            (Some(_), Some(kind)) => Ok(kind),
            _ => Err(AppError::FileType(
                "Only image files are allowed (jpeg, jpg, png, gif)".into(),
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

/// An admitted image, held in memory until the form is valid.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    pub kind: ImageKind,
    pub body: Bytes,
}

/// Fails once more than [`MAX_IMAGES`] images have been sent.
pub fn check_count(already_admitted: usize) -> Result<(), AppError> {
    if already_admitted >= MAX_IMAGES {
        return Err(AppError::invalid(
            "images",
            format!("At most {} images are allowed", MAX_IMAGES),
        ));
    }
    Ok(())
}

pub fn check_size(len: usize) -> Result<(), AppError> {
    if len > MAX_IMAGE_BYTES {
        return Err(AppError::FileTooLarge("Each image must be at most 5MB".into()));
    }
    Ok(())
}

/// Stores every image under a random filename. If one write fails, the
/// images stored so far are removed again.
pub async fn store_images(
    storage: &dyn StorageClient,
    uploads: Vec<ImageUpload>,
) -> anyhow::Result<Vec<StoredImage>> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let filename = format!("{}.{}", Uuid::new_v4().simple(), upload.kind.extension());
        if let Err(e) = storage
            .put_object(&filename, upload.body, upload.kind.content_type())
            .await
        {
            discard_images(storage, &stored).await;
            return Err(e);
        }
        debug!(%filename, original = %upload.original_name, "image stored");
        stored.push(StoredImage {
            url: storage.public_url(&filename),
            filename,
            original_name: upload.original_name,
        });
    }
    Ok(stored)
}

/// Best-effort removal; failures are only logged.
pub async fn discard_images(storage: &dyn StorageClient, images: &[StoredImage]) {
    for image in images {
        if let Err(e) = storage.delete_object(&image.filename).await {
            warn!(error = %e, filename = %image.filename, "failed to remove stored image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStorage;

    #[test]
    fn mime_and_extension_must_both_be_images() {
        assert_eq!(
            ImageKind::detect(Some("image/png"), Some("nasi.PNG")).unwrap(),
            ImageKind::Png
        );
        assert_eq!(
            ImageKind::detect(Some("image/jpeg"), Some("roti.jpeg")).unwrap(),
            ImageKind::Jpeg
        );
        assert!(matches!(
            ImageKind::detect(Some("image/png"), Some("script.exe")),
            Err(AppError::FileType(_))
        ));
        assert!(matches!(
            ImageKind::detect(Some("application/pdf"), Some("menu.png")),
            Err(AppError::FileType(_))
        ));
        assert!(matches!(
            ImageKind::detect(None, Some("menu.png")),
            Err(AppError::FileType(_))
        ));
        assert!(matches!(
            ImageKind::detect(Some("image/webp"), Some("menu.webp")),
            Err(AppError::FileType(_))
        ));
    }

    #[test]
    fn count_and_size_limits() {
        assert!(check_count(2).is_ok());
        assert!(matches!(check_count(3), Err(AppError::Validation(_))));
        assert!(check_size(MAX_IMAGE_BYTES).is_ok());
        assert!(matches!(
            check_size(MAX_IMAGE_BYTES + 1),
            Err(AppError::FileTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn stored_images_get_random_names_and_keep_originals() {
        let storage = RecordingStorage::default();
        let stored = store_images(
            &storage,
            vec![ImageUpload {
                original_name: "sayur.jpg".into(),
                kind: ImageKind::Jpeg,
                body: Bytes::from_static(b"jpg"),
            }],
        )
        .await
        .unwrap();

        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].filename, "sayur.jpg");
        assert!(stored[0].filename.ends_with(".jpg"));
        assert_eq!(stored[0].original_name, "sayur.jpg");
        assert_eq!(stored[0].url, format!("/uploads/{}", stored[0].filename));
        assert_eq!(storage.keys().await, vec![stored[0].filename.clone()]);

        discard_images(&storage, &stored).await;
        assert!(storage.keys().await.is_empty());
    }
}
