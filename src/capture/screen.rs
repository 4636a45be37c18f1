use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::join_all;
use std::path::{Path, PathBuf};

use super::{ScreenshotStore, Screenshot};
use crate::ai::ImageData;
use crate::error::{AiResult, ProviderError};

pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Drops queued paths that no longer exist on disk, keeping queue order.
pub async fn existing_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let checks = join_all(paths.iter().map(|path| tokio::fs::try_exists(path))).await;
    paths
        .into_iter()
        .zip(checks)
        .filter_map(|(path, exists)| match exists {
            Ok(true) => Some(path),
            _ => {
                log::debug!("Skipping missing screenshot {}", path.display());
                None
            }
        })
        .collect()
}

async fn load_one(
    path: PathBuf,
    store: Option<&dyn ScreenshotStore>,
) -> Option<Screenshot> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Failed to read screenshot {}: {}", path.display(), e);
            return None;
        }
    };

    let preview = match store {
        Some(store) => match store.get_preview(&path).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                log::warn!("No preview for {}: {:#}", path.display(), e);
                None
            }
        },
        None => None,
    };

    Some(Screenshot {
        image: ImageData {
            data: STANDARD.encode(bytes),
            media_type: media_type_for(&path),
        },
        path,
        preview,
    })
}

/// Reads every path concurrently, preserving order and skipping files that fail.
///
/// Previews are fetched from `store` when one is given. Fails only when no
/// screenshot at all could be read.
pub async fn load_screenshots(
    paths: Vec<PathBuf>,
    store: Option<&dyn ScreenshotStore>,
) -> AiResult<Vec<Screenshot>> {
    let requested = paths.len();
    let loaded: Vec<Screenshot> = join_all(paths.into_iter().map(|path| load_one(path, store)))
        .await
        .into_iter()
        .flatten()
        .collect();

    if loaded.is_empty() {
        return Err(ProviderError::generic("Failed to load screenshot data"));
    }
    if loaded.len() < requested {
        log::warn!(
            "Loaded {} of {} screenshots",
            loaded.len(),
            requested
        );
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(media_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("noext")), "image/png");
    }

    #[tokio::test]
    async fn test_existing_paths_filters_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.png");
        std::fs::write(&present, b"png").unwrap();
        let missing = dir.path().join("gone.png");

        let kept = existing_paths(vec![missing, present.clone()]).await;
        assert_eq!(kept, vec![present]);
    }

    #[tokio::test]
    async fn test_load_skips_unreadable_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("1.png");
        let second = dir.path().join("2.jpg");
        std::fs::write(&first, b"one").unwrap();
        std::fs::write(&second, b"two").unwrap();

        let shots = load_screenshots(
            vec![first.clone(), dir.path().join("missing.png"), second.clone()],
            None,
        )
        .await
        .unwrap();

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].path, first);
        assert_eq!(shots[0].image.data, STANDARD.encode(b"one"));
        assert_eq!(shots[1].image.media_type, "image/jpeg");
        assert!(shots[1].preview.is_none());
    }

    #[tokio::test]
    async fn test_load_all_failed() {
        let err = load_screenshots(vec![PathBuf::from("/nonexistent/x.png")], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Generic);
        assert_eq!(err.message, "Failed to load screenshot data");
    }
}
