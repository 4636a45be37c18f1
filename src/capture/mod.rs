pub mod screen;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::ai::ImageData;

/// Screenshot queues owned by the embedding application.
///
/// The primary queue holds the problem screenshots; the secondary (extra) queue
/// holds the screenshots taken for a debugging pass.
#[async_trait]
pub trait ScreenshotStore: Send + Sync {
    fn list_primary_queue(&self) -> Vec<PathBuf>;

    fn list_secondary_queue(&self) -> Vec<PathBuf>;

    fn clear_secondary_queue(&self);

    /// Encoded thumbnail for display next to a queued screenshot.
    async fn get_preview(&self, path: &Path) -> anyhow::Result<String>;
}

/// A screenshot read from disk and ready to send to a provider.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub path: PathBuf,
    pub image: ImageData,
    pub preview: Option<String>,
}
