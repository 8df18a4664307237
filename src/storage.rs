// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for capture artifacts

use crate::constants::app_info::APP_DIR;
use crate::pipelines::artifact::CaptureArtifact;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where artifacts are saved when nothing is configured (~/Downloads)
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Config file location (~/.config/eyecam)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Write an artifact into `dir` under its fixed name
///
/// The directory is created when missing. An existing file of the same
/// name is replaced, the same way a repeated download would be.
pub async fn save_artifact(dir: &Path, artifact: &CaptureArtifact) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(artifact.file_name());
    debug!(path = %path.display(), size = artifact.len(), "Writing artifact");
    tokio::fs::write(&path, &artifact.bytes).await?;
    info!(path = %path.display(), kind = ?artifact.kind, "Artifact saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("captures");

        let photo = CaptureArtifact::photo(vec![1, 2, 3]);
        let path = save_artifact(&nested, &photo).await.unwrap();
        assert_eq!(path, nested.join("photo.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);

        let again = CaptureArtifact::photo(vec![9]);
        save_artifact(&nested, &again).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_video_and_photo_coexist() {
        let dir = tempfile::tempdir().unwrap();
        save_artifact(dir.path(), &CaptureArtifact::photo(vec![1]))
            .await
            .unwrap();
        save_artifact(dir.path(), &CaptureArtifact::video(vec![2]))
            .await
            .unwrap();
        assert!(dir.path().join("photo.png").exists());
        assert!(dir.path().join("video.webm").exists());
    }
}
