// SPDX-License-Identifier: MPL-2.0

//! Downloadable capture results

use crate::constants::capture;
use chrono::{DateTime, Local};

/// What a capture produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Photo,
    Video,
}

impl ArtifactKind {
    /// Fixed download name
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Photo => capture::PHOTO_FILE_NAME,
            ArtifactKind::Video => capture::VIDEO_FILE_NAME,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ArtifactKind::Photo => capture::PHOTO_MIME,
            ArtifactKind::Video => capture::VIDEO_MIME,
        }
    }
}

/// Encoded photo or video held in memory until saved
#[derive(Clone)]
pub struct CaptureArtifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Local>,
}

impl CaptureArtifact {
    pub fn photo(bytes: Vec<u8>) -> Self {
        Self::new(ArtifactKind::Photo, bytes)
    }

    pub fn video(bytes: Vec<u8>) -> Self {
        Self::new(ArtifactKind::Video, bytes)
    }

    fn new(kind: ArtifactKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            bytes,
            created_at: Local::now(),
        }
    }

    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for CaptureArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureArtifact")
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}
