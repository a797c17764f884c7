//! Per-peer output file layout
//!
//! ```text
//! <live>/<peer>.m3u8               master playlist
//! <live>/<peer>-video.sdp          description read by the video encoder
//! <live>/<peer>-video.m3u8         video index written by the encoder
//! <live>/video_<peer>_000.ts ...   video segments
//! (same for audio)
//! ```

use std::path::{Path, PathBuf};

use crate::engine::MediaKind;

/// Paths of every file a packaging session reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    dir: PathBuf,
    stem: String,
}

impl OutputPaths {
    pub fn new(dir: impl Into<PathBuf>, peer_id: &str) -> Self {
        Self {
            dir: dir.into(),
            stem: file_stem(peer_id),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filesystem-safe form of the peer id used in every file name
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn description(&self, kind: MediaKind) -> PathBuf {
        self.dir.join(format!("{}-{}.sdp", self.stem, kind))
    }

    /// File name of a per-kind playlist, relative to the master playlist
    pub fn playlist_name(&self, kind: MediaKind) -> String {
        format!("{}-{}.m3u8", self.stem, kind)
    }

    pub fn playlist(&self, kind: MediaKind) -> PathBuf {
        self.dir.join(self.playlist_name(kind))
    }

    /// printf-style segment template handed to the encoder
    pub fn segment_template(&self, kind: MediaKind) -> PathBuf {
        self.dir.join(format!("{}_{}_%03d.ts", kind, self.stem))
    }

    pub fn master(&self) -> PathBuf {
        self.dir.join(format!("{}.m3u8", self.stem))
    }

    /// Whether a file name in the live directory belongs to this peer
    pub fn owns(&self, file_name: &str) -> bool {
        let master = format!("{}.m3u8", self.stem);
        if file_name == master {
            return true;
        }

        for kind in [MediaKind::Video, MediaKind::Audio] {
            let description = format!("{}-{}.sdp", self.stem, kind);
            let playlist = self.playlist_name(kind);
            if file_name == description
                || file_name == playlist
                || file_name
                    .strip_prefix(playlist.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            {
                return true;
            }

            let segment_prefix = format!("{}_{}_", kind, self.stem);
            if let Some(rest) = file_name.strip_prefix(segment_prefix.as_str()) {
                let digits = rest.split('.').next().unwrap_or_default();
                if !digits.is_empty()
                    && digits.bytes().all(|b| b.is_ascii_digit())
                    && rest[digits.len()..].starts_with(".ts")
                {
                    return true;
                }
            }
        }

        false
    }
}

/// Replace everything outside `[A-Za-z0-9_-]` so the id is safe in a file name
fn file_stem(peer_id: &str) -> String {
    peer_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
