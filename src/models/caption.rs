// Caption data models
use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Handle to an image used as inference input. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum ImageReference {
    Local(PathBuf),
    Remote(Url),
}

impl ImageReference {
    /// Reference a local image file, which must exist
    pub fn local(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let raw = path.to_string_lossy();
        if raw.trim().is_empty() {
            return Err(InputError::EmptyReference);
        }
        if raw.contains('\n') || raw.contains('\r') {
            return Err(InputError::LineBreak);
        }
        if !path.is_file() {
            return Err(InputError::ImageNotFound(raw.to_string()));
        }
        Ok(ImageReference::Local(path.to_path_buf()))
    }

    pub fn remote(url: &str) -> Result<Self, InputError> {
        let parsed = Url::parse(url.trim())
            .map_err(|_| InputError::UnsupportedScheme(url.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(ImageReference::Remote(parsed)),
            other => Err(InputError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Accepts either an http(s) URL or a local path
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyReference);
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::remote(trimmed)
        } else {
            Self::local(trimmed)
        }
    }

    /// Rebuild a reference read back from storage without touching the filesystem.
    /// Images confirmed in the past may since have been removed.
    pub(crate) fn from_stored(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyReference);
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::remote(trimmed)
        } else {
            Ok(ImageReference::Local(PathBuf::from(trimmed)))
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::Local(path) => write!(f, "{}", path.display()),
            ImageReference::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Distinct caption candidates for one image, in the order they were first produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSet {
    captions: Vec<String>,
    pub attempts: u32,
    pub target_count: usize,
    pub sampling_budget: u32,
    /// Budget ran out before `target_count` distinct captions were found
    pub exhausted: bool,
}

impl CaptionSet {
    pub fn new(target_count: usize, sampling_budget: u32) -> Self {
        Self {
            captions: Vec::new(),
            attempts: 0,
            target_count,
            sampling_budget,
            exhausted: false,
        }
    }

    /// Returns true when the caption was not already present. Blank captions are ignored.
    pub fn insert(&mut self, caption: &str) -> bool {
        let caption = caption.trim();
        if caption.is_empty() || self.contains(caption) {
            return false;
        }
        self.captions.push(caption.to_string());
        true
    }

    pub fn contains(&self, caption: &str) -> bool {
        let caption = caption.trim();
        self.captions.iter().any(|c| c == caption)
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn captions(&self) -> &[String] {
        &self.captions
    }

    pub fn into_captions(self) -> Vec<String> {
        self.captions
    }
}
