//! Composite cache keys.
//!
//! Every dimension a cached value depends on is part of its key. Locale only
//! appears where display names are cached.

use decilo_core::{ImageSize, Selection, TemplateId, VariantId};
use std::fmt;

/// Key of a template metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub template: TemplateId,
    pub locale: String,
}

impl SnapshotKey {
    pub fn new(template: TemplateId, locale: impl Into<String>) -> Self {
        Self {
            template,
            locale: locale.into(),
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snapshot:{}:{}", self.template, self.locale)
    }
}

/// Key of a full variant image lookup result.
///
/// The selection is stored as normalised pairs, so selections differing only
/// in case, padding or order share one entry. Pairs are kept structured
/// because attribute and value names may contain any delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageResultKey {
    pub template: TemplateId,
    pub size: ImageSize,
    pub selection: Vec<(String, String)>,
}

impl ImageResultKey {
    pub fn new(template: TemplateId, size: ImageSize, selection: &Selection) -> Self {
        Self {
            template,
            size,
            selection: selection.normalized_pairs(),
        }
    }
}

impl fmt::Display for ImageResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image:{}:{}:", self.template, self.size.as_str())?;
        for (index, (attribute, value)) in self.selection.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            write!(f, "{:?}={:?}", attribute, value)?;
        }
        Ok(())
    }
}

/// Key of one variant's own image at one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantImageKey {
    pub variant: VariantId,
    pub size: ImageSize,
}

impl VariantImageKey {
    pub fn new(variant: VariantId, size: ImageSize) -> Self {
        Self { variant, size }
    }
}

/// Key of a template's fallback image at one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateImageKey {
    pub template: TemplateId,
    pub size: ImageSize,
}

impl TemplateImageKey {
    pub fn new(template: TemplateId, size: ImageSize) -> Self {
        Self { template, size }
    }
}
