//! Image size selector

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of image sizes a client may request.
///
/// Each size maps to one binary field on template and variant records; the
/// field names themselves live in [`crate::config::ImageFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Thumbnail,
    Small,
    Medium,
    Large,
    Original,
}

impl ImageSize {
    pub const ALL: [ImageSize; 5] = [
        ImageSize::Thumbnail,
        ImageSize::Small,
        ImageSize::Medium,
        ImageSize::Large,
        ImageSize::Original,
    ];

    /// Longest edge in pixels of the stored rendition.
    pub fn pixels(&self) -> u32 {
        match self {
            ImageSize::Thumbnail => 128,
            ImageSize::Small => 256,
            ImageSize::Medium => 512,
            ImageSize::Large => 1024,
            ImageSize::Original => 1920,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Thumbnail => "thumbnail",
            ImageSize::Small => "small",
            ImageSize::Medium => "medium",
            ImageSize::Large => "large",
            ImageSize::Original => "original",
        }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::Medium
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "thumbnail" | "128" => Ok(ImageSize::Thumbnail),
            "small" | "256" => Ok(ImageSize::Small),
            "medium" | "512" => Ok(ImageSize::Medium),
            "large" | "1024" => Ok(ImageSize::Large),
            "original" | "1920" => Ok(ImageSize::Original),
            other => Err(format!("unknown image size: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_parse() {
        assert_eq!("Thumbnail".parse::<ImageSize>().unwrap(), ImageSize::Thumbnail);
        assert_eq!("1024".parse::<ImageSize>().unwrap(), ImageSize::Large);
        assert!("huge".parse::<ImageSize>().is_err());
    }

    #[test]
    fn test_image_size_display_matches_parse() {
        for size in ImageSize::ALL {
            assert_eq!(size.to_string().parse::<ImageSize>().unwrap(), size);
        }
    }
}
