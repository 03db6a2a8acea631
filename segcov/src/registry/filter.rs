//! Image eligibility filtering
//!
//! Decides, once per image, whether its routines are registered at all.
//! Checks run in a fixed order and the first failing one rejects the image:
//!
//! 1. Main executable, or library inclusion enabled
//! 2. Name matches no exclusion substring (unless exclusions are disabled)
//! 3. Name contains the image filter substring, if one is configured

use super::ImageInfo;

/// Common system runtime libraries excluded by default
pub const DEFAULT_EXCLUSIONS: &str =
    "libc.so,ld-linux,libm.so,libpthread,libdl.so,libstdc++,libc++";

/// Split a comma-separated exclusion list, ignoring empty patterns
#[must_use]
pub fn parse_exclusions(list: &str) -> Vec<String> {
    list.split(',').filter(|p| !p.is_empty()).map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFilter {
    pub include_libs: bool,
    pub exclusions: Vec<String>,
    pub exclusions_disabled: bool,
    pub name_filter: Option<String>,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self {
            include_libs: true,
            exclusions: parse_exclusions(DEFAULT_EXCLUSIONS),
            exclusions_disabled: false,
            name_filter: None,
        }
    }
}

impl ImageFilter {
    /// Whether routines of `image` should be registered and instrumented
    #[must_use]
    pub fn admits(&self, image: &ImageInfo) -> bool {
        if !self.include_libs && !image.is_main_executable {
            return false;
        }
        if self.is_excluded(&image.path) {
            return false;
        }
        match self.name_filter.as_deref() {
            Some(filter) if !filter.is_empty() => image.path.contains(filter),
            _ => true,
        }
    }

    fn is_excluded(&self, image_name: &str) -> bool {
        !self.exclusions_disabled
            && self.exclusions.iter().any(|pattern| image_name.contains(pattern.as_str()))
    }
}
