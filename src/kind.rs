//! Image-kind inference
//!
//! Whole-slide files tag their auxiliary images through the free-text
//! ImageDescription: a word "label" marks the slide-label photo, a
//! word "macro" the low-power overview. The first IFD is always the
//! base image. This is read-only metadata inference; nothing in the
//! tile paths depends on it.

use lazy_static::lazy_static;
use regex::Regex;

use crate::tiff::constants::tags;
use crate::tiff::ifd::Ifd;

lazy_static! {
    static ref LABEL_RE: Regex = Regex::new(r"(?i)\blabel\b").unwrap();
    static ref MACRO_RE: Regex = Regex::new(r"(?i)\bmacro\b").unwrap();
}

/// Role of one image within a multi-image document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// The first, full-resolution image
    Base,
    /// Slide-label photograph
    Label,
    /// Low-power overview photograph
    Macro,
    /// Anything else (pyramid levels, pages, masks)
    Ordinary,
}

/// Classifies one IFD given its position in the chain
pub fn classify(number: usize, ifd: &Ifd) -> ImageKind {
    if number == 0 {
        return ImageKind::Base;
    }

    let description = ifd
        .get(tags::IMAGE_DESCRIPTION)
        .and_then(|v| v.as_ascii())
        .unwrap_or("");

    if LABEL_RE.is_match(description) {
        ImageKind::Label
    } else if MACRO_RE.is_match(description) {
        ImageKind::Macro
    } else {
        ImageKind::Ordinary
    }
}
