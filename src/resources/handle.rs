use std::fmt::Display;

use uuid::Uuid;

/// Opaque identifier of a loaded image. A fresh handle is minted for every load, so a handle is
/// never reused for different storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle(Uuid);

impl ImageHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image:{}", self.0)
    }
}

/// Opaque identifier of a loaded font (one face at one size).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FontHandle(Uuid);

impl FontHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "font:{}", self.0)
    }
}
