use std::sync::{Mutex, PoisonError};

use crate::resources::{FontHandle, ImageHandle};

/// Coarse classification of a [`DrawError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed something unusable (bad handle, empty string, out-of-range cell).
    Argument,
    /// A job or resource node could not be allocated.
    Allocation,
    /// The drawing, decoding or font backend reported a failure.
    Backend,
    /// The calling thread does not hold the rendering context.
    Affinity,
}

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("Invalid image handle {0}")]
    InvalidImageHandle(ImageHandle),

    #[error("Invalid font handle {0}")]
    InvalidFontHandle(FontHandle),

    #[error("No font named '{0}' is loaded")]
    UnknownFont(String),

    #[error("No font is currently selected")]
    NoCurrentFont,

    #[error("Resource {0} is pending release and cannot be acquired")]
    ResourcePendingFree(String),

    #[error("Reference count of {0} is already zero")]
    RefCountUnderflow(String),

    #[error("Cannot draw empty text")]
    EmptyText,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Sprite cell ({column}, {row}) is outside the {columns}x{rows} grid")]
    SpriteCellOutOfRange {
        column: u32,
        row: u32,
        columns: u32,
        rows: u32,
    },

    #[error("Animation has no sequence named '{0}'")]
    UnknownSequence(String),

    #[error("Animation already has a sequence named '{0}'")]
    DuplicateSequence(String),

    #[error("Sequence frame period cannot be zero")]
    ZeroFramePeriod,

    #[error("Resource '{0}' could not be found")]
    ResourceNotFound(String),

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Backend error: {context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Calling thread does not hold the rendering context")]
    NotRenderThread,

    #[error("Binding the rendering context failed: {0}")]
    Bind(#[source] anyhow::Error),

    #[error("Internal lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl DrawError {
    /// Wraps a backend failure together with what the core was trying to do.
    pub fn backend(context: impl Into<String>, source: anyhow::Error) -> Self {
        DrawError::Backend {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DrawError::InvalidImageHandle(_)
            | DrawError::InvalidFontHandle(_)
            | DrawError::UnknownFont(_)
            | DrawError::NoCurrentFont
            | DrawError::ResourcePendingFree(_)
            | DrawError::RefCountUnderflow(_)
            | DrawError::EmptyText
            | DrawError::InvalidArgument(_)
            | DrawError::SpriteCellOutOfRange { .. }
            | DrawError::UnknownSequence(_)
            | DrawError::DuplicateSequence(_)
            | DrawError::ZeroFramePeriod
            | DrawError::ResourceNotFound(_)
            | DrawError::Config(_) => ErrorKind::Argument,
            DrawError::Allocation(_) => ErrorKind::Allocation,
            DrawError::Backend { .. } | DrawError::Poisoned(_) | DrawError::Io(_) => {
                ErrorKind::Backend
            }
            DrawError::NotRenderThread | DrawError::Bind(_) => ErrorKind::Affinity,
        }
    }
}

pub type Result<T, E = DrawError> = std::result::Result<T, E>;

/// Process-wide "what went wrong last" slot, overwritten by every new failure.
#[derive(Debug, Default)]
pub struct LastError {
    message: Mutex<Option<String>>,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, err: &DrawError) {
        let mut slot = self.message.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(err.to_string());
    }

    pub fn get(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
