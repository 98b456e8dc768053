use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("no such node: {0}")]
    UnknownNode(u32),

    #[error("image failed to load: {0}")]
    Load(String),

    #[error("image could not be encoded: {0}")]
    Encoding(String),
}

/// Synthetic events dispatched on a filled field so page-side reactive
/// validation observes the change as if typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticEvent {
    Input,
    Change,
    KeyUp,
    Focus,
    Blur,
}

/// Page operations the resolver needs from whatever hosts the document.
///
/// Implementations exist per host: a snapshot-file backend for offline runs
/// and mocks in tests; a live backend would forward these to the page.
#[async_trait]
pub trait PageBackend: Send + Sync {
    /// Resolve once the image resource has finished loading; resolves
    /// immediately if it already has. The caller applies the load timeout.
    async fn await_image_load(&self, image: u32) -> Result<(), PageError>;

    /// Lossless base64 encoding of the image pixels at natural size, with
    /// any data-URI/format prefix stripped. Fails when the pixel data is not
    /// readable (the cross-origin tainted case on a live page).
    async fn encode_image(&self, image: u32) -> Result<String, PageError>;

    /// Replace the field's current value wholesale.
    async fn set_value(&self, field: u32, value: &str) -> Result<(), PageError>;

    /// Dispatch one synthetic event on the field.
    async fn dispatch(&self, field: u32, event: SyntheticEvent) -> Result<(), PageError>;
}
