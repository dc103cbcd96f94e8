//! Error types for the shared vocabulary.

use thiserror::Error;

/// Errors raised while decoding vocabulary values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// A reaction or annotation name outside the fixed spectrum.
    #[error("unrecognised annotation {0:?} (code {1})")]
    UnknownAnnotation(String, String),
}

impl ProtoError {
    /// Build an [`ProtoError::UnknownAnnotation`] carrying the code points of
    /// the offending text, which is what operators need to spot look-alike emoji.
    pub fn unknown_annotation(text: &str) -> Self {
        let codes = text
            .chars()
            .map(|c| format!("{:#x}", c as u32))
            .collect::<Vec<_>>()
            .join(" ");
        Self::UnknownAnnotation(text.to_string(), codes)
    }
}
