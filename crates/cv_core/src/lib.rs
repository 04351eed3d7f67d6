//! ClearVoice core - speech isolation pipeline.
//!
//! Extracts the audio track from a media file, splits it into overlapping
//! chunks, filters each chunk in parallel through a noise/music-suppression
//! model, and crossfades the filtered chunks back into one continuous track.
//! All business logic lives here with no CLI dependencies.

pub mod chunking;
pub mod config;
pub mod engine;
pub mod filter;
pub mod logging;
pub mod media;
pub mod merge;
pub mod orchestrator;

pub use engine::{Engine, IsolationOutput};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
