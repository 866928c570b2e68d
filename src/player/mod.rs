//! Client-side playback support
//!
//! The presentation layer owns the actual media element; this module decides
//! which stream to load next and when to give up.

pub mod alternatives;
pub mod fallback;

pub use alternatives::{AlternativesProvider, CatalogAlternatives, HttpAlternativesClient};
pub use fallback::{
    AttemptToken, FallbackController, PlaybackCommand, PlaybackOutcome, PlayerSettings,
    SessionState, Transition,
};
