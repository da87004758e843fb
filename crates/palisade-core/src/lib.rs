//! Palisade core: a synchronous content guard for user-supplied text.
//!
//! Text goes in, a verdict comes out: allow, soften, or block. Matching is
//! robust against the usual evasion channels (leet digits, homoglyph
//! lookalikes, separator stuffing, stretched letters) and combines
//! weighted context scoring, numeric age statements, prompt-injection
//! patterns, and per-caller rate limiting.
//!
//! ```
//! use palisade_core::{Action, ContentGuard};
//!
//! let guard = ContentGuard::new();
//! let verdict = guard.assess("17 year old character");
//! assert_eq!(verdict.action, Action::Block);
//! assert!(verdict.reason.starts_with("minor_age"));
//! ```
//!
//! [`ContentGuard`] instances own their configuration and rate buckets;
//! the free functions at the crate root wrap one shared default instance
//! for hosts that want a singleton.

mod config;
mod engine;
mod error;
mod injection;
mod lexicon;
mod matcher;
mod normalize;
mod rate_limit;
mod scorer;

pub use config::{GuardConfig, GuardConfigPatch};
pub use engine::{Action, Assessment, ContentGuard};
pub use error::{GuardError, Result};
pub use lexicon::{Category, Lexicon, LexiconEntry};
pub use matcher::{MatchKind, TermMatch};
pub use normalize::normalize_text;
pub use rate_limit::RateLimiter;

use once_cell::sync::Lazy;

static DEFAULT_GUARD: Lazy<ContentGuard> = Lazy::new(ContentGuard::new);

/// Assesses text against the shared default guard.
pub fn assess(text: &str) -> Assessment {
    DEFAULT_GUARD.assess(text)
}

/// Assesses text against the shared default guard, counting the request
/// toward `caller_key`'s rate window.
pub fn assess_with_caller(text: &str, caller_key: &str) -> Assessment {
    DEFAULT_GUARD.assess_with_caller(text, caller_key)
}

/// Returns a snapshot of the shared guard's configuration.
pub fn get_config() -> GuardConfig {
    DEFAULT_GUARD.config()
}

/// Merges a patch into the shared guard's configuration.
pub fn update_config(patch: &GuardConfigPatch) -> Result<()> {
    DEFAULT_GUARD.update_config(patch)
}

/// Same semantics as [`update_config`].
pub fn load_config(patch: &GuardConfigPatch) -> Result<()> {
    DEFAULT_GUARD.load_config(patch)
}

/// Restores the shared guard's configuration to its defaults.
pub fn reset_config() {
    DEFAULT_GUARD.reset_config()
}
