//! Lowering pipeline configuration.
//!
//! Typed options with a bon builder and environment variable fallbacks.

use bon::bon;

/// Default cap on inline expansion rounds.
pub const DEFAULT_MAX_INLINE_ROUNDS: usize = 64;

/// Options of [`lower_function`](crate::pipeline::lower_function).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowerOptions {
    /// Rounds of inline expansion before giving up with an error.
    pub max_inline_rounds: usize,
    /// Whether barrier insertion runs after GPU loop lowering.
    pub insert_barriers: bool,
}

#[bon]
impl LowerOptions {
    /// Create lowering options with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = DEFAULT_MAX_INLINE_ROUNDS)] max_inline_rounds: usize,
        #[builder(default = true)] insert_barriers: bool,
    ) -> Self {
        Self { max_inline_rounds, insert_barriers }
    }

    /// Create options from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSEL_INLINE_MAX_ROUNDS` - Inline expansion round cap (default: 64)
    /// * `TESSEL_NO_SYNC` - Skip barrier insertion if set
    pub fn from_env() -> Self {
        let max_inline_rounds = std::env::var("TESSEL_INLINE_MAX_ROUNDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&rounds: &usize| rounds > 0)
            .unwrap_or(DEFAULT_MAX_INLINE_ROUNDS);
        let insert_barriers = std::env::var("TESSEL_NO_SYNC").is_err();

        Self { max_inline_rounds, insert_barriers }
    }
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
