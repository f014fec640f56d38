//! Guardrail tuning parameters.

/// Retry policy for retriable provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Initial backoff delay.
    pub base_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub factor: u32,
    /// Maximum number of attempts, including the first.
    pub max_tries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_ms: 200,
            factor: 2,
            max_tries: 3,
        }
    }
}

/// Tuning parameters for one [`crate::CoverageAgent`].
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    /// Retrieval depth for the exclusion probe.
    pub k_exclusion: usize,
    /// Retrieval depth for the inclusion probe.
    pub k_inclusion: usize,
    /// Retrieval depth for the financial probe.
    pub k_financial: usize,
    /// Confidence threshold above which an exclusion evaluation is
    /// decisive. Deployments should prefer lowering this over raising it:
    /// false negatives here are the one catastrophic failure mode (`spec`
    /// §4.6).
    pub tau_exclusion: f32,
    /// Confidence threshold above which an inclusion evaluation is
    /// decisive.
    pub tau_inclusion: f32,
    /// Maximum number of concurrent `evaluate_*` calls within one probe
    /// step.
    pub fanout_limit: usize,
    /// Retry policy for retriable provider failures.
    pub retry: RetryConfig,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            k_exclusion: 8,
            k_inclusion: 8,
            k_financial: 4,
            tau_exclusion: 0.6,
            tau_inclusion: 0.6,
            fanout_limit: 4,
            retry: RetryConfig::default(),
        }
    }
}

impl GuardrailConfig {
    /// Starts from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exclusion-probe retrieval depth.
    #[must_use]
    pub const fn with_k_exclusion(mut self, k: usize) -> Self {
        self.k_exclusion = k;
        self
    }

    /// Sets the inclusion-probe retrieval depth.
    #[must_use]
    pub const fn with_k_inclusion(mut self, k: usize) -> Self {
        self.k_inclusion = k;
        self
    }

    /// Sets the financial-probe retrieval depth.
    #[must_use]
    pub const fn with_k_financial(mut self, k: usize) -> Self {
        self.k_financial = k;
        self
    }

    /// Sets the exclusion-evaluation confidence threshold.
    #[must_use]
    pub const fn with_tau_exclusion(mut self, tau: f32) -> Self {
        self.tau_exclusion = tau;
        self
    }

    /// Sets the inclusion-evaluation confidence threshold.
    #[must_use]
    pub const fn with_tau_inclusion(mut self, tau: f32) -> Self {
        self.tau_inclusion = tau;
        self
    }

    /// Sets the per-probe concurrent evaluation fan-out limit.
    #[must_use]
    pub const fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit;
        self
    }
}
