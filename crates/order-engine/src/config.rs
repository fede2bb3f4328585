//! Engine configuration loaded from environment variables.

use common::Money;

/// Engine tunables with sensible defaults.
///
/// Reads from environment variables:
/// - `GST_RATE_BPS` — tax rate in basis points (default: `500` = 5%)
/// - `DELIVERY_CHARGE_PAISE` — flat delivery charge in paise (default: `5000` = ₹50)
/// - `ENGINE_MAX_RETRIES` — optimistic-retry attempts per write (default: `5`)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gst_rate_bps: u32,
    pub delivery_charge: Money,
    pub max_retries: u32,
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            gst_rate_bps: std::env::var("GST_RATE_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            delivery_charge: std::env::var("DELIVERY_CHARGE_PAISE")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Money::from_paise)
                .unwrap_or_else(|| Money::from_rupees(50)),
            max_retries: std::env::var("ENGINE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gst_rate_bps: 500,
            delivery_charge: Money::from_rupees(50),
            max_retries: 5,
        }
    }
}
