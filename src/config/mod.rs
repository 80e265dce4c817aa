// ==========================================
// Scolaris - Couche configuration
// ==========================================

pub mod thresholds;

pub use thresholds::AlertThresholds;
