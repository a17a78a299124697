use serde::{Deserialize, Serialize};

/// Rolling activity counters feeding the demand signal: inquiries over the
/// last 24 hours plus bookings over the last 7 days. A periodic job resets
/// the window; both operations are idempotent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandWindow {
    pub inquiries_24h: u32,
    pub bookings_7d: u32,
}

impl DemandWindow {
    pub fn record_inquiry(&mut self) {
        self.inquiries_24h = self.inquiries_24h.saturating_add(1);
    }

    pub fn record_booking(&mut self) {
        self.bookings_7d = self.bookings_7d.saturating_add(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn activity(&self) -> u32 {
        self.inquiries_24h.saturating_add(self.bookings_7d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandLevel {
    Low,
    Normal,
    High,
    VeryHigh,
}

impl DemandLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// Bucket the rolling activity count into a demand level and score.
pub fn bucket(window: &DemandWindow) -> (DemandLevel, u8) {
    match window.activity() {
        0..=4 => (DemandLevel::Low, 30),
        5..=9 => (DemandLevel::Normal, 50),
        10..=19 => (DemandLevel::High, 70),
        _ => (DemandLevel::VeryHigh, 90),
    }
}
