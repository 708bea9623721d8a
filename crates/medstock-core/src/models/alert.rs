//! Alert settings and stock status models.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::TimeWindow;

/// Default number of days at or below which stock is critical.
pub const DEFAULT_CRITICAL_DAYS: i64 = 3;
/// Default number of days at or below which stock is low.
pub const DEFAULT_LOW_DAYS: i64 = 7;

/// Stock urgency classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Critical,
    Warning,
    Ok,
}

/// Critical/low thresholds, in days of remaining stock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thresholds {
    pub critical: i64,
    pub low: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical: DEFAULT_CRITICAL_DAYS,
            low: DEFAULT_LOW_DAYS,
        }
    }
}

/// Where a notification should go.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Push,
    Email,
    Sms,
}

/// Enablement and delivery channels for one alert condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelPreference {
    pub enabled: bool,
    pub channels: Vec<NotificationChannel>,
}

impl Default for ChannelPreference {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec![NotificationChannel::Push],
        }
    }
}

/// Per-user alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSettings {
    pub user_id: String,
    pub thresholds: Thresholds,
    pub medication_delay: ChannelPreference,
    pub low_stock: ChannelPreference,
    pub critical_stock: ChannelPreference,
    pub prescription_expiry: ChannelPreference,
    pub replenishment_request: ChannelPreference,
    pub quiet_hours_enabled: bool,
    pub quiet_hours: TimeWindow,
    pub updated_at: DateTime<Utc>,
}

impl AlertSettings {
    /// Settings with every condition enabled on push and the given thresholds.
    pub fn with_defaults(user_id: String, thresholds: Thresholds) -> Self {
        let (start, end) = default_quiet_hours();
        Self {
            user_id,
            thresholds,
            medication_delay: ChannelPreference::default(),
            low_stock: ChannelPreference::default(),
            critical_stock: ChannelPreference::default(),
            prescription_expiry: ChannelPreference::default(),
            replenishment_request: ChannelPreference::default(),
            quiet_hours_enabled: false,
            quiet_hours: TimeWindow::new(start, end),
            updated_at: Utc::now(),
        }
    }

    /// Whether `time` falls inside enabled quiet hours.
    pub fn is_quiet_at(&self, time: NaiveTime) -> bool {
        self.quiet_hours_enabled && self.quiet_hours.contains(time)
    }
}

/// 22:00 to 07:00.
fn default_quiet_hours() -> (NaiveTime, NaiveTime) {
    let start = NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default();
    (start, end)
}
