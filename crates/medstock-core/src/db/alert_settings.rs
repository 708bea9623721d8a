//! Alert settings database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{AlertSettings, ChannelPreference, Thresholds, TimeWindow};

const SETTINGS_COLUMNS: &str = "user_id, critical_stock_threshold, low_stock_threshold, \
     medication_delay, low_stock, critical_stock, prescription_expiry, replenishment_request, \
     quiet_hours_enabled, quiet_hours_start, quiet_hours_end, updated_at";

impl Database {
    /// Insert settings unless the user already has some.
    ///
    /// Returns `true` if a row was created.
    pub fn insert_alert_settings_if_absent(&self, settings: &AlertSettings) -> DbResult<bool> {
        let rows_affected = self.write_alert_settings("INSERT OR IGNORE", settings)?;
        Ok(rows_affected > 0)
    }

    /// Insert or replace a user's settings.
    pub fn save_alert_settings(&self, settings: &AlertSettings) -> DbResult<()> {
        self.write_alert_settings("INSERT OR REPLACE", settings)?;
        Ok(())
    }

    fn write_alert_settings(&self, verb: &str, settings: &AlertSettings) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            &format!(
                "{} INTO alert_settings ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                verb, SETTINGS_COLUMNS
            ),
            params![
                settings.user_id,
                settings.thresholds.critical,
                settings.thresholds.low,
                serde_json::to_string(&settings.medication_delay)?,
                serde_json::to_string(&settings.low_stock)?,
                serde_json::to_string(&settings.critical_stock)?,
                serde_json::to_string(&settings.prescription_expiry)?,
                serde_json::to_string(&settings.replenishment_request)?,
                settings.quiet_hours_enabled,
                settings.quiet_hours.start,
                settings.quiet_hours.end,
                settings.updated_at,
            ],
        )?;
        Ok(rows_affected)
    }

    /// Get a user's settings, if they have been created.
    pub fn get_alert_settings(&self, user_id: &str) -> DbResult<Option<AlertSettings>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM alert_settings WHERE user_id = ?", SETTINGS_COLUMNS),
                [user_id],
                SettingsRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }
}

/// Intermediate row struct for database mapping.
struct SettingsRow {
    user_id: String,
    critical: i64,
    low: i64,
    medication_delay: String,
    low_stock: String,
    critical_stock: String,
    prescription_expiry: String,
    replenishment_request: String,
    quiet_hours_enabled: bool,
    quiet_hours_start: chrono::NaiveTime,
    quiet_hours_end: chrono::NaiveTime,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl SettingsRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            critical: row.get(1)?,
            low: row.get(2)?,
            medication_delay: row.get(3)?,
            low_stock: row.get(4)?,
            critical_stock: row.get(5)?,
            prescription_expiry: row.get(6)?,
            replenishment_request: row.get(7)?,
            quiet_hours_enabled: row.get(8)?,
            quiet_hours_start: row.get(9)?,
            quiet_hours_end: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<SettingsRow> for AlertSettings {
    type Error = DbError;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        let pref = |json: &str| -> Result<ChannelPreference, DbError> { Ok(serde_json::from_str(json)?) };

        Ok(AlertSettings {
            user_id: row.user_id,
            thresholds: Thresholds {
                critical: row.critical,
                low: row.low,
            },
            medication_delay: pref(&row.medication_delay)?,
            low_stock: pref(&row.low_stock)?,
            critical_stock: pref(&row.critical_stock)?,
            prescription_expiry: pref(&row.prescription_expiry)?,
            replenishment_request: pref(&row.replenishment_request)?,
            quiet_hours_enabled: row.quiet_hours_enabled,
            quiet_hours: TimeWindow::new(row.quiet_hours_start, row.quiet_hours_end),
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationChannel;

    #[test]
    fn test_insert_if_absent_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let defaults = AlertSettings::with_defaults("user".into(), Thresholds::default());

        assert!(db.insert_alert_settings_if_absent(&defaults).unwrap());

        let mut other = defaults.clone();
        other.thresholds.critical = 1;
        assert!(!db.insert_alert_settings_if_absent(&other).unwrap());

        let stored = db.get_alert_settings("user").unwrap().unwrap();
        assert_eq!(stored.thresholds.critical, 3);
    }

    #[test]
    fn test_save_replaces() {
        let db = Database::open_in_memory().unwrap();
        let mut settings = AlertSettings::with_defaults("user".into(), Thresholds::default());
        db.save_alert_settings(&settings).unwrap();

        settings.thresholds = Thresholds { critical: 5, low: 10 };
        settings.low_stock.channels = vec![NotificationChannel::Email, NotificationChannel::Sms];
        settings.quiet_hours_enabled = true;
        db.save_alert_settings(&settings).unwrap();

        let stored = db.get_alert_settings("user").unwrap().unwrap();
        assert_eq!(stored, settings);
    }

    #[test]
    fn test_missing_settings() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_alert_settings("nobody").unwrap().is_none());
    }
}
