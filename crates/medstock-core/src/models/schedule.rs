//! Caregiver schedule models and the wall-clock window they cover.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Day of the week, labelled the way the client apps display it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Segunda,
    Terca,
    Quarta,
    Quinta,
    Sexta,
    Sabado,
    Domingo,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Segunda,
        Weekday::Terca,
        Weekday::Quarta,
        Weekday::Quinta,
        Weekday::Sexta,
        Weekday::Sabado,
        Weekday::Domingo,
    ];

    /// Display label ("Segunda" … "Domingo").
    pub fn label(&self) -> &'static str {
        match self {
            Weekday::Segunda => "Segunda",
            Weekday::Terca => "Terça",
            Weekday::Quarta => "Quarta",
            Weekday::Quinta => "Quinta",
            Weekday::Sexta => "Sexta",
            Weekday::Sabado => "Sábado",
            Weekday::Domingo => "Domingo",
        }
    }

    /// Parse a label. Case-insensitive; accepts unaccented spellings and the
    /// "-feira" suffix.
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.trim().to_lowercase();
        let key = lower.strip_suffix("-feira").unwrap_or(&lower);
        match key {
            "segunda" => Some(Weekday::Segunda),
            "terça" | "terca" => Some(Weekday::Terca),
            "quarta" => Some(Weekday::Quarta),
            "quinta" => Some(Weekday::Quinta),
            "sexta" => Some(Weekday::Sexta),
            "sábado" | "sabado" => Some(Weekday::Sabado),
            "domingo" => Some(Weekday::Domingo),
            _ => None,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Segunda,
            chrono::Weekday::Tue => Weekday::Terca,
            chrono::Weekday::Wed => Weekday::Quarta,
            chrono::Weekday::Thu => Weekday::Quinta,
            chrono::Weekday::Fri => Weekday::Sexta,
            chrono::Weekday::Sat => Weekday::Sabado,
            chrono::Weekday::Sun => Weekday::Domingo,
        }
    }
}

/// A wall-clock window with no date attached.
///
/// When `end <= start` the window wraps past midnight and covers both the
/// late segment `[start, 24:00)` and the early segment `[00:00, end]`.
/// Equal bounds therefore cover the whole day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn is_overnight(&self) -> bool {
        self.end <= self.start
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.is_overnight() {
            time >= self.start || time <= self.end
        } else {
            self.start <= time && time <= self.end
        }
    }

    /// Whether two windows share any instant of the same day.
    ///
    /// Two arcs on the clock intersect exactly when one contains the
    /// other's start.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.contains(other.start) || other.contains(self.start)
    }
}

/// A recurring caregiver shift covering one or more patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaregiverSchedule {
    pub id: String,
    pub caregiver_id: String,
    /// Days on which the shift starts
    pub weekdays: Vec<Weekday>,
    pub window: TimeWindow,
    pub owner_id: String,
    pub patient_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CaregiverSchedule {
    pub fn new(
        caregiver_id: String,
        mut weekdays: Vec<Weekday>,
        window: TimeWindow,
        owner_id: String,
        patient_ids: Vec<String>,
    ) -> Self {
        weekdays.sort();
        weekdays.dedup();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            caregiver_id,
            weekdays,
            window,
            owner_id,
            patient_ids,
            created_at: Utc::now(),
        }
    }

    pub fn runs_on(&self, day: Weekday) -> bool {
        self.weekdays.contains(&day)
    }
}
