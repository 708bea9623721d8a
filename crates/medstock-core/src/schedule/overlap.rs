//! Detection of schedules that compete for the same patient and time.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::CareScheduleResolver;
use crate::error::EngineResult;
use crate::models::{CaregiverSchedule, Weekday};

/// Two schedules for the same patient sharing weekdays and clock time.
///
/// Resolution picks `earlier`; `later` never wins during the shared span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOverlap {
    pub earlier: String,
    pub later: String,
    pub weekdays: Vec<Weekday>,
}

/// Pairwise overlaps among schedules given in creation order.
pub fn find_overlaps(schedules: &[CaregiverSchedule]) -> Vec<ScheduleOverlap> {
    let mut overlaps = Vec::new();
    for (i, earlier) in schedules.iter().enumerate() {
        for later in &schedules[i + 1..] {
            if !earlier.window.overlaps(&later.window) {
                continue;
            }
            let weekdays: Vec<Weekday> = earlier
                .weekdays
                .iter()
                .copied()
                .filter(|day| later.runs_on(*day))
                .collect();
            if !weekdays.is_empty() {
                overlaps.push(ScheduleOverlap {
                    earlier: earlier.id.clone(),
                    later: later.id.clone(),
                    weekdays,
                });
            }
        }
    }
    overlaps
}

impl<'a> CareScheduleResolver<'a> {
    /// Overlapping schedule pairs for a patient. Reported, never rejected.
    pub fn overlapping_schedules(&self, user_id: &str, patient_id: &str) -> EngineResult<Vec<ScheduleOverlap>> {
        let overlaps = find_overlaps(&self.schedules_for_patient(user_id, patient_id)?);
        for overlap in &overlaps {
            warn!(
                patient_id,
                earlier = %overlap.earlier,
                later = %overlap.later,
                "Overlapping caregiver schedules"
            );
        }
        Ok(overlaps)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::models::TimeWindow;

    fn schedule(days: Vec<Weekday>, start: u32, end: u32) -> CaregiverSchedule {
        let window = TimeWindow::new(
            NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        );
        CaregiverSchedule::new("c".into(), days, window, "owner".into(), vec!["p".into()])
    }

    #[test]
    fn test_shared_day_and_time() {
        let a = schedule(vec![Weekday::Segunda, Weekday::Terca], 8, 14);
        let b = schedule(vec![Weekday::Terca, Weekday::Quarta], 12, 18);

        let overlaps = find_overlaps(&[a.clone(), b.clone()]);
        assert_eq!(
            overlaps,
            vec![ScheduleOverlap {
                earlier: a.id,
                later: b.id,
                weekdays: vec![Weekday::Terca],
            }]
        );
    }

    #[test]
    fn test_overnight_against_morning() {
        let night = schedule(vec![Weekday::Segunda], 19, 8);
        let morning = schedule(vec![Weekday::Segunda], 6, 10);
        assert_eq!(find_overlaps(&[night, morning]).len(), 1);
    }

    #[test]
    fn test_disjoint() {
        let day = schedule(vec![Weekday::Segunda], 8, 18);
        let night = schedule(vec![Weekday::Segunda], 19, 7);
        let other_day = schedule(vec![Weekday::Terca], 8, 18);
        assert!(find_overlaps(&[day, night, other_day]).is_empty());
    }
}
