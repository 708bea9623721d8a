//! Expense amortization: priced purchases spread over calendar months.
//!
//! A purchase paid in `n > 1` installments contributes `price / n` to its
//! own month and each of the following `n - 1` months. Anything else is
//! attributed in full to the month it was recorded in (UTC).

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{Direction, StockMovement};

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1 through 12
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidInput(format!("month must be 1-12 (got {})", month)));
        }
        Ok(Self { year, month })
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn of_timestamp(at: DateTime<Utc>) -> Self {
        Self::of_date(at.date_naive())
    }

    /// The month `n` months later, rolling over years.
    pub fn plus_months(&self, n: u32) -> Self {
        let index = i64::from(self.year) * 12 + (i64::from(self.month) - 1) + i64::from(n);
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Whole months from `earlier` to `self`; negative if `self` comes first.
    pub fn months_since(&self, earlier: YearMonth) -> i64 {
        let index = |ym: &YearMonth| i64::from(ym.year) * 12 + i64::from(ym.month);
        index(self) - index(&earlier)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One month's total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyExpense {
    pub month: YearMonth,
    pub total: Decimal,
}

/// What a single movement contributes to `month`.
///
/// Zero for outgoing or unpriced movements.
pub fn attributed_amount(movement: &StockMovement, month: YearMonth) -> Decimal {
    let price = match (movement.direction, movement.price) {
        (Direction::In, Some(price)) => price,
        _ => return Decimal::ZERO,
    };
    let bought = YearMonth::of_timestamp(movement.created_at);

    match movement.total_installments {
        Some(n) if n > 1 => {
            let offset = month.months_since(bought);
            if (0..i64::from(n)).contains(&offset) {
                price / Decimal::from(n)
            } else {
                Decimal::ZERO
            }
        }
        _ if bought == month => price,
        _ => Decimal::ZERO,
    }
}

pub struct ExpenseAmortizer<'a> {
    db: &'a Database,
}

impl<'a> ExpenseAmortizer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Amount attributed to `month` across every priced purchase on
    /// medications the user can access.
    pub fn monthly_expense(&self, user_id: &str, month: YearMonth) -> EngineResult<Decimal> {
        let purchases = self.db.list_priced_purchases(user_id)?;
        let total = total_for(&purchases, month)?;
        debug!(user_id, %month, %total, purchases = purchases.len(), "Monthly expense derived");
        Ok(total)
    }

    /// Totals for January through December of `year`.
    pub fn yearly_breakdown(&self, user_id: &str, year: i32) -> EngineResult<Vec<MonthlyExpense>> {
        let purchases = self.db.list_priced_purchases(user_id)?;
        let january = YearMonth { year, month: 1 };

        (0..12)
            .map(|offset| -> EngineResult<MonthlyExpense> {
                let month = january.plus_months(offset);
                Ok(MonthlyExpense {
                    month,
                    total: total_for(&purchases, month)?,
                })
            })
            .collect()
    }
}

fn total_for(purchases: &[StockMovement], month: YearMonth) -> EngineResult<Decimal> {
    purchases
        .iter()
        .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(attributed_amount(m, month)))
        .ok_or_else(|| EngineError::InvalidState(format!("expenses of {} overflow", month)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn purchase(year: i32, month: u32, price: Decimal, installments: Option<u32>) -> StockMovement {
        let mut movement = StockMovement::new("m".into(), Direction::In, dec!(30), "Compra".into(), "owner".into());
        movement.created_at = Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap();
        movement.price = Some(price);
        movement.total_installments = installments;
        movement
    }

    #[test]
    fn test_plus_months_rolls_over() {
        assert_eq!(ym(2024, 11).plus_months(3), ym(2025, 2));
        assert_eq!(ym(2024, 1).plus_months(0), ym(2024, 1));
        assert_eq!(ym(2024, 12).plus_months(12), ym(2025, 12));
        assert!(YearMonth::new(2024, 13).is_err());
        assert_eq!(ym(2024, 3).to_string(), "2024-03");
    }

    #[test]
    fn test_three_installments() {
        let m = purchase(2024, 1, dec!(300), Some(3));
        assert_eq!(attributed_amount(&m, ym(2024, 1)), dec!(100));
        assert_eq!(attributed_amount(&m, ym(2024, 2)), dec!(100));
        assert_eq!(attributed_amount(&m, ym(2024, 3)), dec!(100));
        assert_eq!(attributed_amount(&m, ym(2024, 4)), Decimal::ZERO);
        assert_eq!(attributed_amount(&m, ym(2023, 12)), Decimal::ZERO);
    }

    #[test]
    fn test_installments_cross_year() {
        let m = purchase(2024, 11, dec!(120), Some(4));
        assert_eq!(attributed_amount(&m, ym(2025, 2)), dec!(30));
        assert_eq!(attributed_amount(&m, ym(2025, 3)), Decimal::ZERO);
    }

    #[test]
    fn test_months_since() {
        assert_eq!(ym(2025, 2).months_since(ym(2024, 11)), 3);
        assert_eq!(ym(2024, 11).months_since(ym(2025, 2)), -3);
        assert_eq!(ym(2024, 5).months_since(ym(2024, 5)), 0);
    }

    #[test]
    fn test_huge_installment_count() {
        let m = purchase(2024, 1, dec!(300), Some(u32::MAX));
        let installment = dec!(300) / Decimal::from(u32::MAX);
        assert_eq!(attributed_amount(&m, ym(2024, 1)), installment);
        assert_eq!(attributed_amount(&m, ym(2024, 2)), installment);
        assert_eq!(attributed_amount(&m, ym(9999, 12)), installment);
        assert_eq!(attributed_amount(&m, ym(2023, 12)), Decimal::ZERO);
    }

    #[test]
    fn test_paid_in_full() {
        for installments in [None, Some(1)] {
            let m = purchase(2024, 5, dec!(89.90), installments);
            assert_eq!(attributed_amount(&m, ym(2024, 5)), dec!(89.90));
            assert_eq!(attributed_amount(&m, ym(2024, 6)), Decimal::ZERO);
        }
    }

    #[test]
    fn test_outgoing_and_unpriced_ignored() {
        let mut out = purchase(2024, 5, dec!(10), None);
        out.direction = Direction::Out;
        assert_eq!(attributed_amount(&out, ym(2024, 5)), Decimal::ZERO);

        let mut unpriced = purchase(2024, 5, dec!(10), None);
        unpriced.price = None;
        assert_eq!(attributed_amount(&unpriced, ym(2024, 5)), Decimal::ZERO);
    }

    #[test]
    fn test_monthly_and_yearly_from_store() {
        let db = Database::open_in_memory().unwrap();
        let med = crate::models::Medication::new("Insulina".into(), "owner".into());
        db.insert_medication(&med).unwrap();

        let mut split = purchase(2024, 1, dec!(300), Some(3));
        split.medication_id = med.id.clone();
        let mut full = purchase(2024, 2, dec!(50), None);
        full.medication_id = med.id.clone();
        db.insert_movement(&split).unwrap();
        db.insert_movement(&full).unwrap();

        let amortizer = ExpenseAmortizer::new(&db);
        assert_eq!(amortizer.monthly_expense("owner", ym(2024, 2)).unwrap(), dec!(150));
        assert_eq!(amortizer.monthly_expense("stranger", ym(2024, 2)).unwrap(), Decimal::ZERO);

        let year = amortizer.yearly_breakdown("owner", 2024).unwrap();
        assert_eq!(year.len(), 12);
        assert_eq!(year[0].total, dec!(100));
        assert_eq!(year[1].total, dec!(150));
        assert_eq!(year[2].total, dec!(100));
        assert_eq!(year[3].total, Decimal::ZERO);
        assert_eq!(year[11].month, ym(2024, 12));
    }

    #[test]
    fn test_overflowing_month_fails_cleanly() {
        let db = Database::open_in_memory().unwrap();
        let med = crate::models::Medication::new("Insulina".into(), "owner".into());
        db.insert_medication(&med).unwrap();

        for _ in 0..2 {
            let mut m = purchase(2024, 3, Decimal::MAX, None);
            m.medication_id = med.id.clone();
            db.insert_movement(&m).unwrap();
        }

        let amortizer = ExpenseAmortizer::new(&db);
        assert!(matches!(
            amortizer.monthly_expense("owner", ym(2024, 3)),
            Err(EngineError::InvalidState(_))
        ));
        assert!(amortizer.yearly_breakdown("owner", 2024).is_err());
        assert_eq!(amortizer.monthly_expense("owner", ym(2024, 4)).unwrap(), Decimal::ZERO);
    }
}
