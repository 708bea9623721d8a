//! Pure ledger arithmetic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::Direction;

/// Σ(In) and Σ(Out) kept apart. `None` if either total overflows.
pub fn movement_totals<I>(movements: I) -> Option<(Decimal, Decimal)>
where
    I: IntoIterator<Item = (Direction, Decimal)>,
{
    movements
        .into_iter()
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(ins, outs), (direction, quantity)| {
            match direction {
                Direction::In => Some((ins.checked_add(quantity)?, outs)),
                Direction::Out => Some((ins, outs.checked_add(quantity)?)),
            }
        })
}

/// Σ(In) − Σ(Out). Order of the movements does not matter.
///
/// `None` if either side's total does not fit in a `Decimal`.
pub fn sum_movements<I>(movements: I) -> Option<Decimal>
where
    I: IntoIterator<Item = (Direction, Decimal)>,
{
    let (ins, outs) = movement_totals(movements)?;
    ins.checked_sub(outs)
}

/// `floor(stock / consumption)`, or 0 when nothing is consumed.
///
/// Non-positive stock also yields 0. Results too large for `i64` saturate.
pub fn days_remaining(stock: Decimal, total_daily_consumption: Decimal) -> i64 {
    if total_daily_consumption <= Decimal::ZERO || stock <= Decimal::ZERO {
        return 0;
    }

    match stock.checked_div(total_daily_consumption) {
        Some(days) => days.floor().to_i64().unwrap_or(i64::MAX),
        None => i64::MAX,
    }
}
