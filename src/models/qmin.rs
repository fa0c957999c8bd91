use chrono::{Datelike, NaiveDate};

/// Maximum number of periods accepted in one schedule. File-format contract.
pub const MAX_QMIN_PERIODS: usize = 5;

// Period boundaries are compared as day-of-year ordinals in a fixed leap
// reference year so 29 February stays representable.
const REFERENCE_YEAR: i32 = 2000;

fn ordinal(month: u32, day: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, day).map(|d| d.ordinal())
}

/// One seasonal minimum-discharge requirement.
#[derive(Debug, Clone)]
pub struct QminPeriod {
    pub start_day: u32,
    pub start_month: u32,
    pub end_day: u32,
    pub end_month: u32,
    pub min_discharge_m3s: f64,
    pub penalty_per_hour: f64,
    start_ord: u32,
    end_ord: u32,
}

impl QminPeriod {
    /// Returns None when either boundary is not a valid calendar date.
    pub fn new(
        start_day: u32,
        start_month: u32,
        end_day: u32,
        end_month: u32,
        min_discharge_m3s: f64,
        penalty_per_hour: f64,
    ) -> Option<QminPeriod> {
        let start_ord = ordinal(start_month, start_day)?;
        let end_ord = ordinal(end_month, end_day)?;
        Some(QminPeriod {
            start_day,
            start_month,
            end_day,
            end_month,
            min_discharge_m3s,
            penalty_per_hour,
            start_ord,
            end_ord,
        })
    }
}

/// Seasonal minimum-discharge schedule. Periods do not overlap; lookup
/// returns the first period covering the queried date.
#[derive(Debug, Clone, Default)]
pub struct QminSchedule {
    periods: Vec<QminPeriod>,
}

impl QminSchedule {
    pub fn new(periods: Vec<QminPeriod>) -> QminSchedule {
        QminSchedule { periods }
    }

    pub fn periods(&self) -> &[QminPeriod] {
        &self.periods
    }

    /// Required minimum discharge [m3/s] and the penalty cost per hour of
    /// violation for the given date. Outside every period both are zero.
    pub fn required(&self, month: u32, day: u32) -> (f64, f64) {
        let Some(q) = ordinal(month, day) else {
            return (0.0, 0.0);
        };
        for p in &self.periods {
            if q >= p.start_ord && q <= p.end_ord {
                return (p.min_discharge_m3s, p.penalty_per_hour);
            }
        }
        (0.0, 0.0)
    }
}
