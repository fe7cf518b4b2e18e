use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LoanLedgerError;
use crate::LoanLedgerResult;

/// A calendar month, the unit every schedule is laid out in.
///
/// Serialises as `YYYY-MM`. Parsing also accepts a full `YYYY-MM-DD` date and
/// keeps only its year and month, since start dates arrive in either shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> LoanLedgerResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(LoanLedgerError::DateError(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        // Keep every derived date representable by NaiveDate.
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(LoanLedgerError::DateError(format!(
                "year {year} is out of range"
            )));
        }
        Ok(YearMonth { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // `new` only admits months whose first day exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The month `n` months after this one.
    pub fn plus_months(&self, n: u32) -> LoanLedgerResult<Self> {
        self.first_day()
            .checked_add_months(Months::new(n))
            .map(YearMonth::of)
            .ok_or_else(|| {
                LoanLedgerError::DateError(format!("{self} plus {n} months is out of range"))
            })
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// The date in this month on `day`, pulled back to the month's last day
    /// when the month is shorter (31 in February lands on the 28th or 29th).
    pub fn clamped_date(&self, day: u32) -> LoanLedgerResult<NaiveDate> {
        let day = day.clamp(1, self.days_in_month());
        NaiveDate::from_ymd_opt(self.year, self.month, day).ok_or_else(|| {
            LoanLedgerError::DateError(format!("{self}-{day:02} is not a valid date"))
        })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = LoanLedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(YearMonth::of(date));
        }

        let (year, month) = trimmed.split_once('-').ok_or_else(|| {
            LoanLedgerError::DateError(format!("expected YYYY-MM or YYYY-MM-DD, got '{s}'"))
        })?;
        if year.len() != 4 || month.len() != 2 {
            return Err(LoanLedgerError::DateError(format!(
                "expected YYYY-MM or YYYY-MM-DD, got '{s}'"
            )));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| LoanLedgerError::DateError(format!("invalid year in '{s}'")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| LoanLedgerError::DateError(format!("invalid month in '{s}'")))?;
        YearMonth::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = LoanLedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

pub fn is_leap_year(year: i32) -> bool {
    days_in_month(year, 2) == 29
}

/// Length of a month, or 0 for a month chrono cannot represent.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next - first).num_days() as u32,
        // Only the calendar's final December has no successor.
        None => 31,
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> LoanLedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| LoanLedgerError::DateError(format!("invalid date '{s}': {e}")))
}

/// Move `date` to `day` within its own month, clamped to the month's length.
pub fn with_day_clamped(date: NaiveDate, day: u32) -> LoanLedgerResult<NaiveDate> {
    YearMonth::of(date).clamped_date(day)
}
