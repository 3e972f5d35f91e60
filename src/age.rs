//! Calendar age breakdown used by the child list and child detail views.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Age {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Age {
    pub fn zero() -> Self {
        Self::default()
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} years, {} months, {} days",
            self.years, self.months, self.days
        )
    }
}

fn days_in_month(year: i32, month: u32) -> i32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as i32,
        _ => 30,
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Age at `as_of` as years, months and days.
///
/// Day shortfalls borrow the length of the month preceding `as_of`'s month
/// (then the one before, should one borrow not cover it). A birthday after
/// `as_of` yields a zero age.
pub fn calculate_age(birthday: NaiveDate, as_of: NaiveDate) -> Age {
    if birthday > as_of {
        return Age::zero();
    }

    let mut years = as_of.year() - birthday.year();
    let mut months = as_of.month() as i32 - birthday.month() as i32;
    let mut days = as_of.day() as i32 - birthday.day() as i32;

    let (mut borrow_year, mut borrow_month) = previous_month(as_of.year(), as_of.month());
    while days < 0 {
        months -= 1;
        days += days_in_month(borrow_year, borrow_month);
        (borrow_year, borrow_month) = previous_month(borrow_year, borrow_month);
    }
    while months < 0 {
        years -= 1;
        months += 12;
    }

    Age {
        years: years.max(0) as u32,
        months: months as u32,
        days: days as u32,
    }
}

/// Whole calendar years between joining and `today`, never negative.
pub fn years_of_experience(joined: NaiveDate, today: NaiveDate) -> u32 {
    (today.year() - joined.year()).max(0) as u32
}
