use crate::error::{HeatwaveError, Result};
use chrono::{NaiveDate, TimeDelta};
use std::mem::replace;

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + TimeDelta::days(1);
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

/// Dense integer day index (`itime`) over the dataset's calendar span.
///
/// One unit per calendar day starting at 0 on the first date. Dates with no
/// observations simply have no records; indices are never reused or shifted.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct TimeAxis {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeAxis {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(HeatwaveError::InvalidConfig(format!(
                "time axis ends ({end}) before it starts ({start})"
            )));
        }
        Ok(TimeAxis { start, end })
    }

    /// The smallest axis covering every date given.
    pub fn spanning<I>(dates: I) -> Result<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for date in dates {
            bounds = Some(match bounds {
                None => (date, date),
                Some((lo, hi)) => (lo.min(date), hi.max(date)),
            });
        }
        let (start, end) = bounds
            .ok_or_else(|| HeatwaveError::EmptyInput("no dates to build a time axis".to_string()))?;
        TimeAxis::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Day index of `date`, or `None` if it falls outside the axis.
    pub fn itime(&self, date: NaiveDate) -> Option<u32> {
        if date < self.start || date > self.end {
            return None;
        }
        u32::try_from((date - self.start).num_days()).ok()
    }

    pub fn date(&self, itime: u32) -> NaiveDate {
        self.start + TimeDelta::days(itime as i64)
    }

    /// Number of calendar days covered.
    pub fn n_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn dates(&self) -> DateRange {
        DateRange(self.start, self.end)
    }
}
