use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use tracing::warn;

use super::domain::{ExamRecord, MonthDay};

/// examDate → records sharing that date, in load order.
pub type DateGroups = BTreeMap<String, Vec<ExamRecord>>;

pub fn group_by_date<I>(records: I) -> DateGroups
where
    I: IntoIterator<Item = ExamRecord>,
{
    let mut groups = DateGroups::new();
    for record in records {
        groups
            .entry(record.exam_date.clone())
            .or_default()
            .push(record);
    }
    groups
}

/// Orders two date keys by (month, day); unparseable keys sort after every parseable one.
pub fn compare_dates(a: &str, b: &str) -> Ordering {
    match (MonthDay::parse(a), MonthDay::parse(b)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn order_dates<I, S>(dates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ordered: Vec<String> = dates.into_iter().map(Into::into).collect();
    ordered.sort_by(|a, b| compare_dates(a, b));
    ordered
}

/// Like [`order_dates`], but December precedes January through March.
pub fn admission_order<I, S>(dates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ordered: Vec<String> = dates.into_iter().map(Into::into).collect();
    ordered.sort_by(|a, b| match (MonthDay::parse(a), MonthDay::parse(b)) {
        (Some(left), Some(right)) => left.cmp_cycle(right).then_with(|| a.cmp(b)),
        _ => compare_dates(a, b),
    });
    ordered
}

/// Resolves a year-less date to the calendar date it denotes in the admission cycle
/// containing `today`: January through March belong to the following year, every other
/// month (December included) to the current one. Days past the end of the month roll
/// into the next, so `"2/29"` lands on March 1st outside leap years.
pub fn admission_date(month_day: MonthDay, today: NaiveDate) -> Option<NaiveDate> {
    let year = match month_day.month {
        1..=3 => today.year() + 1,
        _ => today.year(),
    };
    NaiveDate::from_ymd_opt(year, month_day.month, 1)?
        .checked_add_days(Days::new(u64::from(month_day.day.saturating_sub(1))))
}

/// `"D-day"`, `"D-n"` for n days ahead, `"D+n"` for n days past; empty when unparseable.
pub fn dday_label(raw: &str, today: NaiveDate) -> String {
    let Some(target) = MonthDay::parse(raw).and_then(|md| admission_date(md, today)) else {
        return String::new();
    };

    let diff = (target - today).num_days();
    match diff.cmp(&0) {
        Ordering::Equal => "D-day".to_string(),
        Ordering::Greater => format!("D-{diff}"),
        Ordering::Less => format!("D+{}", diff.abs()),
    }
}

/// Records grouped by exam date together with the chronological date sequence.
#[derive(Debug, Clone, Default)]
pub struct ExamBoard {
    groups: DateGroups,
    dates: Vec<String>,
}

impl ExamBoard {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ExamRecord>,
    {
        let mut skipped = 0usize;
        let usable = records.into_iter().filter(|record| {
            let keep = !record.exam_date.trim().is_empty();
            if !keep {
                skipped += 1;
            }
            keep
        });
        let groups = group_by_date(usable);
        if skipped > 0 {
            warn!(skipped, "discarded exam records without an exam date");
        }

        let dates = order_dates(groups.keys().cloned());
        Self { groups, dates }
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn records_on(&self, date: &str) -> &[ExamRecord] {
        self.groups.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn position(&self, date: &str) -> Option<usize> {
        self.dates.iter().position(|candidate| candidate == date)
    }

    pub fn contains(&self, date: &str) -> bool {
        self.groups.contains_key(date)
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn groups(&self) -> &DateGroups {
        &self.groups
    }
}
