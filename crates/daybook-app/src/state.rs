// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime};

use crate::model::{DiaryView, ModuleKind, NoteScope, date_to_int, int_to_date};

/// Per-module view state that survives restarts.
pub trait ViewState: Clone + Default + PartialEq + Serialize + DeserializeOwned {
    const MODULE: ModuleKind;

    fn query(&self) -> ListQuery;
}

/// Parameters of one list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    Diary { year: i32, month: u8 },
    Bill { start: i64, end: i64 },
    Interest { sort: i64 },
    Note,
    Sport,
}

impl ListQuery {
    pub const fn module(&self) -> ModuleKind {
        match self {
            Self::Diary { .. } => ModuleKind::Diary,
            Self::Bill { .. } => ModuleKind::Bill,
            Self::Interest { .. } => ModuleKind::Interest,
            Self::Note => ModuleKind::Note,
            Self::Sport => ModuleKind::Sport,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Diary { year, month } => {
                vec![("year", year.to_string()), ("month", month.to_string())]
            }
            Self::Bill { start, end } => vec![("start", start.to_string()), ("end", end.to_string())],
            Self::Interest { sort } => vec![("sort", sort.to_string())],
            Self::Note | Self::Sport => Vec::new(),
        }
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryState {
    pub view: DiaryView,
    pub date: i64,
}

impl Default for DiaryState {
    fn default() -> Self {
        Self {
            view: DiaryView::Daily,
            date: date_to_int(today()),
        }
    }
}

impl DiaryState {
    pub fn day(&self) -> Date {
        int_to_date(self.date).unwrap_or_else(today)
    }
}

impl ViewState for DiaryState {
    const MODULE: ModuleKind = ModuleKind::Diary;

    fn query(&self) -> ListQuery {
        let day = self.day();
        ListQuery::Diary {
            year: day.year(),
            month: u8::from(day.month()),
        }
    }
}

/// Bill range; `month` is `YYYY-MM` and the range covers it unless the
/// user narrowed `start`/`end` by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillState {
    pub month: String,
    pub start: i64,
    pub end: i64,
}

impl Default for BillState {
    fn default() -> Self {
        Self::for_date(today())
    }
}

impl BillState {
    pub fn for_date(date: Date) -> Self {
        Self::for_month(date.year(), date.month())
    }

    pub fn for_month(year: i32, month: Month) -> Self {
        let last = time::util::days_in_year_month(year, month);
        let first_day = i64::from(year) * 10_000 + i64::from(u8::from(month)) * 100;
        Self {
            month: format!("{year:04}-{:02}", u8::from(month)),
            start: first_day + 1,
            end: first_day + i64::from(last),
        }
    }

    pub fn set_month(&mut self, value: &str) -> Result<()> {
        let (year, month) = parse_month(value)?;
        *self = Self::for_month(year, month);
        Ok(())
    }
}

impl ViewState for BillState {
    const MODULE: ModuleKind = ModuleKind::Bill;

    fn query(&self) -> ListQuery {
        ListQuery::Bill {
            start: self.start,
            end: self.end,
        }
    }
}

pub fn parse_month(value: &str) -> Result<(i32, Month)> {
    let (year, month) = value
        .trim()
        .split_once('-')
        .ok_or_else(|| anyhow!("month {value:?} should look like 2026-03"))?;
    let year = year
        .parse::<i32>()
        .with_context(|| format!("invalid year in month {value:?}"))?;
    let month = month
        .parse::<u8>()
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(|| anyhow!("invalid month number in {value:?}; use 01 through 12"))?;
    Ok((year, month))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestState {
    /// Category index; 0 lists every category.
    pub sort: i64,
}

impl ViewState for InterestState {
    const MODULE: ModuleKind = ModuleKind::Interest;

    fn query(&self) -> ListQuery {
        ListQuery::Interest { sort: self.sort }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteState {
    pub flag: i64,
}

impl NoteState {
    pub const fn scope(&self) -> NoteScope {
        NoteScope::from_flag(self.flag)
    }
}

impl ViewState for NoteState {
    const MODULE: ModuleKind = ModuleKind::Note;

    fn query(&self) -> ListQuery {
        ListQuery::Note
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SportState {}

impl ViewState for SportState {
    const MODULE: ModuleKind = ModuleKind::Sport;

    fn query(&self) -> ListQuery {
        ListQuery::Sport
    }
}
