// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use time::{Date, Month};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Diary,
    Bill,
    Interest,
    Note,
    Sport,
}

impl ModuleKind {
    pub const ALL: [Self; 5] = [
        Self::Diary,
        Self::Bill,
        Self::Interest,
        Self::Note,
        Self::Sport,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Diary => "diary",
            Self::Bill => "bill",
            Self::Interest => "interest",
            Self::Note => "note",
            Self::Sport => "sport",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "diary" => Some(Self::Diary),
            "bill" => Some(Self::Bill),
            "interest" => Some(Self::Interest),
            "note" => Some(Self::Note),
            "sport" => Some(Self::Sport),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "int",
            Self::Float => "float",
            Self::Boolean => "bool",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::String,
            Self::Integer(_) => FieldKind::Integer,
            Self::Float(_) => FieldKind::Float,
            Self::Boolean(_) => FieldKind::Boolean,
        }
    }

    /// Text as the server's JSON would print it, so `10.0` reads back as `10`.
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => format_float(*value),
            Self::Boolean(value) => value.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) | Self::Boolean(_) => None,
        }
    }

    /// Numbers compare numerically, everything else case-insensitively as text.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) => left.total_cmp(&right),
            _ => self
                .display()
                .to_lowercase()
                .cmp(&other.display().to_lowercase()),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Rust types a record field can hold.
pub trait FieldType: Clone + PartialEq + Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> FieldValue;

    fn from_value(value: FieldValue) -> Option<Self>;
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_value(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(value) => Some(value),
            _ => None,
        }
    }
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(value) => Some(value),
            _ => None,
        }
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::String;

    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_value(&self) -> FieldValue {
        FieldValue::Boolean(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Boolean(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaryView {
    Daily,
    Monthly,
}

pub const INTEREST_CATEGORIES: [&str; 8] = [
    "All", "Movie", "TV", "Comic", "Game", "Book", "Music", "Others",
];

pub fn interest_category_label(sort: i64) -> &'static str {
    usize::try_from(sort)
        .ok()
        .and_then(|index| INTEREST_CATEGORIES.get(index))
        .copied()
        .unwrap_or("Others")
}

/// Progress scope applied to the note grid on top of the text filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteScope {
    #[default]
    All,
    InProgress,
    Done,
}

impl NoteScope {
    pub const fn from_flag(flag: i64) -> Self {
        match flag {
            1 => Self::InProgress,
            2 => Self::Done,
            _ => Self::All,
        }
    }

    pub const fn flag(self) -> i64 {
        match self {
            Self::All => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    pub const fn admits(self, process: i64) -> bool {
        match self {
            Self::All => true,
            Self::InProgress => process < 100,
            Self::Done => process >= 100,
        }
    }
}

/// Days are stored on the wire as yyyymmdd integers.
pub fn date_to_int(date: Date) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(u8::from(date.month())) * 100 + i64::from(date.day())
}

pub fn int_to_date(value: i64) -> Option<Date> {
    if !(10_000_101..=99_991_231).contains(&value) {
        return None;
    }
    let year = i32::try_from(value / 10_000).ok()?;
    let month = Month::try_from(u8::try_from((value / 100) % 100).ok()?).ok()?;
    let day = u8::try_from(value % 100).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
