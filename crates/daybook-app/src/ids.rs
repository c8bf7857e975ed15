// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Identifier of one record inside its module's list.
pub trait RecordId:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + FromStr + From<i64> + Send + Sync + 'static
{
    fn get(self) -> i64;
}

macro_rules! record_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse::<i64>().map(Self)
            }
        }

        impl RecordId for $name {
            fn get(self) -> i64 {
                self.0
            }
        }
    };
}

record_id!(BillId);
record_id!(InterestId);
record_id!(NoteId);
record_id!(SportId);
// Diary ids are the day they describe, encoded as yyyymmdd.
record_id!(DiaryId);
