// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use daybook_app::{
    Bill, BillId, Diary, DiaryId, INTEREST_CATEGORIES, Interest, InterestId, Note, NoteId, Sport,
    SportId, date_to_int,
};
use std::path::PathBuf;
use time::{Date, Month};

const BILL_CATEGORIES: [&str; 10] = [
    "food",
    "transport",
    "rent",
    "utilities",
    "health",
    "books",
    "travel",
    "gifts",
    "salary",
    "misc",
];

const BILL_ITEMS: [&str; 16] = [
    "lunch",
    "groceries",
    "bus pass",
    "train ticket",
    "electricity",
    "water bill",
    "pharmacy",
    "paperback",
    "hotel",
    "birthday present",
    "coffee",
    "dinner out",
    "taxi",
    "gym",
    "phone plan",
    "monthly pay",
];

const INTEREST_TITLES: [&str; 14] = [
    "The Long Winter",
    "Harbor Lights",
    "Night Train",
    "Paper Moons",
    "Quiet Valley",
    "Signal Fire",
    "Northern Tide",
    "Glass Garden",
    "Iron Orchard",
    "Salt Roads",
    "Hollow Crown",
    "Amber Fields",
    "Far Shore",
    "Last Light",
];

const PROGRESS_MARKS: [&str; 6] = ["", "ep 3", "ch 12", "halfway", "done", "s2e5"];

const WEATHER: [&str; 7] = ["sunny", "cloudy", "rain", "snow", "windy", "fog", "storm"];
const LOCATIONS: [&str; 6] = ["home", "office", "park", "library", "station", "cafe"];

const WORDS: [&str; 24] = [
    "walk", "read", "cook", "call", "write", "plan", "fix", "paint", "clean", "visit", "garden",
    "letter", "river", "market", "friend", "window", "train", "morning", "evening", "quiet",
    "long", "early", "late", "small",
];

const SPORTS: [&str; 8] = [
    "run 5k",
    "swim 1k",
    "cycle 20k",
    "yoga",
    "row 2k",
    "climb",
    "hike",
    "stretch",
];

pub const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible records for every module.
#[derive(Debug, Clone)]
pub struct DaybookFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl DaybookFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn bill(&mut self, id: i64) -> Bill {
        let income = self.rng.int_n(8) == 0;
        let item = if income {
            "monthly pay"
        } else {
            self.pick(&BILL_ITEMS)
        };
        Bill {
            id: BillId::new(id),
            date: self.day_in_month(REFERENCE_YEAR, Month::March),
            inout: if income { 1 } else { -1 },
            category: if income {
                "salary".to_owned()
            } else {
                self.pick(&BILL_CATEGORIES).to_owned()
            },
            // Whole cents keep equality checks exact.
            amount: self.int_range(100, 50_000) as f64 / 100.0,
            item: item.to_owned(),
        }
    }

    /// `count` bills with ids `1..=count`.
    pub fn bills(&mut self, count: usize) -> Vec<Bill> {
        (1..=count as i64).map(|id| self.bill(id)).collect()
    }

    pub fn interest(&mut self, id: i64) -> Interest {
        let added = self.day_in_month(REFERENCE_YEAR, Month::January);
        Interest {
            id: InterestId::new(id),
            added,
            updated: added,
            name: self.pick(&INTEREST_TITLES).to_owned(),
            sort: self.int_range(1, INTEREST_CATEGORIES.len() as i64 - 1),
            progress: self.pick(&PROGRESS_MARKS).to_owned(),
            publish: self.int_range(1960, 2025),
            date: added,
            score_db: self.int_range(40, 95) as f64 / 10.0,
            score_imdb: self.int_range(40, 95) as f64 / 10.0,
            score: self.int_range(0, 10) as f64,
            remark: self.sentence(0, 6),
        }
    }

    pub fn note(&mut self, id: i64) -> Note {
        let begin = self.day_in_month(REFERENCE_YEAR, Month::February);
        let process = if self.rng.bool() {
            100
        } else {
            self.int_range(0, 99)
        };
        Note {
            id: NoteId::new(id),
            begin,
            last: begin,
            process,
            desire: self.int_range(1, 5),
            priority: self.int_range(1, 5),
            content: self.sentence(2, 8),
        }
    }

    pub fn sport(&mut self, id: i64) -> Sport {
        Sport {
            id: SportId::new(id),
            date: self.day_in_month(REFERENCE_YEAR, Month::April),
            content: self.pick(&SPORTS).to_owned(),
        }
    }

    pub fn diary(&mut self, day: Date) -> Diary {
        Diary {
            id: DiaryId::new(date_to_int(day)),
            content: self.paragraphs(1, 3),
            weather: self.pick(&WEATHER).to_owned(),
            location: self.pick(&LOCATIONS).to_owned(),
        }
    }

    /// yyyymmdd of a random day in the given month.
    pub fn day_in_month(&mut self, year: i32, month: Month) -> i64 {
        let last = time::util::days_in_year_month(year, month);
        let day = self.int_range(1, i64::from(last));
        i64::from(year) * 10_000 + i64::from(u8::from(month)) * 100 + day
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = self.int_range(min_words as i64, max_words as i64) as usize;
        let words: Vec<&str> = (0..count).map(|_| self.pick(&WORDS)).collect();
        words.join(" ")
    }

    fn paragraphs(&mut self, min: usize, max: usize) -> String {
        let count = self.int_range(min as i64, max as i64) as usize;
        let lines: Vec<String> = (0..count).map(|_| self.sentence(3, 9)).collect();
        lines.join("\n")
    }
}

pub fn temp_state_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("state.json");
    Ok((dir, path))
}

pub fn bill_categories() -> &'static [&'static str] {
    &BILL_CATEGORIES
}

#[cfg(test)]
mod tests {
    use super::{DaybookFaker, REFERENCE_YEAR, bill_categories};
    use daybook_app::{NoteScope, int_to_date};
    use std::collections::BTreeSet;
    use time::macros::date;

    #[test]
    fn same_seed_same_records() {
        let mut left = DaybookFaker::new(42);
        let mut right = DaybookFaker::new(42);
        assert_eq!(left.bills(5), right.bills(5));
        assert_eq!(left.note(1), right.note(1));
    }

    #[test]
    fn bills_carry_valid_days_and_signs() {
        let mut faker = DaybookFaker::new(7);
        for bill in faker.bills(50) {
            let day = int_to_date(bill.date);
            assert!(day.is_some_and(|day| day.year() == REFERENCE_YEAR), "date {}", bill.date);
            assert!(bill.inout == 1 || bill.inout == -1);
            assert!(bill.amount >= 1.0);
            assert!(bill_categories().contains(&bill.category.as_str()));
        }
    }

    #[test]
    fn notes_cover_both_scopes() {
        let mut done = false;
        let mut open = false;
        for seed in 1_u64..40 {
            let note = DaybookFaker::new(seed).note(1);
            done |= NoteScope::Done.admits(note.process);
            open |= NoteScope::InProgress.admits(note.process);
        }
        assert!(done && open);
    }

    #[test]
    fn diary_id_is_the_day() {
        let diary = DaybookFaker::new(3).diary(date!(2026 - 05 - 04));
        assert_eq!(diary.id.get(), 20260504);
        assert!(!diary.content.is_empty());
    }

    #[test]
    fn variety_across_seeds() {
        let mut items = BTreeSet::new();
        for seed in 0_u64..20 {
            items.insert(DaybookFaker::new(seed).bill(1).item);
        }
        assert!(items.len() >= 5, "got {}", items.len());
    }
}
