// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use crate::ids::*;
use crate::model::{FieldKind, FieldType, FieldValue, ModuleKind};

/// Column of one record kind, addressed on the wire by `name()`.
pub trait FieldName: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn kind(self) -> FieldKind;

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }
}

pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: RecordId;
    type Field: FieldName;
    type Patch: Patch<Record = Self>;

    const MODULE: ModuleKind;

    fn id(&self) -> Self::Id;

    /// Empty row used when an edit lands on a day that has no record yet.
    fn blank(id: Self::Id) -> Self;

    fn value(&self, field: Self::Field) -> FieldValue;

    /// Fields concatenated for the free-text grid filter.
    fn search_fields() -> &'static [Self::Field];

    /// Numeric field targeted by the `<N` / `>N` filter shorthand.
    fn range_field() -> Option<Self::Field> {
        None
    }

    /// Completion percentage, for kinds that track one.
    fn progress(&self) -> Option<i64> {
        None
    }
}

/// Typed partial update of one record kind: every field optional.
pub trait Patch:
    Clone + fmt::Debug + Default + PartialEq + Serialize + Send + Sync + 'static
{
    type Record: Record<Patch = Self>;

    fn get(&self, field: <Self::Record as Record>::Field) -> Option<FieldValue>;

    fn set(
        &mut self,
        field: <Self::Record as Record>::Field,
        value: FieldValue,
    ) -> Result<(), FieldTypeMismatch>;

    fn clear(&mut self, field: <Self::Record as Record>::Field);

    /// Overlay `newer` onto `self`; fields present in `newer` win.
    fn merge(&mut self, newer: &Self);

    fn apply_to(&self, record: &mut Self::Record);

    fn fields(&self) -> Vec<<Self::Record as Record>::Field> {
        <<Self::Record as Record>::Field as FieldName>::ALL
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_some())
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    fn len(&self) -> usize {
        self.fields().len()
    }

    /// Drop the fields named in `touched` whose value equals `record`'s.
    fn prune_unchanged(&mut self, record: &Self::Record, touched: &Self) {
        for field in touched.fields() {
            if self
                .get(field)
                .is_some_and(|value| value == record.value(field))
            {
                self.clear(field);
            }
        }
    }

    /// Drop every field whose value equals `record`'s.
    fn prune_against(&mut self, record: &Self::Record) {
        for field in self.fields() {
            if self
                .get(field)
                .is_some_and(|value| value == record.value(field))
            {
                self.clear(field);
            }
        }
    }

    /// Drop the fields that still hold exactly what `sent` carried.
    fn retain_unsent(&mut self, sent: &Self) {
        for field in sent.fields() {
            if self.get(field) == sent.get(field) {
                self.clear(field);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTypeMismatch {
    pub field: &'static str,
    pub expected: FieldKind,
    pub found: FieldKind,
}

impl fmt::Display for FieldTypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field `{}` holds {} values, got {}",
            self.field,
            self.expected.as_str(),
            self.found.as_str()
        )
    }
}

impl std::error::Error for FieldTypeMismatch {}

macro_rules! record_kind {
    (
        $(#[$meta:meta])*
        $record:ident, $patch:ident, $field:ident, $id:ty;
        $( $name:ident : $ty:ty => $variant:ident = $wire:literal ),+ $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $record {
            pub id: $id,
            $(
                #[serde(rename = $wire, default)]
                pub $name: $ty,
            )+
        }

        impl $record {
            pub fn blank_with_id(id: $id) -> Self {
                Self {
                    id,
                    $( $name: <$ty>::default(), )+
                }
            }

            fn field_value(&self, field: $field) -> FieldValue {
                match field {
                    $( $field::$variant => <$ty as FieldType>::to_value(&self.$name), )+
                }
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $field {
            $( $variant, )+
        }

        impl FieldName for $field {
            const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            fn kind(self) -> FieldKind {
                match self {
                    $( Self::$variant => <$ty as FieldType>::KIND, )+
                }
            }
        }

        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct $patch {
            $(
                #[serde(rename = $wire, skip_serializing_if = "Option::is_none")]
                pub $name: Option<$ty>,
            )+
        }

        impl Patch for $patch {
            type Record = $record;

            fn get(&self, field: $field) -> Option<FieldValue> {
                match field {
                    $( $field::$variant => self.$name.as_ref().map(<$ty as FieldType>::to_value), )+
                }
            }

            fn set(&mut self, field: $field, value: FieldValue) -> Result<(), FieldTypeMismatch> {
                let found = value.kind();
                match field {
                    $(
                        $field::$variant => {
                            let typed = <$ty as FieldType>::from_value(value).ok_or(
                                FieldTypeMismatch {
                                    field: $wire,
                                    expected: <$ty as FieldType>::KIND,
                                    found,
                                },
                            )?;
                            self.$name = Some(typed);
                        }
                    )+
                }
                Ok(())
            }

            fn clear(&mut self, field: $field) {
                match field {
                    $( $field::$variant => self.$name = None, )+
                }
            }

            fn merge(&mut self, newer: &Self) {
                $(
                    if let Some(value) = &newer.$name {
                        self.$name = Some(value.clone());
                    }
                )+
            }

            fn apply_to(&self, record: &mut $record) {
                $(
                    if let Some(value) = &self.$name {
                        record.$name = value.clone();
                    }
                )+
            }
        }
    };
}

record_kind! {
    /// One income or expense line.
    Bill, BillPatch, BillField, BillId;
    date: i64 => Date = "date",
    inout: i64 => Inout = "inout",
    category: String => Category = "type",
    amount: f64 => Amount = "amount",
    item: String => Item = "item",
}

record_kind! {
    /// A tracked book, film, show, game or album.
    Interest, InterestPatch, InterestField, InterestId;
    added: i64 => Added = "added",
    updated: i64 => Updated = "updated",
    name: String => Name = "name",
    sort: i64 => Sort = "sort",
    progress: String => Progress = "progress",
    publish: i64 => Publish = "publish",
    date: i64 => Date = "date",
    score_db: f64 => ScoreDb = "score_db",
    score_imdb: f64 => ScoreImdb = "score_imdb",
    score: f64 => Score = "score",
    remark: String => Remark = "remark",
}

record_kind! {
    Note, NotePatch, NoteField, NoteId;
    begin: i64 => Begin = "begin",
    last: i64 => Last = "last",
    process: i64 => Process = "process",
    desire: i64 => Desire = "desire",
    priority: i64 => Priority = "priority",
    content: String => Content = "content",
}

record_kind! {
    Sport, SportPatch, SportField, SportId;
    date: i64 => Date = "date",
    content: String => Content = "content",
}

record_kind! {
    /// One day of the diary; the id is the day itself.
    Diary, DiaryPatch, DiaryField, DiaryId;
    content: String => Content = "content",
    weather: String => Weather = "weather",
    location: String => Location = "location",
}

impl Record for Bill {
    type Id = BillId;
    type Field = BillField;
    type Patch = BillPatch;

    const MODULE: ModuleKind = ModuleKind::Bill;

    fn id(&self) -> BillId {
        self.id
    }

    fn blank(id: BillId) -> Self {
        Self::blank_with_id(id)
    }

    fn value(&self, field: BillField) -> FieldValue {
        self.field_value(field)
    }

    fn search_fields() -> &'static [BillField] {
        &[BillField::Date, BillField::Category, BillField::Item]
    }

    fn range_field() -> Option<BillField> {
        Some(BillField::Amount)
    }
}

impl Bill {
    /// Signed amount: income counts up, expenses count down.
    pub fn signed_amount(&self) -> f64 {
        if self.inout > 0 {
            self.amount
        } else {
            -self.amount
        }
    }
}

impl Record for Interest {
    type Id = InterestId;
    type Field = InterestField;
    type Patch = InterestPatch;

    const MODULE: ModuleKind = ModuleKind::Interest;

    fn id(&self) -> InterestId {
        self.id
    }

    fn blank(id: InterestId) -> Self {
        Self::blank_with_id(id)
    }

    fn value(&self, field: InterestField) -> FieldValue {
        self.field_value(field)
    }

    fn search_fields() -> &'static [InterestField] {
        InterestField::ALL
    }
}

impl Record for Note {
    type Id = NoteId;
    type Field = NoteField;
    type Patch = NotePatch;

    const MODULE: ModuleKind = ModuleKind::Note;

    fn id(&self) -> NoteId {
        self.id
    }

    fn blank(id: NoteId) -> Self {
        Self::blank_with_id(id)
    }

    fn value(&self, field: NoteField) -> FieldValue {
        self.field_value(field)
    }

    fn search_fields() -> &'static [NoteField] {
        &[NoteField::Content]
    }

    fn progress(&self) -> Option<i64> {
        Some(self.process)
    }
}

impl Record for Sport {
    type Id = SportId;
    type Field = SportField;
    type Patch = SportPatch;

    const MODULE: ModuleKind = ModuleKind::Sport;

    fn id(&self) -> SportId {
        self.id
    }

    fn blank(id: SportId) -> Self {
        Self::blank_with_id(id)
    }

    fn value(&self, field: SportField) -> FieldValue {
        self.field_value(field)
    }

    fn search_fields() -> &'static [SportField] {
        &[SportField::Date, SportField::Content]
    }
}

impl Record for Diary {
    type Id = DiaryId;
    type Field = DiaryField;
    type Patch = DiaryPatch;

    const MODULE: ModuleKind = ModuleKind::Diary;

    fn id(&self) -> DiaryId {
        self.id
    }

    fn blank(id: DiaryId) -> Self {
        Self::blank_with_id(id)
    }

    fn value(&self, field: DiaryField) -> FieldValue {
        self.field_value(field)
    }

    fn search_fields() -> &'static [DiaryField] {
        DiaryField::ALL
    }
}

impl Diary {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.weather.is_empty() && self.location.is_empty()
    }
}
