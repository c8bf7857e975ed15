// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{NoteScope, SortDirection};
use crate::record::{Bill, FieldName, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: SortDirection,
}

/// Header click transition: none -> asc -> desc -> none on the same key;
/// a different key always starts over at asc.
pub fn next_sort<F: FieldName>(current: Option<SortSpec<F>>, clicked: F) -> Option<SortSpec<F>> {
    match current {
        Some(spec) if spec.field == clicked => match spec.direction {
            SortDirection::Asc => Some(SortSpec {
                field: clicked,
                direction: SortDirection::Desc,
            }),
            SortDirection::Desc => None,
        },
        _ => Some(SortSpec {
            field: clicked,
            direction: SortDirection::Asc,
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterQuery {
    All,
    Text(String),
    AtMost(f64),
    AtLeast(f64),
}

impl FilterQuery {
    /// `<N` and `>N` only mean a numeric bound when the grid has a range
    /// field and `N` parses; otherwise the whole text is matched literally.
    pub fn parse(input: &str, has_range_field: bool) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::All;
        }
        if has_range_field {
            if let Some(bound) = trimmed.strip_prefix('<').and_then(parse_bound) {
                return Self::AtMost(bound);
            }
            if let Some(bound) = trimmed.strip_prefix('>').and_then(parse_bound) {
                return Self::AtLeast(bound);
            }
        }
        Self::Text(trimmed.to_lowercase())
    }

    fn admits<R: Record>(&self, record: &R) -> bool {
        match self {
            Self::All => true,
            Self::Text(needle) => search_text(record).contains(needle.as_str()),
            Self::AtMost(bound) => range_value(record).is_some_and(|value| value <= *bound),
            Self::AtLeast(bound) => range_value(record).is_some_and(|value| value >= *bound),
        }
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn search_text<R: Record>(record: &R) -> String {
    R::search_fields()
        .iter()
        .map(|field| record.value(*field).display())
        .collect::<String>()
        .to_lowercase()
}

fn range_value<R: Record>(record: &R) -> Option<f64> {
    R::range_field().and_then(|field| record.value(field).as_f64())
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand<R: Record> {
    ClickHeader(R::Field),
    SetFilter(String),
    SetScope(NoteScope),
    Select(R::Id),
    ClearSelection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent<R: Record> {
    SortChanged(Option<SortSpec<R::Field>>),
    FilterChanged(FilterQuery),
    ScopeChanged(NoteScope),
    SelectionChanged(Option<R::Id>),
}

/// Filter, sort and selection over one module's list. The list itself is
/// never reordered; [`GridController::view`] derives a new ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct GridController<R: Record> {
    sort: Option<SortSpec<R::Field>>,
    filter_text: String,
    filter: FilterQuery,
    scope: NoteScope,
    selection: Option<R::Id>,
}

impl<R: Record> Default for GridController<R> {
    fn default() -> Self {
        Self {
            sort: None,
            filter_text: String::new(),
            filter: FilterQuery::All,
            scope: NoteScope::All,
            selection: None,
        }
    }
}

impl<R: Record> GridController<R> {
    pub fn sort(&self) -> Option<SortSpec<R::Field>> {
        self.sort
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn filter(&self) -> &FilterQuery {
        &self.filter
    }

    pub fn scope(&self) -> NoteScope {
        self.scope
    }

    pub fn selection(&self) -> Option<R::Id> {
        self.selection
    }

    pub fn sort_by_name(&self) -> Option<(&'static str, SortDirection)> {
        self.sort.map(|spec| (spec.field.name(), spec.direction))
    }

    /// Restore a persisted sort; unknown field names leave the grid unsorted.
    pub fn restore_sort(&mut self, name: &str, direction: SortDirection) -> bool {
        let Some(field) = R::Field::parse(name) else {
            return false;
        };
        self.sort = Some(SortSpec { field, direction });
        true
    }

    pub fn dispatch(&mut self, command: GridCommand<R>, records: &[R]) -> Vec<GridEvent<R>> {
        let mut events = match command {
            GridCommand::ClickHeader(field) => {
                self.sort = next_sort(self.sort, field);
                vec![GridEvent::SortChanged(self.sort)]
            }
            GridCommand::SetFilter(text) => {
                self.filter = FilterQuery::parse(&text, R::range_field().is_some());
                self.filter_text = text;
                vec![GridEvent::FilterChanged(self.filter.clone())]
            }
            GridCommand::SetScope(scope) => {
                self.scope = scope;
                vec![GridEvent::ScopeChanged(scope)]
            }
            GridCommand::Select(id) => {
                if self.selection == Some(id) || !self.admits_id(records, id) {
                    Vec::new()
                } else {
                    self.selection = Some(id);
                    vec![GridEvent::SelectionChanged(Some(id))]
                }
            }
            GridCommand::ClearSelection => self.clear_selection(),
        };
        events.extend(self.refresh(records));
        events
    }

    /// Re-check the selection against the current filtered view; call after
    /// every list replacement or deletion.
    pub fn refresh(&mut self, records: &[R]) -> Vec<GridEvent<R>> {
        match self.selection {
            Some(id) if !self.admits_id(records, id) => self.clear_selection(),
            _ => Vec::new(),
        }
    }

    pub fn view<'a>(&self, records: &'a [R]) -> Vec<&'a R> {
        let mut rows: Vec<&R> = records.iter().filter(|record| self.admits(record)).collect();
        if let Some(spec) = self.sort {
            rows.sort_by(|left, right| {
                let order = left.value(spec.field).cmp_value(&right.value(spec.field));
                match spec.direction {
                    SortDirection::Asc => order,
                    SortDirection::Desc => order.reverse(),
                }
            });
        }
        rows
    }

    fn admits(&self, record: &R) -> bool {
        let in_scope = record
            .progress()
            .is_none_or(|process| self.scope.admits(process));
        in_scope && self.filter.admits(record)
    }

    fn admits_id(&self, records: &[R], id: R::Id) -> bool {
        records
            .iter()
            .any(|record| record.id() == id && self.admits(record))
    }

    fn clear_selection(&mut self) -> Vec<GridEvent<R>> {
        if self.selection.take().is_some() {
            vec![GridEvent::SelectionChanged(None)]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BillTotals {
    pub net: f64,
    pub income: f64,
    pub expense: f64,
}

impl BillTotals {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a Bill>) -> Self {
        rows.into_iter().fold(Self::default(), |mut totals, bill| {
            if bill.inout > 0 {
                totals.income += bill.amount;
            } else {
                totals.expense += bill.amount;
            }
            totals.net += bill.signed_amount();
            totals
        })
    }
}
