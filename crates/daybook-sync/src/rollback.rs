// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use daybook_app::{FieldKind, FieldName, FieldValue, Record, coerce};

#[derive(Debug, Clone, PartialEq)]
pub enum BlurOutcome {
    /// Text fields are saved as they are typed and never rolled back.
    Exempt,
    /// The text parsed; it stays on screen and the value goes to the draft.
    Keep(FieldValue),
    /// The text did not parse; the cell must show this confirmed text again.
    Revert(String),
}

/// Validate a typed cell when it loses focus.
///
/// Reverts always restore the record's confirmed value, never a pending
/// draft value.
pub fn check_blur<R: Record>(record: &R, field: R::Field, raw: &str) -> BlurOutcome {
    let kind = field.kind();
    if kind == FieldKind::String {
        return BlurOutcome::Exempt;
    }
    match coerce(raw, kind) {
        Ok(value) => BlurOutcome::Keep(value),
        Err(_) => BlurOutcome::Revert(record.value(field).display()),
    }
}

#[cfg(test)]
mod tests {
    use super::{BlurOutcome, check_blur};
    use daybook_app::{Bill, BillField, BillId, FieldValue};

    fn bill() -> Bill {
        Bill {
            id: BillId::new(1),
            date: 20260101,
            inout: -1,
            category: "food".to_owned(),
            amount: 10.0,
            item: "lunch".to_owned(),
        }
    }

    #[test]
    fn invalid_number_reverts_to_confirmed_text() {
        assert_eq!(
            check_blur(&bill(), BillField::Amount, "12a"),
            BlurOutcome::Revert("10".to_owned())
        );
        assert_eq!(
            check_blur(&bill(), BillField::Date, ""),
            BlurOutcome::Revert("20260101".to_owned())
        );
    }

    #[test]
    fn valid_number_is_kept() {
        assert_eq!(
            check_blur(&bill(), BillField::Amount, "12"),
            BlurOutcome::Keep(FieldValue::Float(12.0))
        );
    }

    #[test]
    fn text_fields_are_exempt() {
        assert_eq!(check_blur(&bill(), BillField::Item, ""), BlurOutcome::Exempt);
    }
}
