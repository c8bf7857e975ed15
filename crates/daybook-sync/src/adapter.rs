// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use daybook_app::{FieldName, Patch, Record, coerce, normalize_line_breaks};

/// How the edited cell presents its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    /// Plain text input; the value is taken as typed.
    Input,
    /// Drop-down; the value is the chosen option's value.
    Select,
    /// Rich-text cell whose markup carries line breaks.
    RichText,
}

/// Raw edit event from a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEdit<'a> {
    pub row_id: &'a str,
    pub field: &'a str,
    pub raw: &'a str,
    pub editor: EditorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellPatch<R: Record> {
    pub id: R::Id,
    pub field: R::Field,
    pub patch: R::Patch,
    /// The text did not parse as the field's kind; `patch` is empty.
    pub invalid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    UnknownField { module: &'static str, field: String },
    InvalidRowId { module: &'static str, row_id: String },
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { module, field } => {
                write!(f, "{module} has no field named `{field}`")
            }
            Self::InvalidRowId { module, row_id } => {
                write!(f, "{module} row id `{row_id}` is not a number")
            }
        }
    }
}

impl std::error::Error for AdapterError {}

/// Turn one edited cell into the typed patch it stands for.
pub fn read_cell<R: Record>(edit: &CellEdit<'_>) -> Result<CellPatch<R>, AdapterError> {
    let module = R::MODULE.as_str();
    let id = edit
        .row_id
        .parse::<R::Id>()
        .map_err(|_| AdapterError::InvalidRowId {
            module,
            row_id: edit.row_id.to_owned(),
        })?;
    let field = R::Field::parse(edit.field).ok_or_else(|| AdapterError::UnknownField {
        module,
        field: edit.field.to_owned(),
    })?;

    let text = match edit.editor {
        EditorKind::RichText => normalize_line_breaks(edit.raw),
        EditorKind::Input | EditorKind::Select => edit.raw.to_owned(),
    };

    let mut patch = R::Patch::default();
    let invalid = match coerce(&text, field.kind()) {
        Ok(value) => patch.set(field, value).is_err(),
        Err(_) => true,
    };
    Ok(CellPatch {
        id,
        field,
        patch,
        invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::{AdapterError, CellEdit, EditorKind, read_cell};
    use daybook_app::{Bill, BillField, BillId, BillPatch, Diary, DiaryPatch, Note, NotePatch};

    fn edit<'a>(row_id: &'a str, field: &'a str, raw: &'a str, editor: EditorKind) -> CellEdit<'a> {
        CellEdit {
            row_id,
            field,
            raw,
            editor,
        }
    }

    #[test]
    fn input_cells_become_typed_patches() -> anyhow::Result<()> {
        let read = read_cell::<Bill>(&edit("3", "amount", "12.5", EditorKind::Input))?;
        assert_eq!(read.id, BillId::new(3));
        assert_eq!(read.field, BillField::Amount);
        assert!(!read.invalid);
        assert_eq!(
            read.patch,
            BillPatch {
                amount: Some(12.5),
                ..BillPatch::default()
            }
        );
        Ok(())
    }

    #[test]
    fn select_cells_use_wire_field_names() -> anyhow::Result<()> {
        let read = read_cell::<Bill>(&edit("3", "type", "rent", EditorKind::Select))?;
        assert_eq!(read.patch.category.as_deref(), Some("rent"));
        Ok(())
    }

    #[test]
    fn rich_text_cells_normalize_breaks() -> anyhow::Result<()> {
        let read = read_cell::<Diary>(&edit(
            "20260102",
            "content",
            "<div>a</div><div>b</div>",
            EditorKind::RichText,
        ))?;
        assert_eq!(
            read.patch,
            DiaryPatch {
                content: Some("a\nb".to_owned()),
                ..DiaryPatch::default()
            }
        );
        Ok(())
    }

    #[test]
    fn invalid_values_flag_an_empty_patch() -> anyhow::Result<()> {
        let read = read_cell::<Note>(&edit("1", "process", "12a", EditorKind::Input))?;
        assert!(read.invalid);
        assert_eq!(read.patch, NotePatch::default());
        Ok(())
    }

    #[test]
    fn wiring_mistakes_are_errors() {
        assert_eq!(
            read_cell::<Bill>(&edit("3", "category", "x", EditorKind::Input)),
            Err(AdapterError::UnknownField {
                module: "bill",
                field: "category".to_owned()
            })
        );
        assert!(matches!(
            read_cell::<Bill>(&edit("row-3", "item", "x", EditorKind::Input)),
            Err(AdapterError::InvalidRowId { .. })
        ));
    }
}
