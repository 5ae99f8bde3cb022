use crate::models::{parse_due_date, TaskFormData, TaskPatch};

pub const TITLE_MIN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    TitleRequired,
    TitleTooShort,
    InvalidDueDate(String),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::TitleRequired => write!(f, "Title is required"),
            FormError::TitleTooShort => {
                write!(f, "Title must be at least {TITLE_MIN_CHARS} characters")
            }
            FormError::InvalidDueDate(value) => write!(f, "Invalid due date: {value}"),
        }
    }
}

impl std::error::Error for FormError {}

/// Checks form input before it is handed to the store. The store itself
/// accepts anything.
pub fn validate_form(form: &TaskFormData) -> Result<(), FormError> {
    validate_title(&form.title)?;
    validate_due_date(&form.due_date)
}

/// Same rules as [`validate_form`], applied only to the fields an edit sets.
pub fn validate_patch(patch: &TaskPatch) -> Result<(), FormError> {
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(due_date) = &patch.due_date {
        validate_due_date(due_date)?;
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), FormError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(FormError::TitleRequired);
    }
    if title.chars().count() < TITLE_MIN_CHARS {
        return Err(FormError::TitleTooShort);
    }
    Ok(())
}

fn validate_due_date(due_date: &str) -> Result<(), FormError> {
    let due_date = due_date.trim();
    if !due_date.is_empty() && parse_due_date(due_date).is_none() {
        return Err(FormError::InvalidDueDate(due_date.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, due_date: &str) -> TaskFormData {
        TaskFormData {
            title: title.to_string(),
            due_date: due_date.to_string(),
            ..TaskFormData::default()
        }
    }

    #[test]
    fn accepts_valid_input() {
        assert_eq!(validate_form(&form("Buy milk", "")), Ok(()));
        assert_eq!(validate_form(&form("  ok  ", "2024-12-31")), Ok(()));
    }

    #[test]
    fn rejects_blank_and_short_titles() {
        assert_eq!(validate_form(&form("   ", "")), Err(FormError::TitleRequired));
        assert_eq!(validate_form(&form(" a ", "")), Err(FormError::TitleTooShort));
        // Counted in characters, not bytes.
        assert_eq!(validate_form(&form("日本", "")), Ok(()));
    }

    #[test]
    fn rejects_malformed_due_date() {
        assert_eq!(
            validate_form(&form("Pay rent", "31/12/2024")),
            Err(FormError::InvalidDueDate("31/12/2024".to_string()))
        );
    }

    #[test]
    fn patch_validation_only_checks_present_fields() {
        assert_eq!(validate_patch(&TaskPatch::default()), Ok(()));
        let patch = TaskPatch {
            title: Some("x".to_string()),
            ..TaskPatch::default()
        };
        assert_eq!(validate_patch(&patch), Err(FormError::TitleTooShort));
        let patch = TaskPatch {
            due_date: Some(String::new()),
            ..TaskPatch::default()
        };
        assert_eq!(validate_patch(&patch), Ok(()));
    }

    #[test]
    fn error_messages_match_form_copy() {
        assert_eq!(FormError::TitleRequired.to_string(), "Title is required");
        assert_eq!(
            FormError::TitleTooShort.to_string(),
            "Title must be at least 2 characters"
        );
    }
}
