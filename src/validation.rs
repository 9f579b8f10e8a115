//! Turns `validator` errors into messages for display above a form.

use std::collections::HashSet;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Flattens every error into its message, falling back to `"{field} is invalid."`
/// when a rule carries no message. Duplicates are dropped, order is by field name.
pub fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut out = Vec::new();
    collect(errors, &mut out);

    let mut seen = HashSet::new();
    out.retain(|m| seen.insert(m.clone()));
    out
}

fn collect(errors: &ValidationErrors, out: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    for (field, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    match &error.message {
                        Some(message) => out.push(message.to_string()),
                        None => out.push(format!("{} is invalid.", humanize(field))),
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect(inner, out);
                }
            }
        }
    }
}

/// "start_date" -> "Start date"
fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Name is required."))]
        name: String,
        #[validate(length(min = 8))]
        pass_word: String,
    }

    #[test]
    fn test_messages_use_custom_text_or_field_name() {
        let sample = Sample {
            name: String::new(),
            pass_word: "short".to_owned(),
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(
            messages(&errors),
            vec!["Name is required.".to_owned(), "Pass word is invalid.".to_owned()]
        );
    }
}
