//! Form field validation.
//!
//! ```
//! use lattice_web::validator::{Rule, Validator};
//! use std::collections::HashMap;
//!
//! let data = HashMap::from([("full-name".to_owned(), String::new())]);
//! let mut validator = Validator::new();
//!
//! assert!(!validator.validate(&data, &[("full-name", vec![Rule::Required, Rule::Max(64)])]));
//! assert_eq!(validator.error_fields()["full-name"], ["Full name is required"]);
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::HttpError;

/// A check applied to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// The field must be present and non-empty; `"0"` counts as present
    Required,
    /// Skips the remaining rules of the field when it is missing or empty
    Optional,
    Integer,
    /// At least this many characters
    Min(usize),
    /// At most this many characters
    Max(usize),
    Email,
    /// One of the listed values
    OneOf(Vec<String>),
    /// Either `"0"` or `"1"`
    Boolean,
}

impl Rule {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }
}

/// Collects rule violations per field across calls to [`Validator::validate`].
#[derive(Debug, Default)]
pub struct Validator {
    error_fields: BTreeMap<String, Vec<String>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `data` against `rules`, returning true when no errors have been recorded.
    ///
    /// Rules of a field run in order and every failing rule records a message,
    /// except that [`Rule::Optional`] on an empty field skips the rest.
    pub fn validate(&mut self, data: &HashMap<String, String>, rules: &[(&str, Vec<Rule>)]) -> bool {
        for (field, field_rules) in rules {
            let value = data.get(*field).map(String::as_str).unwrap_or_default();
            let label = field_label(field);

            for rule in field_rules {
                if *rule == Rule::Optional && value.is_empty() {
                    break;
                }

                if let Some(message) = check(rule, value, &label) {
                    debug!(field, reason = %message, "field failed validation");
                    self.error_fields.entry((*field).to_owned()).or_default().push(message);
                }
            }
        }

        self.error_fields.is_empty()
    }

    /// Messages recorded so far, by field
    pub fn error_fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.error_fields
    }

    /// A 400 error carrying the first message of every invalid field
    pub fn into_http_error(self, message: impl AsRef<str>) -> HttpError {
        let first_errors = self
            .error_fields
            .into_iter()
            .filter_map(|(field, messages)| messages.into_iter().next().map(|first| (field, first)));
        HttpError::bad_request_with_fields(message, first_errors)
    }
}

fn check(rule: &Rule, value: &str, label: &str) -> Option<String> {
    let valid = match rule {
        Rule::Required => !value.is_empty(),
        Rule::Optional => true,
        Rule::Integer => value.parse::<i64>().is_ok(),
        Rule::Min(min) => value.chars().count() >= *min,
        Rule::Max(max) => value.chars().count() <= *max,
        Rule::Email => is_email(value),
        Rule::OneOf(values) => values.iter().any(|v| v == value),
        Rule::Boolean => matches!(value, "0" | "1"),
    };
    if valid {
        return None;
    }

    let message = match rule {
        Rule::Required => format!("{label} is required"),
        Rule::Integer => format!("{label} must be an integer"),
        Rule::Min(min) => format!("{label} must be at least {min} characters"),
        Rule::Max(max) => format!("{label} must be no more than {max} characters"),
        Rule::Email => format!("{label} must be a valid email address"),
        Rule::OneOf(values) => format!("{label} must be one of {}", values.join(", ")),
        Rule::Boolean => format!("{label} must be a boolean"),
        Rule::Optional => return None,
    };
    Some(message)
}

/// `full-name` becomes `Full name`
fn field_label(field: &str) -> String {
    let spaced = field.replace('-', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

// local@domain.tld, no whitespace, a single `@`
fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    let well_formed_label = |label: &str| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    };

    !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(b, b'@' | b'(' | b')' | b',' | b':' | b';' | b'<' | b'>' | b'[' | b'\\' | b']' | b'"')
        })
        && domain.contains('.')
        && domain.split('.').all(well_formed_label)
}
