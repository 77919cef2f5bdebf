use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// A single rejected field, addressed by its dotted camelCase path
/// (`mmrSystem.kFactor`, `seasonManagement.rankTiers[1].color`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.field = join_path(prefix, &self.field);
        self
    }
}

/// Everything a config section checks before it may be persisted.
///
/// The derived `validator` rules cover single fields; `extra_checks` covers
/// cross-field rules and list invariants the derive cannot express.
pub trait Schema: Validate {
    fn extra_checks(&self) -> Vec<FieldError> {
        Vec::new()
    }

    fn check(&self) -> Vec<FieldError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => collect_errors("", &e),
        };
        errors.extend(self.extra_checks());
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        errors
    }
}

/// Flatten `validator` output into field errors, recursing into nested
/// structs and lists.
pub fn collect_errors(prefix: &str, errors: &ValidationErrors) -> Vec<FieldError> {
    let mut collected = Vec::new();

    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &camel_case(&field.to_string()));
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                collected.extend(field_errors.iter().map(|e| to_field_error(&path, e)));
            }
            ValidationErrorsKind::Struct(nested) => {
                collected.extend(collect_errors(&path, nested));
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collected.extend(collect_errors(&format!("{}[{}]", path, index), nested));
                }
            }
        }
    }

    collected
}

fn to_field_error(path: &str, error: &ValidationError) -> FieldError {
    let message = match &error.message {
        Some(message) => message.to_string(),
        None => describe(error),
    };
    FieldError::new(path, error.code.to_string(), message)
}

fn describe(error: &ValidationError) -> String {
    let min = error.params.get("min").map(format_bound);
    let max = error.params.get("max").map(format_bound);

    match (&*error.code, min, max) {
        ("range", Some(min), Some(max)) => format!("must be between {} and {}", min, max),
        ("range", Some(min), None) => format!("must be at least {}", min),
        ("range", None, Some(max)) => format!("must be at most {}", max),
        ("length", Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
        ("length", Some(min), None) => format!("length must be at least {}", min),
        ("length", None, Some(max)) => format!("length must be at most {}", max),
        ("url", _, _) => "must be a valid URL".to_string(),
        (code, _, _) => format!("failed `{}` check", code),
    }
}

fn format_bound(value: &serde_json::Value) -> String {
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 => format!("{}", n as i64),
        _ => value.to_string(),
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    match (prefix.is_empty(), field.is_empty()) {
        (true, _) => field.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) if field.starts_with('[') => format!("{}{}", prefix, field),
        (false, false) => format!("{}.{}", prefix, field),
    }
}

/// `k_factor` -> `kFactor`. Already camelCase names pass through unchanged.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    out
}
