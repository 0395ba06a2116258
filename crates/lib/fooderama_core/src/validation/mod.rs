//! Typed request validation.
//!
//! Request bodies are deserialized into `#[derive(Deserialize, Validate)]`
//! structs. Serde rejections and `validator` failures are both reported as
//! [`FieldErrors`], the `{ formErrors, fieldErrors }` payload of a
//! `ValidationError` response.

pub mod menu;
pub mod users;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveTime;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Validation failures, split into object-level and per-field messages.
///
/// Nested fields use dotted paths such as `Cuisines.1.cuisineId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// A single object-level error.
    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push_form(message);
        errors
    }

    pub fn push_form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn push_field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        self.form_errors.extend(other.form_errors);
        for (field, messages) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(messages);
        }
    }

    /// Re-key every error under `prefix`. Form errors become errors of the
    /// `prefix` field itself.
    pub fn prefixed(self, prefix: &str) -> Self {
        let mut out = Self::default();
        for message in self.form_errors {
            out.push_field(prefix, message);
        }
        for (field, messages) in self.field_errors {
            out.field_errors
                .entry(format!("{prefix}.{field}"))
                .or_default()
                .extend(messages);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// Messages for one field, empty when the field passed.
    pub fn for_field(&self, field: &str) -> &[String] {
        self.field_errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn collect(&mut self, path: Option<&str>, errors: &ValidationErrors) {
        for (name, kind) in errors.errors() {
            let key = match (path, name.as_ref()) {
                (path, "__all__") => path.map(str::to_string),
                (Some(path), name) => Some(format!("{path}.{}", json_key(name))),
                (None, name) => Some(json_key(name)),
            };
            match kind {
                ValidationErrorsKind::Field(list) => {
                    for error in list {
                        match &key {
                            Some(key) => self.push_field(key.clone(), message_of(error)),
                            None => self.push_form(message_of(error)),
                        }
                    }
                }
                ValidationErrorsKind::Struct(nested) if FLATTENED.contains(&name.as_ref()) => {
                    self.collect(path, nested)
                }
                ValidationErrorsKind::Struct(nested) => self.collect(key.as_deref(), nested),
                ValidationErrorsKind::List(items) => {
                    for (index, nested) in items {
                        let item = match &key {
                            Some(key) => format!("{key}.{index}"),
                            None => index.to_string(),
                        };
                        self.collect(Some(&item), nested);
                    }
                }
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::default();
        out.collect(None, &errors);
        out
    }
}

impl From<serde_json::Error> for FieldErrors {
    /// `missing field` rejections name the field; anything else is reported
    /// against the whole object.
    fn from(error: serde_json::Error) -> Self {
        let text = error.to_string();
        match text
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
        {
            Some(field) => {
                let mut out = Self::default();
                out.push_field(field, "Required");
                out
            }
            None => Self::form(text),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            parts.push(format!("{field}: {}", messages.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

pub type Validated<T> = Result<T, FieldErrors>;

/// Association arrays keep their capitalised JSON names.
const ASSOCIATIONS: [&str; 3] = ["Cuisines", "Categories", "Dishes"];

/// `#[serde(flatten)]` fields whose errors belong to the enclosing object.
const FLATTENED: [&str; 2] = ["attributes", "category"];

/// JSON name of a struct field as reported by `validator`.
fn json_key(name: &str) -> String {
    if let Some(assoc) = ASSOCIATIONS.iter().find(|a| a.eq_ignore_ascii_case(name)) {
        return (*assoc).to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn message_of(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("Invalid value ({})", error.code),
    }
}

/// JSON type name as it appears in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserialize a JSON object into `T` without running its rules.
pub(crate) fn deserialize<T: DeserializeOwned>(body: &Value) -> Validated<T> {
    if !body.is_object() {
        return Err(FieldErrors::form(format!(
            "Expected object, received {}",
            type_name(body)
        )));
    }
    Ok(T::deserialize(body)?)
}

/// Run the `validator` rules of `value`, reporting them together with
/// `extra` failures found by the caller.
pub(crate) fn check<T: Validate>(value: T, mut extra: FieldErrors) -> Validated<T> {
    if let Err(errors) = value.validate() {
        extra.merge(errors.into());
    }
    if extra.is_empty() { Ok(value) } else { Err(extra) }
}

/// Deserialize a JSON object into `T` and run its `validator` rules.
pub fn parse<T: DeserializeOwned + Validate>(body: &Value) -> Validated<T> {
    check(deserialize(body)?, FieldErrors::default())
}

/// Record an error on `field` when it holds more than `max` items.
pub(crate) fn limit_items(errors: &mut FieldErrors, field: &str, len: usize, max: usize) {
    if len > max {
        errors.push_field(field, format!("Array must contain at most {max} element(s)"));
    }
}

// ---------------------------------------------------------------------------
// Serde field adapters
// ---------------------------------------------------------------------------

pub(crate) fn trimmed<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(String::deserialize(de)?.trim().to_string())
}

pub(crate) fn trimmed_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(de)?.map(|s| s.trim().to_string()))
}

/// A boolean, or the strings `"true"`/`"false"`.
pub(crate) fn bool_like_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    match Option::<BoolLike>::deserialize(de)? {
        None => Ok(None),
        Some(BoolLike::Bool(b)) => Ok(Some(b)),
        Some(BoolLike::Text(s)) if s == "true" => Ok(Some(true)),
        Some(BoolLike::Text(s)) if s == "false" => Ok(Some(false)),
        Some(BoolLike::Text(_)) => Err(D::Error::custom(
            "Expected boolean or 'true' | 'false'",
        )),
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub(crate) fn validate_time(value: &str) -> Result<(), ValidationError> {
    match parse_time(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("time")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Item {
        #[validate(range(min = 1, message = "Too small"))]
        item_count: i32,
    }

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    #[validate(schema(function = "never_blank"))]
    struct Sample {
        #[serde(deserialize_with = "trimmed")]
        #[validate(length(min = 3, message = "Too short"))]
        display_name: String,
        #[serde(rename = "Dishes", default)]
        #[validate(nested)]
        dishes: Vec<Item>,
    }

    fn never_blank(sample: &Sample) -> Result<(), ValidationError> {
        if sample.display_name == "bad" {
            return Err(ValidationError::new("blank").with_message("Object rejected".into()));
        }
        Ok(())
    }

    #[test]
    fn non_object_body_is_a_form_error() {
        let errors = parse::<Sample>(&json!([1])).unwrap_err();
        assert_eq!(errors.form_errors, ["Expected object, received array"]);
    }

    #[test]
    fn missing_field_is_required() {
        let errors = parse::<Sample>(&json!({})).unwrap_err();
        assert_eq!(errors.for_field("displayName"), ["Required"]);
    }

    #[test]
    fn type_mismatch_is_a_form_error() {
        let errors = parse::<Sample>(&json!({ "displayName": 12 })).unwrap_err();
        assert_eq!(errors.form_errors.len(), 1);
        assert!(errors.field_errors.is_empty());
    }

    #[test]
    fn trims_before_measuring() {
        let errors = parse::<Sample>(&json!({ "displayName": "  ab  " })).unwrap_err();
        assert_eq!(errors.for_field("displayName"), ["Too short"]);
        let ok = parse::<Sample>(&json!({ "displayName": "  abc " })).unwrap();
        assert_eq!(ok.display_name, "abc");
    }

    #[test]
    fn nested_lists_report_dotted_paths() {
        let body = json!({
            "displayName": "ok name",
            "Dishes": [{ "itemCount": 2 }, { "itemCount": 0 }]
        });
        let errors = parse::<Sample>(&body).unwrap_err();
        assert_eq!(errors.for_field("Dishes.1.itemCount"), ["Too small"]);
        assert!(errors.for_field("Dishes.0.itemCount").is_empty());
    }

    #[test]
    fn struct_level_errors_are_form_errors() {
        let errors = parse::<Sample>(&json!({ "displayName": "bad" })).unwrap_err();
        assert_eq!(errors.form_errors, ["Object rejected"]);
    }

    #[test]
    fn prefixing_rekeys_fields_and_form_errors() {
        let mut errors = FieldErrors::form("Broken");
        errors.push_field("restName", "Required");
        let errors = errors.prefixed("2");
        assert_eq!(errors.for_field("2"), ["Broken"]);
        assert_eq!(errors.for_field("2.restName"), ["Required"]);
        assert!(errors.form_errors.is_empty());
    }

    #[test]
    fn extra_failures_are_reported_with_rule_failures() {
        let sample: Sample =
            deserialize(&json!({ "displayName": "ab", "Dishes": [{ "itemCount": 1 }] })).unwrap();
        let mut extra = FieldErrors::default();
        limit_items(&mut extra, "Dishes", sample.dishes.len(), 0);
        let errors = check(sample, extra).unwrap_err();
        assert_eq!(errors.for_field("Dishes"), ["Array must contain at most 0 element(s)"]);
        assert_eq!(errors.for_field("displayName"), ["Too short"]);
    }

    #[test]
    fn json_keys_are_camel_case() {
        assert_eq!(json_key("rest_name"), "restName");
        assert_eq!(json_key("restName"), "restName");
        assert_eq!(json_key("cuisines"), "Cuisines");
        assert_eq!(json_key("Dishes"), "Dishes");
    }

    #[test]
    fn times_accept_minutes_and_seconds() {
        assert_eq!(parse_time("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time("22:15:05"), NaiveTime::from_hms_opt(22, 15, 5));
        assert!(parse_time("9am").is_none());
        assert!(validate_time("25:00").is_err());
    }

    #[test]
    fn serialises_flattened_shape() {
        let mut errors = FieldErrors::form("Bad object");
        errors.push_field("price", "Too small");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            json!({ "formErrors": ["Bad object"], "fieldErrors": { "price": ["Too small"] } })
        );
    }
}
