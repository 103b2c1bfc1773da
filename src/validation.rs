//! Field and form validation rules.
//!
//! Everything here is pure: fields go in, results come out. Applying the
//! results to the page lives in the controller.

use super::*;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const NORWEGIAN_PHONE_PATTERN: &str = r"^(\+47)?[\s-]?[2-9][0-9]{7}$";
const PHONE_FIELD_NAME: &str = "phone";
const PHONE_MIN_DIGITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Phone,
    Other,
}

impl FieldKind {
    /// Maps a control's tag and `type` attribute to a field kind.
    pub fn from_control(tag: &str, type_attr: Option<&str>) -> Self {
        if !tag.eq_ignore_ascii_case("input") {
            return Self::Other;
        }
        match type_attr.map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("text") => Self::Text,
            Some("email") => Self::Email,
            Some("tel") => Self::Phone,
            Some(_) => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: FieldKind::Text,
            required: false,
        }
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    fn is_phone(&self) -> bool {
        self.name == PHONE_FIELD_NAME
    }

    /// Whether the field has a rule beyond `required`.
    pub fn has_type_rule(&self) -> bool {
        self.kind == FieldKind::Email || self.is_phone()
    }

    /// Whether a form pass checks this field at all.
    pub fn needs_validation(&self) -> bool {
        self.required || self.has_type_rule()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Outcome of one validation pass over a form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValidation {
    results: Vec<(String, ValidationResult)>,
}

impl FormValidation {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, result)| result.valid)
    }

    /// Results for every checked field, in form order.
    pub fn results(&self) -> &[(String, ValidationResult)] {
        &self.results
    }

    pub fn result_for(&self, name: &str) -> Option<&ValidationResult> {
        self.results
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, result)| result)
    }

    pub fn errors(&self) -> Vec<FieldError> {
        self.results
            .iter()
            .filter_map(|(field, result)| {
                let message = result.message.clone()?;
                (!result.valid).then(|| FieldError {
                    field: field.clone(),
                    message,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    email: Pattern,
    phone: Pattern,
    messages: ValidationMessages,
    phone_fallback: PhoneFallback,
}

impl Validator {
    pub fn new(messages: ValidationMessages, phone_fallback: PhoneFallback) -> Result<Self> {
        Ok(Self {
            email: Pattern::new(EMAIL_PATTERN)?,
            phone: Pattern::new(NORWEGIAN_PHONE_PATTERN)?,
            messages,
            phone_fallback,
        })
    }

    /// Norwegian messages with the digits-only phone fallback.
    pub fn standard() -> Result<Self> {
        Self::new(ValidationMessages::default(), PhoneFallback::default())
    }

    pub fn from_config(config: &FormConfig) -> Result<Self> {
        Self::new(config.validation_messages.clone(), config.phone_fallback)
    }

    pub fn validate(&self, field: &FormField) -> ValidationResult {
        let value = field.value.trim();
        let mut result = ValidationResult::ok();

        if field.required && value.is_empty() {
            result = ValidationResult::invalid(&self.messages.required);
        }

        if field.kind == FieldKind::Email && !value.is_empty() && !self.email.is_match(value) {
            result = ValidationResult::invalid(&self.messages.invalid_email);
        }

        if field.is_phone() && !value.is_empty() && !self.is_acceptable_phone(value) {
            result = ValidationResult::invalid(&self.messages.invalid_phone);
        }

        result
    }

    fn is_acceptable_phone(&self, value: &str) -> bool {
        let cleaned = value
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '-')
            .collect::<String>();
        if self.phone.is_match(&cleaned) {
            return true;
        }
        match self.phone_fallback {
            PhoneFallback::DigitsOnly => {
                let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
                digits.len() >= PHONE_MIN_DIGITS && digits.bytes().all(|b| b.is_ascii_digit())
            }
            PhoneFallback::LengthOnly => cleaned.chars().count() >= PHONE_MIN_DIGITS,
        }
    }

    /// Checks every required or typed field without stopping at the first failure.
    pub fn validate_form(&self, fields: &[FormField]) -> FormValidation {
        let results = fields
            .iter()
            .filter(|field| field.needs_validation())
            .map(|field| (field.name.clone(), self.validate(field)))
            .collect();
        FormValidation { results }
    }

    pub fn validate_all(&self, fields: &[FormField]) -> bool {
        self.validate_form(fields).is_valid()
    }
}
