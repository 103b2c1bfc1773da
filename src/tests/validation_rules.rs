use super::*;

fn phone(value: &str) -> FormField {
    FormField::new("phone", value).kind(FieldKind::Phone)
}

fn email(value: &str) -> FormField {
    FormField::new("email", value).kind(FieldKind::Email)
}

#[test]
fn required_field_rejects_blank_and_whitespace() -> Result<()> {
    let validator = Validator::standard()?;
    for value in ["", "   ", "\t\n"] {
        let result = validator.validate(&FormField::new("name", value).required(true));
        assert!(!result.valid, "{value:?} should be rejected");
        assert_eq!(result.message.as_deref(), Some("Dette feltet er påkrevd"));
    }
    assert!(validator.validate(&FormField::new("name", " Ola ").required(true)).valid);
    Ok(())
}

#[test]
fn optional_empty_fields_pass_every_rule() -> Result<()> {
    let validator = Validator::standard()?;
    assert_eq!(validator.validate(&email("")), ValidationResult::ok());
    assert_eq!(validator.validate(&phone("")), ValidationResult::ok());
    assert_eq!(
        validator.validate(&FormField::new("message", "")),
        ValidationResult::ok()
    );
    Ok(())
}

#[test]
fn email_rule_matches_local_at_domain_dot_tld() -> Result<()> {
    let validator = Validator::standard()?;
    for value in ["ola@example.com", "post@kostr-elektro.no", " kari@x.io "] {
        assert!(validator.validate(&email(value)).valid, "{value:?}");
    }
    for value in ["ola@", "ola.example.com", "ola@example", "ola @example.com", "a@b@c.no"] {
        let result = validator.validate(&email(value));
        assert!(!result.valid, "{value:?}");
        assert_eq!(
            result.message.as_deref(),
            Some("Vennligst oppgi en gyldig e-postadresse")
        );
    }
    Ok(())
}

#[test]
fn phone_rule_accepts_norwegian_numbers() -> Result<()> {
    let validator = Validator::standard()?;
    for value in [
        "+47 91234567",
        "91234567",
        "+4791234567",
        "912 34 567",
        "22-33-44-55",
    ] {
        assert!(validator.validate(&phone(value)).valid, "{value:?}");
    }
    Ok(())
}

#[test]
fn phone_rule_only_counts_ascii_digits() -> Result<()> {
    let validator = Validator::standard()?;
    for value in ["9١٢٣٤٥٦٧", "+47 ٩١٢٣٤٥٦٧", "９１２３４５６７", "9१२३४५६७"] {
        let result = validator.validate(&phone(value));
        assert!(!result.valid, "{value:?}");
        assert_eq!(
            result.message.as_deref(),
            Some("Vennligst oppgi et gyldig telefonnummer")
        );
    }
    Ok(())
}

#[test]
fn phone_rule_rejects_short_and_non_numeric_values() -> Result<()> {
    let validator = Validator::standard()?;
    for value in ["123", "abcdefgh", "9123 456", "+47abc45678"] {
        let result = validator.validate(&phone(value));
        assert!(!result.valid, "{value:?}");
        assert_eq!(
            result.message.as_deref(),
            Some("Vennligst oppgi et gyldig telefonnummer")
        );
    }
    Ok(())
}

#[test]
fn phone_digit_fallback_admits_long_foreign_numbers() -> Result<()> {
    let validator = Validator::standard()?;
    assert!(validator.validate(&phone("+46 70 123 45 67")).valid);
    assert!(validator.validate(&phone("12345678")).valid);
    Ok(())
}

#[test]
fn length_only_fallback_keeps_legacy_laxity() -> Result<()> {
    let validator = Validator::new(ValidationMessages::default(), PhoneFallback::LengthOnly)?;
    assert!(validator.validate(&phone("abcdefgh")).valid);
    assert!(!validator.validate(&phone("abc")).valid);
    Ok(())
}

#[test]
fn phone_rule_keys_on_field_name_not_kind() -> Result<()> {
    let validator = Validator::standard()?;
    let mobile = FormField::new("mobile", "abc").kind(FieldKind::Phone);
    assert!(validator.validate(&mobile).valid);
    let named_phone = FormField::new("phone", "abc");
    assert!(!validator.validate(&named_phone).valid);
    Ok(())
}

#[test]
fn later_rule_message_wins_when_several_fail() -> Result<()> {
    let validator = Validator::standard()?;
    let field = FormField::new("phone", "12ab")
        .kind(FieldKind::Phone)
        .required(true);
    assert_eq!(
        validator.validate(&field),
        ValidationResult::invalid("Vennligst oppgi et gyldig telefonnummer")
    );
    Ok(())
}

#[test]
fn validate_form_reports_every_checked_field() -> Result<()> {
    let validator = Validator::standard()?;
    let fields = vec![
        FormField::new("name", "").required(true),
        email("not-an-email").required(true),
        phone("91234567"),
        FormField::new("service", ""),
        FormField::new("message", "hei").required(true),
    ];

    let report = validator.validate_form(&fields);
    assert!(!report.is_valid());
    let names = report
        .results()
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["name", "email", "phone", "message"]);
    assert!(report.result_for("service").is_none());
    assert_eq!(
        report.errors(),
        vec![
            FieldError {
                field: "name".into(),
                message: "Dette feltet er påkrevd".into(),
            },
            FieldError {
                field: "email".into(),
                message: "Vennligst oppgi en gyldig e-postadresse".into(),
            },
        ]
    );
    assert!(!validator.validate_all(&fields));
    Ok(())
}

#[test]
fn validate_form_is_valid_iff_no_errors() -> Result<()> {
    let validator = Validator::standard()?;
    let fields = vec![
        FormField::new("name", "Ola").required(true),
        email("ola@example.com").required(true),
        phone("+47 91234567"),
    ];
    let report = validator.validate_form(&fields);
    assert!(report.is_valid());
    assert!(report.errors().is_empty());
    assert!(validator.validate_all(&fields));
    assert!(validator.validate_all(&[]));
    Ok(())
}

#[test]
fn custom_messages_flow_through_validator() -> Result<()> {
    let messages = ValidationMessages {
        required: "required".into(),
        invalid_email: "bad email".into(),
        invalid_phone: "bad phone".into(),
    };
    let validator = Validator::new(messages, PhoneFallback::DigitsOnly)?;
    assert_eq!(
        validator.validate(&email("x")).message.as_deref(),
        Some("bad email")
    );
    assert_eq!(
        validator
            .validate(&FormField::new("name", "").required(true))
            .message
            .as_deref(),
        Some("required")
    );
    Ok(())
}

#[test]
fn field_kind_follows_control_tag_and_type() {
    assert_eq!(FieldKind::from_control("input", None), FieldKind::Text);
    assert_eq!(FieldKind::from_control("INPUT", Some("Email")), FieldKind::Email);
    assert_eq!(FieldKind::from_control("input", Some("tel")), FieldKind::Phone);
    assert_eq!(FieldKind::from_control("input", Some("number")), FieldKind::Other);
    assert_eq!(FieldKind::from_control("textarea", None), FieldKind::Other);
    assert_eq!(FieldKind::from_control("select", None), FieldKind::Other);
}

#[test]
fn pattern_compile_errors_surface_as_crate_errors() {
    let err = Pattern::new("(").map_err(Error::from);
    assert!(matches!(err, Err(Error::Pattern(_))));
}
