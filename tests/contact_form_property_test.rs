use kostr_site::{
    Dispatch, FieldKind, FormField, ScriptedTransport, Site, SubmissionState, SubmitAttempt,
    Validator,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const CONTACT_FORM_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/contact_form_property_test.txt";
const DEFAULT_CONTACT_FORM_PROPTEST_CASES: u32 = 96;
const RESPONSE_DELAY_MS: i64 = 700;

const CONTACT_PAGE_HTML: &str = r#"
<header class="header">
  <button class="nav-toggle" aria-expanded="false"><span></span></button>
  <nav class="nav-mobile"><a id="nav-home" href="index.html">Hjem</a></nav>
</header>
<a id="call" href="tel:+4791234567">912 34 567</a>
<form id="contact-form" novalidate>
  <div><input id="name" name="name" type="text" required></div>
  <div><input id="email" name="email" type="email" required></div>
  <div><input id="phone" name="phone" type="tel"></div>
  <div><textarea id="message" name="message" required></textarea></div>
  <div><input id="website" name="website" type="text"></div>
  <button id="send" type="submit">Send</button>
  <div class="form-message"></div>
</form>
"#;

#[derive(Clone, Debug)]
enum FormAction {
    Type(&'static str, String),
    Focus(&'static str),
    Blur(&'static str),
    ClickSend,
    SubmitForm,
    Advance(i64),
    Flush,
    ToggleMenu,
    Escape,
    Scroll(i64),
    ClickCall,
}

fn env_proptest_cases(var_name: &str, default_cases: u32) -> u32 {
    std::env::var(var_name)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default_cases)
}

fn contact_form_proptest_cases() -> u32 {
    std::env::var("KOSTR_SITE_FORM_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or_else(|| {
            env_proptest_cases(
                "KOSTR_SITE_PROPTEST_CASES",
                DEFAULT_CONTACT_FORM_PROPTEST_CASES,
            )
        })
}

fn field_value_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        3 => Just(String::new()),
        2 => Just("Ola".to_string()),
        2 => Just("ola@example.com".to_string()),
        2 => Just("91234567".to_string()),
        1 => Just("+47 912 34 567".to_string()),
        1 => Just("abcdefgh".to_string()),
        1 => Just("  ".to_string()),
        1 => "[a-z@. 0-9-]{0,12}",
    ]
    .boxed()
}

fn field_selector_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![
        Just("#name"),
        Just("#email"),
        Just("#phone"),
        Just("#message"),
    ]
    .boxed()
}

fn form_action_strategy() -> BoxedStrategy<FormAction> {
    prop_oneof![
        6 => (field_selector_strategy(), field_value_strategy())
            .prop_map(|(selector, value)| FormAction::Type(selector, value)),
        1 => field_value_strategy().prop_map(|value| FormAction::Type("#website", value)),
        1 => field_selector_strategy().prop_map(FormAction::Focus),
        1 => field_selector_strategy().prop_map(FormAction::Blur),
        4 => Just(FormAction::ClickSend),
        1 => Just(FormAction::SubmitForm),
        3 => (0i64..=12_000).prop_map(FormAction::Advance),
        1 => Just(FormAction::Flush),
        1 => Just(FormAction::ToggleMenu),
        1 => Just(FormAction::Escape),
        1 => (0i64..=200).prop_map(FormAction::Scroll),
        1 => Just(FormAction::ClickCall),
    ]
    .boxed()
}

fn form_action_sequence_strategy() -> BoxedStrategy<Vec<FormAction>> {
    vec(form_action_strategy(), 1..=32).boxed()
}

fn run_action(site: &mut Site, action: &FormAction) -> kostr_site::Result<()> {
    match action {
        FormAction::Type(selector, value) => site.type_text(selector, value),
        FormAction::Focus(selector) => site.focus(selector),
        FormAction::Blur(selector) => site.blur(selector),
        FormAction::ClickSend => site.click("#send"),
        FormAction::SubmitForm => site.submit("#contact-form"),
        FormAction::Advance(delta_ms) => site.advance_time(*delta_ms),
        FormAction::Flush => site.flush(),
        FormAction::ToggleMenu => site.click(".nav-toggle"),
        FormAction::Escape => site.press_key("Escape"),
        FormAction::Scroll(y) => site.scroll_to(*y),
        FormAction::ClickCall => site.click("#call"),
    }
}

fn is_submit_action(action: &FormAction) -> bool {
    matches!(action, FormAction::ClickSend | FormAction::SubmitForm)
}

fn assert_submission_invariants(failures: &[bool], actions: &[FormAction]) -> TestCaseResult {
    let transport = failures.iter().fold(
        ScriptedTransport::succeeding(RESPONSE_DELAY_MS),
        |transport, fail| {
            if *fail {
                transport.then(Dispatch::fail_after(RESPONSE_DELAY_MS, "scripted failure"))
            } else {
                transport.then(Dispatch::succeed_after(RESPONSE_DELAY_MS))
            }
        },
    );
    let mut site = Site::from_html(CONTACT_PAGE_HTML)
        .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
    site.set_transport(transport.clone());

    for (step, action) in actions.iter().enumerate() {
        let was_submitting = site.form_state() == Some(SubmissionState::Submitting);
        let calls_before = transport.calls();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_action(&mut site, action)
        }));
        match outcome {
            Err(_) => {
                prop_assert!(
                    false,
                    "action panicked at step {step}: {action:?}, actions={actions:?}"
                );
            }
            Ok(Err(error)) => {
                prop_assert!(
                    false,
                    "action returned error at step {step}: {action:?}, error={error:?}, actions={actions:?}"
                );
            }
            Ok(Ok(())) => {}
        }

        let calls_after = transport.calls();
        if was_submitting || !is_submit_action(action) {
            prop_assert_eq!(
                calls_after,
                calls_before,
                "transport called outside an accepted submit at step {}: {:?}",
                step,
                action
            );
        } else {
            let dispatched = site.last_submit_attempt() == Some(SubmitAttempt::Dispatched);
            prop_assert_eq!(
                calls_after,
                calls_before + usize::from(dispatched),
                "submit at step {} dispatched={} but transport saw {} new calls",
                step,
                dispatched,
                calls_after - calls_before
            );
        }

        let submitting = site.form_state() == Some(SubmissionState::Submitting);
        prop_assert!(
            site.assert_disabled("#send", submitting).is_ok(),
            "submit control disabled state out of sync at step {step}: {action:?}"
        );
        let label = if submitting { " Sender..." } else { "Send" };
        prop_assert!(
            site.assert_text("#send", label).is_ok(),
            "submit control label out of sync at step {step}: {action:?}"
        );
        for payload in transport.payloads() {
            prop_assert!(!payload.contains("website"), "honeypot leaked into payload");
        }
    }

    Ok(())
}

fn norwegian_phone_strategy() -> BoxedStrategy<String> {
    (
        any::<bool>(),
        2u8..=9,
        vec(0u8..=9, 7),
        vec(prop_oneof![Just(""), Just(" "), Just("-")], 8),
    )
        .prop_map(|(with_prefix, first, rest, separators)| {
            let mut out = String::new();
            if with_prefix {
                out.push_str("+47");
            }
            let digits = std::iter::once(first).chain(rest);
            for (digit, separator) in digits.zip(separators) {
                out.push_str(separator);
                out.push(char::from(b'0' + digit));
            }
            out
        })
        .boxed()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: contact_form_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(CONTACT_FORM_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn contact_form_actions_keep_submission_invariants(
        failures in vec(any::<bool>(), 0..4),
        actions in form_action_sequence_strategy(),
    ) {
        assert_submission_invariants(&failures, &actions)?;
    }

    #[test]
    fn norwegian_numbers_always_pass_phone_rule(value in norwegian_phone_strategy()) {
        let validator = Validator::standard()
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        let field = FormField::new("phone", value.clone()).kind(FieldKind::Phone);
        prop_assert!(validator.validate(&field).valid, "{value:?} rejected");
    }

    #[test]
    fn phone_values_with_letters_never_pass(
        prefix in "[0-9 ]{0,6}",
        letter in "[a-zA-Z]",
        suffix in "[0-9a-z]{0,8}",
    ) {
        let validator = Validator::standard()
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        let value = format!("{prefix}{letter}{suffix}");
        let field = FormField::new("phone", value.clone()).kind(FieldKind::Phone);
        prop_assert!(!validator.validate(&field).valid, "{value:?} accepted");
    }

    #[test]
    fn simple_addresses_pass_email_rule(
        local in "[a-z0-9._%+-]{1,12}",
        domain in "[a-z0-9-]{1,12}",
        tld in "[a-z]{2,6}",
    ) {
        let validator = Validator::standard()
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        let value = format!("{local}@{domain}.{tld}");
        let field = FormField::new("email", value.clone()).kind(FieldKind::Email);
        prop_assert!(validator.validate(&field).valid, "{value:?} rejected");
    }
}
