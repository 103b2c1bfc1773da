use super::*;

fn traced_site(transport: &ScriptedTransport) -> Result<Site> {
    let mut site = contact_site(transport)?;
    site.set_trace_stderr(false);
    Ok(site)
}

#[test]
fn submission_trace_lines_follow_the_flow() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500);
    let mut site = traced_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.enable_trace(true);

    site.click("#send")?;
    site.advance_time(1_500)?;

    assert_eq!(
        site.take_trace_logs(),
        vec![
            "[event] click target=button#send".to_string(),
            "[event] submit target=form#contact-form".to_string(),
            "[form] dispatch attempt=1 payload={name=\"Ola\", email=\"ola@example.com\", phone=\"91234567\", service=\"\", message=\"hei\"}".to_string(),
            "[timer] schedule id=1 due_at=1500 kind=submission_response".to_string(),
            "[timer] run id=1 due_at=1500 now_ms=1500".to_string(),
            "[form] attempt=1 settled outcome=success".to_string(),
            "[timer] schedule id=2 due_at=11500 kind=hide_message".to_string(),
            "[form] scroll_into_view div.form-message.success".to_string(),
            "[timer] advance delta_ms=1500 from=0 to=1500 ran_due=1".to_string(),
        ]
    );
    assert!(site.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn failure_reason_is_traced_not_displayed() -> Result<()> {
    let transport = ScriptedTransport::failing(200, "HTTP 502 Bad Gateway");
    let mut site = traced_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.enable_trace(true);
    site.click("#send")?;
    site.advance_time(200)?;

    let logs = site.take_trace_logs();
    assert!(logs.contains(
        &"[form] attempt=1 settled outcome=failure reason=HTTP 502 Bad Gateway".to_string()
    ));
    assert!(!site.text(".form-message")?.contains("502"));
    Ok(())
}

#[test]
fn validation_and_honeypot_paths_are_traced() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let mut site = traced_site(&transport)?;
    site.enable_trace(true);
    site.set_trace_events(false);

    site.click("#send")?;
    site.type_text("#website", "bot")?;
    site.click("#send")?;

    assert_eq!(
        site.take_trace_logs(),
        vec![
            "[form] validation failed fields=name,email,message".to_string(),
            "[form] honeypot filled; reporting success".to_string(),
            "[timer] schedule id=1 due_at=10000 kind=hide_message".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn nav_analytics_and_scroll_are_traced() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let mut site = traced_site(&transport)?;
    site.enable_trace(true);

    site.click(".nav-toggle")?;
    site.press_key("Escape")?;
    site.click("#call")?;
    site.scroll_to(80)?;

    assert_eq!(
        site.take_trace_logs(),
        vec![
            "[event] click target=button.nav-toggle".to_string(),
            "[nav] menu opened".to_string(),
            "[event] keydown key=Escape target=#document".to_string(),
            "[nav] menu closed via=escape".to_string(),
            "[event] click target=a#call".to_string(),
            "[analytics] phone_call category=Contact label=tel:+4791234567".to_string(),
            "[event] scroll y=80".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn trace_category_switches_filter_lines() -> Result<()> {
    let transport = ScriptedTransport::succeeding(100);
    let mut site = traced_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.enable_trace(true);
    site.set_trace_events(false);
    site.set_trace_form(false);

    site.click("#send")?;
    site.advance_time(100)?;

    let logs = site.take_trace_logs();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|line| line.starts_with("[timer]")));
    Ok(())
}

#[test]
fn trace_is_off_by_default() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let mut site = traced_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    site.flush()?;
    assert!(site.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_keeps_newest_lines() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let mut site = traced_site(&transport)?;
    site.enable_trace(true);
    assert!(matches!(site.set_trace_log_limit(0), Err(Error::Runtime(_))));

    for y in [10, 20, 30, 40] {
        site.scroll_to(y)?;
    }
    site.set_trace_log_limit(2)?;
    assert_eq!(
        site.take_trace_logs(),
        vec!["[event] scroll y=30".to_string(), "[event] scroll y=40".to_string()]
    );

    for y in [50, 60, 70] {
        site.scroll_to(y)?;
    }
    assert_eq!(
        site.take_trace_logs(),
        vec!["[event] scroll y=60".to_string(), "[event] scroll y=70".to_string()]
    );
    Ok(())
}

#[test]
fn message_hides_after_display_timeout() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    site.advance_time(1_500)?;

    site.advance_time(9_999)?;
    site.assert_visible(".form-message", true)?;
    site.advance_time(1)?;
    site.assert_visible(".form-message", false)?;
    assert_eq!(site.form_state(), Some(SubmissionState::Idle));
    assert_eq!(site.now_ms(), 11_500);
    Ok(())
}

#[test]
fn newer_message_cancels_older_hide() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_000);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    site.advance_time(1_000)?;

    site.advance_time_to(6_000)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    site.advance_time(1_000)?;
    assert_eq!(
        site.pending_timers()
            .iter()
            .map(|timer| (timer.due_at, timer.kind))
            .collect::<Vec<_>>(),
        vec![(17_000, TimerKind::HideMessage)]
    );

    site.advance_time_to(11_000)?;
    site.assert_visible(".form-message", true)?;
    site.advance_time_to(17_000)?;
    site.assert_visible(".form-message", false)?;
    Ok(())
}

#[test]
fn custom_display_time_is_honored() -> Result<()> {
    let config = SiteConfig::default().form(FormConfig::default().message_display_ms(3_000));
    let transport = ScriptedTransport::succeeding(0);
    let mut site = Site::from_html_with_config(CONTACT_PAGE, config)?;
    site.set_transport(transport.clone());
    site.type_text("#website", "bot")?;
    site.click("#send")?;
    site.advance_time(2_999)?;
    site.assert_visible(".form-message", true)?;
    site.advance_time(1)?;
    site.assert_visible(".form-message", false)?;
    Ok(())
}

#[test]
fn pending_timers_report_submission_response() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    assert_eq!(
        site.pending_timers(),
        vec![PendingTimer {
            id: 1,
            due_at: 1_500,
            order: 0,
            kind: TimerKind::SubmissionResponse,
        }]
    );
    Ok(())
}

#[test]
fn cleared_response_timer_leaves_submission_pending() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;

    assert!(site.clear_timer(1));
    assert!(!site.clear_timer(1));
    site.flush()?;
    assert_eq!(site.form_state(), Some(SubmissionState::Submitting));

    assert!(site.settle_submission(SubmissionOutcome::Failure(TransportError::new("lost")))?);
    site.assert_text(".form-message", FAILURE_TEXT)?;
    Ok(())
}

#[test]
fn run_next_timer_jumps_the_clock() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;

    assert!(site.run_next_timer()?);
    assert_eq!(site.now_ms(), 1_500);
    assert!(site.run_next_timer()?);
    assert_eq!(site.now_ms(), 11_500);
    assert!(!site.run_next_timer()?);
    site.assert_visible(".form-message", false)?;
    Ok(())
}

#[test]
fn run_due_timers_only_runs_what_is_due() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    assert_eq!(site.run_due_timers()?, 0);
    assert_eq!(site.form_state(), Some(SubmissionState::Submitting));
    Ok(())
}

#[test]
fn clear_all_timers_empties_queue() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    site.run_due_timers()?;
    assert_eq!(site.clear_all_timers(), 1);
    assert!(site.pending_timers().is_empty());
    site.flush()?;
    site.assert_visible(".form-message", true)?;
    Ok(())
}

#[test]
fn clock_rejects_moving_backwards() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let mut site = contact_site(&transport)?;
    assert!(matches!(site.advance_time(-1), Err(Error::Runtime(_))));
    site.advance_time(100)?;
    assert!(matches!(site.advance_time_to(99), Err(Error::Runtime(_))));
    site.advance_time_to(100)?;
    assert_eq!(site.now_ms(), 100);
    Ok(())
}

#[test]
fn timer_step_limit_turns_runaway_queue_into_error() -> Result<()> {
    let transport = ScriptedTransport::succeeding(1_500).then(Dispatch::fail_after(100, "x"));
    let mut site = contact_site(&transport)?;
    fill_valid_form(&mut site)?;
    site.click("#send")?;
    site.advance_time(100)?;
    site.click("#send")?;
    assert_eq!(site.pending_timers().len(), 2);

    assert!(matches!(site.set_timer_step_limit(0), Err(Error::Runtime(_))));
    site.set_timer_step_limit(1)?;
    let Err(Error::Runtime(message)) = site.flush() else {
        return Err(Error::Runtime("flush should hit the step limit".into()));
    };
    assert!(message.starts_with("timer queue exceeded max steps: limit=1, steps=2"));
    Ok(())
}

#[test]
fn error_display_is_readable() {
    assert_eq!(
        Error::SelectorNotFound("#x".into()).to_string(),
        "selector not found: #x"
    );
    assert_eq!(
        Error::MissingElement("#contact-form button".into()).to_string(),
        "required element missing: #contact-form button"
    );
    assert_eq!(
        Error::TypeMismatch {
            selector: "#s".into(),
            expected: "input or textarea".into(),
            actual: "select".into(),
        }
        .to_string(),
        "type mismatch for #s: expected input or textarea, actual select"
    );
}

#[test]
fn assertion_failure_carries_snippet() -> Result<()> {
    let transport = ScriptedTransport::succeeding(0);
    let site = contact_site(&transport)?;
    let err = site.assert_text("#send", "Send");
    assert_eq!(
        err,
        Err(Error::AssertionFailed {
            selector: "#send".into(),
            expected: "Send".into(),
            actual: "Send henvendelse".into(),
            dom_snippet: "<button id=\"send\" type=\"submit\">Send henvendelse</button>".into(),
        })
    );
    Ok(())
}
