use super::*;

const ERROR_CLASS: &str = "error";
const FIELD_ERROR_CLASS: &str = "field-error";
const FIELD_ERROR_STYLE: &str =
    "color: var(--color-error); font-size: 0.875rem; margin-top: 0.25rem; display: block;";
const ERROR_BORDER_COLOR: &str = "var(--color-error)";
const FIELD_SELECTOR: &str = "input, textarea, select";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Settled(SubmissionOutcome),
}

/// What a submit action led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAttempt {
    /// A submission is already in flight; nothing happened.
    InFlight,
    /// Validation failed; the transport was not called.
    Invalid(Vec<FieldError>),
    /// The payload went to the transport and the form is waiting on it.
    Dispatched,
    /// Settled without a transport round-trip.
    Settled(SubmissionOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Success,
    Error,
}

impl MessageKind {
    fn class_name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Owns the lifecycle of the contact form: element references cached at
/// attach time, the submission state machine and the message region.
#[derive(Debug)]
pub(crate) struct ContactForm {
    form: NodeId,
    submit_button: NodeId,
    message_region: Option<NodeId>,
    honeypot: Option<NodeId>,
    honeypot_name: String,
    validator: Validator,
    messages: FormMessages,
    message_display_ms: i64,
    state: SubmissionState,
    attempt: u64,
    saved_label: Option<Vec<NodeId>>,
    message_generation: u64,
    last_attempt: Option<SubmitAttempt>,
}

impl ContactForm {
    /// `Ok(None)` when the page has no contact form.
    pub(crate) fn attach(dom: &Dom, config: &FormConfig) -> Result<Option<Self>> {
        let Some(form) = dom.query_selector(&config.form_selector)? else {
            return Ok(None);
        };
        let submit_button = dom
            .query_selector_from(form, &config.submit_selector)?
            .ok_or_else(|| {
                Error::MissingElement(format!(
                    "{} {}",
                    config.form_selector, config.submit_selector
                ))
            })?;
        let message_region = dom.query_selector_from(form, &config.message_selector)?;
        let honeypot = dom.query_selector_from(
            form,
            &format!("input[name=\"{}\"]", config.honeypot_name),
        )?;

        Ok(Some(Self {
            form,
            submit_button,
            message_region,
            honeypot,
            honeypot_name: config.honeypot_name.clone(),
            validator: Validator::from_config(config)?,
            messages: config.messages.clone(),
            message_display_ms: config.message_display_ms,
            state: SubmissionState::Idle,
            attempt: 0,
            saved_label: None,
            message_generation: 0,
            last_attempt: None,
        }))
    }

    pub(crate) fn form_node(&self) -> NodeId {
        self.form
    }

    pub(crate) fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub(crate) fn last_attempt(&self) -> Option<&SubmitAttempt> {
        self.last_attempt.as_ref()
    }

    pub(crate) fn owns(&self, dom: &Dom, node: NodeId) -> bool {
        dom.is_descendant_of(node, self.form)
    }

    fn field_nodes(&self, dom: &Dom) -> Result<Vec<NodeId>> {
        Ok(dom
            .query_selector_all_from(self.form, FIELD_SELECTOR)?
            .into_iter()
            .filter(|node| Some(*node) != self.honeypot && !is_button_like(dom, *node))
            .collect())
    }

    /// Current field values, read fresh from the page. A radio group is read
    /// once, at its first radio.
    pub(crate) fn read_fields(&self, dom: &Dom) -> Result<Vec<(NodeId, FormField)>> {
        let mut seen_groups = HashSet::new();
        let mut fields = Vec::new();
        for node in self.field_nodes(dom)? {
            if is_radio_input(dom, node) {
                let Some(first) = dom.radio_group(node).first().copied() else {
                    continue;
                };
                if !seen_groups.insert(first) {
                    continue;
                }
            }
            fields.push((node, read_field(dom, node)?));
        }
        Ok(fields)
    }

    fn honeypot_tripped(&self, dom: &Dom) -> bool {
        self.honeypot
            .and_then(|node| dom.value(node).ok())
            .is_some_and(|value| !value.is_empty())
    }

    pub(crate) fn handle_submit(
        &mut self,
        page: &mut PageCtx<'_>,
        transport: &mut dyn Transport,
    ) -> Result<SubmitAttempt> {
        let attempt = self.run_submit(page, transport)?;
        self.last_attempt = Some(attempt.clone());
        Ok(attempt)
    }

    fn run_submit(
        &mut self,
        page: &mut PageCtx<'_>,
        transport: &mut dyn Transport,
    ) -> Result<SubmitAttempt> {
        if self.state == SubmissionState::Submitting {
            page.trace.line(TraceCategory::Form, || {
                format!("submit ignored attempt={} state=submitting", self.attempt)
            });
            return Ok(SubmitAttempt::InFlight);
        }

        if self.honeypot_tripped(page.dom) {
            page.trace
                .line(TraceCategory::Form, || "honeypot filled; reporting success".into());
            let text = self.messages.bot_success.clone();
            self.show_message(page, MessageKind::Success, &text)?;
            page.dom.reset_form(self.form);
            self.state = SubmissionState::Settled(SubmissionOutcome::Success);
            return Ok(SubmitAttempt::Settled(SubmissionOutcome::Success));
        }

        self.state = SubmissionState::Validating;
        let fields = self.read_fields(page.dom)?;
        let values = fields
            .iter()
            .map(|(_, field)| field.clone())
            .collect::<Vec<_>>();
        let report = self.validator.validate_form(&values);
        let checked = fields
            .iter()
            .filter(|(_, field)| field.needs_validation())
            .map(|(node, _)| *node);
        for (node, (_, result)) in checked.zip(report.results()) {
            apply_field_feedback(page.dom, node, result)?;
        }
        let errors = report.errors();

        if !errors.is_empty() {
            self.state = SubmissionState::Idle;
            page.trace.line(TraceCategory::Form, || {
                let names = errors
                    .iter()
                    .map(|error| error.field.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("validation failed fields={names}")
            });
            return Ok(SubmitAttempt::Invalid(errors));
        }

        self.state = SubmissionState::Submitting;
        self.attempt += 1;
        self.enter_loading_state(page.dom)?;

        let payload = SubmissionPayload::from_entries(
            fields
                .iter()
                .filter(|(node, _)| is_submitted(page.dom, *node))
                .map(|(_, field)| (field.name.clone(), field.value.as_str())),
            &self.honeypot_name,
        );
        page.trace.line(TraceCategory::Form, || {
            format!("dispatch attempt={} payload={payload}", self.attempt)
        });

        match transport.submit(&payload) {
            Dispatch::After { delay_ms, outcome } => {
                let (timer_id, due_at) = page.timers.schedule(
                    delay_ms,
                    TaskKind::SettleSubmission {
                        attempt: self.attempt,
                        outcome,
                    },
                );
                page.trace.line(TraceCategory::Timer, || {
                    format!("schedule id={timer_id} due_at={due_at} kind=submission_response")
                });
            }
            Dispatch::Pending => {
                page.trace.line(TraceCategory::Form, || {
                    format!("attempt={} awaiting external settlement", self.attempt)
                });
            }
        }

        Ok(SubmitAttempt::Dispatched)
    }

    /// Applies a transport outcome. Returns `false` when nothing was in flight
    /// or the outcome belongs to an older attempt.
    pub(crate) fn settle(
        &mut self,
        page: &mut PageCtx<'_>,
        attempt: Option<u64>,
        outcome: SubmissionOutcome,
    ) -> Result<bool> {
        if self.state != SubmissionState::Submitting
            || attempt.is_some_and(|attempt| attempt != self.attempt)
        {
            page.trace.line(TraceCategory::Form, || {
                format!(
                    "stale outcome ignored attempt={} current={}",
                    attempt.map(|a| a.to_string()).unwrap_or_else(|| "external".into()),
                    self.attempt
                )
            });
            return Ok(false);
        }

        match &outcome {
            SubmissionOutcome::Success => {
                page.trace.line(TraceCategory::Form, || {
                    format!("attempt={} settled outcome=success", self.attempt)
                });
                let text = self.messages.success.clone();
                self.show_message(page, MessageKind::Success, &text)?;
                page.dom.reset_form(self.form);
                if let Some(region) = self.message_region {
                    page.viewport.scroll_into_view(region);
                    let label = page.dom.node_label(region);
                    page.trace
                        .line(TraceCategory::Form, || format!("scroll_into_view {label}"));
                }
            }
            SubmissionOutcome::Failure(err) => {
                page.trace.line(TraceCategory::Form, || {
                    format!(
                        "attempt={} settled outcome=failure reason={}",
                        self.attempt,
                        err.reason()
                    )
                });
                let text = self.messages.failure.clone();
                self.show_message(page, MessageKind::Error, &text)?;
            }
        }

        self.leave_loading_state(page.dom)?;
        self.state = SubmissionState::Settled(outcome);
        Ok(true)
    }

    pub(crate) fn handle_blur(&mut self, page: &mut PageCtx<'_>, node: NodeId) -> Result<()> {
        if Some(node) == self.honeypot || !is_form_control(page.dom, node) {
            return Ok(());
        }
        let field = read_field(page.dom, node)?;
        let result = self.validator.validate(&field);
        page.trace.line(TraceCategory::Form, || {
            format!("blur field={} valid={}", field.name, result.valid)
        });
        apply_field_feedback(page.dom, node, &result)
    }

    pub(crate) fn handle_input(&mut self, page: &mut PageCtx<'_>, node: NodeId) -> Result<()> {
        if Some(node) == self.honeypot || !is_form_control(page.dom, node) {
            return Ok(());
        }
        clear_field_feedback(page.dom, node)
    }

    /// Hides the message region unless a newer message replaced it.
    pub(crate) fn hide_message(&mut self, page: &mut PageCtx<'_>, generation: u64) -> Result<()> {
        if generation != self.message_generation {
            return Ok(());
        }
        if let Some(region) = self.message_region {
            page.dom.style_set(region, "display", "none")?;
        }
        if matches!(self.state, SubmissionState::Settled(_)) {
            self.state = SubmissionState::Idle;
        }
        Ok(())
    }

    fn show_message(&mut self, page: &mut PageCtx<'_>, kind: MessageKind, text: &str) -> Result<()> {
        if let Some(region) = self.message_region {
            page.dom
                .set_class_name(region, &format!("form-message {}", kind.class_name()))?;
            page.dom.set_text_content(region, text)?;
            page.dom.style_set(region, "display", "block")?;
        }

        // The hide timer also carries Settled back to Idle, region or not.
        self.message_generation += 1;
        page.timers.clear_message_hides();
        let (timer_id, due_at) = page.timers.schedule(
            self.message_display_ms,
            TaskKind::HideMessage {
                generation: self.message_generation,
            },
        );
        page.trace.line(TraceCategory::Timer, || {
            format!("schedule id={timer_id} due_at={due_at} kind=hide_message")
        });
        Ok(())
    }

    fn enter_loading_state(&mut self, dom: &mut Dom) -> Result<()> {
        let button = self.submit_button;
        dom.set_disabled(button, true)?;
        self.saved_label = Some(dom.take_children(button));
        let mut attrs = BTreeMap::new();
        attrs.insert("class".to_string(), "pulse".to_string());
        attrs.insert("aria-hidden".to_string(), "true".to_string());
        dom.create_element(button, "span".into(), attrs);
        dom.create_text(button, format!(" {}", self.messages.loading_label));
        Ok(())
    }

    fn leave_loading_state(&mut self, dom: &mut Dom) -> Result<()> {
        let button = self.submit_button;
        if let Some(label) = self.saved_label.take() {
            dom.restore_children(button, label);
        }
        dom.set_disabled(button, false)
    }
}

fn is_button_like(dom: &Dom, node: NodeId) -> bool {
    dom.tag_name(node)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("input"))
        && dom.attr(node, "type").is_some_and(|kind| {
            matches!(
                kind.to_ascii_lowercase().as_str(),
                "submit" | "button" | "reset" | "image"
            )
        })
}

fn read_field(dom: &Dom, node: NodeId) -> Result<FormField> {
    let tag = dom.tag_name(node).unwrap_or_default().to_string();
    let kind = FieldKind::from_control(&tag, dom.attr(node, "type").as_deref());
    let value = if is_checkbox_input(dom, node) || is_radio_input(dom, node) {
        checked_value(dom, node)?.unwrap_or_default()
    } else {
        dom.value(node)?
    };
    Ok(FormField {
        name: dom.attr(node, "name").unwrap_or_default(),
        value,
        kind,
        required: dom.required(node),
    })
}

/// The value a checkbox or radio group submits, `None` when nothing is checked.
fn checked_value(dom: &Dom, node: NodeId) -> Result<Option<String>> {
    let candidates = if is_radio_input(dom, node) {
        dom.radio_group(node)
    } else {
        vec![node]
    };
    for candidate in candidates {
        if dom.checked(candidate)? {
            return Ok(Some(
                dom.attr(candidate, "value").unwrap_or_else(|| "on".into()),
            ));
        }
    }
    Ok(None)
}

/// Unchecked checkboxes and radio groups stay out of the payload.
fn is_submitted(dom: &Dom, node: NodeId) -> bool {
    if !(is_checkbox_input(dom, node) || is_radio_input(dom, node)) {
        return true;
    }
    checked_value(dom, node).is_ok_and(|value| value.is_some())
}

fn clear_field_feedback(dom: &mut Dom, node: NodeId) -> Result<()> {
    dom.class_remove(node, ERROR_CLASS)?;
    let Some(parent) = dom.parent(node) else {
        return Ok(());
    };
    if let Some(existing) =
        dom.query_selector_from(parent, &format!(".{FIELD_ERROR_CLASS}"))?
    {
        dom.remove_node(existing)?;
    }
    Ok(())
}

/// Presentation step for one validation result.
fn apply_field_feedback(dom: &mut Dom, node: NodeId, result: &ValidationResult) -> Result<()> {
    clear_field_feedback(dom, node)?;

    if result.valid {
        return dom.style_set(node, "border-color", "");
    }

    dom.class_add(node, ERROR_CLASS)?;
    dom.style_set(node, "border-color", ERROR_BORDER_COLOR)?;
    let Some(parent) = dom.parent(node) else {
        return Ok(());
    };
    let mut attrs = BTreeMap::new();
    attrs.insert("class".to_string(), FIELD_ERROR_CLASS.to_string());
    attrs.insert("style".to_string(), FIELD_ERROR_STYLE.to_string());
    let span = dom.create_element(parent, "span".into(), attrs);
    if let Some(message) = &result.message {
        dom.create_text(span, message.clone());
    }
    Ok(())
}
