use super::*;

/// Mutable page state handed to the behaviors while they react to an event.
pub(crate) struct PageCtx<'a> {
    pub(crate) dom: &'a mut Dom,
    pub(crate) timers: &'a mut Scheduler,
    pub(crate) trace: &'a mut TraceLog,
    pub(crate) viewport: &'a mut Viewport,
}

/// A loaded page with its behaviors attached: the contact form, the
/// navigation and the analytics hooks.
///
/// All time is virtual. Transport responses and message timeouts wait on the
/// clock until it is moved with [`Site::advance_time`] or [`Site::flush`].
pub struct Site {
    dom: Dom,
    timers: Scheduler,
    trace: TraceLog,
    viewport: Viewport,
    form: Option<ContactForm>,
    navigation: Navigation,
    transport: Box<dyn Transport>,
    analytics: Option<Box<dyn AnalyticsSink>>,
    active_element: Option<NodeId>,
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("now_ms", &self.timers.now_ms)
            .field("pending_timers", &self.timers.len())
            .field("form_state", &self.form.as_ref().map(ContactForm::state))
            .field("scroll_y", &self.viewport.scroll_y)
            .finish_non_exhaustive()
    }
}

impl Site {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, SiteConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: SiteConfig) -> Result<Self> {
        let mut dom = parse_html(html)?;
        let form = ContactForm::attach(&dom, &config.form)?;
        let navigation = Navigation::attach(&dom, &config)?;
        Navigation::mark_active_links(&mut dom, &config.current_path)?;
        Navigation::mark_keyboard_cards(&mut dom)?;

        let mut site = Self {
            dom,
            timers: Scheduler::default(),
            trace: TraceLog::default(),
            viewport: Viewport::default(),
            form,
            navigation,
            transport: Box::new(SimulatedTransport::new()),
            analytics: None,
            active_element: None,
        };
        site.sync_scroll()?;
        Ok(site)
    }

    pub fn set_transport(&mut self, transport: impl Transport + 'static) {
        self.transport = Box::new(transport);
    }

    pub fn set_analytics_sink(&mut self, sink: impl AnalyticsSink + 'static) {
        self.analytics = Some(Box::new(sink));
    }

    pub fn clear_analytics_sink(&mut self) {
        self.analytics = None;
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace.to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.timers = enabled;
    }

    pub fn set_trace_form(&mut self, enabled: bool) {
        self.trace.form = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_limit(max_entries)
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Runtime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timers.step_limit = max_steps;
        Ok(())
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) || self.dom.has_attr(target, "readonly") {
            return Ok(());
        }

        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();

        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)?;
        self.dispatch_event(target, "input")
    }

    /// Picks the option of a `<select>` whose value is `value`.
    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "select" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".into(),
                actual: tag,
            });
        }

        let previous = self.dom.value(target)?;
        if !self.dom.set_select_value(target, value)? {
            return Err(Error::Runtime(format!(
                "select {selector} has no option with value {value:?}"
            )));
        }
        if previous != value {
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }
        Ok(())
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let is_radio = is_radio_input(&self.dom, target);
        if !is_radio && !is_checkbox_input(&self.dom, target) {
            let actual = match self.dom.tag_name(target) {
                Some(tag) if tag.eq_ignore_ascii_case("input") => format!(
                    "input[type={}]",
                    self.dom.attr(target, "type").unwrap_or_else(|| "text".into())
                ),
                Some(tag) => tag.to_ascii_lowercase(),
                None => "non-element".into(),
            };
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual,
            });
        }

        if self.dom.checked(target)? != checked {
            if is_radio && checked {
                self.uncheck_other_radios_in_group(target)?;
            }
            self.dom.set_checked(target, checked)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }
        Ok(())
    }

    fn uncheck_other_radios_in_group(&mut self, target: NodeId) -> Result<()> {
        for radio in self.dom.radio_group(target) {
            if radio != target {
                self.dom.set_checked(radio, false)?;
            }
        }
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.disabled(target) {
            return Ok(());
        }

        self.dispatch_event(target, "click")?;

        if is_checkbox_input(&self.dom, target) {
            let current = self.dom.checked(target)?;
            self.dom.set_checked(target, !current)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        } else if is_radio_input(&self.dom, target) && !self.dom.checked(target)? {
            self.uncheck_other_radios_in_group(target)?;
            self.dom.set_checked(target, true)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
        }

        if is_submit_control(&self.dom, target) {
            if let Some(form) = self.dom.find_ancestor_by_tag(target, "form") {
                self.dispatch_event(form, "submit")?;
            }
        }
        Ok(())
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.focus_node(target)
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.blur_node(target)
    }

    /// Submits the form matched by `selector`, or the form owning it.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let form = if self
            .dom
            .tag_name(target)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("form"))
        {
            Some(target)
        } else {
            self.dom.find_ancestor_by_tag(target, "form")
        };

        if let Some(form) = form {
            self.dispatch_event(form, "submit")?;
        }
        Ok(())
    }

    /// Presses `key` on the focused element. `"Shift+Tab"` is Tab with Shift held.
    pub fn press_key(&mut self, key: &str) -> Result<()> {
        let target = self.active_element.unwrap_or(self.dom.root);
        let label = self.dom.node_label(target);
        self.trace
            .line(TraceCategory::Event, || format!("keydown key={key} target={label}"));
        let Self {
            dom,
            timers,
            trace,
            viewport,
            navigation,
            ..
        } = self;
        let mut page = PageCtx {
            dom,
            timers,
            trace,
            viewport,
        };
        match navigation.handle_key(&mut page, key, target)? {
            Some(KeyAction::Focus(node)) => self.focus_node(node),
            Some(KeyAction::Click(node)) => self.click_node(node),
            None => Ok(()),
        }
    }

    pub fn scroll_to(&mut self, y: i64) -> Result<()> {
        self.viewport.scroll_y = y.max(0);
        self.trace
            .line(TraceCategory::Event, || format!("scroll y={}", y.max(0)));
        self.sync_scroll()
    }

    pub fn scroll_y(&self) -> i64 {
        self.viewport.scroll_y
    }

    pub fn is_menu_open(&self) -> bool {
        self.navigation.is_open(&self.dom)
    }

    /// Delivers the outcome of a submission the transport left pending.
    /// Returns `false` when no submission was waiting for it.
    pub fn settle_submission(&mut self, outcome: SubmissionOutcome) -> Result<bool> {
        let Self {
            dom,
            timers,
            trace,
            viewport,
            form,
            ..
        } = self;
        let Some(form) = form else {
            return Ok(false);
        };
        let mut page = PageCtx {
            dom,
            timers,
            trace,
            viewport,
        };
        form.settle(&mut page, None, outcome)
    }

    pub fn form_state(&self) -> Option<SubmissionState> {
        self.form.as_ref().map(|form| form.state().clone())
    }

    pub fn last_submit_attempt(&self) -> Option<SubmitAttempt> {
        self.form
            .as_ref()
            .and_then(|form| form.last_attempt().cloned())
    }

    /// The contact form's fields as the validator sees them right now.
    pub fn form_fields(&self) -> Result<Vec<FormField>> {
        let Some(form) = &self.form else {
            return Ok(Vec::new());
        };
        Ok(form
            .read_fields(&self.dom)?
            .into_iter()
            .map(|(_, field)| field)
            .collect())
    }

    pub fn now_ms(&self) -> i64 {
        self.timers.now_ms
    }

    pub fn clear_timer(&mut self, timer_id: i64) -> bool {
        let cleared = self.timers.clear(timer_id);
        self.trace.line(TraceCategory::Timer, || {
            format!("clear id={timer_id} existed={cleared}")
        });
        cleared
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.timers.clear_all();
        self.trace
            .line(TraceCategory::Timer, || format!("clear_all cleared={cleared}"));
        cleared
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers.pending()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.timers.now_ms;
        self.timers.now_ms = from.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(self.timers.now_ms), false)?;
        let to = self.timers.now_ms;
        self.trace.line(TraceCategory::Timer, || {
            format!("advance delta_ms={delta_ms} from={from} to={to} ran_due={ran}")
        });
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.timers.now_ms;
        if target_ms < from {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
            )));
        }
        self.timers.now_ms = target_ms;
        let ran = self.run_timer_queue(Some(target_ms), false)?;
        self.trace.line(TraceCategory::Timer, || {
            format!("advance_to from={from} to={target_ms} ran_due={ran}")
        });
        Ok(())
    }

    /// Runs every pending timer, moving the clock forward as needed.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.timers.now_ms;
        let ran = self.run_timer_queue(None, true)?;
        let to = self.timers.now_ms;
        self.trace.line(TraceCategory::Timer, || {
            format!("flush from={from} to={to} ran={ran}")
        });
        Ok(())
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(task) = self.timers.pop_next(None, true) else {
            self.trace
                .line(TraceCategory::Timer, || "run_next none".into());
            return Ok(false);
        };
        self.execute_task(task)?;
        Ok(true)
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let now = self.timers.now_ms;
        let ran = self.run_timer_queue(Some(now), false)?;
        self.trace
            .line(TraceCategory::Timer, || format!("run_due now_ms={now} ran={ran}"));
        Ok(ran)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while self.timers.has_next(due_limit) {
            steps += 1;
            if steps > self.timers.step_limit {
                return Err(self.timers.step_limit_error(steps, due_limit));
            }
            let Some(task) = self.timers.pop_next(due_limit, advance_clock) else {
                break;
            };
            self.execute_task(task)?;
        }
        Ok(steps)
    }

    fn execute_task(&mut self, task: ScheduledTask) -> Result<()> {
        let now = self.timers.now_ms;
        self.trace.line(TraceCategory::Timer, || {
            format!("run id={} due_at={} now_ms={now}", task.id, task.due_at)
        });

        let Self {
            dom,
            timers,
            trace,
            viewport,
            form,
            ..
        } = self;
        let Some(form) = form else {
            return Ok(());
        };
        let mut page = PageCtx {
            dom,
            timers,
            trace,
            viewport,
        };
        match task.kind {
            TaskKind::HideMessage { generation } => form.hide_message(&mut page, generation),
            TaskKind::SettleSubmission { attempt, outcome } => {
                form.settle(&mut page, Some(attempt), outcome).map(|_| ())
            }
        }
    }

    fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.disabled(node) || self.active_element == Some(node) {
            return Ok(());
        }
        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }
        self.active_element = Some(node);
        self.dispatch_event(node, "focus")
    }

    fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }
        self.active_element = None;
        self.dispatch_event(node, "blur")
    }

    /// Routes one event to the behaviors interested in it.
    fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<()> {
        let label = self.dom.node_label(target);
        self.trace
            .line(TraceCategory::Event, || format!("{event_type} target={label}"));

        let Self {
            dom,
            timers,
            trace,
            viewport,
            form,
            navigation,
            transport,
            analytics,
            ..
        } = self;
        let mut page = PageCtx {
            dom,
            timers,
            trace,
            viewport,
        };

        match event_type {
            "click" => {
                for event in events_for_click(page.dom, target)? {
                    page.trace.line(TraceCategory::Analytics, || {
                        format!(
                            "{} category={} label={}",
                            event.name, event.category, event.label
                        )
                    });
                    if let Some(sink) = analytics.as_mut() {
                        sink.record(event);
                    }
                }
                navigation.handle_click(&mut page, target)?;
            }
            "input" => {
                if let Some(form) = form.as_mut().filter(|form| form.owns(page.dom, target)) {
                    form.handle_input(&mut page, target)?;
                }
            }
            "blur" => {
                if let Some(form) = form.as_mut().filter(|form| form.owns(page.dom, target)) {
                    form.handle_blur(&mut page, target)?;
                }
            }
            "submit" => {
                if let Some(form) = form.as_mut().filter(|form| form.form_node() == target) {
                    form.handle_submit(&mut page, &mut **transport)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn sync_scroll(&mut self) -> Result<()> {
        let Self {
            dom,
            timers,
            trace,
            viewport,
            navigation,
            ..
        } = self;
        let mut page = PageCtx {
            dom,
            timers,
            trace,
            viewport,
        };
        navigation.on_scroll(&mut page)
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        self.check(selector, target, expected, actual)
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        self.check(selector, target, expected, actual)
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.checked(target)?;
        self.check(selector, target, &expected.to_string(), actual.to_string())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = match self.active_element {
            Some(active) if active == target => "focused".to_string(),
            Some(active) => format!("focus on {}", self.dom.node_label(active)),
            None => "nothing focused".to_string(),
        };
        self.check(selector, target, "focused", actual)
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name)?;
        self.check(
            selector,
            target,
            &format!("class {class_name}={expected}"),
            format!("class {class_name}={actual}"),
        )
    }

    /// Visibility as far as inline styles go: hidden only by `display: none`.
    pub fn assert_visible(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.style_get(target, "display")? != "none";
        self.check(selector, target, &expected.to_string(), actual.to_string())
    }

    pub fn assert_disabled(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.disabled(target);
        self.check(selector, target, &expected.to_string(), actual.to_string())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: Option<&str>) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name);
        self.check(
            selector,
            target,
            &format!("{name}={expected:?}"),
            format!("{name}={:?}", actual.as_deref()),
        )
    }

    pub fn assert_scrolled_into_view(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self
            .viewport
            .scrolled_into_view
            .map(|node| self.dom.node_label(node))
            .unwrap_or_else(|| "none".into());
        if self.viewport.scrolled_into_view == Some(target) {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            selector: selector.to_string(),
            expected: "scrolled into view".into(),
            actual,
            dom_snippet: self.node_snippet(target),
        })
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn check(&self, selector: &str, target: NodeId, expected: &str, actual: String) -> Result<()> {
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }
}
