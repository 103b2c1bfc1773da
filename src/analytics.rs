use super::*;
use std::cell::RefCell;
use std::rc::Rc;

pub const PHONE_LINK_SELECTOR: &str = "a[href^=\"tel:\"]";
pub const EMERGENCY_LINK_SELECTOR: &str = ".emergency-bar a, [data-emergency=\"true\"]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub category: String,
    pub label: String,
}

impl AnalyticsEvent {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            label: label.into(),
        }
    }

    pub(crate) fn phone_call(href: &str) -> Self {
        Self::new("phone_call", "Contact", href)
    }

    pub(crate) fn emergency_contact() -> Self {
        Self::new("emergency_contact", "Contact", "Emergency Call")
    }
}

/// Receiver for best-effort analytics events.
pub trait AnalyticsSink {
    fn record(&mut self, event: AnalyticsEvent);
}

/// Keeps every event it receives. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<AnalyticsEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<AnalyticsEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl AnalyticsSink for RecordingSink {
    fn record(&mut self, event: AnalyticsEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Events a click on `target` should emit, in emission order.
pub(crate) fn events_for_click(dom: &Dom, target: NodeId) -> Result<Vec<AnalyticsEvent>> {
    let mut events = Vec::new();
    if let Some(link) = dom.closest(target, PHONE_LINK_SELECTOR)? {
        let href = dom.attr(link, "href").unwrap_or_default();
        events.push(AnalyticsEvent::phone_call(&href));
    }
    if dom.closest(target, EMERGENCY_LINK_SELECTOR)?.is_some() {
        events.push(AnalyticsEvent::emergency_contact());
    }
    Ok(events)
}
