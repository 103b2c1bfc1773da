//! Deterministic runtime for the Kostr Elektro site behaviors.
//!
//! A page is parsed into an owned DOM and the behaviors the site ships with
//! are attached to it: the contact form (validation, honeypot, submission
//! state machine), the mobile navigation, the sticky header and the phone
//! click analytics. Actions and assertions go through [`Site`]; time only
//! moves when the caller moves it.
//!
//! ```no_run
//! use kostr_site::{ScriptedTransport, Site};
//!
//! # fn main() -> kostr_site::Result<()> {
//! # let html = "";
//! let mut site = Site::from_html(html)?;
//! let transport = ScriptedTransport::succeeding(1_500);
//! site.set_transport(transport.clone());
//! site.type_text("#name", "Ola Nordmann")?;
//! site.type_text("#email", "ola@example.no")?;
//! site.type_text("#message", "Sikringsskapet må byttes")?;
//! site.click("button[type=\"submit\"]")?;
//! site.advance_time(1_500)?;
//! site.assert_text(".form-message", "Takk for din henvendelse! Vi kontakter deg innen 24 timer.")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::error::Error as StdError;
use std::fmt;

mod analytics;
mod config;
mod controller;
mod dom;
mod html;
mod navigation;
mod pattern;
mod scheduler;
mod selector;
mod site;
mod trace;
mod transport;
mod validation;

use analytics::events_for_click;
use controller::ContactForm;
use dom::*;
use html::{is_void_tag, parse_html};
use navigation::{KeyAction, Navigation, Viewport};
use pattern::Pattern;
use scheduler::{ScheduledTask, Scheduler, TaskKind};
use selector::*;
use site::PageCtx;
use trace::{TraceCategory, TraceLog};

pub use analytics::{
    AnalyticsEvent, AnalyticsSink, EMERGENCY_LINK_SELECTOR, PHONE_LINK_SELECTOR, RecordingSink,
};
pub use config::{FormConfig, FormMessages, PhoneFallback, SiteConfig, ValidationMessages};
pub use controller::{SubmissionState, SubmitAttempt};
pub use pattern::PatternError;
pub use scheduler::{PendingTimer, TimerKind};
pub use site::Site;
pub use transport::{
    Dispatch, ScriptedTransport, SimulatedTransport, SubmissionOutcome, SubmissionPayload,
    Transport, TransportError,
};
pub use validation::{
    FieldError, FieldKind, FormField, FormValidation, ValidationResult, Validator,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    Pattern(String),
    MissingElement(String),
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
            Self::Pattern(msg) => write!(f, "pattern error: {msg}"),
            Self::MissingElement(selector) => write!(f, "required element missing: {selector}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl StdError for Error {}

impl From<PatternError> for Error {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err.to_string())
    }
}

#[cfg(test)]
mod tests;
