use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceCategory {
    Event,
    Timer,
    Form,
    Analytics,
    Nav,
}

impl TraceCategory {
    fn prefix(self) -> &'static str {
        match self {
            Self::Event => "[event]",
            Self::Timer => "[timer]",
            Self::Form => "[form]",
            Self::Analytics => "[analytics]",
            Self::Nav => "[nav]",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TraceLog {
    pub(crate) enabled: bool,
    pub(crate) events: bool,
    pub(crate) timers: bool,
    pub(crate) form: bool,
    pub(crate) to_stderr: bool,
    log_limit: usize,
    logs: VecDeque<String>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            form: true,
            to_stderr: true,
            log_limit: 10_000,
            logs: VecDeque::new(),
        }
    }
}

impl TraceLog {
    pub(crate) fn set_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.log_limit = max_entries;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs).into()
    }

    fn category_enabled(&self, category: TraceCategory) -> bool {
        match category {
            TraceCategory::Event => self.events,
            TraceCategory::Timer => self.timers,
            TraceCategory::Form => self.form,
            TraceCategory::Analytics | TraceCategory::Nav => true,
        }
    }

    /// Records `message` under `category` when tracing is on.
    pub(crate) fn line(&mut self, category: TraceCategory, message: impl FnOnce() -> String) {
        if !self.enabled || !self.category_enabled(category) {
            return;
        }
        let line = format!("{} {}", category.prefix(), message());
        if self.to_stderr {
            eprintln!("{line}");
        }
        if self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }
}
