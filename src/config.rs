/// How the phone rule treats numbers that miss the Norwegian pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhoneFallback {
    /// Accept any cleaned value of at least 8 ASCII digits, optionally led by `+`.
    #[default]
    DigitsOnly,
    /// Accept any cleaned value of at least 8 characters. Lets `"abcdefgh"` through.
    LengthOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessages {
    pub required: String,
    pub invalid_email: String,
    pub invalid_phone: String,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self {
            required: "Dette feltet er påkrevd".into(),
            invalid_email: "Vennligst oppgi en gyldig e-postadresse".into(),
            invalid_phone: "Vennligst oppgi et gyldig telefonnummer".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessages {
    pub success: String,
    /// Shown when the honeypot trips. Reads like a normal confirmation.
    pub bot_success: String,
    pub failure: String,
    pub loading_label: String,
}

impl Default for FormMessages {
    fn default() -> Self {
        Self {
            success: "Takk for din henvendelse! Vi kontakter deg innen 24 timer.".into(),
            bot_success: "Takk for din henvendelse! Vi kontakter deg snart.".into(),
            failure: "Beklager, noe gikk galt. Vennligst prøv igjen eller ring oss direkte."
                .into(),
            loading_label: "Sender...".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    pub form_selector: String,
    pub submit_selector: String,
    pub message_selector: String,
    pub honeypot_name: String,
    pub message_display_ms: i64,
    pub phone_fallback: PhoneFallback,
    pub validation_messages: ValidationMessages,
    pub messages: FormMessages,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form_selector: "#contact-form".into(),
            submit_selector: "button[type=\"submit\"]".into(),
            message_selector: ".form-message".into(),
            honeypot_name: "website".into(),
            message_display_ms: 10_000,
            phone_fallback: PhoneFallback::default(),
            validation_messages: ValidationMessages::default(),
            messages: FormMessages::default(),
        }
    }
}

impl FormConfig {
    pub fn form_selector(mut self, selector: impl Into<String>) -> Self {
        self.form_selector = selector.into();
        self
    }

    pub fn honeypot_name(mut self, name: impl Into<String>) -> Self {
        self.honeypot_name = name.into();
        self
    }

    pub fn message_display_ms(mut self, millis: i64) -> Self {
        self.message_display_ms = millis.max(0);
        self
    }

    pub fn phone_fallback(mut self, fallback: PhoneFallback) -> Self {
        self.phone_fallback = fallback;
        self
    }

    pub fn messages(mut self, messages: FormMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn validation_messages(mut self, messages: ValidationMessages) -> Self {
        self.validation_messages = messages;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub form: FormConfig,
    /// Path the page was served from; drives active navigation links.
    pub current_path: String,
    pub header_scroll_threshold: i64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            form: FormConfig::default(),
            current_path: "/".into(),
            header_scroll_threshold: 50,
        }
    }
}

impl SiteConfig {
    pub fn form(mut self, form: FormConfig) -> Self {
        self.form = form;
        self
    }

    pub fn current_path(mut self, path: impl Into<String>) -> Self {
        self.current_path = path.into();
        self
    }

    pub fn header_scroll_threshold(mut self, threshold: i64) -> Self {
        self.header_scroll_threshold = threshold;
        self
    }
}
