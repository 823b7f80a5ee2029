//! User-facing message catalogue.
//!
//! Messages live in an embedded Fluent resource so wording stays out of
//! the code paths that produce errors.

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use tracing::warn;
use unic_langid::LanguageIdentifier;

const MESSAGES: &str = r#"
# Errors
error-document-not-found = Document not found
error-not-authenticated = Authentication credentials were not provided or are invalid
error-bad-credentials = No active account found with the given credentials
error-validation = Invalid input
error-ask-fields-required = document_id and question are required
error-payload-too-large = Request body exceeds { $limit } bytes
error-internal = An internal error occurred

# Field validation
validation-required = This field is required.
validation-blank = This field may not be blank.
validation-too-long = Ensure this field has no more than { $max } characters.
validation-username-too-short = Username too short
validation-invalid-characters = Invalid characters
validation-username-exists = Username exists
validation-weak-password = Weak password

# Health
health-status-healthy = Service is healthy
health-status-degraded = Service is degraded: { $reason }
"#;

/// English message bundle (thread-safe)
pub struct I18n {
    bundle: FluentBundle<FluentResource>,
}

impl I18n {
    pub fn new() -> Self {
        let resource = FluentResource::try_new(MESSAGES.to_string()).unwrap_or_else(
            |(partial, errors)| {
                warn!(errors = ?errors, "Failed to parse embedded messages");
                partial
            },
        );

        let locale: LanguageIdentifier = "en".parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Messages end up in JSON bodies, not bidi-aware UI text
        bundle.set_use_isolating(false);
        if let Err(errors) = bundle.add_resource(resource) {
            warn!(errors = ?errors, "Failed to add embedded messages");
        }

        Self { bundle }
    }

    /// Look up a message, falling back to the key itself
    pub fn get(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let Some(pattern) = self.bundle.get_message(key).and_then(|m| m.value()) else {
            warn!(key = %key, "Missing message");
            return key.to_string();
        };

        let mut errors = vec![];
        let result = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        result.into_owned()
    }

    /// Look up a message with string arguments
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (k, v) in args {
            fluent_args.set(*k, *v);
        }
        self.get(key, Some(&fluent_args))
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}
