use serde::Deserialize;

/// Landing page contact form.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Returns the first problem with the form, if any.
    pub fn problem(&self) -> Option<&'static str> {
        let email = self.email.trim();
        if email.is_empty() {
            return Some("Please enter your email address.");
        }
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Some("A valid email address is required.");
        }
        if self.message.trim().is_empty() {
            return Some("Please add a message.");
        }
        None
    }
}
