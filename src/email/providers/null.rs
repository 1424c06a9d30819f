use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::email::{EmailError, HttpResponse, HttpTransport};

/// Body returned for every request; Mandrill answers a send with a JSON list.
pub const NULL_RESPONSE_BODY: &str = "[]";

pub struct NullTransport;

impl NullTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

#[async_trait]
impl HttpTransport for NullTransport {
    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<HttpResponse, EmailError> {
        // Collect the recipient addresses
        let recipients = form
            .iter()
            .filter(|(name, _)| name.starts_with("message[to][") && name.ends_with("][email]"))
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        // Prefer the text body for the preview
        let body_preview = field(form, "message[text]")
            .or_else(|| field(form, "message[html]"))
            .unwrap_or("")
            .chars()
            .take(200)
            .collect::<String>();

        // Log the request that would have been sent
        info!(
            "NULL TRANSPORT - Would POST to {}:\n\
             From: {}\n\
             To: {}\n\
             Reply-To: {}\n\
             Subject: {}\n\
             Template: {}\n\
             Body (first 200 chars): {}",
            url,
            field(form, "message[from]").unwrap_or("(none)"),
            recipients,
            field(form, "message[headers][Reply-To]").unwrap_or("(none)"),
            field(form, "message[subject]").unwrap_or("(none)"),
            field(form, "template_name").unwrap_or("(none)"),
            body_preview,
        );

        // For debugging, also log every form field
        tracing::debug!("NULL TRANSPORT - Full form: {:?}", form);

        Ok(HttpResponse {
            status: 200,
            body: NULL_RESPONSE_BODY.to_string(),
        })
    }

    fn name(&self) -> &str {
        "Null Transport (Logging Only)"
    }
}
