use indexmap::IndexMap;
use tracing::{debug, error, info};
use url::Url;

use crate::email::{
    DynHttpTransport, EmailError, HtmlBody, MandrillConfig, MergeVar, MessageHeaders,
    MessagePayload, Recipient, RecipientMergeVars, SendRequest, create_transport,
};

/// Collects a single transactional message and sends it through the Mandrill
/// `messages/send` or `messages/send-template` endpoint.
///
/// Recipients and per-recipient merge vars are keyed by email address and
/// keep their first-insertion order. Addresses are not validated.
pub struct Mandrill {
    config: MandrillConfig,
    transport: DynHttpTransport,
    recipients: IndexMap<String, Recipient>,
    global_merge_vars: Vec<MergeVar>,
    merge_vars: IndexMap<String, RecipientMergeVars>,
    from: Option<String>,
    from_name: Option<String>,
    reply_to: Option<String>,
    subject: Option<String>,
    html_body: Option<String>,
    body: Option<String>,
    template: Option<String>,
}

impl Mandrill {
    pub fn new(config: MandrillConfig, transport: DynHttpTransport) -> Self {
        Self {
            config,
            transport,
            recipients: IndexMap::new(),
            global_merge_vars: Vec::new(),
            merge_vars: IndexMap::new(),
            from: None,
            from_name: None,
            reply_to: None,
            subject: None,
            html_body: None,
            body: None,
            template: None,
        }
    }

    /// Builds a client using the transport named in the config.
    pub fn from_config(config: MandrillConfig) -> Result<Self, EmailError> {
        let transport = create_transport(&config)?;
        Ok(Self::new(config, transport))
    }

    pub fn config(&self) -> &MandrillConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Adds a recipient unless one with the same email is already present.
    /// An existing entry keeps its name and type.
    pub fn add_recipient(mut self, recipient: impl Into<Recipient>) -> Self {
        let recipient = recipient.into();
        self.recipients
            .entry(recipient.email.clone())
            .or_insert(recipient);
        self
    }

    pub fn remove_recipient(mut self, email: &str) -> Self {
        self.recipients.shift_remove(email);
        self
    }

    pub fn recipients(&self) -> impl Iterator<Item = &Recipient> + '_ {
        self.recipients.values()
    }

    pub fn recipient(&self, email: &str) -> Option<&Recipient> {
        self.recipients.get(email)
    }

    pub fn with_global_merge_vars(mut self, vars: Vec<MergeVar>) -> Self {
        self.global_merge_vars = vars;
        self
    }

    pub fn global_merge_vars(&self) -> &[MergeVar] {
        &self.global_merge_vars
    }

    /// Replaces every per-recipient entry. A repeated `rcpt` overwrites the
    /// earlier entry's vars but keeps its position.
    pub fn with_merge_vars(mut self, entries: Vec<RecipientMergeVars>) -> Self {
        self.merge_vars.clear();
        for entry in entries {
            self.merge_vars.insert(entry.rcpt.clone(), entry);
        }
        self
    }

    pub fn merge_vars(&self) -> impl Iterator<Item = &RecipientMergeVars> + '_ {
        self.merge_vars.values()
    }

    pub fn with_merge_var_for_recipient<K, V>(
        mut self,
        email: impl Into<String>,
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let email = email.into();
        let vars: IndexMap<String, String> = vars
            .into_iter()
            .map(|(name, content)| (name.into(), content.into()))
            .collect();

        match self.merge_vars.get_mut(&email) {
            Some(entry) => entry.vars = vars,
            None => {
                self.merge_vars
                    .insert(email.clone(), RecipientMergeVars::new(email, vars));
            }
        }
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn from_address(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn with_from_name(mut self, from_name: impl Into<String>) -> Self {
        self.from_name = Some(from_name.into());
        self
    }

    pub fn from_name(&self) -> Option<&str> {
        self.from_name.as_deref()
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Plain-text body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Stores strings verbatim; rich values are rendered to HTML first.
    pub fn with_html_body<'a>(mut self, html: impl Into<HtmlBody<'a>>) -> Self {
        self.html_body = Some(html.into().into_html());
        self
    }

    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_deref()
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.config.api_url = api_url.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.config.api_version = api_version.into();
        self
    }

    /// Joins the API base URL, version and `path`, ignoring stray slashes.
    pub fn endpoint(&self, path: &str) -> Result<Url, EmailError> {
        let joined = [
            self.config.api_url.as_str(),
            self.config.api_version.as_str(),
            path,
        ]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

        Url::parse(&joined)
            .map_err(|e| EmailError::ConfigError(format!("invalid endpoint {}: {}", joined, e)))
    }

    /// Hook for checks run before every send. Nothing is checked yet.
    pub fn validate(&self) -> Result<(), EmailError> {
        Ok(())
    }

    fn active_template(&self) -> Option<&str> {
        self.template.as_deref().filter(|name| !name.is_empty())
    }

    /// Assembles the request `send` would POST, without touching the network.
    ///
    /// Mandrill requires `global_merge_vars` even for non-template sends, so a
    /// `backwards`/`compatibility` placeholder is sent when none were set. The
    /// builder itself is left unchanged.
    pub fn build_request(&self) -> Result<SendRequest, EmailError> {
        let global_merge_vars = if self.global_merge_vars.is_empty() {
            vec![MergeVar::placeholder()]
        } else {
            self.global_merge_vars.clone()
        };

        let message = MessagePayload {
            to: self.recipients.values().cloned().collect(),
            subject: self.subject.clone(),
            html: self.html_body.clone(),
            text: self.body.clone(),
            from: self.from.clone().or_else(|| self.config.from_address.clone()),
            from_name: self
                .from_name
                .clone()
                .or_else(|| self.config.from_name.clone()),
            headers: MessageHeaders {
                reply_to: self
                    .reply_to
                    .clone()
                    .or_else(|| self.config.reply_to.clone()),
            },
            global_merge_vars: global_merge_vars.clone(),
            merge_vars: self.merge_vars.values().cloned().collect(),
        };

        let mut request = SendRequest {
            key: self.config.resolve_api_key()?,
            message,
            async_send: false,
            template_name: None,
            template_content: None,
        };

        if let Some(template) = self.active_template() {
            request.template_name = Some(template.to_string());
            request.template_content = Some(global_merge_vars);
        }

        Ok(request)
    }

    /// Sends the message and returns the raw response body.
    ///
    /// Transport failures come back as [`EmailError::Transport`] and are not
    /// retried. Any status other than 200 is a
    /// [`EmailError::ProviderRejection`].
    pub async fn send(&self) -> Result<String, EmailError> {
        self.validate()?;

        let request = self.build_request()?;
        let url = self.endpoint(request.endpoint_path())?;
        let form = request.to_form()?;

        debug!(
            "Sending message via {} to {} recipient(s), template: {:?}",
            self.transport.name(),
            request.message.to.len(),
            request.template_name
        );

        let response = self.transport.post_form(&url, &form).await?;

        if response.status != 200 {
            error!(
                "Mandrill responded to {} with status {}",
                url, response.status
            );
            return Err(EmailError::ProviderRejection {
                status: response.status,
                body: response.body,
            });
        }

        info!("Message accepted by {}", url);
        Ok(response.body)
    }
}
