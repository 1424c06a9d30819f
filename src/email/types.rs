use indexmap::IndexMap;
use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeSeq};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    #[default]
    To,
    Cc,
    Bcc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: RecipientType,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            kind: RecipientType::To,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, kind: RecipientType) -> Self {
        self.kind = kind;
        self
    }
}

impl From<&str> for Recipient {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Recipient {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeVar {
    pub name: String,
    pub content: String,
}

impl MergeVar {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Mandrill rejects requests without global merge vars, so this stands in
    /// when none were set.
    pub fn placeholder() -> Self {
        Self::new("backwards", "compatibility")
    }
}

/// Merge vars for a single recipient, sent as `{"rcpt", "vars": [{name, content}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientMergeVars {
    pub rcpt: String,
    #[serde(serialize_with = "serialize_vars")]
    pub vars: IndexMap<String, String>,
}

impl RecipientMergeVars {
    pub fn new(rcpt: impl Into<String>, vars: IndexMap<String, String>) -> Self {
        Self {
            rcpt: rcpt.into(),
            vars,
        }
    }
}

fn serialize_vars<S>(vars: &IndexMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(vars.len()))?;
    for (name, content) in vars {
        seq.serialize_element(&MergeVar::new(name.as_str(), content.as_str()))?;
    }
    seq.end()
}

/// Anything that can produce an HTML fragment for a message body.
pub trait RenderHtml {
    fn render_html(&self) -> String;
}

/// HTML body input: either markup stored as-is or a value rendered on the way in.
pub enum HtmlBody<'a> {
    Raw(String),
    Rich(&'a dyn RenderHtml),
}

impl<'a> HtmlBody<'a> {
    pub fn rich(value: &'a dyn RenderHtml) -> Self {
        HtmlBody::Rich(value)
    }

    pub fn into_html(self) -> String {
        match self {
            HtmlBody::Raw(html) => html,
            HtmlBody::Rich(value) => value.render_html(),
        }
    }
}

impl From<String> for HtmlBody<'_> {
    fn from(html: String) -> Self {
        HtmlBody::Raw(html)
    }
}

impl From<&str> for HtmlBody<'_> {
    fn from(html: &str) -> Self {
        HtmlBody::Raw(html.to_string())
    }
}

impl From<&String> for HtmlBody<'_> {
    fn from(html: &String) -> Self {
        HtmlBody::Raw(html.clone())
    }
}

/// Markdown source rendered to HTML with CommonMark plus tables,
/// strikethrough and footnotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markdown(pub String);

impl Markdown {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

impl RenderHtml for Markdown {
    fn render_html(&self) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);

        let parser = Parser::new_ext(&self.0, options);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipient_serializes_type_lowercase() {
        let recipient = Recipient::new("a@example.com")
            .with_name("Alice")
            .with_type(RecipientType::Bcc);

        assert_eq!(
            serde_json::to_value(&recipient).unwrap(),
            json!({"email": "a@example.com", "name": "Alice", "type": "bcc"})
        );
    }

    #[test]
    fn test_recipient_merge_vars_use_provider_shape() {
        let mut vars = IndexMap::new();
        vars.insert("FNAME".to_string(), "Alice".to_string());
        vars.insert("PLAN".to_string(), "pro".to_string());

        let entry = RecipientMergeVars::new("a@example.com", vars);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "rcpt": "a@example.com",
                "vars": [
                    {"name": "FNAME", "content": "Alice"},
                    {"name": "PLAN", "content": "pro"}
                ]
            })
        );
    }

    #[test]
    fn test_markdown_renders_html() {
        let body = Markdown::new("# Welcome\n\nThanks for **signing up**.");
        let html = body.render_html();
        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(html.contains("<strong>signing up</strong>"));
    }

    #[test]
    fn test_html_body_raw_is_verbatim() {
        let html: HtmlBody = "<p>unchanged &amp; raw</p>".into();
        assert_eq!(html.into_html(), "<p>unchanged &amp; raw</p>");
    }
}
