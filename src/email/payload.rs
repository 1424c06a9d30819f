use serde::Serialize;
use serde_json::Value;

use crate::email::{EmailError, MergeVar, Recipient, RecipientMergeVars};

pub const SEND_ENDPOINT: &str = "messages/send.json";
pub const SEND_TEMPLATE_ENDPOINT: &str = "messages/send-template.json";

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageHeaders {
    #[serde(rename = "Reply-To")]
    pub reply_to: Option<String>,
}

/// The `message` object of a send request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagePayload {
    pub to: Vec<Recipient>,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub headers: MessageHeaders,
    pub global_merge_vars: Vec<MergeVar>,
    pub merge_vars: Vec<RecipientMergeVars>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub key: String,
    pub message: MessagePayload,
    #[serde(rename = "async")]
    pub async_send: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_content: Option<Vec<MergeVar>>,
}

impl SendRequest {
    pub fn uses_template(&self) -> bool {
        self.template_name.is_some()
    }

    pub fn endpoint_path(&self) -> &'static str {
        if self.uses_template() {
            SEND_TEMPLATE_ENDPOINT
        } else {
            SEND_ENDPOINT
        }
    }

    pub fn to_value(&self) -> Result<Value, EmailError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Flattens the request into `application/x-www-form-urlencoded` pairs.
    pub fn to_form(&self) -> Result<Vec<(String, String)>, EmailError> {
        Ok(encode_form(&self.to_value()?))
    }
}

/// Encodes a JSON tree the way PHP's `http_build_query` does: nested keys in
/// brackets, list items by index, `null` dropped, booleans as `1`/`0`.
pub fn encode_form(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    push_pairs(&mut pairs, String::new(), value);
    pairs
}

fn push_pairs(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((key, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((key, number.to_string())),
        Value::String(text) => pairs.push((key, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                push_pairs(pairs, nested_key(&key, &index.to_string()), item);
            }
        }
        Value::Object(fields) => {
            for (name, field) in fields {
                push_pairs(pairs, nested_key(&key, name), field);
            }
        }
    }
}

fn nested_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}[{}]", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_form_nests_with_brackets() {
        let pairs = encode_form(&json!({
            "key": "abc",
            "message": {
                "to": [{"email": "a@example.com", "name": null, "type": "to"}],
                "headers": {"Reply-To": "reply@example.com"}
            },
            "async": false
        }));

        assert_eq!(
            pairs,
            vec![
                ("key".to_string(), "abc".to_string()),
                ("message[to][0][email]".to_string(), "a@example.com".to_string()),
                ("message[to][0][type]".to_string(), "to".to_string()),
                (
                    "message[headers][Reply-To]".to_string(),
                    "reply@example.com".to_string()
                ),
                ("async".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_form_drops_empty_lists_and_nulls() {
        let pairs = encode_form(&json!({
            "message": {"to": [], "subject": null, "merge_vars": []},
            "async": true
        }));

        assert_eq!(pairs, vec![("async".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_endpoint_path_follows_template() {
        let mut request = SendRequest {
            key: "abc".to_string(),
            message: MessagePayload::default(),
            async_send: false,
            template_name: None,
            template_content: None,
        };
        assert_eq!(request.endpoint_path(), "messages/send.json");

        request.template_name = Some("welcome".to_string());
        assert_eq!(request.endpoint_path(), "messages/send-template.json");
    }
}
