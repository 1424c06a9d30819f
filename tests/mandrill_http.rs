use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use mandrill_mailer::email::{EmailError, Mandrill, MandrillConfig, MergeVar, Recipient, RecipientType};
use std::sync::{Arc, Mutex};
use url::form_urlencoded;

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
}

impl Captured {
    fn last(&self) -> (String, Vec<(String, String)>) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn field(&self, key: &str) -> Option<String> {
        self.last()
            .1
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

fn record(state: &Captured, path: &str, body: String) {
    let pairs = form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    state
        .requests
        .lock()
        .unwrap()
        .push((path.to_string(), pairs));
}

async fn send_handler(State(state): State<Captured>, body: String) -> (StatusCode, String) {
    record(&state, "send", body);
    (
        StatusCode::OK,
        r#"[{"email":"a@example.com","status":"sent"}]"#.to_string(),
    )
}

async fn send_template_handler(State(state): State<Captured>, body: String) -> (StatusCode, String) {
    record(&state, "send-template", body);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"status":"error","name":"Unknown_Template"}"#.to_string(),
    )
}

async fn spawn_fake_mandrill() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/api/1.0/messages/send.json", post(send_handler))
        .route(
            "/api/1.0/messages/send-template.json",
            post(send_template_handler),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/", addr), captured)
}

fn config(api_url: &str) -> MandrillConfig {
    MandrillConfig {
        api_key: Some("local-test-key".to_string()),
        api_url: api_url.to_string(),
        timeout_seconds: Some(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_send_posts_form_to_send_endpoint() {
    let (api_url, captured) = spawn_fake_mandrill().await;

    let body = Mandrill::from_config(config(&api_url))
        .unwrap()
        .add_recipient(Recipient::new("a@example.com").with_name("Alice"))
        .add_recipient(Recipient::new("b@example.com").with_type(RecipientType::Bcc))
        .with_from("noreply@example.com")
        .with_subject("Welcome")
        .with_body("Hello there")
        .with_reply_to("support@example.com")
        .with_merge_var_for_recipient("a@example.com", [("FNAME", "Alice")])
        .send()
        .await
        .unwrap();

    assert_eq!(body, r#"[{"email":"a@example.com","status":"sent"}]"#);
    assert_eq!(captured.last().0, "send");
    assert_eq!(captured.field("key").as_deref(), Some("local-test-key"));
    assert_eq!(captured.field("async").as_deref(), Some("0"));
    assert_eq!(captured.field("message[to][0][name]").as_deref(), Some("Alice"));
    assert_eq!(captured.field("message[to][1][type]").as_deref(), Some("bcc"));
    assert_eq!(captured.field("message[to][1][name]"), None);
    assert_eq!(
        captured.field("message[headers][Reply-To]").as_deref(),
        Some("support@example.com")
    );
    assert_eq!(
        captured.field("message[merge_vars][0][vars][0][content]").as_deref(),
        Some("Alice")
    );
    assert_eq!(
        captured
            .field("message[global_merge_vars][0][content]")
            .as_deref(),
        Some("compatibility")
    );
    assert_eq!(captured.field("template_name"), None);
}

#[tokio::test]
async fn test_template_rejection_surfaces_status_and_body() {
    let (api_url, captured) = spawn_fake_mandrill().await;

    let result = Mandrill::from_config(config(&api_url))
        .unwrap()
        .add_recipient("a@example.com")
        .with_template("missing-template")
        .with_global_merge_vars(vec![MergeVar::new("NAME", "Alice")])
        .send()
        .await;

    assert_eq!(captured.last().0, "send-template");
    assert_eq!(
        captured.field("template_content[0][name]").as_deref(),
        Some("NAME")
    );

    match result {
        Err(EmailError::ProviderRejection { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, r#"{"status":"error","name":"Unknown_Template"}"#);
        }
        other => panic!("expected provider rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = Mandrill::from_config(config(&format!("http://{}/api/", addr)))
        .unwrap()
        .add_recipient("a@example.com")
        .send()
        .await;

    match result {
        Err(e @ EmailError::Transport(_)) => assert!(e.is_fatal()),
        other => panic!("expected transport failure, got {:?}", other),
    }
}
