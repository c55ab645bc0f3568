//! Full submit → dispatch → settle cycles against a fake backend

mod common;

use std::time::Duration;

use chatbox::{App, ChatClient, Config, Phase, Role, Turn};
use common::serve_once;

fn app_for(endpoint: &str) -> App {
    App::with_client(ChatClient::new(endpoint), &Config::default())
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.insert_char(c);
    }
}

async fn wait_idle(app: &mut App) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.is_loading() {
            app.poll_reply().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("reply never settled");
}

#[tokio::test]
async fn test_hello_round_trip() {
    let backend = serve_once(200, r#"{"response": "Hi there!"}"#).await;
    let mut app = app_for(&backend.endpoint());

    type_text(&mut app, "hello");
    app.send_message();
    assert_eq!(app.phase, Phase::AwaitingReply);

    wait_idle(&mut app).await;
    assert_eq!(
        app.conversation.turns(),
        &[
            Turn::assistant("Hi, how can I help you today?"),
            Turn::user("hello"),
            Turn::assistant("Hi there!"),
        ]
    );
}

#[tokio::test]
async fn test_server_error_round_trip() {
    let backend = serve_once(500, r#"{"response": "Error: internal"}"#).await;
    let mut app = app_for(&backend.endpoint());

    type_text(&mut app, "hello");
    app.send_message();
    wait_idle(&mut app).await;

    assert_eq!(app.conversation.len(), 3);
    assert_eq!(
        app.conversation.last(),
        Some(&Turn::assistant("Error: Server error: 500"))
    );

    // controls are usable again, so the user can retry by hand
    type_text(&mut app, "again");
    assert_eq!(app.input, "again");
}

#[tokio::test]
async fn test_empty_response_round_trip() {
    let backend = serve_once(200, r#"{"foo": "bar"}"#).await;
    let mut app = app_for(&backend.endpoint());

    type_text(&mut app, "hello");
    app.send_message();
    wait_idle(&mut app).await;

    let last = app.conversation.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, "Error: No response received from server");
}

#[tokio::test]
async fn test_rapid_second_submission_is_dropped() {
    let backend = serve_once(200, r#"{"response": "got a"}"#).await;
    let mut app = app_for(&backend.endpoint());

    type_text(&mut app, "a");
    app.send_message();
    app.input = "b".to_string();
    app.send_message();

    wait_idle(&mut app).await;

    let request = backend.request.await.unwrap();
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["message"], "a");

    let contents: Vec<&str> = app
        .conversation
        .turns()
        .iter()
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Hi, how can I help you today?", "a", "got a"]);
}

#[tokio::test]
async fn test_hung_backend_keeps_awaiting() {
    let addr = common::serve_silent().await;
    let mut app = app_for(&format!("http://{}/chat", addr));

    type_text(&mut app, "hello");
    app.send_message();

    tokio::time::sleep(Duration::from_millis(200)).await;
    app.poll_reply().await;
    assert_eq!(app.phase, Phase::AwaitingReply);
    assert_eq!(app.conversation.len(), 2);
}
