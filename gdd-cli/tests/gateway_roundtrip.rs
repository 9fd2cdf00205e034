//! Editing sessions against a real gateway served on a local port.

use std::sync::Arc;

use futures::stream;
use gdd_cli::{ClientError, EditingSession, GatewayClient, SaveReport, SessionError, SessionState, StreamOutcome};
use gdd_cli::session::SessionBackend;
use gdd_core::{Config, EditorSettings, GameContext, ModelSpec, ProviderType, SaveSectionRequest};
use gdd_db::test_helpers::create_test_pool;
use gdd_gateway::server::create_router;
use gdd_gateway::{AppState, CompletionRequest, ModelEntry, ModelRegistry, Provider, ProviderError, TextStream};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct CannedProvider {
    chunks: Vec<&'static str>,
}

#[async_trait::async_trait]
impl Provider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }

    async fn stream_completion(&self, _request: CompletionRequest) -> Result<TextStream, ProviderError> {
        let items: Vec<Result<String, ProviderError>> =
            self.chunks.iter().map(|c| Ok(c.to_string())).collect();
        Ok(Box::pin(stream::iter(items)))
    }

    fn clone_box(&self) -> Box<dyn Provider> {
        Box::new(self.clone())
    }
}

fn spec(id: &str) -> ModelSpec {
    ModelSpec {
        id: id.to_string(),
        name: id.to_string(),
        provider: ProviderType::Anthropic,
        api_model: id.to_string(),
        description: String::new(),
        base_url: None,
    }
}

/// Serve a gateway on 127.0.0.1 and return a client for it.
async fn start_gateway() -> GatewayClient {
    let provider = CannedProvider {
        chunks: vec!["<p>Night ", "heists ", "é</p>"],
    };
    let registry = ModelRegistry::from_entries(
        vec![
            ModelEntry::new(spec("canned"), Some(Arc::new(provider))),
            ModelEntry::new(spec("keyless"), None),
        ],
        vec!["canned".to_string()],
    );
    let db = create_test_pool().await.unwrap();
    let state = AppState::new(&Config::default(), Arc::new(registry), db);
    let router = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    GatewayClient::new(&format!("http://{addr}")).unwrap()
}

fn game() -> GameContext {
    GameContext {
        name: "Moonlit".to_string(),
        concept: "Stealth heists across rooftops".to_string(),
        ..Default::default()
    }
}

fn editor(user: &str) -> EditorSettings {
    EditorSettings {
        autosave_seconds: 30,
        auto_save_on_accept: false,
        user_id: user.to_string(),
    }
}

#[tokio::test]
async fn health_and_models() {
    let client = start_gateway().await;

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");

    let models = client.list_models().await.unwrap();
    let canned = models.iter().find(|m| m.id == "canned").unwrap();
    let keyless = models.iter().find(|m| m.id == "keyless").unwrap();
    assert!(canned.available);
    assert!(!keyless.available);
}

#[tokio::test]
async fn save_and_reopen_section() {
    let client = Arc::new(start_gateway().await);
    let game_id = "moonlit heist";

    let session = EditingSession::open(client.clone(), game_id, game(), "overview", editor("alice"))
        .await
        .unwrap();
    assert_eq!(session.version().await, 0);
    session
        .edit("brief-introduction", "<p>Thieves &amp; rooftops</p>")
        .await
        .unwrap();
    assert_eq!(session.save().await.unwrap(), SaveReport::Saved { version: 1 });

    let reopened = EditingSession::open(client.clone(), game_id, game(), "overview", editor("bob"))
        .await
        .unwrap();
    assert_eq!(reopened.version().await, 1);
    assert_eq!(reopened.last_edited_by().await.as_deref(), Some("alice"));
    assert_eq!(
        reopened.content().await["brief-introduction"],
        "<p>Thieves &amp; rooftops</p>"
    );
    assert!(reopened.all_content().await.contains_key("overview"));
}

#[tokio::test]
async fn stale_save_is_a_conflict() {
    let client = Arc::new(start_gateway().await);

    let session = EditingSession::open(client.clone(), "g", game(), "story", editor("alice"))
        .await
        .unwrap();

    let theirs = SaveSectionRequest {
        content: [("synopsis".to_string(), "<p>theirs</p>".to_string())].into(),
        editor_user_id: "bob".to_string(),
        expected_version: None,
    };
    client.save_section("g", "story", &theirs).await.unwrap();

    session.edit("synopsis", "<p>mine</p>").await.unwrap();
    let err = session.save().await.unwrap_err();
    assert!(matches!(err, SessionError::Conflict(_)));
    assert_eq!(
        session.state().await,
        SessionState::Idle {
            has_unsaved_changes: true
        }
    );

    assert_eq!(
        session.save_overwrite().await.unwrap(),
        SaveReport::Saved { version: 2 }
    );
}

#[tokio::test]
async fn generate_streams_through_http() {
    let client = Arc::new(start_gateway().await);
    let session = EditingSession::open(client, "g", game(), "gameplay", editor("alice"))
        .await
        .unwrap();
    let cancel = CancellationToken::new();

    let err = session
        .generate_draft("core-loop", None, &cancel, |_| {})
        .await
        .unwrap_err();
    match err {
        SessionError::Backend(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 422);
            assert_eq!(code.as_deref(), Some("INSUFFICIENT_CONTEXT"));
        }
        other => panic!("unexpected error: {other}"),
    }

    session
        .edit("mechanics", "<p>Grappling hooks and lockpicks</p>")
        .await
        .unwrap();
    let outcome = session
        .generate_draft("core-loop", Some("canned".to_string()), &cancel, |_| {})
        .await
        .unwrap();
    assert_eq!(
        outcome,
        StreamOutcome::Completed("<p>Night heists é</p>".to_string())
    );

    let err = session
        .generate_draft("core-loop", Some("keyless".to_string()), &cancel, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Backend(ClientError::Api { status: 502, .. })
    ));
}
