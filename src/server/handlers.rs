use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::models::{
    AnalyzeWordRequest, ErrorResponse, ExplainSentenceRequest, ExplainSentenceResponse,
    TranslateRequest, TranslateResponse, WordPageQuery,
};
use super::state::ServerState;
use crate::analyzer::{AnalysisOutcome, AnalysisRequest, Analyzer};
use crate::error::LookupError;
use crate::languages::{language_options, LanguageOption};
use crate::providers::Provider;
use crate::render::{self, WordPanel};
use crate::session::WORD_FAILED_TEXT;
use crate::settings;
use crate::translate::{MyMemory, TranslationRequest, TranslationService};

const MISSING_KEY_MESSAGE: &str = "Missing OpenRouter API key on server";

pub async fn run_server(settings: settings::Settings, key: Option<String>) -> Result<()> {
    let analyzer = match Analyzer::from_settings(&settings, key.as_deref()) {
        Ok(analyzer) => Some(analyzer),
        Err(err) => {
            tracing::warn!(error = %err, "OPENROUTER_API_KEY is not set; word and sentence requests will fail");
            None
        }
    };
    if !settings.dist_dir.join("index.html").exists() {
        tracing::warn!(
            path = %settings.dist_dir.display(),
            "client build not found; only the API and /word are served"
        );
    }
    let addr = settings.server_addr.clone();
    let state = Arc::new(ServerState {
        translator: MyMemory::new(settings.translate_endpoint.clone()),
        analyzer,
        settings,
    });
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub(crate) fn build_router<P: Provider, T: TranslationService>(
    state: Arc<ServerState<P, T>>,
) -> Router {
    let dist = state.settings.dist_dir.clone();
    let client = ServeDir::new(&dist).fallback(ServeFile::new(dist.join("index.html")));
    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(languages))
        .route("/api/analyze-word", post(analyze_word::<P, T>))
        .route("/api/explain-sentence", post(explain_sentence::<P, T>))
        .route("/api/translate", post(translate::<P, T>))
        .route("/word", get(word_page::<P, T>))
        .with_state(state)
        .fallback_service(client)
        .layer(axum::middleware::from_fn(cors_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn languages() -> Json<Vec<LanguageOption>> {
    Json(language_options())
}

fn analyzer_of<P: Provider, T: TranslationService>(
    state: &ServerState<P, T>,
) -> Result<&Analyzer<P>, ServerError> {
    state
        .analyzer
        .as_ref()
        .ok_or_else(|| ServerError::internal(MISSING_KEY_MESSAGE))
}

async fn analyze_word<P: Provider, T: TranslationService>(
    State(state): State<Arc<ServerState<P, T>>>,
    Json(payload): Json<AnalyzeWordRequest>,
) -> Result<Json<AnalysisOutcome>, ServerError> {
    let analyzer = analyzer_of(&state)?;
    let request = AnalysisRequest::new(payload.sentence, payload.word.as_deref().unwrap_or(""))
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let outcome = analyzer.analyze_word(&request).await.map_err(|err| {
        tracing::error!(error = %err, word = request.word(), "OpenRouter request failed");
        ServerError::internal("Failed to analyze word")
    })?;
    Ok(Json(outcome))
}

async fn explain_sentence<P: Provider, T: TranslationService>(
    State(state): State<Arc<ServerState<P, T>>>,
    Json(payload): Json<ExplainSentenceRequest>,
) -> Result<Json<ExplainSentenceResponse>, ServerError> {
    let analyzer = analyzer_of(&state)?;
    let sentence = payload.sentence.unwrap_or_default();
    let explanation = analyzer
        .explain_sentence(&sentence)
        .await
        .map_err(|err| match err {
            LookupError::InvalidInput(_) => ServerError::bad_request(err.to_string()),
            err => {
                tracing::error!(error = %err, "OpenRouter sentence explanation failed");
                ServerError::internal("Failed to explain sentence")
            }
        })?;
    Ok(Json(ExplainSentenceResponse { explanation }))
}

async fn translate<P: Provider, T: TranslationService>(
    State(state): State<Arc<ServerState<P, T>>>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ServerError> {
    let from = payload
        .from
        .unwrap_or_else(|| state.settings.default_from.clone());
    let to = payload
        .to
        .unwrap_or_else(|| state.settings.default_to.clone());
    let request = TranslationRequest::new(payload.text.as_deref().unwrap_or(""), &from, &to)
        .map_err(|err| match err {
            LookupError::UnsupportedLanguage(_) => ServerError::bad_request("Unsupported language"),
            err => ServerError::bad_request(err.to_string()),
        })?;
    let translation = state.translator.translate(request).await.map_err(|err| {
        tracing::error!(error = %err, "translation request failed");
        ServerError::bad_gateway("Failed to translate")
    })?;
    Ok(Json(TranslateResponse { translation }))
}

async fn word_page<P: Provider, T: TranslationService>(
    State(state): State<Arc<ServerState<P, T>>>,
    Query(query): Query<WordPageQuery>,
) -> Result<Html<String>, ServerError> {
    let request = AnalysisRequest::new(query.sentence, query.word.as_deref().unwrap_or(""))
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let outcome = match state.analyzer.as_ref() {
        Some(analyzer) => analyzer.analyze_word(&request).await.map_err(|err| {
            tracing::error!(error = %err, word = request.word(), "OpenRouter request failed");
        }),
        None => {
            tracing::warn!("word page requested without an OpenRouter key");
            Err(())
        }
    };
    let panel = WordPanel {
        word: request.word(),
        sentence: request.sentence(),
        outcome: outcome.as_ref().ok(),
        loading: false,
        error: outcome.is_err().then_some(WORD_FAILED_TEXT),
    };
    Ok(Html(render::render_html(&panel)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::{test_options, Reply, TestProvider};
    use crate::translate::tests::EchoTranslator;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router(
        provider: Option<TestProvider>,
        translator: EchoTranslator,
        dist: &std::path::Path,
    ) -> Router {
        let settings = settings::Settings {
            dist_dir: dist.to_path_buf(),
            ..settings::Settings::default()
        };
        build_router(Arc::new(ServerState {
            settings,
            analyzer: provider.map(|provider| Analyzer::new(provider, test_options())),
            translator,
        }))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn send_json(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(router, request).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn analyze_word_returns_content_and_analysis() {
        let dist = tempfile::tempdir().unwrap();
        let provider = TestProvider::text("Ось: {\"origin\": \"праслов'янське\"}");
        let router = router(Some(provider), EchoTranslator::default(), dist.path());
        let (status, body) = send_json(
            router,
            post_json("/api/analyze-word", json!({"sentence": "Я їм яблуко.", "word": "яблуко"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        insta::assert_json_snapshot!(body, @r###"
        {
          "analysis": {
            "origin": "праслов'янське"
          },
          "content": "Ось: {\"origin\": \"праслов'янське\"}"
        }
        "###);
    }

    #[tokio::test]
    async fn blank_word_is_a_bad_request() {
        let dist = tempfile::tempdir().unwrap();
        let provider = TestProvider::text("unused");
        let router = router(Some(provider.clone()), EchoTranslator::default(), dist.path());
        let (status, body) =
            send_json(router, post_json("/api/analyze-word", json!({"word": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing word"}));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let dist = tempfile::tempdir().unwrap();
        let router = router(None, EchoTranslator::default(), dist.path());
        let (status, body) = send_json(
            router.clone(),
            post_json("/api/analyze-word", json!({"word": "яблуко"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Missing OpenRouter API key on server"}));

        let (status, _) = send_json(
            router,
            post_json("/api/explain-sentence", json!({"sentence": "Речення."})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn provider_failure_maps_to_fixed_messages() {
        let dist = tempfile::tempdir().unwrap();
        let router = router(
            Some(TestProvider::new(Reply::Fail)),
            EchoTranslator::default(),
            dist.path(),
        );
        let (status, body) = send_json(
            router.clone(),
            post_json("/api/analyze-word", json!({"word": "яблуко"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to analyze word"}));

        let (status, body) = send_json(
            router,
            post_json("/api/explain-sentence", json!({"sentence": "Речення."})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to explain sentence"}));
    }

    #[tokio::test]
    async fn explain_sentence_trims_and_validates() {
        let dist = tempfile::tempdir().unwrap();
        let router = router(
            Some(TestProvider::text("  пояснення \n")),
            EchoTranslator::default(),
            dist.path(),
        );
        let (status, body) = send_json(
            router.clone(),
            post_json("/api/explain-sentence", json!({"sentence": "Речення."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"explanation": "пояснення"}));

        let (status, body) =
            send_json(router, post_json("/api/explain-sentence", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing sentence"}));
    }

    #[tokio::test]
    async fn translate_rejects_unsupported_language_without_calling_out() {
        let dist = tempfile::tempdir().unwrap();
        let translator = EchoTranslator::default();
        let router = router(None, translator.clone(), dist.path());
        let (status, body) = send_json(
            router.clone(),
            post_json("/api/translate", json!({"text": "hello", "from": "en", "to": "pl"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Unsupported language"}));
        assert!(translator.seen().is_empty());

        let (status, body) = send_json(
            router,
            post_json("/api/translate", json!({"text": "hello", "from": "en", "to": "de"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"translation": "en|de: hello"}));
    }

    #[tokio::test]
    async fn translate_upstream_failure_is_bad_gateway() {
        let dist = tempfile::tempdir().unwrap();
        let translator = EchoTranslator {
            fail: true,
            ..EchoTranslator::default()
        };
        let router = router(None, translator, dist.path());
        let (status, body) =
            send_json(router, post_json("/api/translate", json!({"text": "hello"}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({"error": "Failed to translate"}));
    }

    #[tokio::test]
    async fn languages_are_listed_with_labels() {
        let dist = tempfile::tempdir().unwrap();
        let router = router(None, EchoTranslator::default(), dist.path());
        let (status, body) = send_json(router, get_request("/api/languages")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[1], json!({"value": "uk", "label": "Українська"}));
        assert_eq!(body.as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn word_page_renders_sections() {
        let dist = tempfile::tempdir().unwrap();
        let provider = TestProvider::text(
            r#"{"grammar": {"part_of_speech": "іменник", "gender": "середній", "number": "однина", "cases": ["Знахідний — яблуко"]}, "origin": "праслов'янське"}"#,
        );
        let router = router(Some(provider), EchoTranslator::default(), dist.path());
        let uri = "/word?word=%D1%8F%D0%B1%D0%BB%D1%83%D0%BA%D0%BE";
        let (status, body) = send(router, get_request(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<div class="word-hero">яблуко</div>"#));
        assert!(body.contains("Знахідний"));
        assert!(body.contains("праслов&#x27;янське"));
    }

    #[tokio::test]
    async fn word_page_without_key_shows_retry_message() {
        let dist = tempfile::tempdir().unwrap();
        let router = router(None, EchoTranslator::default(), dist.path());
        let (status, body) = send(router, get_request("/word?word=tree")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(WORD_FAILED_TEXT));
    }

    #[tokio::test]
    async fn unknown_paths_fall_back_to_the_client_build() {
        let dist = tempfile::tempdir().unwrap();
        std::fs::write(dist.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
        let router = router(None, EchoTranslator::default(), dist.path());
        let (status, body) = send(router.clone(), get_request("/explain")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<div id=\"root\"></div>");

        let (status, _) = send(router, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers() {
        let dist = tempfile::tempdir().unwrap();
        let router = router(None, EchoTranslator::default(), dist.path());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/analyze-word")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            HeaderValue::from_static("*")
        );
    }
}
