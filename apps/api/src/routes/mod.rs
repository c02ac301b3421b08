pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::credentials::handlers as credential_handlers;
use crate::optimizer::handlers as optimizer_handlers;
use crate::session::handlers as session_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Credentials
        .route(
            "/api/check-api-key",
            get(credential_handlers::handle_check_api_key),
        )
        .route(
            "/api/validate-api-key",
            post(credential_handlers::handle_validate_api_key),
        )
        // Analysis
        .route("/api/analyze", post(optimizer_handlers::handle_analyze))
        .route(
            "/api/analyze/upload",
            post(optimizer_handlers::handle_analyze_upload),
        )
        .route(
            "/api/fetch-job-description",
            post(optimizer_handlers::handle_fetch_job_description),
        )
        .route(
            "/api/regenerate-cv",
            post(optimizer_handlers::handle_regenerate_cv),
        )
        .route(
            "/api/download-cv",
            post(optimizer_handlers::handle_download_cv),
        )
        // Session results view
        .route(
            "/api/sessions/:id",
            get(session_handlers::handle_get_session).delete(session_handlers::handle_clear_session),
        )
        .route("/api/sessions/:id/cv", put(session_handlers::handle_update_cv))
        .route(
            "/api/sessions/:id/regenerate",
            post(session_handlers::handle_regenerate),
        )
        .route(
            "/api/sessions/:id/download",
            get(session_handlers::handle_download),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::credentials::{Credential, CredentialMode};
    use crate::llm_client::LlmError;
    use crate::optimizer::analyzer::testing::ScriptedCompleter;
    use crate::optimizer::job_source::UNSUPPORTED_MESSAGE;

    const ANALYSIS_REPLY: &str = r#"Sure! ```json
{"atsScore":74,"matchScore":66,"missingKeywords":["Terraform"],"suggestions":["Add metrics"],"keywordDensity":{"Rust":4.2},"optimizedCV":"JANE DOE\nRust Engineer"}
``` Good luck!"#;

    fn app(completer: Arc<ScriptedCompleter>, config: Config) -> (Router, AppState) {
        let state = AppState::new(completer, config);
        (build_router(state.clone()), state)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn analyze_body() -> Value {
        json!({
            "cvText": "Jane Doe\nRust Engineer",
            "experienceSummary": "Six years of systems work",
            "jobDescription": "Rust, Terraform, AWS",
            "apiKey": "gsk_user"
        })
    }

    async fn analyze(router: &Router) -> Value {
        let response = router
            .clone()
            .oneshot(json_request(Method::POST, "/api/analyze", analyze_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = app(Arc::new(ScriptedCompleter::new()), Config::for_tests());
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_analyze_creates_session() {
        let completer = Arc::new(ScriptedCompleter::new().reply(ANALYSIS_REPLY));
        let (router, state) = app(completer.clone(), Config::for_tests());

        let body = analyze(&router).await;
        assert_eq!(body["result"]["atsScore"], 74);
        assert_eq!(body["result"]["missingKeywords"][0], "Terraform");

        let session_id: uuid::Uuid = body["sessionId"].as_str().unwrap().parse().unwrap();
        let snapshot = state.sessions.get(session_id).unwrap();
        assert_eq!(snapshot.optimized_cv, "JANE DOE\nRust Engineer");
        assert_eq!(completer.calls()[0].credential, "gsk_user");
    }

    #[tokio::test]
    async fn test_analyze_requires_fields() {
        let (router, _) = app(Arc::new(ScriptedCompleter::new()), Config::for_tests());
        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/analyze",
                json!({"cvText": "cv", "experienceSummary": " ", "jobDescription": "jd"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analyze_with_only_job_url_is_unsupported() {
        let completer = Arc::new(ScriptedCompleter::new());
        let (router, _) = app(completer.clone(), Config::for_tests());
        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/analyze",
                json!({
                    "cvText": "cv",
                    "experienceSummary": "summary",
                    "jobUrl": "https://jobs.example.com/1",
                    "apiKey": "gsk_user"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_json(response).await["error"]["message"], UNSUPPORTED_MESSAGE);
        assert!(completer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_without_any_key_is_unauthorized() {
        let completer = Arc::new(ScriptedCompleter::new());
        let (router, _) = app(completer.clone(), Config::for_tests());
        let mut body = analyze_body();
        body.as_object_mut().unwrap().remove("apiKey");

        let response = router
            .oneshot(json_request(Method::POST, "/api/analyze", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "AUTH_ERROR");
        assert!(completer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_uses_server_key_when_configured() {
        let completer = Arc::new(ScriptedCompleter::new().reply(ANALYSIS_REPLY));
        let mut config = Config::for_tests();
        config.credential_mode = CredentialMode::Server;
        config.groq_api_key = Some(Credential::new("gsk_server"));
        let (router, _) = app(completer.clone(), config);

        analyze(&router).await;
        assert_eq!(completer.calls()[0].credential, "gsk_server");
    }

    #[tokio::test]
    async fn test_undecodable_reply_reports_decode_kind() {
        let completer = Arc::new(ScriptedCompleter::new().reply("{atsScore: 80,}"));
        let (router, state) = app(completer, Config::for_tests());

        let response = router
            .oneshot(json_request(Method::POST, "/api/analyze", analyze_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "MALFORMED_JSON");
        assert_eq!(state.sessions.len(), 0);
    }

    #[tokio::test]
    async fn test_session_regenerate_replaces_cv() {
        let completer = Arc::new(
            ScriptedCompleter::new()
                .reply(ANALYSIS_REPLY)
                .reply("JANE DOE\nSenior Rust Engineer"),
        );
        let (router, _) = app(completer.clone(), Config::for_tests());
        let session_id = analyze(&router).await["sessionId"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/sessions/{session_id}/regenerate"),
                json!({"apiKey": "gsk_user"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["optimizedCV"],
            "JANE DOE\nSenior Rust Engineer"
        );

        let response = router
            .oneshot(
                Request::get(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["optimizedCV"], "JANE DOE\nSenior Rust Engineer");
        assert_eq!(body["result"]["atsScore"], 74);
        assert!(completer.calls()[1].prompt.contains("JANE DOE\nRust Engineer"));
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_previous_cv() {
        let completer = Arc::new(
            ScriptedCompleter::new()
                .reply(ANALYSIS_REPLY)
                .fail(LlmError::Transport("connection reset".to_string())),
        );
        let (router, state) = app(completer, Config::for_tests());
        let session_id: uuid::Uuid = analyze(&router).await["sessionId"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let response = router
            .oneshot(json_request(
                Method::POST,
                &format!("/api/sessions/{session_id}/regenerate"),
                json!({"apiKey": "gsk_user"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let snapshot = state.sessions.get(session_id).unwrap();
        assert_eq!(snapshot.optimized_cv, "JANE DOE\nRust Engineer");
        assert!(!snapshot.regenerating);
    }

    #[tokio::test]
    async fn test_regenerate_while_outstanding_is_conflict() {
        let completer = Arc::new(ScriptedCompleter::new().reply(ANALYSIS_REPLY));
        let (router, state) = app(completer, Config::for_tests());
        let session_id: uuid::Uuid = analyze(&router).await["sessionId"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        let _in_flight = state.sessions.begin_regeneration(session_id).unwrap();
        let response = router
            .oneshot(json_request(
                Method::POST,
                &format!("/api/sessions/{session_id}/regenerate"),
                json!({"apiKey": "gsk_user"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_edit_then_download_session_cv() {
        let completer = Arc::new(ScriptedCompleter::new().reply(ANALYSIS_REPLY));
        let (router, _) = app(completer, Config::for_tests());
        let session_id = analyze(&router).await["sessionId"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/sessions/{session_id}/cv"),
                json!({"optimizedCV": "edited by hand"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(
                Request::get(format!("/api/sessions/{session_id}/download"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"optimized-cv.txt\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"edited by hand");
    }

    #[tokio::test]
    async fn test_cleared_session_is_gone() {
        let completer = Arc::new(ScriptedCompleter::new().reply(ANALYSIS_REPLY));
        let (router, _) = app(completer, Config::for_tests());
        let session_id = analyze(&router).await["sessionId"]
            .as_str()
            .unwrap()
            .to_string();

        let response = router
            .clone()
            .oneshot(
                Request::delete(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(
                Request::get(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stateless_regenerate_and_download() {
        let completer = Arc::new(ScriptedCompleter::new().reply("IMPROVED CV"));
        let (router, _) = app(completer, Config::for_tests());

        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/regenerate-cv",
                json!({"currentCV": "old cv", "apiKey": "gsk_user"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["optimizedCV"], "IMPROVED CV");

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/download-cv",
                json!({"cvContent": "IMPROVED CV"}),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_check_api_key_reflects_config() {
        let (router, _) = app(Arc::new(ScriptedCompleter::new()), Config::for_tests());
        let response = router
            .oneshot(Request::get("/api/check-api-key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["hasApiKey"], false);

        let mut config = Config::for_tests();
        config.groq_api_key = Some(Credential::new("gsk_server"));
        let (router, _) = app(Arc::new(ScriptedCompleter::new()), config);
        let response = router
            .oneshot(Request::get("/api/check-api-key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["hasApiKey"], true);
    }

    #[tokio::test]
    async fn test_validate_api_key() {
        let (router, _) = app(Arc::new(ScriptedCompleter::new()), Config::for_tests());
        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/validate-api-key",
                json!({"apiKey": "gsk_good"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["valid"], true);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/validate-api-key",
                json!({"apiKey": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let completer = ScriptedCompleter::new().reject_probe(LlmError::Auth("bad".to_string()));
        let (router, _) = app(Arc::new(completer), Config::for_tests());
        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/validate-api-key",
                json!({"apiKey": "gsk_bad"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["valid"], false);
    }

    #[tokio::test]
    async fn test_analyze_upload_reads_cv_file_as_text() {
        let completer = Arc::new(ScriptedCompleter::new().reply(ANALYSIS_REPLY));
        let (router, _) = app(completer.clone(), Config::for_tests());

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"cv\"; filename=\"cv.txt\"\r\nContent-Type: text/plain\r\n\r\nJane Doe\nUploaded CV\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"experienceSummary\"\r\n\r\nSystems work\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"jobDescription\"\r\n\r\nRust role\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"apiKey\"\r\n\r\ngsk_user\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::post("/api/analyze/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let calls = completer.calls();
        assert!(calls[0].prompt.contains("Jane Doe Uploaded CV"));
        assert_eq!(calls[0].credential, "gsk_user");
    }
}
