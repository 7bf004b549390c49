#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use webai_core::{Message, Role, WebAiError};
    use webai_llm::anthropic::AnthropicProvider;
    use webai_llm::mock::{MockProvider, MockResponse};
    use webai_llm::openai::OpenAiProvider;
    use webai_llm::provider::{LlmRequest, StopReason};
    use webai_llm::router::ModelRouter;

    fn make_request(model: &str) -> LlmRequest {
        LlmRequest {
            model: model.to_string(),
            messages: vec![Message::text(Role::User, "Hello")],
            max_tokens: 100,
            temperature: 0.7,
            system: None,
        }
    }

    fn screenshot_request() -> LlmRequest {
        LlmRequest {
            model: "gpt-4o".into(),
            messages: vec![
                Message::text(Role::System, "You are a browsing agent."),
                Message::text(Role::User, "Find the pricing page"),
                Message::image(Role::User, "aGVsbG8=", "image/png", "Here's the screenshot."),
            ],
            max_tokens: 1024,
            temperature: 0.7,
            system: None,
        }
    }

    fn fast_router() -> ModelRouter {
        ModelRouter::new().with_base_delay(Duration::from_millis(1))
    }

    // ── Router resolve / complete ──────────────────────────────

    #[tokio::test]
    async fn test_complete_with_prefix_resolution() {
        let mock = MockProvider::new("testprovider").with_response("Hello from mock!");
        let mut router = fast_router();
        router.add_provider(Arc::new(mock));
        let resp = router
            .complete(&make_request("testprovider/gpt-4o"), None)
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "Hello from mock!");
        assert_eq!(resp.message.role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_prefix_strips_provider_name() {
        let mock = MockProvider::new("openai").with_response("ok");
        let requests = mock.recorded_requests();
        let mut router = fast_router();
        router.add_provider(Arc::new(mock));
        router
            .complete(&make_request("OpenAI/gpt-4o"), None)
            .await
            .unwrap();
        assert_eq!(requests.lock()[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_bare_model_resolves_by_model_list() {
        let mock = MockProvider::new("mock").with_response("bare");
        let mut router = fast_router();
        router.add_provider(Arc::new(mock));
        let resp = router
            .complete(&make_request("mock-vision"), None)
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "bare");
    }

    #[tokio::test]
    async fn test_model_not_found() {
        let router = fast_router();
        let result = router.complete(&make_request("nonexistent/model"), None).await;
        assert!(matches!(result, Err(WebAiError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_failover_to_fallback() {
        let mut primary = MockProvider::new("primary");
        for _ in 0..4 {
            primary.queue_response(MockResponse::error("HTTP 500: Internal Server Error"));
        }
        let fallback = MockProvider::new("fallback").with_response("Fallback reply");

        let mut router = fast_router();
        router.add_provider(Arc::new(primary));
        router.add_provider(Arc::new(fallback));

        let resp = router
            .complete(&make_request("primary/model"), Some("fallback/model"))
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "Fallback reply");
    }

    #[tokio::test]
    async fn test_primary_error_surfaces_without_fallback() {
        let mock = MockProvider::new("solo").with_error("Invalid API key");
        let mut router = fast_router();
        router.add_provider(Arc::new(mock));
        let err = router
            .complete(&make_request("solo/model"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }

    // ── Retry logic ────────────────────────────────────────────

    #[tokio::test]
    async fn test_retry_on_transient_error() {
        let mut mock = MockProvider::new("retry_test");
        mock.queue_response(MockResponse::error("HTTP 429: rate limited"));
        mock.queue_response(MockResponse::text("success after retry"));

        let mut router = fast_router();
        router.add_provider(Arc::new(mock));

        let resp = router
            .complete(&make_request("retry_test/model"), None)
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "success after retry");
    }

    #[tokio::test]
    async fn test_retry_on_rate_limited() {
        let mut mock = MockProvider::new("limited");
        mock.queue_response(MockResponse::rate_limited());
        mock.queue_response(MockResponse::text("through"));
        let requests = mock.recorded_requests();

        let mut router = fast_router();
        router.add_provider(Arc::new(mock));

        let resp = router
            .complete(&make_request("limited/model"), None)
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "through");
        assert_eq!(requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_on_non_transient_error() {
        let mock = MockProvider::new("no_retry")
            .with_error("Invalid API key")
            .with_response("never reached");
        let requests = mock.recorded_requests();

        let mut router = fast_router();
        router.add_provider(Arc::new(mock));

        assert!(router.complete(&make_request("no_retry/model"), None).await.is_err());
        assert_eq!(requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut mock = MockProvider::new("flaky");
        for _ in 0..10 {
            mock.queue_response(MockResponse::error("HTTP 503: overloaded"));
        }
        let requests = mock.recorded_requests();

        let mut router = fast_router();
        router.add_provider(Arc::new(mock));

        assert!(router.complete(&make_request("flaky/model"), None).await.is_err());
        // one attempt plus three retries
        assert_eq!(requests.lock().len(), 4);
    }

    // ── Request recording ──────────────────────────────────────

    #[tokio::test]
    async fn test_request_recording_keeps_images() {
        let mock = MockProvider::new("recorder").with_response("ok");
        let requests = mock.recorded_requests();
        let mut router = fast_router();
        router.add_provider(Arc::new(mock));

        let mut req = screenshot_request();
        req.model = "recorder/m".into();
        router.complete(&req, None).await.unwrap();

        let recorded = requests.lock();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].messages[2].has_image());
    }

    // ── Provider request bodies ────────────────────────────────

    #[test]
    fn test_openai_body_uses_image_url_parts() {
        let body = OpenAiProvider::build_request_body(&screenshot_request());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Find the pricing page");

        let parts = messages[2]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,aGVsbG8=");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn test_openai_body_max_completion_tokens_for_reasoning_models() {
        let mut req = make_request("o3");
        req.max_tokens = 512;
        let body = OpenAiProvider::build_request_body(&req);
        assert_eq!(body["max_completion_tokens"], 512);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_openai_parse_response() {
        let data = serde_json::json!({
            "choices": [{
                "message": { "content": "{\"click\": \"Pricing\"}" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 900, "completion_tokens": 12 }
        });
        let resp = OpenAiProvider::parse_response(&data);
        assert_eq!(resp.message.text_content(), "{\"click\": \"Pricing\"}");
        assert_eq!(resp.usage.total_tokens(), 912);
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_anthropic_body_folds_system_and_uses_base64_source() {
        let mut req = screenshot_request();
        req.system = Some("Be brief.".into());
        let body = AnthropicProvider::build_request_body(&req);

        assert_eq!(body["system"], "Be brief.\n\nYou are a browsing agent.");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);

        let blocks = messages[1]["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "image");
        assert_eq!(blocks[0]["source"]["type"], "base64");
        assert_eq!(blocks[0]["source"]["media_type"], "image/png");
        assert_eq!(blocks[0]["source"]["data"], "aGVsbG8=");
        assert_eq!(blocks[1]["text"], "Here's the screenshot.");
    }

    #[test]
    fn test_anthropic_parse_response_max_tokens() {
        let data = serde_json::json!({
            "content": [{ "type": "text", "text": "partial" }],
            "stop_reason": "max_tokens",
            "usage": { "input_tokens": 10, "output_tokens": 1024 }
        });
        let resp = AnthropicProvider::parse_response(&data);
        assert_eq!(resp.message.text_content(), "partial");
        assert_eq!(resp.stop_reason, StopReason::MaxTokens);
    }
}
