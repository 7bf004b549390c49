#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use webai_agent::{Agent, AgentSettings, PageDriver, StepEvent, prompt};
    use webai_core::{MessageContent, Result, Role, WebAiError};
    use webai_llm::{MockProvider, ModelRouter};

    /// Records what the agent asked of the page.
    #[derive(Default)]
    struct FakePage {
        calls: Mutex<Vec<String>>,
        /// Labels that resolve to an element.
        labels: Vec<&'static str>,
        /// URLs that fail to load.
        broken_urls: Vec<&'static str>,
        fail_screenshot: bool,
    }

    impl FakePage {
        fn with_labels(labels: &[&'static str]) -> Self {
            Self {
                labels: labels.to_vec(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        async fn open(&self, url: &str) -> Result<()> {
            self.calls.lock().push(format!("open {url}"));
            if self.broken_urls.contains(&url) {
                return Err(WebAiError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_NAME_NOT_RESOLVED".into(),
                });
            }
            Ok(())
        }

        async fn click(&self, label: &str) -> Result<()> {
            self.calls.lock().push(format!("click {label}"));
            if self.labels.contains(&label) {
                Ok(())
            } else {
                Err(WebAiError::ElementNotFound(label.to_string()))
            }
        }

        async fn annotate(&self) -> Result<usize> {
            self.calls.lock().push("annotate".into());
            Ok(self.labels.len())
        }

        async fn screenshot(&self) -> Result<MessageContent> {
            self.calls.lock().push("screenshot".into());
            if self.fail_screenshot {
                return Err(WebAiError::Browser("tab crashed".into()));
            }
            Ok(MessageContent::Image {
                data: "aGVsbG8=".into(),
                media_type: "image/png".into(),
            })
        }
    }

    fn router_with(mock: MockProvider) -> ModelRouter {
        let mut router = ModelRouter::new().with_base_delay(Duration::from_millis(1));
        router.add_provider(Arc::new(mock));
        router
    }

    fn settings() -> AgentSettings {
        AgentSettings {
            model: "mock/vision".into(),
            ..Default::default()
        }
    }

    // ── Basic flow ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_immediate_answer() {
        let mock = MockProvider::new("mock").with_response("Paris is the capital of France.");
        let requests = mock.recorded_requests();
        let mut agent = Agent::new(router_with(mock), FakePage::default(), settings());

        let outcome = agent.run("What is the capital of France?").await.unwrap();
        assert_eq!(outcome.answer, "Paris is the capital of France.");
        assert_eq!(outcome.steps, 1);
        assert!(agent.driver().calls().is_empty());

        let recorded = requests.lock();
        let messages = &recorded[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text_content(), prompt::SYSTEM_PROMPT);
        assert_eq!(messages[1].text_content(), "What is the capital of France?");
        assert_eq!(recorded[0].model, "vision");
        assert_eq!(recorded[0].max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_navigate_then_answer_sends_screenshot() {
        let mock = MockProvider::new("mock")
            .with_response(r#"{"url": "https://docs.phantom.app"}"#)
            .with_response("Phantom is a wallet.");
        let requests = mock.recorded_requests();
        let mut agent = Agent::new(router_with(mock), FakePage::default(), settings());

        let outcome = agent.run("What is Phantom?").await.unwrap();
        assert_eq!(outcome.answer, "Phantom is a wallet.");
        assert_eq!(outcome.steps, 2);
        assert_eq!(
            agent.driver().calls(),
            vec!["open https://docs.phantom.app", "annotate", "screenshot"]
        );

        let recorded = requests.lock();
        let second = &recorded[1].messages;
        // system, user, assistant directive, screenshot turn
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        let shot = &second[3];
        assert_eq!(shot.role, Role::User);
        assert!(matches!(shot.content[0], MessageContent::Image { .. }));
        assert_eq!(shot.text_content(), prompt::CONTINUE_PROMPT);
    }

    #[tokio::test]
    async fn test_click_then_answer() {
        let mock = MockProvider::new("mock")
            .with_response(r#"{"url": "https://example.com"}"#)
            .with_response(r#"{"click": "Pricing"}"#)
            .with_response("The Pro plan costs $20.");
        let mut agent = Agent::new(
            router_with(mock),
            FakePage::with_labels(&["Home", "Pricing"]),
            settings(),
        );

        let outcome = agent.run("How much is Pro?").await.unwrap();
        assert_eq!(outcome.steps, 3);
        assert_eq!(
            agent.driver().calls(),
            vec![
                "open https://example.com",
                "annotate",
                "screenshot",
                "click Pricing",
                "annotate",
                "screenshot",
            ]
        );
    }

    // ── Recovery ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_click_miss_is_reported_and_recaptured() {
        let mock = MockProvider::new("mock")
            .with_response(r#"{"click": "Careers"}"#)
            .with_response("There is no careers page.");
        let requests = mock.recorded_requests();
        let mut agent = Agent::new(router_with(mock), FakePage::with_labels(&["Home"]), settings());

        let outcome = agent.run("Find careers").await.unwrap();
        assert_eq!(outcome.answer, "There is no careers page.");
        assert_eq!(
            agent.driver().calls(),
            vec!["click Careers", "annotate", "screenshot"]
        );

        let recorded = requests.lock();
        let second = &recorded[1].messages;
        let miss = &second[3];
        assert_eq!(miss.role, Role::User);
        assert_eq!(miss.text_content(), prompt::click_miss("Careers"));
        assert!(second[4].has_image());
    }

    #[tokio::test]
    async fn test_navigation_failure_is_reported() {
        let page = FakePage {
            broken_urls: vec!["https://nope.invalid"],
            ..Default::default()
        };
        let mock = MockProvider::new("mock")
            .with_response(r#"{"url": "https://nope.invalid"}"#)
            .with_response("I could not reach the site.");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut agent = Agent::new(router_with(mock), page, settings())
            .with_observer(move |e| sink.lock().push(e.clone()));

        agent.run("Open it").await.unwrap();
        assert!(events.lock().iter().any(|e| matches!(
            e,
            StepEvent::NavigationFailed { url, .. } if url == "https://nope.invalid"
        )));
        assert!(
            agent.history()[3]
                .text_content()
                .contains("could not open https://nope.invalid")
        );
    }

    // ── Limits & errors ────────────────────────────────────────

    #[tokio::test]
    async fn test_step_limit() {
        let mut mock = MockProvider::new("mock");
        for _ in 0..5 {
            mock = mock.with_response(r#"{"url": "https://example.com"}"#);
        }
        let requests = mock.recorded_requests();
        let mut agent = Agent::new(
            router_with(mock),
            FakePage::default(),
            AgentSettings {
                max_steps: 3,
                ..settings()
            },
        );

        let err = agent.run("loop forever").await.unwrap_err();
        assert!(matches!(err, WebAiError::StepLimit { steps: 3 }));
        assert_eq!(requests.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_driver_failure_ends_run() {
        let page = FakePage {
            fail_screenshot: true,
            ..Default::default()
        };
        let mock = MockProvider::new("mock").with_response(r#"{"url": "https://example.com"}"#);
        let mut agent = Agent::new(router_with(mock), page, settings());

        let err = agent.run("go").await.unwrap_err();
        assert!(matches!(err, WebAiError::Browser(_)));
    }

    #[tokio::test]
    async fn test_model_error_ends_run() {
        let mock = MockProvider::new("mock").with_error("Invalid API key");
        let mut agent = Agent::new(router_with(mock), FakePage::default(), settings());
        let err = agent.run("hi").await.unwrap_err();
        assert!(matches!(err, WebAiError::LlmProvider(_)));
    }

    // ── Start URL & observer ───────────────────────────────────

    #[tokio::test]
    async fn test_start_url_sends_screenshot_first() {
        let mock = MockProvider::new("mock").with_response("Done.");
        let requests = mock.recorded_requests();
        let mut agent = Agent::new(
            router_with(mock),
            FakePage::default(),
            AgentSettings {
                start_url: Some("https://example.com".into()),
                ..settings()
            },
        );

        agent.run("Summarize").await.unwrap();
        let recorded = requests.lock();
        assert_eq!(recorded[0].messages.len(), 3);
        assert!(recorded[0].messages[2].has_image());
    }

    #[tokio::test]
    async fn test_observer_sees_events_in_order() {
        let mock = MockProvider::new("mock")
            .with_response(r#"{"url": "https://example.com"}"#)
            .with_response(r#"{"click": "Docs"}"#)
            .with_response("Found it.");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut agent = Agent::new(router_with(mock), FakePage::with_labels(&["Docs"]), settings())
            .with_observer(move |e| sink.lock().push(e.clone()));

        agent.run("Find the docs").await.unwrap();
        assert_eq!(
            *events.lock(),
            vec![
                StepEvent::Thinking { step: 1 },
                StepEvent::Navigated {
                    url: "https://example.com".into(),
                    labeled: 1
                },
                StepEvent::Thinking { step: 2 },
                StepEvent::Clicked {
                    label: "Docs".into(),
                    labeled: 1
                },
                StepEvent::Thinking { step: 3 },
                StepEvent::Answered {
                    text: "Found it.".into()
                },
            ]
        );
    }

    #[test]
    fn test_settings_default_to_builtin_prompt() {
        let s = AgentSettings::default();
        assert_eq!(s.system_prompt, prompt::SYSTEM_PROMPT);
        assert_eq!(s.max_steps, 20);
        assert_eq!(s.max_tokens, 1024);
    }
}
