//! The browse loop.
//!
//! ```text
//!   prompt ─▶ model ─▶ directive ─┬─ Navigate ─▶ open ─┐
//!              ▲                  ├─ Click ────▶ click ┤
//!              │                  └─ Answer ─▶ done    │
//!              └──── screenshot ◀── annotate ◀─────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};
use webai_config::AgentConfig;
use webai_core::{Message, MessageContent, Result, Role, WebAiError};
use webai_llm::{LlmRequest, ModelRouter, Usage};

use crate::directive::Directive;
use crate::driver::PageDriver;
use crate::prompt;

/// Knobs for one agent run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub fallback_model: Option<String>,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_steps: u32,
    pub start_url: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_parts(&AgentConfig::default(), None)
    }
}

impl AgentSettings {
    /// Build settings from config, reading the system prompt file if one is set.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let system_prompt = config.resolve_system_prompt()?;
        Ok(Self::from_parts(config, system_prompt))
    }

    fn from_parts(config: &AgentConfig, system_prompt: Option<String>) -> Self {
        Self {
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            system_prompt: system_prompt.unwrap_or_else(|| prompt::SYSTEM_PROMPT.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_steps: config.max_steps,
            start_url: config.start_url.clone(),
        }
    }
}

/// Progress notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    /// About to ask the model.
    Thinking { step: u32 },
    Navigated { url: String, labeled: usize },
    NavigationFailed { url: String, reason: String },
    Clicked { label: String, labeled: usize },
    ClickMissed { label: String },
    Answered { text: String },
}

type Observer = Arc<dyn Fn(&StepEvent) + Send + Sync>;

/// How a successful run ended.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    /// Model turns used.
    pub steps: u32,
    pub usage: Usage,
}

/// Drives one page through the model's directives until it answers.
pub struct Agent<D: PageDriver> {
    router: ModelRouter,
    driver: D,
    settings: AgentSettings,
    history: Vec<Message>,
    observer: Option<Observer>,
}

impl<D: PageDriver> Agent<D> {
    pub fn new(router: ModelRouter, driver: D, settings: AgentSettings) -> Self {
        Self {
            router,
            driver,
            settings,
            history: Vec::new(),
            observer: None,
        }
    }

    /// Receive a [`StepEvent`] for every step.
    pub fn with_observer(mut self, observer: impl Fn(&StepEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    fn emit(&self, event: StepEvent) {
        debug!(?event, "agent step");
        if let Some(ref observer) = self.observer {
            observer(&event);
        }
    }

    /// Run the loop for `user_prompt`.
    pub async fn run(&mut self, user_prompt: &str) -> Result<AgentOutcome> {
        self.history = vec![
            Message::text(Role::System, self.settings.system_prompt.clone()),
            Message::text(Role::User, user_prompt),
        ];
        let mut usage = Usage::default();
        let mut pending: Option<MessageContent> = None;

        if let Some(url) = self.settings.start_url.clone() {
            pending = Some(self.visit(&url).await?);
        }

        info!(model = %self.settings.model, max_steps = self.settings.max_steps, "agent started");

        for step in 1..=self.settings.max_steps {
            if let Some(image) = pending.take() {
                self.history.push(Message::with_content(
                    Role::User,
                    vec![
                        image,
                        MessageContent::Text {
                            text: prompt::CONTINUE_PROMPT.to_string(),
                        },
                    ],
                ));
            }

            self.emit(StepEvent::Thinking { step });
            let request = LlmRequest {
                model: self.settings.model.clone(),
                messages: self.history.clone(),
                system: None,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };
            let response = self
                .router
                .complete(&request, self.settings.fallback_model.as_deref())
                .await?;
            usage.merge(&response.usage);

            let reply = response.message.text_content();
            self.history.push(response.message);
            debug!(step, reply = %reply, "model replied");

            match Directive::parse(&reply) {
                Directive::Navigate { url } => {
                    pending = Some(self.visit(&url).await?);
                }
                Directive::Click { label } => {
                    pending = Some(self.click(&label).await?);
                }
                Directive::Answer(text) => {
                    info!(steps = step, tokens = usage.total_tokens(), "agent answered");
                    self.emit(StepEvent::Answered { text: text.clone() });
                    return Ok(AgentOutcome {
                        answer: text,
                        steps: step,
                        usage,
                    });
                }
            }
        }

        warn!(steps = self.settings.max_steps, "agent hit the step limit");
        Err(WebAiError::StepLimit {
            steps: self.settings.max_steps,
        })
    }

    /// Navigate, label and capture. A page that fails to load is reported
    /// to the model instead of ending the run.
    async fn visit(&mut self, url: &str) -> Result<MessageContent> {
        match self.driver.open(url).await {
            Ok(()) => {
                let labeled = self.driver.annotate().await?;
                self.emit(StepEvent::Navigated {
                    url: url.to_string(),
                    labeled,
                });
            }
            Err(WebAiError::Navigation { url, reason }) => {
                warn!(%url, %reason, "navigation failed");
                self.history
                    .push(Message::text(Role::User, prompt::navigation_failed(&url, &reason)));
                self.emit(StepEvent::NavigationFailed { url, reason });
                self.driver.annotate().await?;
            }
            Err(e) => return Err(e),
        }
        self.driver.screenshot().await
    }

    /// Click by label, label again and capture. A missing label is
    /// reported to the model, which then sees a fresh screenshot.
    async fn click(&mut self, label: &str) -> Result<MessageContent> {
        match self.driver.click(label).await {
            Ok(()) => {
                let labeled = self.driver.annotate().await?;
                self.emit(StepEvent::Clicked {
                    label: label.to_string(),
                    labeled,
                });
            }
            Err(WebAiError::ElementNotFound(_)) => {
                warn!(label, "can't find link");
                self.history
                    .push(Message::text(Role::User, prompt::click_miss(label)));
                self.emit(StepEvent::ClickMissed {
                    label: label.to_string(),
                });
                self.driver.annotate().await?;
            }
            Err(e) => return Err(e),
        }
        self.driver.screenshot().await
    }
}
