use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{info, warn};

use webai_agent::{Agent, AgentSettings, BrowserDriver, StepEvent};
use webai_browser::BrowserManager;
use webai_config::WebAiConfig;
use webai_core::WebAiError;

use crate::providers;

pub(super) async fn cmd_run(
    mut config: WebAiConfig,
    prompt: Option<String>,
    url: Option<String>,
    max_steps: Option<u32>,
    headed: bool,
) -> webai_core::Result<()> {
    if url.is_some() {
        config.agent.start_url = url;
    }
    if let Some(n) = max_steps {
        config.agent.max_steps = n;
    }
    if headed {
        config.browser.headless = false;
    }

    let prompt = match prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => ask_prompt()?,
    };

    if let Some(hint) = providers::missing_key_hint(&config) {
        eprintln!("⚠️  No API key for {}.", config.agent.model);
        eprintln!("   {hint}");
        eprintln!();
    }

    let router = providers::build_router(&config);
    let settings = AgentSettings::from_config(&config.agent)?;

    let mut browser = BrowserManager::new(config.browser.clone());
    let page = match browser.new_page().await {
        Ok(page) => page,
        Err(e) => {
            browser.shutdown().await;
            return Err(e);
        }
    };
    let driver = BrowserDriver::new(page, config.browser.images_dir.clone());

    let spinner = spinner();
    let printer = spinner.clone();
    let mut agent =
        Agent::new(router, driver, settings).with_observer(move |event| report(&printer, event));

    info!(prompt = %prompt, "starting run");
    let result = agent.run(&prompt).await;
    spinner.finish_and_clear();

    let page = agent.into_driver().into_page();
    if let Err(e) = browser.close_page(page).await {
        warn!(error = %e, "failed to close tab");
    }
    browser.shutdown().await;

    match result {
        Ok(outcome) => {
            println!();
            println!("{}", style("Answer").bold().green());
            println!("{}", outcome.answer);
            println!();
            println!(
                "{}",
                style(format!(
                    "{} steps, {} tokens",
                    outcome.steps,
                    outcome.usage.total_tokens()
                ))
                .dim()
            );
            Ok(())
        }
        Err(e @ WebAiError::StepLimit { .. }) => {
            println!("❌ {e}");
            println!("   Raise agent.max_steps or pass --max-steps to give it more room.");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn ask_prompt() -> webai_core::Result<String> {
    use dialoguer::{Input, theme::ColorfulTheme};

    let prompt: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("You")
        .interact_text()
        .map_err(|e| WebAiError::Agent(format!("cannot read prompt: {e}")))?;
    Ok(prompt)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(s) = ProgressStyle::with_template("{spinner:.cyan}  {msg}") {
        pb.set_style(s.tick_strings(&["◒", "◐", "◓", "◑", "●"]));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn report(pb: &ProgressBar, event: &StepEvent) {
    match event {
        StepEvent::Thinking { step } => {
            pb.set_message(format!("step {step}: waiting for the model"));
        }
        StepEvent::Navigated { url, labeled } => {
            pb.println(format!(
                "{} {} {}",
                style("→").cyan(),
                style(url).underlined(),
                style(format!("({labeled} links)")).dim()
            ));
        }
        StepEvent::NavigationFailed { url, reason } => {
            pb.println(format!("{} {url}: {reason}", style("✗").red()));
        }
        StepEvent::Clicked { label, labeled } => {
            pb.println(format!(
                "{} click \"{label}\" {}",
                style("→").cyan(),
                style(format!("({labeled} links)")).dim()
            ));
        }
        StepEvent::ClickMissed { label } => {
            pb.println(format!("{} can't find link \"{label}\"", style("✗").yellow()));
        }
        StepEvent::Answered { .. } => {
            pb.set_message("done");
        }
    }
}
