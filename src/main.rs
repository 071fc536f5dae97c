use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, Select, Text};
use log::warn;
use podcast_studio::core::config::Config;
use podcast_studio::core::error::{StudioError, StudioResult};
use podcast_studio::core::state::{PublishPlatform, Step};
use podcast_studio::services::gateway::HttpGateway;
use podcast_studio::services::setup;
use podcast_studio::services::workflow::{VideoTicket, WorkflowController};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

async fn with_spinner<F: Future>(message: &str, fut: F) -> Result<F::Output> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    let output = fut.await;
    pb.finish_and_clear();
    Ok(output)
}

fn print_script(workflow: &WorkflowController) {
    println!("\nScript:");
    for (i, line) in workflow.state().script.iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, line.speaker, line.text);
    }
    let estimate = workflow.estimate();
    println!(
        "\nTotal characters: {} | Credits: {} | Est. cost: ₹{:.2} (${:.2})",
        estimate.total_chars, estimate.credits, estimate.cost_inr, estimate.cost_usd
    );
    if let Some(warning) = estimate.warning() {
        println!("{}", warning);
    }
}

/// Video render running on its own task while the wizard keeps going.
struct VideoJob {
    ticket: VideoTicket,
    handle: JoinHandle<StudioResult<String>>,
}

impl VideoJob {
    fn start(workflow: &mut WorkflowController) -> StudioResult<Self> {
        let ticket = workflow.prepare_video()?;
        let backend = workflow.backend();
        let request = ticket.request.clone();
        let handle = tokio::spawn(async move { backend.render_video(&request).await });
        Ok(Self { ticket, handle })
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    async fn finish(self, workflow: &mut WorkflowController) {
        let result = self.handle.await.unwrap_or_else(|e| {
            warn!("Video task failed: {}", e);
            Err(StudioError::gateway("Video generation failed."))
        });
        match workflow.complete_video(self.ticket, result) {
            Ok(true) => {}
            Ok(false) => println!("A video finished for audio you have moved on from; it was ignored."),
            Err(e) => println!("Video error: {}", e),
        }
    }
}

const SCRIPT_AUDIO: &str = "Generate audio";
const SCRIPT_EDIT: &str = "Edit a line";
const SCRIPT_REGENERATE: &str = "Regenerate a line with AI";
const SCRIPT_BACK: &str = "Back to config";
const QUIT: &str = "Quit";

const DONE_YOUTUBE: &str = "Publish to YouTube (render video)";
const DONE_REFRESH: &str = "Check video status";
const DONE_SPOTIFY: &str = "Publish to Spotify (RSS feed)";
const DONE_EDIT: &str = "Edit script again";
const DONE_ANOTHER: &str = "Generate another";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = Config::path_from_env();
    let mut config = Config::load(&config_path)?;

    let gateway = Arc::new(HttpGateway::for_build()?);
    println!("AI Podcast Studio (backend: {})", gateway.base_url());

    let mut workflow = WorkflowController::new(config.initial_state(), gateway);
    let credentials = setup::prompt_credentials()?;
    workflow.set_credentials(credentials.llm, credentials.tts);

    let mut video: Option<VideoJob> = None;

    loop {
        if video.as_ref().is_some_and(VideoJob::is_finished) {
            if let Some(job) = video.take() {
                job.finish(&mut workflow).await;
            }
        }

        match workflow.state().step {
            Step::Config => {
                setup::configure(&mut workflow).await?;
                let result = with_spinner("Writing script...", workflow.generate_script()).await?;
                if let Err(e) = result {
                    println!("Error: {}", e);
                    if !Confirm::new("Try again?").with_default(true).prompt()? {
                        break;
                    }
                }
            }
            Step::Script => {
                print_script(&workflow);
                let action = Select::new(
                    "Next:",
                    vec![SCRIPT_AUDIO, SCRIPT_EDIT, SCRIPT_REGENERATE, SCRIPT_BACK, QUIT],
                )
                .prompt()?;
                let outcome = match action {
                    SCRIPT_AUDIO => {
                        with_spinner("Synthesizing audio...", workflow.generate_audio()).await?
                    }
                    SCRIPT_EDIT => {
                        let index = setup::pick_line(&workflow)?;
                        let current = workflow.state().script.get(index).map(|l| l.text.clone());
                        match current {
                            Some(current) => {
                                let text = Text::new("Text:").with_initial_value(&current).prompt()?;
                                workflow.edit_line(index, text)
                            }
                            None => {
                                println!("No such line.");
                                Ok(())
                            }
                        }
                    }
                    SCRIPT_REGENERATE => {
                        let index = setup::pick_line(&workflow)?;
                        with_spinner("Rewriting line...", workflow.regenerate_line(index))
                            .await?
                            .map(|_| ())
                    }
                    SCRIPT_BACK => workflow.back_to_config(),
                    _ => break,
                };
                if let Err(e) = outcome {
                    println!("Error: {}", e);
                }
            }
            Step::Processing => bail!("Audio generation did not finish"),
            Step::Done => {
                let state = workflow.state();
                if let Some(url) = &state.audio_url {
                    println!("\nYour podcast is ready: {}", url);
                }
                if let Some(url) = &state.video_url {
                    println!("Video: {}", url);
                } else if state.is_video_generating {
                    println!("Video: rendering in the background...");
                }
                if let Some(url) = &state.rss_url {
                    println!("RSS feed: {}", url);
                }

                let first = if state.is_video_generating {
                    DONE_REFRESH
                } else {
                    DONE_YOUTUBE
                };
                let action = Select::new(
                    "Next:",
                    vec![first, DONE_SPOTIFY, DONE_EDIT, DONE_ANOTHER, QUIT],
                )
                .prompt()?;
                let outcome = match action {
                    DONE_YOUTUBE => {
                        workflow.select_platform(PublishPlatform::Youtube)?;
                        let details = setup::publish_details(&workflow, false)?;
                        workflow.set_publish_details(details);
                        VideoJob::start(&mut workflow).map(|job| {
                            println!("Rendering video in the background.");
                            video = Some(job);
                        })
                    }
                    DONE_REFRESH => Ok(()),
                    DONE_SPOTIFY => {
                        workflow.select_platform(PublishPlatform::Spotify)?;
                        let details = setup::publish_details(&workflow, true)?;
                        workflow.set_publish_details(details);
                        with_spinner("Publishing feed...", workflow.publish_rss()).await?
                    }
                    DONE_EDIT => workflow.edit_script_again(),
                    DONE_ANOTHER => workflow.generate_another(),
                    _ => break,
                };
                if let Err(e) = outcome {
                    println!("Error: {}", e);
                }
            }
        }
    }

    if let Some(job) = video.take() {
        if job.is_finished()
            || Confirm::new("A video is still rendering. Wait for it?")
                .with_default(true)
                .prompt()?
        {
            with_spinner("Rendering video...", job.finish(&mut workflow)).await?;
            if let Some(url) = &workflow.state().video_url {
                println!("Video: {}", url);
            }
        }
    }

    if Confirm::new("Save language, duration and speakers as defaults?")
        .with_default(false)
        .prompt()?
    {
        config.remember(workflow.state());
        config.save(&config_path)?;
        println!("Saved to {}", config_path);
    }

    Ok(())
}
