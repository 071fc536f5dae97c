use crate::core::catalog::{self, Language};
use crate::core::state::{ApiKey, Channels, Credentials, InputMode, PublishDetails};
use crate::services::explorer::{display_text, TopicExplorer};
use crate::services::workflow::WorkflowController;
use anyhow::{Context, Result};
use inquire::validator::Validation;
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Select, Text};
use log::info;
use std::fs;
use std::path::Path;

pub const LLM_KEY_ENV: &str = "PODCAST_LLM_API_KEY";
pub const TTS_KEY_ENV: &str = "PODCAST_TTS_API_KEY";

/// Reads both keys from the environment, prompting for any that are unset.
/// Keys only ever live in memory.
pub fn prompt_credentials() -> Result<Credentials> {
    Ok(Credentials {
        llm: key_from_env_or_prompt(LLM_KEY_ENV, "Gemini API Key:")?,
        tts: key_from_env_or_prompt(TTS_KEY_ENV, "Fonada API Key:")?,
    })
}

fn key_from_env_or_prompt(var: &str, prompt: &str) -> Result<ApiKey> {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            info!("Using key from {}", var);
            return Ok(ApiKey::new(value));
        }
    }
    let value = Password::new(prompt)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("Leave empty to skip; kept in memory for this session only")
        .prompt()?;
    Ok(ApiKey::new(value))
}

const MODE_TOPIC: &str = "Topic";
const MODE_CONTENT: &str = "Paste content";
const MODE_UPLOAD: &str = "Upload PDF/TXT";

/// Walks the user through the config step. Returns once the form is filled;
/// validity is checked by the workflow when the script is requested.
pub async fn configure(workflow: &mut WorkflowController) -> Result<()> {
    let current = workflow.state().language;
    let start = Language::ALL.iter().position(|l| *l == current).unwrap_or(0);
    let language = Select::new("Language:", Language::ALL.to_vec())
        .with_starting_cursor(start)
        .prompt()?;
    if language != current {
        workflow.set_language(language);
    }

    let mode = Select::new("Mode:", vec![MODE_TOPIC, MODE_CONTENT, MODE_UPLOAD]).prompt()?;
    match mode {
        MODE_CONTENT => {
            workflow.set_input_mode(InputMode::Content);
            let content = Text::new("Content:")
                .with_initial_value(&workflow.state().content)
                .prompt()?;
            workflow.set_content(content);
        }
        MODE_UPLOAD => {
            workflow.set_input_mode(InputMode::Upload);
            let path = Text::new("Path to a .pdf or .txt file:").prompt()?;
            match read_document(&path) {
                Ok((filename, bytes)) => {
                    if let Err(e) = workflow.upload_document(&filename, bytes).await {
                        println!("Upload failed: {}", e);
                    } else {
                        println!(
                            "Extracted {} characters.",
                            workflow.state().content.chars().count()
                        );
                    }
                }
                Err(e) => println!("Upload failed: {:#}", e),
            }
        }
        _ => {
            workflow.set_input_mode(InputMode::Topic);
            if Confirm::new("Brainstorm a topic with AI first?")
                .with_default(false)
                .prompt()?
            {
                brainstorm(workflow).await?;
            }
            let topic = Text::new("Topic:")
                .with_initial_value(&workflow.state().topic)
                .with_placeholder("e.g. AI in Agriculture")
                .prompt()?;
            workflow.set_topic(topic);
        }
    }

    let duration = CustomType::<u32>::new("Duration (minutes):")
        .with_default(workflow.state().duration_minutes)
        .with_help_message("1 to 60")
        .prompt()?;
    workflow.set_duration(duration);

    let channels = Select::new("Audio:", vec!["Mono", "Stereo"]).prompt()?;
    workflow.set_channels(if channels == "Stereo" {
        Channels::Stereo
    } else {
        Channels::Mono
    });

    edit_roster(workflow)?;
    Ok(())
}

/// Reads a local document for upload, returning its file name and bytes.
pub fn read_document(path: &str) -> Result<(String, Vec<u8>)> {
    let path = Path::new(path.trim());
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok((filename, bytes))
}

const ROSTER_DONE: &str = "Done";
const ROSTER_ADD: &str = "Add speaker";
const ROSTER_REMOVE: &str = "Remove speaker";
const ROSTER_RENAME: &str = "Rename speaker";
const ROSTER_VOICE: &str = "Change voice";

fn edit_roster(workflow: &mut WorkflowController) -> Result<()> {
    loop {
        println!("\nVoice artists:");
        for (i, s) in workflow.state().speakers.as_slice().iter().enumerate() {
            println!("  {}. {} ({}, {})", i + 1, s.name, s.voice, s.language);
        }

        let mut options = vec![ROSTER_DONE];
        if !workflow.state().speakers.is_full() {
            options.push(ROSTER_ADD);
        }
        if workflow.state().speakers.len() > 1 {
            options.push(ROSTER_REMOVE);
        }
        options.push(ROSTER_RENAME);
        options.push(ROSTER_VOICE);

        match Select::new("Speakers:", options).prompt()? {
            ROSTER_ADD => {
                workflow.add_speaker();
            }
            ROSTER_REMOVE => {
                let index = pick_speaker(workflow, "Remove which speaker?")?;
                if let Err(e) = workflow.remove_speaker(index) {
                    println!("{}", e);
                }
            }
            ROSTER_RENAME => {
                let index = pick_speaker(workflow, "Rename which speaker?")?;
                let name = Text::new("Nickname:")
                    .with_initial_value(&workflow.state().speakers.as_slice()[index].name)
                    .prompt()?;
                if let Err(e) = workflow.rename_speaker(index, name.trim()) {
                    println!("{}", e);
                }
            }
            ROSTER_VOICE => {
                let index = pick_speaker(workflow, "Change whose voice?")?;
                let language = workflow.state().speakers.as_slice()[index].language;
                let voice = select_voice("Voice:", language)?;
                if let Err(e) = workflow.set_speaker_voice(index, voice) {
                    println!("{}", e);
                }
            }
            _ => return Ok(()),
        }
    }
}

fn pick_speaker(workflow: &WorkflowController, prompt: &str) -> Result<usize> {
    let options: Vec<String> = workflow
        .state()
        .speakers
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s.name))
        .collect();
    let selection = Select::new(prompt, options).raw_prompt()?;
    Ok(selection.index)
}

/// Zero-based index for a 1-based line number, if the script has that line.
pub fn line_index(number: usize, len: usize) -> Option<usize> {
    if (1..=len).contains(&number) {
        Some(number - 1)
    } else {
        None
    }
}

/// Asks for a 1-based script line number and returns its index.
pub fn pick_line(workflow: &WorkflowController) -> Result<usize> {
    let len = workflow.state().script.len();
    let help = format!("1 to {}", len);
    let number = CustomType::<usize>::new("Line number:")
        .with_help_message(&help)
        .with_validator(move |n: &usize| {
            Ok(match line_index(*n, len) {
                Some(_) => Validation::Valid,
                None => Validation::Invalid(format!("Enter a line number from 1 to {}.", len).into()),
            })
        })
        .prompt()?;
    Ok(number - 1)
}

fn select_voice(prompt: &str, language: Language) -> Result<&'static str> {
    let voices = catalog::voices(language).to_vec();
    Ok(Select::new(prompt, voices).with_page_size(12).prompt()?)
}

/// Chat loop for the topic explorer. An accepted suggestion is written into
/// the workflow's topic.
pub async fn brainstorm(workflow: &mut WorkflowController) -> Result<()> {
    let mut explorer = TopicExplorer::new(workflow.backend());
    let key = workflow.credentials().llm.clone();
    println!("Hi! Let's find the perfect topic for your podcast. What's on your mind? (empty line to leave)");

    loop {
        let input = Text::new(">").prompt()?;
        if input.trim().is_empty() {
            break;
        }
        match explorer.send(&input, &key).await {
            Ok(suggestion) => {
                if let Some(reply) = explorer.history().last() {
                    println!("\n{}\n", display_text(&reply.content));
                }
                if let Some(topic) = suggestion {
                    let prompt = format!("Ready to go with: {}. Apply this topic?", topic);
                    if Confirm::new(&prompt).with_default(true).prompt()? {
                        explorer.apply(workflow);
                        break;
                    }
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    explorer.close();
    Ok(())
}

/// Fills in the episode title, description and (for RSS) email.
pub fn publish_details(workflow: &WorkflowController, needs_email: bool) -> Result<PublishDetails> {
    let current = &workflow.state().publish;
    let title = Text::new("Episode title:")
        .with_initial_value(&workflow.episode_title())
        .prompt()?;
    let description = Text::new("Description:")
        .with_initial_value(&current.description)
        .prompt()?;
    let email = if needs_email {
        Text::new("Email for the RSS feed:")
            .with_initial_value(&current.email)
            .prompt()?
    } else {
        current.email.clone()
    };
    Ok(PublishDetails {
        title,
        description,
        email,
    })
}
