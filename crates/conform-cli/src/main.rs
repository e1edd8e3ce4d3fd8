mod configuration;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use conform::prompt_template::load_prompt_file;
use conform::providers::factory::get_provider;
use conform::{Agent, CancellationToken, Generation, ReactStrategy, Schema, Strategy};
use configuration::Settings;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file layered between the user config and CONFORM_* variables
    #[arg(long)]
    config: Option<String>,

    /// JSON file describing the schema the output must satisfy
    #[arg(long)]
    schema: Option<String>,

    /// Use the Thought / Action / Final Answer protocol
    #[arg(long)]
    react: bool,

    /// System prompt text
    #[arg(long, conflicts_with = "system_file")]
    system: Option<String>,

    /// Template file rendered into the system prompt
    #[arg(long)]
    system_file: Option<String>,

    /// Return the last candidate instead of failing when retries run out
    #[arg(long)]
    lenient: bool,

    /// Corrective round-trips allowed after the first attempt
    #[arg(long)]
    max_retries: Option<usize>,

    /// The request sent to the backend
    input: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.as_deref().map(expand_path);
    let settings = Settings::new(config_path.as_deref())?;
    tracing::info!(provider = %settings.provider.provider_type(), "loaded settings");

    let mut generation_config = settings.generation;
    if cli.lenient {
        generation_config.strict = false;
    }
    if let Some(max_retries) = cli.max_retries {
        generation_config.max_retries = max_retries;
    }

    let schema = cli.schema.as_deref().map(read_schema).transpose()?;
    let system = system_prompt(&cli)?;

    let backend = get_provider(settings.provider.into_config())?;
    let mut builder = Agent::builder(Box::new(backend)).with_config(generation_config);
    if let Some(system) = system {
        builder = builder.with_system_prompt(system);
    }

    let generation = if cli.react {
        let mut agent = builder.build()?;
        ReactStrategy::new()
            .execute(&mut agent, &cli.input, schema.as_ref(), &CancellationToken::new())
            .await?
    } else {
        if let Some(schema) = schema {
            builder = builder.with_output_schema(schema);
        }
        let mut agent = builder.build()?;
        agent.generate(&cli.input).await?
    };

    print_generation(&generation)
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn read_schema(path: &str) -> Result<Schema> {
    let path = expand_path(path);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;
    Ok(Schema::from_json(&text)?)
}

fn system_prompt(cli: &Cli) -> Result<Option<String>> {
    if let Some(text) = &cli.system {
        return Ok(Some(text.clone()));
    }
    let Some(file) = &cli.system_file else {
        return Ok(None);
    };
    let context = json!({
        "input": cli.input,
        "home": dirs::home_dir().map(|dir| dir.display().to_string()),
    });
    let rendered = load_prompt_file(expand_path(file), &context)
        .with_context(|| format!("Failed to render system prompt template {file}"))?;
    Ok(Some(rendered))
}

fn print_generation(generation: &Generation) -> Result<()> {
    match &generation.value {
        Some(value) if generation.validated => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        _ => println!("{}", generation.content),
    }
    if !generation.validated && generation.value.is_some() {
        tracing::warn!("output did not satisfy the schema");
    }
    tracing::info!(backend_calls = generation.backend_calls, "done");
    Ok(())
}
