mod analysis;
mod config;
mod llm;
mod pipeline;
mod pr;
mod publish;
mod template;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use config::{Config, RawInputs, Settings};
use llm::OpenAiClient;
use pr::github::GitHubClient;

/// PR Describer — generates a structured pull request description from the
/// PR's commits, changed files and diff, merges it with the existing
/// description and writes it back.
///
/// Every input can be given as a flag or through the environment variable
/// a GitHub Actions step sets.
#[derive(Parser, Debug)]
#[command(name = "pr-describer", version, about)]
struct Cli {
    /// Repository owner (user or organization)
    #[arg(long, env = "INPUT_REPOSITORY_OWNER")]
    owner: Option<String>,

    /// Repository name
    #[arg(long, env = "INPUT_REPOSITORY_NAME")]
    repo: Option<String>,

    /// Pull request number
    #[arg(long, env = "INPUT_PULL_REQUEST_NUMBER")]
    pr_number: Option<String>,

    /// Head branch name, searched for a ticket id
    #[arg(long, env = "INPUT_BRANCH_NAME")]
    branch: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// GitHub token with pull request write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Policy file (defaults to .pr-describer.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the final description instead of updating the pull request
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            pr_number: self.pr_number.clone(),
            branch: self.branch.clone(),
            openai_api_key: self.openai_api_key.clone(),
            github_token: self.github_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match describe(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn describe(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    // All configuration is validated before any client is built.
    let config = Config::load(cli.config.as_deref())?;
    let settings = Settings::resolve(cli.raw_inputs(), config)?;
    let target = &settings.target;

    let span = info_span!("pr_describe", owner = %target.owner, repo = %target.repo, pr = target.pr_number, branch = %target.branch);
    info!(parent: &span, "generating PR description");

    let scm = GitHubClient::new(
        &settings.config.github.api_base_url,
        settings.credentials.github_token.clone(),
    );
    let generator = OpenAiClient::new(
        &settings.config.llm,
        settings.credentials.openai_api_key.clone(),
    );

    let outcome = pipeline::run(&settings, &scm, &generator, cli.dry_run)
        .instrument(span)
        .await?;

    if outcome.published {
        println!(
            "{} {}",
            "PR description updated successfully!".green().bold(),
            format!("({})", outcome.decision).dimmed()
        );
    } else {
        println!("{}", outcome.body);
    }

    Ok(())
}
