use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use update_nix_sources::App;
use update_nix_sources::Config;
use update_nix_sources::config;
use update_nix_sources::logging::setup_logging;
use update_nix_sources::ops::git::Committer;
use update_nix_sources::ops::git::RealGit;
use update_nix_sources::ops::github::RealGithub;
use update_nix_sources::ops::niv::RealNiv;
use update_nix_sources::ops::sources::RealPinStore;

#[derive(Parser)]
#[command(name = "update-nix-sources")]
#[command(about = "Update niv-pinned nix sources on a bot branch and open a GitHub PR", long_about = None)]
pub struct Cli {
    /// GitHub access token
    #[arg(env = config::TOKEN_ENV_VAR, hide_env_values = true)]
    pub github_token: Option<String>,

    /// Branch to commit to (suffixed with `-<source>` when --source is given)
    #[arg(long, default_value = config::DEFAULT_BRANCH)]
    pub branch: String,

    /// PR title, used when all sources are updated
    #[arg(long, default_value = config::DEFAULT_PR_TITLE)]
    pub pr_title: String,

    #[arg(long, default_value = config::DEFAULT_PR_BODY)]
    pub pr_body: String,

    #[arg(long, default_value = config::DEFAULT_COMMITTER_NAME)]
    pub committer_username: String,

    #[arg(long, default_value = config::DEFAULT_COMMITTER_EMAIL)]
    pub committer_email: String,

    /// GitHub login to request a review from (repeatable)
    #[arg(long = "reviewer")]
    pub reviewers: Vec<String>,

    /// Specific source to update, if omitted updates all
    #[arg(long)]
    pub source: Option<String>,

    /// PR base branch (defaults to the repository's default branch)
    #[arg(long)]
    pub base_branch: Option<String>,

    /// niv pin store
    #[arg(long, default_value = update_nix_sources::ops::sources::DEFAULT_SOURCES_FILE)]
    pub sources_file: PathBuf,

    /// How many recent tags to consider when naming versions (GitHub pages at 100)
    #[arg(long, default_value_t = config::DEFAULT_TAG_LIMIT, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub tag_limit: u32,

    /// GitHub GraphQL endpoint
    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = update_nix_sources::ops::github_curl::GITHUB_GRAPHQL_URL)]
    pub api_url: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let token = match config::require_token(cli.github_token) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("{}", format!("# >>> {}", e).red());
            return Ok(ExitCode::from(1));
        }
    };

    setup_logging()?;

    let path = std::env::current_dir()?;
    let config = Config {
        branch: cli.branch,
        pr_title: cli.pr_title,
        pr_body: cli.pr_body,
        committer: Committer {
            name: cli.committer_username,
            email: cli.committer_email,
        },
        reviewers: cli.reviewers,
        source: cli.source,
        base_branch: cli.base_branch,
        sources_file: cli.sources_file,
        tag_limit: cli.tag_limit,
        api_url: cli.api_url,
    };

    let app = App::new(
        config.clone(),
        RealGit::new(path.clone()),
        RealNiv::new(path.clone()),
        RealGithub::new(token, config.api_url.clone()),
        RealPinStore::new(path.join(&config.sources_file)),
    );

    app.cmd_update(&mut std::io::stdout()).await?;

    Ok(ExitCode::SUCCESS)
}
