//! Repository inspection command
//!
//! Resolves the repository first so that a wrong URL, a missing repository or
//! a renamed one fails the command. Every other capability is then queried
//! concurrently and reported, with failed queries showing up as empty values.

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use reposcout_git::{
    Base64SecretResolver, BranchList, GitCredential, GitProviderType, GitService,
    GitServiceConfig, GitSource, RepoFileList, RepoLanguageList, RepoMetadata, RepoStatus,
    ResolvedProject, Response, SecretContent, SecretResolver, SecretType, StaticSecretResolver,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Output format for the inspect command
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON report for automation and scripting
    #[default]
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SecretKind {
    PersonalAccessToken,
    Oauth,
    BasicAuth,
    None,
}

impl From<SecretKind> for SecretType {
    fn from(kind: SecretKind) -> Self {
        match kind {
            SecretKind::PersonalAccessToken => SecretType::PersonalAccessToken,
            SecretKind::Oauth => SecretType::OAuth,
            SecretKind::BasicAuth => SecretType::BasicAuth,
            SecretKind::None => SecretType::None,
        }
    }
}

#[derive(Args)]
pub struct InspectCommand {
    /// Repository URL (https, ssh or scp-style)
    pub url: String,

    /// Branch to read files from; defaults to the repository's default branch
    #[arg(long = "ref")]
    pub git_ref: Option<String>,

    /// Directory inside the repository to inspect
    #[arg(long)]
    pub context_dir: Option<String>,

    #[arg(long)]
    pub dockerfile_path: Option<String>,

    #[arg(long)]
    pub devfile_path: Option<String>,

    /// How the token should be presented to the provider
    #[arg(long, value_enum, default_value = "personal-access-token")]
    pub secret_type: SecretKind,

    /// Access token (or app password for basic auth)
    #[arg(long, env = "REPOSCOUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Account name for basic auth
    #[arg(long, env = "REPOSCOUT_USERNAME")]
    pub username: Option<String>,

    /// JSON credential descriptor with a base64 encoded password; overrides --token
    #[arg(long, env = "REPOSCOUT_CREDENTIAL_FILE")]
    pub credential_file: Option<PathBuf>,

    /// Force a provider: github, gitlab, bitbucket, gitea or generic
    #[arg(long, env = "REPOSCOUT_PROVIDER")]
    pub provider: Option<GitProviderType>,

    /// Replace the provider's API root
    #[arg(long, env = "REPOSCOUT_API_URL")]
    pub api_url: Option<String>,

    /// JSON file with client settings; flags take precedence
    #[arg(long, env = "REPOSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "REPOSCOUT_PER_PAGE")]
    pub per_page: Option<u32>,

    #[arg(long, env = "REPOSCOUT_MAX_PAGES")]
    pub max_pages: Option<u32>,

    #[arg(long, env = "REPOSCOUT_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Output format: json (machine-readable) or text (human-readable)
    #[arg(long, value_enum, default_value = "json")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReport {
    pub provider: GitProviderType,
    pub repository: RepoMetadata,
    pub project: ResolvedProject,
    pub status: RepoStatus,
    pub branches: BranchList,
    pub files: RepoFileList,
    pub languages: RepoLanguageList,
    pub dockerfile: Response,
    pub devfile: Response,
    pub package_json: Response,
}

impl InspectCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = self.build_config()?;
        let (source, resolver) = self.build_source()?;

        let rt = tokio::runtime::Runtime::new()?;
        let report = rt.block_on(inspect(&source, resolver.as_ref(), &config))?;

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_text(&report),
        }

        Ok(())
    }

    fn build_config(&self) -> anyhow::Result<GitServiceConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => GitServiceConfig::default(),
        };

        if let Some(provider) = self.provider {
            config.provider = Some(provider);
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = Some(api_url.clone());
        }
        if let Some(per_page) = self.per_page {
            config.per_page = per_page;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }

        debug!("Using configuration {:?}", config);
        Ok(config)
    }

    fn build_source(&self) -> anyhow::Result<(GitSource, Box<dyn SecretResolver>)> {
        let mut source = GitSource::new(&self.url);
        source.git_ref = self.git_ref.clone();
        source.context_dir = self.context_dir.clone();
        source.dockerfile_path = self.dockerfile_path.clone();
        source.devfile_path = self.devfile_path.clone();

        if let Some(path) = &self.credential_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read credential {}", path.display()))?;
            source.credential = serde_json::from_str::<GitCredential>(&raw)
                .with_context(|| format!("Invalid credential {}", path.display()))?;
            return Ok((source, Box::new(Base64SecretResolver)));
        }

        if self.token.is_some() {
            source.credential = GitCredential {
                secret_type: self.secret_type.into(),
                secret_content: self.username.clone().map(|username| SecretContent {
                    username: Some(username),
                    password: String::new(),
                }),
            };
        }

        Ok((source, Box::new(StaticSecretResolver::new(self.token.clone()))))
    }
}

/// Resolve the repository, then gather every capability concurrently
pub async fn inspect(
    source: &GitSource,
    secrets: &dyn SecretResolver,
    config: &GitServiceConfig,
) -> anyhow::Result<InspectionReport> {
    let service = GitService::new(source, secrets, config)
        .map_err(|e| anyhow::anyhow!("{}: {}", e.kind(), e))?;

    let project = service
        .confirm_identity()
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.kind(), e))?;

    let (status, branches, files, languages, dockerfile, devfile, package_json) = tokio::join!(
        service.is_repo_reachable(),
        service.get_repo_branch_list(),
        service.get_repo_file_list(),
        service.get_repo_language_list(),
        service.is_dockerfile_present(),
        service.is_devfile_present(),
        service.is_package_json_present(),
    );

    Ok(InspectionReport {
        provider: service.provider_type(),
        repository: service.metadata().clone(),
        project,
        status,
        branches,
        files,
        languages,
        dockerfile,
        devfile,
        package_json,
    })
}

fn presence(response: &Response) -> colored::ColoredString {
    match (&response.status, &response.error) {
        (true, _) => "present".bright_green(),
        (false, Some(e)) => format!("absent ({})", e.kind()).bright_yellow(),
        (false, None) => "absent".bright_yellow(),
    }
}

fn print_text(report: &InspectionReport) {
    let repo = &report.repository;

    println!();
    println!(
        "{} {}",
        report.project.full_name.bright_white().bold(),
        format!("({})", report.provider).bright_black()
    );
    println!();
    println!("{:>14} {}", "Host:".bright_white().bold(), repo.host.bright_cyan());
    println!("{:>14} {:?}", "Status:".bright_white().bold(), report.status);
    if let Some(branch) = repo
        .default_branch
        .as_ref()
        .or(report.project.default_branch.as_ref())
    {
        println!("{:>14} {}", "Branch:".bright_white().bold(), branch.bright_cyan());
    }
    if !repo.context_dir.is_empty() {
        println!(
            "{:>14} {}",
            "Context:".bright_white().bold(),
            repo.context_dir.bright_cyan()
        );
    }
    println!(
        "{:>14} {}",
        "Branches:".bright_white().bold(),
        report.branches.branches.len()
    );
    println!(
        "{:>14} {}",
        "Languages:".bright_white().bold(),
        report
            .languages
            .languages
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "{:>14} {}",
        "Files:".bright_white().bold(),
        report.files.files.len()
    );
    println!();
    println!(
        "{:>14} {}",
        format!("{}:", repo.dockerfile_path).bright_white().bold(),
        presence(&report.dockerfile)
    );
    println!(
        "{:>14} {}",
        format!("{}:", repo.devfile_path).bright_white().bold(),
        presence(&report.devfile)
    );
    println!(
        "{:>14} {}",
        "package.json:".bright_white().bold(),
        presence(&report.package_json)
    );
    println!();
}
