use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qe_assist::classify::Strategy;
use qe_assist::config::AppConfig;
use qe_assist::platform::github::GitHubPlatform;
use qe_assist::selection::Catalog;
use qe_assist::workflow::classify::{ClassifyRequest, FailureSource};
use qe_assist::workflow::script::ScriptInput;
use qe_assist::workflow::select::SelectRequest;
use qe_assist::workflow::{classify, script, select};

#[derive(Parser)]
#[command(
    name = "qe-assist",
    about = "Classify CI failures with keyword runbooks and select tests for pull requests"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the failed tests of a Jenkins build
    Classify(ClassifyArgs),
    /// Select tests for one or more pull requests of the same component
    Select(SelectArgs),
    /// Generate an automated test script for a Polarion case or a description
    GenerateScript(ScriptArgs),
    /// List the components known to the selection catalog
    Components,
}

#[derive(Args)]
struct ClassifyArgs {
    /// Jenkins build URL (any page of the build)
    #[arg(required_unless_present = "log", conflicts_with = "log")]
    build_url: Option<String>,

    /// Classify a saved console log instead of fetching from Jenkins
    #[arg(long)]
    log: Option<PathBuf>,

    /// Runbook component (derived from the job name when omitted)
    #[arg(long)]
    component: Option<String>,

    #[arg(long, value_enum, default_value_t = Strategy::FirstMatch)]
    strategy: Strategy,

    /// Ask the model for an analysis narrative
    #[arg(long)]
    analyze: bool,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SelectArgs {
    /// GitHub pull request URLs
    #[arg(required = true)]
    prs: Vec<String>,

    /// Trigger the component's Jenkins job with the selected tags
    #[arg(long)]
    trigger: bool,

    /// Jenkins job (`folder/job`), defaults to the component's job
    #[arg(long)]
    jenkins_job: Option<String>,

    /// Build parameters as KEY:VALUE,KEY2:VALUE2 (TEST_TAGS:auto is filled in)
    #[arg(long)]
    jenkins_params: Option<String>,

    /// Component (detected from the repository name when omitted)
    #[arg(long)]
    component: Option<String>,

    /// Existing test repository checkout to scan instead of cloning
    #[arg(long)]
    test_repo_dir: Option<PathBuf>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ScriptArgs {
    /// Polarion case ID (RHACM4K-1234) or a feature description
    input: String,

    /// Write the script to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only results
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            cli.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.log_json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Command::Classify(args) => {
            let source = match (args.build_url, args.log) {
                (_, Some(path)) => FailureSource::LogFile(path),
                (Some(url), None) => FailureSource::Build(url),
                (None, None) => anyhow::bail!("Pass a build URL or --log"),
            };
            let request = ClassifyRequest {
                source,
                component: args.component,
                strategy: args.strategy,
                analyze: args.analyze,
                output_dir: args.output,
            };
            let outcome = classify::run(&config, &request).await?;

            for record in &outcome.records {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.case.case_id.as_deref().unwrap_or("-"),
                    record.verdict,
                    record.matched_keyword.as_deref().unwrap_or("-"),
                    record.case.name
                );
            }
            println!(
                "{} failed: {} product, {} automation, {} system, {} unclassified",
                outcome.summary.total,
                outcome.summary.product_bugs,
                outcome.summary.automation_bugs,
                outcome.summary.system_issues,
                outcome.summary.unclassified
            );
            if let Some(analysis) = &outcome.analysis {
                println!("\n{analysis}");
            }
            println!("Report: {}", outcome.report_path.display());
        }
        Command::Select(args) => {
            let platform = GitHubPlatform::new(&config.github)?;
            let request = SelectRequest {
                pr_urls: args.prs,
                component: args.component,
                test_repo_dir: args.test_repo_dir,
                output_dir: args.output,
                trigger: args.trigger,
                jenkins_job: args.jenkins_job,
                jenkins_params: args.jenkins_params,
            };
            let outcome = select::run(&config, &platform, &request).await?;

            println!("Component: {}", outcome.component);
            println!("PRs analyzed: {}", outcome.pr_count);
            if outcome.docs_only {
                println!("Documentation-only change, no tests selected");
            }
            println!(
                "Selected tags: {}",
                outcome.tags.iter().cloned().collect::<Vec<_>>().join(", ")
            );
            println!(
                "Selected tests: {} ({} must-run, {} should-run)",
                outcome.tests.len(),
                outcome.tests.must_run.len(),
                outcome.tests.should_run.len()
            );
            println!("Tag coverage: {}/{}", outcome.tags.len(), outcome.total_tags);
            println!("TEST_TAGS: {}", outcome.expression);
            println!("Report: {}", outcome.report_path.display());
            println!("Test list: {}", outcome.test_list_path.display());
            if let Some(queued) = &outcome.queued {
                println!(
                    "Triggered {}: {}",
                    queued.job,
                    queued.queue_url.as_deref().unwrap_or("(no queue URL)")
                );
            }
        }
        Command::GenerateScript(args) => {
            let input = ScriptInput::parse(&args.input);
            let code = script::run(&config, &input).await?;
            match args.output {
                Some(path) => {
                    tokio::fs::write(&path, &code).await?;
                    println!("Script: {}", path.display());
                }
                None => println!("{code}"),
            }
        }
        Command::Components => {
            let catalog = match &config.selection.rules_path {
                Some(path) => Catalog::load(path)?,
                None => Catalog::builtin()?,
            };
            for profile in &catalog.components {
                println!(
                    "{}\t{}\t{}\t{} rules",
                    profile.name,
                    profile.jenkins_job,
                    profile.test_repo,
                    profile.rules.len()
                );
            }
        }
    }

    Ok(())
}
