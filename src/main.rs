use std::thread;
use std::time::Duration;

use clap::{ ArgAction, Parser };
use colored::Colorize;

mod archive_handler;
mod config;
mod error;
mod github_api;
mod grouping;
mod http;
mod license_resolver;
mod manifest;
mod metadata;
mod nuget_api;
mod package;
mod pipeline;
mod redirect;
mod report;
#[cfg(test)]
mod testing;

use config::{ CancellationToken, FirstPartyRule, GeneratorConfig };
use error::{ FailurePolicy, NoticeError };
use github_api::GithubClient;
use grouping::DotCount;
use http::ReqwestHttp;
use manifest::ManifestSource;
use nuget_api::NugetRegistry;
use pipeline::NoticeGenerator;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project, solution or directory to run `dotnet list package` against
    #[arg(index = 1, value_name = "PROJECT_PATH", conflicts_with = "manifest")]
    project_path: Option<String>,

    /// Read the `dotnet list package --format json` output from a file ("-" for stdin)
    #[arg(long, short, value_name = "FILE")]
    manifest: Option<String>,

    /// Output file path (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,

    /// Only list the unique package ids found in the manifest
    #[arg(long, action = ArgAction::SetTrue)]
    info: bool,

    /// NuGet V3 service index
    #[arg(long, value_name = "URL", default_value = config::DEFAULT_REGISTRY_INDEX)]
    registry: String,

    /// GitHub REST API base URL
    #[arg(long, value_name = "URL", default_value = config::DEFAULT_GITHUB_API)]
    github_api: String,

    /// Token for the GitHub API (raises the rate limit)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Number of packages whose metadata is fetched in parallel
    #[arg(long, short, default_value_t = 4)]
    jobs: usize,

    /// Attempts per package archive download
    #[arg(long, default_value_t = 3)]
    retries: usize,

    /// What to do when a package's registry metadata cannot be fetched
    #[arg(long, value_enum, default_value_t = FailurePolicy::Skip)]
    metadata_failures: FailurePolicy,

    /// What to do when a repository's license cannot be fetched
    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    license_failures: FailurePolicy,

    /// Cancel the run after this many seconds
    #[arg(long, value_name = "SECS")]
    max_runtime: Option<u64>,

    /// Project URL prefix of first-party packages
    #[arg(long, value_name = "URL", default_value = "https://dot.net")]
    first_party_domain: String,

    /// Repository used for first-party packages without one
    #[arg(long, value_name = "URL", default_value = "https://github.com/dotnet/runtime")]
    first_party_repository: String,

    /// Name shown for the first-party repository
    #[arg(long, value_name = "NAME", default_value = ".NET Runtime")]
    first_party_name: String,

    /// Show debug output
    #[arg(long, short, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Args {
    fn manifest_source(&self) -> ManifestSource {
        match (&self.manifest, &self.project_path) {
            (Some(path), _) if path == "-" => ManifestSource::Stdin,
            (Some(path), _) => ManifestSource::File(path.clone()),
            (None, Some(project)) => ManifestSource::Dotnet(project.clone()),
            (None, None) => ManifestSource::Dotnet(".".to_string()),
        }
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            registry_index_url: self.registry.clone(),
            github_api_url: self.github_api.clone(),
            github_token: self.github_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(self.timeout),
            jobs: self.jobs,
            archive_retries: self.retries,
            metadata_failures: self.metadata_failures,
            license_failures: self.license_failures,
            first_party: FirstPartyRule {
                domain_prefix: self.first_party_domain.clone(),
                fallback_repository: self.first_party_repository.clone(),
                display_name: self.first_party_name.clone(),
            },
            ..GeneratorConfig::default()
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder
        ::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Cancel the run once the deadline passes.
fn spawn_watchdog(cancel: CancellationToken, deadline: Duration) {
    thread::spawn(move || {
        thread::sleep(deadline);
        log::warn!("Maximum runtime of {}s reached, cancelling", deadline.as_secs());
        cancel.cancel();
    });
}

fn run(args: &Args) -> Result<(), NoticeError> {
    let manifest = args.manifest_source().load()?;

    if args.info {
        let ids = manifest.package_set();
        println!("Total packages found: {}", ids.len());
        for id in &ids {
            println!("  {}", id.as_str().bold());
        }
        return Ok(());
    }

    let config = args.generator_config();
    let cancel = CancellationToken::new();
    if let Some(secs) = args.max_runtime {
        spawn_watchdog(cancel.clone(), Duration::from_secs(secs));
    }

    let registry = NugetRegistry::new(&config)?;
    let http = ReqwestHttp::new(&config)?;
    let github = GithubClient::new(&config)?;

    let generator = NoticeGenerator {
        registry: &registry,
        http: &http,
        licenses: &github,
        ranking: &DotCount,
        config: &config,
        cancel: &cancel,
    };
    let entries = generator.generate(&manifest)?;

    let notices = report::render(&entries);
    report::write_report(&notices, args.output.as_deref())?;

    eprintln!("{}", format!("Wrote {} third-party notices", entries.len()).green());
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
