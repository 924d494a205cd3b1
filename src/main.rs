use anyhow::{Result, bail};
use clap::Parser;
use pkgprov::config::Config;
use pkgprov::dispatch::DispatchReport;
use pkgprov::host::ConsoleHost;
use pkgprov::provider::{Operation, Operations};
use pkgprov::{PackageQuery, PackageVersion, Session, SourceQuery};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

/// pkgprov - package provider front end
///
/// Finds and installs packages through the providers registered from
/// manifest files.
///
/// Examples:
///   pkgprov --manifest demo.json find zlib        # Find zlib in every provider
///   pkgprov version range "[1.0,2.0)" 1.5 2.0     # Check versions against a range
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGPROV_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Register a manifest provider (repeatable)
    #[arg(long = "manifest", short = 'm', value_name = "PATH", global = true)]
    manifests: Vec<PathBuf>,

    /// Config file (defaults to <config dir>/pkgprov/config.json)
    #[arg(long, env = "PKGPROV_CONFIG", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Treat a bare version in a range as a minimum instead of an exact match
    #[arg(long, global = true)]
    legacy_range: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List registered providers
    Providers(ProvidersArgs),

    /// Find packages by name
    Find(FindArgs),

    /// Install a package
    Install(InstallArgs),

    /// List package sources
    Sources(SourcesArgs),

    /// Compare versions and check ranges
    #[command(subcommand)]
    Version(VersionCommands),
}

#[derive(clap::Args, Debug)]
struct ProvidersArgs {
    /// Provider name pattern (`*` and `?` wildcards)
    #[arg(default_value = "*")]
    pattern: String,

    /// Only providers supporting this operation
    #[arg(long, value_name = "OP")]
    operation: Option<Operation>,
}

#[derive(clap::Args, Debug)]
struct FindArgs {
    /// Package names or patterns; none means every package
    names: Vec<String>,

    /// Provider name or pattern
    #[arg(long, short = 'p')]
    provider: Option<String>,

    /// Version or version range, e.g. `1.0` or `[1.0,2.0)`
    #[arg(long, short = 'v')]
    version: Option<String>,

    /// Include prerelease versions
    #[arg(long)]
    prerelease: bool,
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    name: String,

    #[arg(long, short = 'p')]
    provider: Option<String>,

    #[arg(long, short = 'v')]
    version: Option<String>,

    /// Do not ask before using untrusted sources
    #[arg(long)]
    trust: bool,
}

#[derive(clap::Args, Debug)]
struct SourcesArgs {
    /// Source name or pattern
    #[arg(default_value = "")]
    name: String,

    #[arg(long, short = 'p')]
    provider: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum VersionCommands {
    /// Print how two versions order
    Compare { left: String, right: String },

    /// Check which versions satisfy a range
    Range {
        range: String,
        #[arg(required = true)]
        versions: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();
    if cli.legacy_range {
        config.single_version_is_exact = false;
    }

    let mut session = Session::new(Arc::new(ConsoleHost::new(cli.json)), config);
    let manifests: Vec<PathBuf> = session
        .config()
        .manifests
        .iter()
        .chain(cli.manifests.iter())
        .cloned()
        .collect();
    session.load_manifests(&manifests)?;

    let report = match cli.command {
        Commands::Providers(args) => return list_providers(&session, &args, cli.json),
        Commands::Find(args) => {
            let mut query = PackageQuery::new(args.names).with_prerelease(args.prerelease);
            if let Some(provider) = args.provider {
                query = query.with_provider(provider);
            }
            if let Some(version) = args.version {
                query = query.with_version(session.parse_range(&version)?);
            }
            session.find_packages(&query)?
        }
        Commands::Install(args) => {
            let mut query = PackageQuery::new([args.name]).with_trust(args.trust);
            if let Some(provider) = args.provider {
                query = query.with_provider(provider);
            }
            if let Some(version) = args.version {
                query = query.with_version(session.parse_range(&version)?);
            }
            session.install_package(&query)?
        }
        Commands::Sources(args) => {
            let mut query = SourceQuery::new(args.name);
            if let Some(provider) = args.provider {
                query = query.with_provider(provider);
            }
            session.get_sources(&query)?
        }
        Commands::Version(command) => return run_version(&command, session.config()),
    };
    finish(report)
}

fn finish(report: DispatchReport) -> Result<()> {
    if !report.is_success() {
        bail!("{} problem(s) reported", report.diagnostics.len());
    }
    Ok(())
}

fn list_providers(session: &Session, args: &ProvidersArgs, json: bool) -> Result<()> {
    let operations = args.operation.map(Operations::from).unwrap_or(Operations::NONE);
    for descriptor in session.providers(&args.pattern, operations)? {
        if json {
            let line = serde_json::json!({
                "id": descriptor.id(),
                "name": descriptor.full_name(),
                "priority": descriptor.priority(),
                "operations": descriptor.operations().iter().map(|op| op.to_string()).collect::<Vec<_>>(),
            });
            println!("{}", line);
        } else {
            println!(
                "{} {} {}",
                descriptor.full_name(),
                descriptor.priority(),
                descriptor.operations()
            );
        }
    }
    Ok(())
}

fn run_version(command: &VersionCommands, config: &Config) -> Result<()> {
    match command {
        VersionCommands::Compare { left, right } => {
            let a = PackageVersion::parse(left)?;
            let b = PackageVersion::parse(right)?;
            let sign = match a.compare(&b) {
                Ordering::Less => "<",
                Ordering::Equal => "=",
                Ordering::Greater => ">",
            };
            println!("{} {} {}", a, sign, b);
        }
        VersionCommands::Range { range, versions } => {
            let range = config.parse_range(range)?;
            for text in versions {
                let version = PackageVersion::parse(text)?;
                println!("{} {} {}", version, range, range.satisfies(&version));
            }
        }
    }
    Ok(())
}
