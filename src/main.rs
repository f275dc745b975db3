use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pfsync::codec;
use pfsync::settings::Settings;
use pfsync::sync::{self, Synchronizer};
use pfsync::transport::SshTransport;
use pfsync::validate::{render_violations, validate};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, FetchArgs, OutputFormat, PushArgs, ShowArgs, ValidateArgs};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pfsync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Fetch(args) => run_fetch(&cli.settings, args),
        Command::Push(args) => run_push(&cli.settings, args),
        Command::Validate(args) => run_validate(args),
        Command::Show(args) => run_show(args),
    }
}

fn run_fetch(settings_path: &Path, args: FetchArgs) -> Result<()> {
    let sync = synchronizer(settings_path)?;
    let doc = sync.fetch()?;

    if args.validate {
        let violations = validate(&doc);
        eprintln!("{}", render_violations(&violations));
        if !violations.is_empty() {
            bail!("fetched configuration failed validation");
        }
    }

    let xml = codec::encode(&doc)?;
    match args.output {
        Some(path) => fs::write(&path, xml)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{xml}"),
    }
    Ok(())
}

fn run_push(settings_path: &Path, args: PushArgs) -> Result<()> {
    let doc = sync::load_from_file(&args.file)?;

    let violations = validate(&doc);
    if !violations.is_empty() {
        eprintln!("{}", render_violations(&violations));
        if !args.force {
            bail!("validation failed; use --force to push anyway");
        }
        eprintln!("pushing despite violations (--force)");
    }

    let sync = synchronizer(settings_path)?;
    sync.push(&doc)?;
    println!("push complete");
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let doc = sync::load_from_file(&args.file)?;
    let violations = validate(&doc);

    match args.format {
        OutputFormat::Text => println!("{}", render_violations(&violations)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&violations)?),
    }

    if !violations.is_empty() {
        bail!("validation failed with {} violation(s)", violations.len());
    }
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<()> {
    let doc = sync::load_from_file(&args.file)?;

    if let OutputFormat::Json = args.format {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let range = &doc.dhcpd.lan.range;
    println!(
        "hostname={} domain={}",
        doc.system.hostname,
        doc.system.domain.as_deref().unwrap_or("none")
    );
    println!(
        "lan={}/{} dhcp_range={}..{}",
        doc.interfaces.lan.ipaddr,
        doc.interfaces.lan.subnet,
        range.from.as_deref().unwrap_or("none"),
        range.to.as_deref().unwrap_or("none")
    );
    println!(
        "users={} groups={} static_maps={}",
        doc.users.len(),
        doc.groups.len(),
        doc.static_maps.len()
    );
    Ok(())
}

fn synchronizer(settings_path: &Path) -> Result<Synchronizer<SshTransport>> {
    let settings = Settings::load(settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    let transport = SshTransport::new(settings.device);
    Ok(Synchronizer::new(transport, settings.paths))
}
