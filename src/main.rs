//! jira-migrate CLI - Migrate Jira Server/DC automation rules to Jira Cloud

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use jira_migrate::{
    document, CloudDirectory, JiraCloudClient, JiraServerClient, Mapper, MappingReport, MappingSet,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jira-migrate")]
#[command(about = "Migrate Jira Server/Data Center automation rules to Jira Cloud")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a rule export for Jira Cloud
    Convert {
        /// Rule export to convert (scans the current directory if omitted)
        input: Option<PathBuf>,

        /// Directory of lookup CSV files (<category>.csv)
        #[arg(short, long, default_value = "mapping")]
        mapping: PathBuf,

        /// Cloud index CSV (category,name,cloud_id) instead of live lookups
        #[arg(long)]
        cloud_index: Option<PathBuf>,

        /// Jira Cloud base URL, e.g. https://your-domain.atlassian.net
        #[arg(long)]
        base_url: Option<String>,

        /// Jira Cloud account email
        #[arg(long)]
        email: Option<String>,

        /// Jira Cloud API token (prompted when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Also write one file per rule
        #[arg(long)]
        split: bool,

        /// Mapping report path
        #[arg(long, default_value = "mapping-result.csv")]
        report: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Verify requirements before a migration
    Check {
        /// Directory of lookup CSV files
        #[arg(short, long, default_value = "mapping")]
        mapping: PathBuf,

        /// Jira Cloud base URL (connection is only tested when given)
        #[arg(long)]
        base_url: Option<String>,

        /// Jira Cloud account email
        #[arg(long)]
        email: Option<String>,

        /// Jira Cloud API token
        #[arg(long)]
        token: Option<String>,
    },

    /// Build the lookup CSV directory from a Server/DC instance
    ///
    /// The user search endpoint returns at most 1000 users; export the
    /// user table from the database for larger instances.
    FetchMapping {
        /// Jira Server/DC base URL, e.g. http://localhost:8080
        #[arg(long)]
        base_url: String,

        /// Server/DC username
        #[arg(long)]
        username: String,

        /// Server/DC password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Where to write the <category>.csv files
        #[arg(short, long, default_value = "mapping")]
        output: PathBuf,
    },

    /// Show rule counts and states for an export
    Info {
        /// Rule export file
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    let result = match cli.command {
        Commands::Convert {
            input,
            mapping,
            cloud_index,
            base_url,
            email,
            token,
            split,
            report,
            yes,
        } => cmd_convert(ConvertArgs {
            input,
            mapping,
            cloud_index,
            base_url,
            email,
            token,
            split,
            report,
            yes,
        }),
        Commands::Check {
            mapping,
            base_url,
            email,
            token,
        } => cmd_check(&mapping, base_url, email, token),
        Commands::FetchMapping {
            base_url,
            username,
            password,
            output,
        } => cmd_fetch_mapping(&base_url, &username, password, &output),
        Commands::Info { input, json } => cmd_info(&input, json),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

struct ConvertArgs {
    input: Option<PathBuf>,
    mapping: PathBuf,
    cloud_index: Option<PathBuf>,
    base_url: Option<String>,
    email: Option<String>,
    token: Option<String>,
    split: bool,
    report: PathBuf,
    yes: bool,
}

fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let input = match args.input {
        Some(ref path) => path.clone(),
        None => pick_export()?,
    };

    let lookups = MappingSet::load_dir(&args.mapping)
        .with_context(|| format!("loading lookup tables from {}", args.mapping.display()))?;
    if lookups.is_empty() {
        bail!(
            "no lookup tables found in {} (expected <category>.csv files)",
            args.mapping.display()
        );
    }

    println!("Selected file: {}", input.display());
    println!("Lookup tables: {} entries", lookups.len());

    if !args.yes {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Proceed with the migration?")
            .default(true)
            .interact()?;
        if !proceed {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let cloud = match &args.cloud_index {
        Some(path) => CloudDirectory::load(path)
            .with_context(|| format!("loading cloud index from {}", path.display()))?,
        None => build_live_directory(&args, &lookups)?,
    };

    let document = document::load_export(&input)?;
    document::write_pretty(&sibling(&input, "-original-pretty.json"), &document)?;

    let conversion = Mapper::new(&lookups, &cloud).convert(document)?;

    let output = sibling(&input, "-modified-for-cloud.json");
    document::write_compact(&output, &conversion.document)?;
    document::write_pretty(&sibling(&input, "-modified-for-cloud-pretty.json"), &conversion.document)?;

    if args.split {
        let dir = input.parent().unwrap_or(Path::new("."));
        for (file_name, part) in document::split_rules(&conversion.document)? {
            let path = dir.join(&file_name);
            document::write_pretty(&path, &part)?;
            println!("  File created: {}", path.display());
        }
    }

    let report = MappingReport::new(&conversion.records);
    report.save_csv(&args.report)?;
    report.print_summary();

    println!();
    println!("Converted {} → {}", input.display(), output.display());
    println!(
        "  Rules: {} kept, {} disabled dropped",
        conversion.rules_kept(),
        conversion.rules_dropped
    );
    println!(
        "  Identifiers: {} mapped, {} missing",
        conversion.mapped_count(),
        conversion.missing_count()
    );
    println!("  Report: {}", args.report.display());
    Ok(())
}

/// Resolve every lookup name against Jira Cloud, with a progress bar.
fn build_live_directory(args: &ConvertArgs, lookups: &MappingSet) -> Result<CloudDirectory> {
    let (Some(base_url), Some(email)) = (&args.base_url, &args.email) else {
        bail!("provide --cloud-index, or --base-url and --email for live resolution");
    };
    let token = match &args.token {
        Some(token) => token.clone(),
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Jira Cloud API token")
            .interact()?,
    };

    let client = JiraCloudClient::new(base_url, email, &token)?;
    println!("Testing Jira Cloud connection...");
    client
        .test_connection()
        .context("unable to connect to Jira Cloud; verify credentials and URL")?;
    println!("{} Jira Cloud connection OK", "✔".green());

    let bar = ProgressBar::new(lookups.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("static template"),
    );
    let directory = client.build_directory(lookups, |category, name| {
        bar.set_message(format!("{category}: {name}"));
        bar.inc(1);
    })?;
    bar.finish_and_clear();
    Ok(directory)
}

fn cmd_check(
    mapping: &Path,
    base_url: Option<String>,
    email: Option<String>,
    token: Option<String>,
) -> Result<()> {
    let mut ok = true;

    match MappingSet::load_dir(mapping) {
        Ok(set) if !set.is_empty() => {
            println!("{} lookup tables: {} entries in {}", "✔".green(), set.len(), mapping.display());
        }
        Ok(_) => {
            println!("{} no lookup tables in {}", "✖".red(), mapping.display());
            ok = false;
        }
        Err(e) => {
            println!("{} lookup tables: {}", "✖".red(), e);
            ok = false;
        }
    }

    let exports = document::scan_exports(Path::new("."))?;
    if exports.is_empty() {
        println!("{} no rule exports (*.json with a \"rules\" key) in the current directory", "✖".red());
        ok = false;
    } else {
        println!("{} found {} rule export(s)", "✔".green(), exports.len());
    }

    if let Some(base_url) = base_url {
        let (Some(email), Some(token)) = (email, token) else {
            bail!("--base-url requires --email and --token");
        };
        let client = JiraCloudClient::new(&base_url, &email, &token)?;
        match client.test_connection() {
            Ok(()) => println!("{} Jira Cloud connection OK", "✔".green()),
            Err(e) => {
                println!("{} Jira Cloud connection failed: {}", "✖".red(), e);
                ok = false;
            }
        }
    }

    if !ok {
        bail!("missing requirements; fix the issues above and retry");
    }
    Ok(())
}

fn cmd_fetch_mapping(
    base_url: &str,
    username: &str,
    password: Option<String>,
    output: &Path,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Jira Server/DC password")
            .interact()?,
    };

    let client = JiraServerClient::new(base_url, username, &password)?;
    println!("Fetching catalogs from {base_url}...");
    let lookups = client.fetch_lookups(|category, count| {
        println!("  {} {}: {} entries", "✔".green(), category, count);
    })?;

    lookups.save_dir(output)?;
    println!("Wrote lookup tables to {}", output.display());
    Ok(())
}

fn cmd_info(input: &Path, as_json: bool) -> Result<()> {
    let document = document::load_export(input)?;
    let rules = document["rules"].as_array().expect("validated export");

    let state_of = |rule: &Value| -> String {
        rule.get("state")
            .or_else(|| rule.get("status"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string()
    };
    let disabled = rules.iter().filter(|r| state_of(r) == "DISABLED").count();

    if as_json {
        let summary = json!({
            "file": input.display().to_string(),
            "rules": rules.len(),
            "disabled": disabled,
            "enabled": rules.len() - disabled,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Rule export: {}", input.display());
    println!("═══════════════════════════════════════════════════");
    println!();
    println!("Rules:    {}", rules.len());
    println!("Enabled:  {}", rules.len() - disabled);
    println!("Disabled: {}", disabled);
    println!();
    for rule in rules {
        let name = rule.get("name").and_then(Value::as_str).unwrap_or("(unnamed)");
        let state = state_of(rule);
        let state = if state == "DISABLED" {
            state.red().to_string()
        } else {
            state.green().to_string()
        };
        println!("  {:<9} {}", state, name);
    }
    Ok(())
}

/// Interactive export selection, for runs without an input argument.
fn pick_export() -> Result<PathBuf> {
    let exports = document::scan_exports(Path::new("."))?;
    if exports.is_empty() {
        bail!("no rule exports (*.json with a \"rules\" key) found in the current directory");
    }
    let names: Vec<String> = exports.iter().map(|p| p.display().to_string()).collect();
    let picked = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the automation rule export")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(exports[picked].clone())
}

/// Append a suffix to a file name, next to the original.
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    input.with_file_name(name)
}
