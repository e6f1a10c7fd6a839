use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cov")]
#[command(about = "Coverage reconciliation and change detection CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overlay...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Report config keys no code path reads in a mode
    ConfigCheck {
        /// SERVICE | BATCH
        #[arg(long, default_value = "BATCH")]
        mode: String,

        /// Exit non-zero when unused keys exist
        #[arg(long, default_value_t = false)]
        fail: bool,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Reconcile one (payer, test) from a JSON file
    Reconcile {
        /// {payerId, testId, lineOfBusiness?, assertions[]}
        #[arg(long)]
        input: String,

        /// Override the request's line of business
        #[arg(long)]
        lob: Option<String>,

        /// Layered config paths (delegation records, thresholds)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Evaluate delegation as of this date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<String>,
    },

    /// Reconcile many pairs and print the multi-payer summary
    Summary {
        /// JSON array of reconcile inputs
        #[arg(long)]
        input: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        today: Option<String>,
    },

    /// Fingerprint a document and compare with a prior snapshot
    Hash {
        #[arg(long)]
        doc_id: String,

        /// Raw document text
        #[arg(long)]
        content: Option<String>,

        /// Extracted fields JSON
        #[arg(long)]
        extracted: Option<String>,

        /// Prior snapshot JSON; absent means a new document
        #[arg(long)]
        prior: Option<String>,

        /// Write the new snapshot here
        #[arg(long)]
        out: Option<String>,

        #[arg(long)]
        parser_version: Option<String>,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Explain delegation routing for a payer
    Delegation {
        #[arg(long)]
        payer: String,

        #[arg(long)]
        lob: Option<String>,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        today: Option<String>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a JSONL audit trail
    Verify {
        path: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = cov_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::ConfigCheck { mode, fail, paths } => {
            commands::config_check(&mode, fail, &paths)?;
        }

        Commands::Reconcile {
            input,
            lob,
            config_paths,
            today,
        } => {
            commands::reconcile::run_one(&input, lob, &config_paths, today.as_deref())?;
        }

        Commands::Summary {
            input,
            config_paths,
            today,
        } => {
            commands::reconcile::run_summary(&input, &config_paths, today.as_deref())?;
        }

        Commands::Hash {
            doc_id,
            content,
            extracted,
            prior,
            out,
            parser_version,
            config_paths,
        } => {
            commands::hash::run(commands::hash::HashArgs {
                doc_id,
                content,
                extracted,
                prior,
                out,
                parser_version,
                config_paths,
            })?;
        }

        Commands::Delegation {
            payer,
            lob,
            config_paths,
            today,
        } => {
            commands::delegation::run(&payer, lob.as_deref(), &config_paths, today.as_deref())?;
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => commands::audit::verify(&path)?,
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable JSON.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
