use std::env;
use std::process::ExitCode;

use hiretrack::config::ImportJobConfig;
use hiretrack::import::{spreadsheet, FieldAliases, ImportSettings, Importer};
use hiretrack::store::{resolve_ownership, SeaOrmCandidateStore};
use sea_orm::Database;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "usage: hiretrack-import <file> [--owner <user_id>]";

struct Args {
    file: String,
    owner: Option<i32>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut file = None;
    let mut owner = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--owner" => {
                let raw = iter.next().ok_or("--owner needs a user id")?;
                owner = Some(raw.parse::<i32>().map_err(|_| format!("invalid user id {:?}", raw))?);
            }
            other if file.is_none() && !other.starts_with("--") => file = Some(other.to_string()),
            other => return Err(format!("unexpected argument {:?}", other)),
        }
    }

    Ok(Args {
        file: file.ok_or("missing spreadsheet file")?,
        owner,
    })
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = ImportJobConfig::from_env()?;

    let bytes = tokio::fs::read(&args.file).await?;
    let rows = spreadsheet::decode_file(&args.file, &bytes)?;
    info!("Decoded {} rows from {}", rows.len(), args.file);

    let db = Database::connect(&config.database_url).await?;
    let schema_has_ownership = resolve_ownership(&db, config.ownership).await;
    if args.owner.is_some() && !schema_has_ownership {
        info!("No ownership column; --owner is ignored");
    }

    let store = SeaOrmCandidateStore::new(db);
    let aliases = FieldAliases::default();
    let settings = ImportSettings {
        batch_size: config.import_batch_size,
        skills_max_len: config.skills_max_len,
        schema_has_ownership,
    };

    let report = Importer::new(&store, &aliases, settings).import(&rows, args.owner).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise tracing (INFO level)
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("import failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
