use anyhow::Context;
use blogos::app_config;
use blogos::store::{ContentStore, DatabaseStore};
use clap::{Parser, Subcommand};
use env_logger::Env;

#[derive(Parser)]
#[command(name = "blogos", version, about = "Blog content store administration")]
struct Cli {
    /// Connection string; overrides `database.url` from config.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create any missing tables and indexes.
    InitSchema,
    /// Add a word that holds comments for moderation.
    AddWord { word: String },
    /// List sensitive words, newest first.
    Words,
    /// Print site statistics as JSON.
    Stats,
}

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    app_config::init();

    let cli = Cli::parse();
    let url = cli
        .database_url
        .unwrap_or_else(|| app_config::database().url);
    let db = blogos::db::connect(&url)
        .await
        .with_context(|| "Failed to connect to database")?;
    let store = DatabaseStore::new(db);

    match cli.command {
        Command::InitSchema => {
            blogos::db::create_schema(store.connection())
                .await
                .context("Failed to create schema")?;
            println!("Schema ready");
        }
        Command::AddWord { word } => {
            let word = blogos::sensitive_words::add_word(&store, &word).await?;
            println!("Added {:?}", word);
        }
        Command::Words => {
            for word in store.list_sensitive_words().await? {
                println!("{}", word);
            }
        }
        Command::Stats => {
            let stats = blogos::stats::collect(&store).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env file is fine for an admin tool
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
