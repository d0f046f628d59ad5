pub mod bookmarks;
pub mod cli;
pub mod commands;
pub mod database;
pub mod errors;
pub mod expiration;
pub mod player;
pub mod settings;

use chrono::Utc;
use cli::{Cli, Command};
use database::DatabaseManager;
use errors::AppError;
use player::PlayerSession;

/// Executes one CLI invocation against the bookmark store.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let db = match &cli.database {
        Some(path) => DatabaseManager::open(path).await?,
        None => DatabaseManager::open_default().await?,
    };

    let result = dispatch(&db, cli.command).await;
    db.close().await;
    result
}

async fn dispatch(db: &DatabaseManager, command: Command) -> Result<(), AppError> {
    match command {
        Command::Play { file } => {
            let session = PlayerSession::load(&db.settings()).await?;
            commands::play(db, &session, &file).await?;
        }
        Command::List { json } => {
            let entries = commands::list(db, Utc::now()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print!("{}", commands::render_list(&entries));
            }
        }
        Command::Clear => {
            for path in commands::clear(db).await? {
                println!("{}", path);
            }
        }
        Command::Expire => {
            for path in commands::expire(db, Utc::now()).await? {
                println!("{}", path);
            }
        }
        Command::Config { name, value } => {
            let settings = commands::config(db, name.as_deref(), value.as_deref()).await?;
            print!("{}", commands::render_settings(&settings));
        }
    }

    Ok(())
}
