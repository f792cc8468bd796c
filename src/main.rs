use mensa_fetcher_rs::collector::collect_food;
use mensa_fetcher_rs::constants::{DEFAULT_DB, DEFAULT_SCHEDULE, FETCH_WINDOW_DAYS};
use mensa_fetcher_rs::db_operations::check_or_create_db_tables;
use mensa_fetcher_rs::translation::Translator;

use clap::Parser;
use log::log_enabled;
use rusqlite::Connection;
use std::{env, sync::Arc, time::Duration};
use tokio_cron_scheduler::{Job, JobScheduler};

/// Collects the daily meal plans of the Munich Studentenwerk canteens into
/// a local SQLite database.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path of the SQLite database
    #[arg(short, long, env = "MENSA_DB", default_value = DEFAULT_DB)]
    db: String,
    /// How many days of menu calendar to seed ahead
    #[arg(long, default_value_t = FETCH_WINDOW_DAYS)]
    days: i64,
    /// Cron schedule for the collection job
    #[arg(short, long, env = "MENSA_SCHEDULE", default_value = DEFAULT_SCHEDULE)]
    schedule: String,
    /// DeepL API key for dish title translation{n}[translation is skipped when unset]
    #[arg(long, env = "DEEPL_API_KEY")]
    deepl_key: Option<String>,
    /// Run a single collection immediately and exit
    #[arg(long)]
    once: bool,
    /// Enable verbose logging (mostly performance metrics){n}[SETS env: RUST_LOG=debug]
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        env::set_var("RUST_LOG", "debug");
    }

    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module(
            "mensa_fetcher_rs",
            if env::var(pretty_env_logger::env_logger::DEFAULT_FILTER_ENV).unwrap_or_default()
                == "debug"
            {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        )
        .init();

    log::info!("Starting mensa fetcher...");

    if !(log_enabled!(log::Level::Debug) || log_enabled!(log::Level::Trace)) {
        log::info!("Enable verbose logging for performance metrics");
    }

    {
        let conn = Connection::open(&args.db)?;
        check_or_create_db_tables(&conn)?;
    }

    let translator = Arc::new(Translator::from_key(args.deepl_key));
    let db_path = Arc::new(args.db);
    let days = args.days;

    if args.once {
        collect_food(&db_path, &translator, days).await?;
        return Ok(());
    }

    let sched = JobScheduler::new().await?;

    let job_db_path = db_path.clone();
    let job_translator = translator.clone();
    let collect_job = Job::new_async(args.schedule.as_str(), move |_uuid, mut _l| {
        let db_path = job_db_path.clone();
        let translator = job_translator.clone();
        Box::pin(async move {
            if let Err(e) = collect_food(&db_path, &translator, days).await {
                log::error!("scheduled collection failed: {}", e);
            }
        })
    })?;
    sched.add(collect_job).await?;

    // collect once on startup so the database is never stale after a deploy
    if let Err(e) = collect_food(&db_path, &translator, days).await {
        log::error!("startup collection failed: {}", e);
    }

    // start scheduler (non blocking)
    sched.start().await?;
    log::info!("Ready, next run per schedule '{}'", args.schedule);

    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
