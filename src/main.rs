use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferramenta::infrastructure::AppState;
use ferramenta::services::{maintenance_service, sms_service};
use ferramenta::{config, db, seed, server};

/// One-off jobs selectable with `--task <name>`
#[derive(Debug, Clone, Copy, PartialEq)]
enum Task {
    Seed,
    PurgeOrphans,
    DispatchSms,
}

impl Task {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "seed" => Some(Task::Seed),
            "purge-orphans" => Some(Task::PurgeOrphans),
            "dispatch-sms" => Some(Task::DispatchSms),
            _ => None,
        }
    }
}

async fn run_task(task: Task, state: &AppState) -> Result<(), String> {
    match task {
        Task::Seed => {
            let seeded = seed::seed_demo_data(state.db())
                .await
                .map_err(|e| e.to_string())?;
            tracing::info!("Seed finished (inserted: {})", seeded);
        }
        Task::PurgeOrphans => {
            let report = maintenance_service::purge_orphans(state.db())
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?
            );
        }
        Task::DispatchSms => {
            let report = sms_service::dispatch_pending(state.db(), &state.twilio)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferramenta=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Check for --task CLI argument
    let args: Vec<String> = std::env::args().collect();
    let task = match args.iter().position(|arg| arg == "--task") {
        Some(pos) => match args.get(pos + 1).and_then(|name| Task::parse(name)) {
            Some(task) => Some(task),
            None => {
                eprintln!("Usage: ferramenta [--task seed|purge-orphans|dispatch-sms]");
                return ExitCode::from(2);
            }
        },
        None => None,
    };

    // Initialize database
    let db = match db::init_db(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let port = config.port;
    let poll_every = Duration::from_secs(config.sms_poll_interval_secs.max(1));
    let state = AppState::new(db, config);

    if let Some(task) = task {
        tracing::info!("Running task {:?}", task);
        return match run_task(task, &state).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Task {:?} failed: {}", task, e);
                ExitCode::FAILURE
            }
        };
    }

    // Check for seed flag
    if std::env::var("SEED_DEMO").is_ok() {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(state.db()).await {
            tracing::error!("Failed to seed data: {}", e);
        }
    }

    // SMS queue dispatcher
    tokio::spawn(sms_service::run_dispatcher(
        state.db().clone(),
        state.twilio.clone(),
        poll_every,
    ));

    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Ferramenta server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
