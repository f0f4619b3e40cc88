use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Check-in server for the campus hiking event
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides WEB_PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Directory of the event database (overrides STATE_PATH)
    #[arg(long)]
    state_path: Option<String>,

    /// Directory of static data such as routes.json (overrides DATA_PATH)
    #[arg(long)]
    data_path: Option<String>,
}

mod config;
mod error;
mod identity;
mod logging;
mod managers;
mod models;
mod state;
mod web;

use config::{RouteCatalog, ServerConfig};
use identity::{HttpStudentVerifier, WechatClient};
use managers::{
    create_shared_admin_manager, create_shared_member_manager, create_shared_registration_manager,
    create_shared_report_manager, create_shared_team_manager,
};
use state::{create_shared_event_store, EventDatabase};

fn load_routes(path: &str) -> Result<RouteCatalog> {
    if !Path::new(path).exists() {
        warn!("No route file at {}, using built-in waypoints", path);
        return Ok(RouteCatalog::default());
    }
    let routes = RouteCatalog::load_from_file(path)?;
    info!("Loaded waypoints from {}", path);
    Ok(routes)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let log_buffer = logging::create_log_buffer(1000);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(state_path) = args.state_path {
        config.state_path = state_path;
    }
    if let Some(data_path) = args.data_path {
        config.data_path = data_path;
    }

    tokio::fs::create_dir_all(&config.state_path).await?;

    let routes = Arc::new(load_routes(&config.routes_path())?);
    for route in models::Route::ALL {
        info!(
            "  {}: destination {} ({})",
            route.display_name(),
            routes.destination(route),
            routes.point_name(route, routes.destination(route))
        );
    }

    let database_path = config.database_path();
    let database = EventDatabase::load(&database_path).await?;
    info!(
        "Loaded {} participants, {} teams and {} admins from {}",
        database.persons.len(),
        database.teams.len(),
        database.admins.len(),
        database_path
    );
    for (route, count) in managers::report_manager::team_totals(&database.teams) {
        info!("  {} teams on {}", count, route);
    }
    if config.window.enforce {
        match config.window.start {
            Some(start) => info!("Check-in opens daily from 08:00, event starts {}", start),
            None => warn!("EVENT_ENFORCE_WINDOW is set without EVENT_START_DATE"),
        }
    }

    let store = create_shared_event_store(database, Some(database_path));
    let verifier = Arc::new(HttpStudentVerifier::new(&config.identity_service_url));
    let wechat = Arc::new(WechatClient::new(&config.wechat_app_id, &config.wechat_secret));

    let state = web::AppState {
        teams: create_shared_team_manager(store.clone(), routes.clone(), config.window.clone()),
        members: create_shared_member_manager(store.clone(), config.window.clone()),
        registration: create_shared_registration_manager(store.clone(), verifier),
        admins: create_shared_admin_manager(store.clone(), routes.clone()),
        reports: create_shared_report_manager(store, routes),
        sessions: web::create_session_store(),
        log_buffer,
        wechat,
        config: Arc::new(config),
    };

    web::start_web_server(state).await
}
