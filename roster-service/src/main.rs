use std::sync::Arc;
use std::{env, fs, process};

use roster_service::adapter::{input::parse_request, output::build_document};
use roster_service::config::RosterConfig;
use roster_service::domain::sink::{TracingNotificationSink, TracingProgressSink};
use roster_service::error::GenerationError;
use roster_service::solver::{RosterGenerator, SolveOutcome};
use shared::types::RosterRequest;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    shared::telemetry::init_telemetry("roster-service");

    let config_path = env::var("ROSTER_CONFIG_PATH").unwrap_or_else(|_| "roster.toml".to_string());
    let config = match RosterConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default config ({e})");
            RosterConfig::default()
        }
    };

    let request_path = env::args()
        .nth(1)
        .expect("usage: roster-service <request.json>");
    let raw = fs::read_to_string(&request_path).expect("Failed to read the request file");
    let request: RosterRequest =
        serde_json::from_str(&raw).expect("Failed to parse the request JSON");

    let notifier = Arc::new(TracingNotificationSink);
    let progress = Arc::new(TracingProgressSink);

    let parsed = match parse_request(&request, notifier.as_ref()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("Rejected request: {e}");
            process::exit(2);
        }
    };
    let month = parsed.month.clone();
    let staff = parsed.staff.clone();

    let generator = RosterGenerator::new(config);
    let cancel = CancellationToken::new();
    match generator.generate(parsed, notifier, progress, cancel).await {
        Ok(SolveOutcome::Solved {
            status,
            objective,
            assignments,
        }) => {
            tracing::info!(%status, objective, "roster generated");
            let (document, _records) = build_document(&month, &staff, &assignments);
            let body =
                serde_json::to_string_pretty(&document).expect("Failed to serialize the document");
            println!("{body}");
        }
        Ok(SolveOutcome::NoSolution { status }) => {
            tracing::error!(%status, "no roster produced");
            process::exit(3);
        }
        Err(e @ GenerationError::InfeasibleInput(_)) => {
            tracing::error!("{e}");
            process::exit(3);
        }
        Err(e) => {
            tracing::error!("{e}");
            process::exit(1);
        }
    }
}
