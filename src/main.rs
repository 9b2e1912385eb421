use std::sync::Arc;

use agent_onboard::config::OnboardConfig;
use agent_onboard::gateway::{AgentDirectory, HttpAgentDirectory, HttpEmailVerifier, LocalPanVerifier};
use agent_onboard::onboarding::{OnboardingRouteState, WizardController, WizardDeps, onboarding_routes};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const USAGE: &str = "usage: agent-onboard [serve | wizard [referredby]]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = OnboardConfig::from_env()?;
    let directory: Arc<dyn AgentDirectory> = Arc::new(HttpAgentDirectory::new(&config)?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve(&config, directory).await,
        Some("wizard") => {
            let deps = WizardDeps {
                directory,
                email_verifier: Arc::new(HttpEmailVerifier::new(&config)?),
                pan_verifier: Arc::new(LocalPanVerifier::new(config.pan_latency)),
            };
            let wizard = WizardController::new(args.get(1).map(String::as_str), deps, config.reset_delay);

            eprintln!("Agent onboarding v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("   Stage: {}", config.stage);
            eprintln!("   Flow: {}", wizard.variant().await);
            eprintln!("   Type 'help' for commands.\n");

            agent_onboard::cli::run(&wizard).await?;
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command '{other}'\n{USAGE}");
            std::process::exit(2);
        }
    }
}

async fn serve(config: &OnboardConfig, directory: Arc<dyn AgentDirectory>) -> anyhow::Result<()> {
    let app = onboarding_routes(OnboardingRouteState { directory })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(
        port = config.port,
        stage = %config.stage,
        directory = %config.directory_url,
        notification = %config.notification_url,
        "Onboarding API started"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
