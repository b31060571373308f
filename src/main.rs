use std::sync::Arc;

use mailsweep::classify::gemini::GeminiClassifier;
use mailsweep::config::Config;
use mailsweep::mailbox::gmail::GmailMailbox;
use mailsweep::pipeline::{TriagePipeline, TriageSettings};
use mailsweep::server::{AppState, cron_routes};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Required: GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET,");
        eprintln!("            GOOGLE_REFRESH_TOKEN, GEMINI_API_KEY, CRON_SECRET");
        std::process::exit(1);
    });

    eprintln!("📬 mailsweep v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.classifier_model);
    eprintln!("   Label: {}", config.ignored_label);
    eprintln!("   Lookback: {}h", config.lookback_hours);
    eprintln!("   Trigger: POST http://{}/api/cron/triage\n", config.bind_addr);

    let mailbox = Arc::new(GmailMailbox::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_refresh_token.clone(),
    ));

    let mut classifier = GeminiClassifier::new(
        config.classifier_api_key.clone(),
        config.classifier_model.clone(),
    );
    if let Some(base_url) = &config.classifier_base_url {
        classifier = classifier.with_base_url(base_url);
    }
    if let Some(prompt) = &config.system_prompt {
        classifier = classifier.with_system_prompt(prompt.clone());
    }

    let pipeline = Arc::new(TriagePipeline::new(
        mailbox,
        Arc::new(classifier),
        TriageSettings {
            ignored_label: config.ignored_label.clone(),
            lookback_hours: config.lookback_hours,
        },
    ));

    let state = AppState {
        pipeline,
        cron_secret: config.cron_secret.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "mailsweep listening");
    axum::serve(listener, cron_routes(state)).await?;

    Ok(())
}
