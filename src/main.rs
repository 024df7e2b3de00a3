use clap::Parser;
use tokio::sync::mpsc;

use sharescribe::cache::{SharedFileBridge, SHARED_FILES_BUCKET};
use sharescribe::cli::Cli;
use sharescribe::credential::{CredentialStore, SaveOutcome};
use sharescribe::gateway::Gateway;
use sharescribe::intake::QueryFlags;
use sharescribe::paths;
use sharescribe::status::{ChannelStatusSink, StatusLevel};
use sharescribe::transcribe::OpenAiBackend;
use sharescribe::{run_pipeline, Session};

#[tokio::main]
async fn main() {
    // Load .env if present; production uses real env vars.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Some(key) = &cli.save_key {
        let store = CredentialStore::new(cli.config_dir());
        match store.save(key) {
            Ok(SaveOutcome::Saved) => log::info!("API key saved."),
            Ok(SaveOutcome::EmptyInput) => log::warn!("Empty key given, stored key removed."),
            Err(e) => {
                log::error!("Failed to save API key: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config_dir = cli.config_dir();
    let cache_root = cli.cache_root();

    let (intake_tx, mut intake_rx) = mpsc::unbounded_channel::<QueryFlags>();
    let (sink, mut status_rx) = ChannelStatusSink::new();

    // Statuses are rendered as log lines; a UI would subscribe here.
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            match status.level {
                StatusLevel::Error => log::error!("{}", status.message),
                StatusLevel::Loading => log::debug!("{}", status.message),
                _ => log::info!("{}", status.message),
            }
        }
    });

    let mut session = Session::new(config_dir, cli.scratch_dir());
    session.announce_credential(sink.as_ref());

    let gateway = Gateway::new(
        cache_root.clone(),
        cli.upstream.clone(),
        cli.addr,
        Some(intake_tx),
    );
    tokio::spawn(async move {
        if let Err(e) = gateway.start().await {
            log::error!("Gateway stopped: {}", e);
            std::process::exit(1);
        }
    });

    let bridge = SharedFileBridge::new(paths::bucket_dir(&cache_root, SHARED_FILES_BUCKET));
    let backend = OpenAiBackend;

    // Each share lands here as query flags; only an actually adopted
    // file kicks off a run. Error-only flags (or a consumed slot) must
    // not re-transcribe whatever input is still selected.
    while let Some(flags) = intake_rx.recv().await {
        if !session.intake(&flags, &bridge, sink.as_ref()) {
            continue;
        }

        let run = run_pipeline(&mut session, &backend, sink.as_ref()).await;
        if run.failed {
            log::warn!("Transcription failed: {}", run.transcript);
        } else {
            println!("{}", run.transcript);
        }
    }
}
