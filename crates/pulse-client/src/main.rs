//! Pulse client binary.
//!
//! Boots the session store, bridge and feed, prints every session and feed
//! transition, and reads commands from stdin until `quit` or a signal.

use pulse_client::app::record_source;
use pulse_client::command::HELP;
use pulse_client::render::{render_feed, render_session};
use pulse_client::{load_config, App, Command};
use pulse_session::Subscription;
use pulse_types::FeedState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PULSE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

/// Prints session transitions and hands back the feed receiver for the
/// render loop. The subscription stops printing when dropped.
fn attach_screen(app: &App) -> (Subscription, watch::Receiver<FeedState>) {
    let session = app
        .store()
        .subscribe(|state| println!("[session] {}", render_session(state)));
    let mut feed = app.feed().watch();
    println!("[feed] {}", render_feed(&feed.borrow_and_update()));
    (session, feed)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("pulse.toml"));

    let config = load_config(selected_config_path)
        .expect("failed to load configuration, check the config file syntax");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so stdout only carries rendered views.
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let source = match record_source(&config.feed) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "invalid feed.endpoint, expected an http(s) URL");
            std::process::exit(1);
        }
    };

    let mut app = App::boot(&config, source);
    let (mut screen, mut feed) = attach_screen(&app);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = feed.changed() => {
                if changed.is_err() {
                    // Only happens if the loader is gone, which `app` prevents.
                    break;
                }
                println!("[feed] {}", render_feed(&feed.borrow_and_update()));
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(Command::Retry) => {
                        if !app.retry() {
                            println!("nothing to retry");
                        }
                    }
                    Some(Command::Reload) => {
                        drop(screen);
                        app.reload();
                        (screen, feed) = attach_screen(&app);
                    }
                    Some(Command::Status) => println!("{}", app.status_line()),
                    Some(Command::Help) => println!("{HELP}"),
                    Some(Command::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => println!("unknown command, {HELP}"),
                },
                Ok(None) => {
                    tracing::debug!("stdin closed, waiting for shutdown signal");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    stdin_open = false;
                }
            },
            () = &mut shutdown => break,
        }
    }

    drop(screen);
    app.shutdown();
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
        () = terminate => { tracing::info!("received SIGTERM, shutting down"); }
    }
}
