//! Hold-Scribe: hold a shortcut to dictate, release to insert the transcript.

mod app;
mod config;
mod error;
mod focus_probe;
mod injector;
mod key_source;
mod notifier;
mod paste_guard;
mod privileged;
mod system_permissions;

pub(crate) use {
    app::App,
    error::{AppError, Result as AppResult},
    focus_probe::SystemFocus,
    injector::{EnigoInjector, KeystrokeInjector},
    key_source::RdevKeySource,
    notifier::DesktopNotifier,
    paste_guard::PasteChordGuard,
    system_permissions::SystemPermissions,
};

use crate::config::Config;

use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "hold_scribe=debug,hold_scribe_core=debug";

/// Application entry point.
fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Config validation failed: {:?}", e);
        std::process::exit(1);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let app = App::new(config);
    if let Err(e) = rt.block_on(app.run(Box::new(RdevKeySource))) {
        error!(error = ?e, "App error");
        std::process::exit(1);
    }
}
