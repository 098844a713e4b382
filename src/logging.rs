// SPDX-License-Identifier: MIT
//
// Diagnostic logging.
//
// The screen is in raw mode and owned by the editor, so log output can't go
// to stdout or stderr. When `TILDE_LOG` names a file, a subscriber writes
// there; otherwise nothing is installed and every `tracing` event is a
// no-op. `RUST_LOG` picks the filter, `info` by default.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming the log file.
pub const LOG_ENV: &str = "TILDE_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install the file subscriber if `TILDE_LOG` is set.
///
/// Failing to open the log file is not fatal: the editor runs without logs.
pub fn init() {
    let Some(path) = std::env::var_os(LOG_ENV) else {
        return;
    };
    match open_log(Path::new(&path)) {
        Ok(file) => install(file),
        Err(e) => eprintln!("tilde: cannot open log file {}: {e}", Path::new(&path).display()),
    }
}

fn open_log(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn install(file: File) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // `try_init` so a second call (tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
}
