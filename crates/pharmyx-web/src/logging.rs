//! Structured logging setup and the per-request log-level switch.
//!
//! A request with `"debug": true` turns on debug output for the Pharmyx
//! crates; one without it puts the base filter back. The filter is global, so
//! concurrent requests with different flags take turns setting it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub const DEFAULT_FILTER: &str = "pharmyx=info,tower_http=info,warn";
pub const DEBUG_FILTER: &str = "pharmyx=debug,tower_http=debug,info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

struct SwitchInner {
    handle: FilterHandle,
    base: String,
    debug: AtomicBool,
}

/// Handle for flipping the global filter between base and debug.
#[derive(Clone, Default)]
pub struct LogLevelSwitch {
    inner: Option<Arc<SwitchInner>>,
}

/// Install the global subscriber. RUST_LOG, when set, replaces `default_filter`.
pub fn init(default_filter: &str) -> anyhow::Result<LogLevelSwitch> {
    let base = std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_filter.to_string());

    let (filter_layer, handle) = reload::Layer::new(EnvFilter::try_new(&base)?);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init()?;

    Ok(LogLevelSwitch::from_handle(handle, base))
}

impl LogLevelSwitch {
    /// A switch that does nothing; used when no subscriber was installed.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    fn from_handle(handle: FilterHandle, base: String) -> Self {
        Self {
            inner: Some(Arc::new(SwitchInner {
                handle,
                base,
                debug: AtomicBool::new(false),
            })),
        }
    }

    /// Set the global level for the request about to run.
    pub fn apply(&self, debug: bool) {
        let Some(inner) = &self.inner else {
            return;
        };
        if inner.debug.swap(debug, Ordering::SeqCst) == debug {
            return;
        }

        let directives = if debug { DEBUG_FILTER } else { inner.base.as_str() };
        let result = EnvFilter::try_new(directives)
            .map_err(|e| e.to_string())
            .and_then(|filter| inner.handle.reload(filter).map_err(|e| e.to_string()));
        let enabled = debug;
        match result {
            Ok(()) => info!(debug = enabled, filter = directives, "Log level switched"),
            Err(e) => warn!(error = %e, "Failed to switch log level"),
        }
    }
}
