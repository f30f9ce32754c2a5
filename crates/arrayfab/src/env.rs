//! Process-wide runtime switches captured from the environment.

use std::env;
use std::sync::OnceLock;

use tracing::warn;

use crate::backend::spec::{ArrayBackend, BackendResult};

const EAGER_VAR: &str = "ARRAYFAB_EAGER";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RuntimeConfig {
    /// Fill operations block on the backend stream after enqueueing.
    pub eager: bool,
}

impl RuntimeConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let eager = lookup(EAGER_VAR).is_some_and(|raw| {
            parse_switch(&raw).unwrap_or_else(|| {
                warn!(variable = EAGER_VAR, value = %raw, "ignoring unrecognised switch value");
                false
            })
        });
        RuntimeConfig { eager }
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Some(false),
        "1" | "true" | "yes" | "on" => Some(true),
        _ => None,
    }
}

/// Settings read once, on first use.
pub(crate) fn runtime_config() -> RuntimeConfig {
    static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();
    *CONFIG.get_or_init(|| RuntimeConfig::from_lookup(|name| env::var(name).ok()))
}

/// Waits for the backend stream to drain when eager mode is on.
pub(crate) fn settle<B: ArrayBackend>(backend: &B) -> BackendResult<()> {
    if runtime_config().eager {
        backend.synchronize()
    } else {
        Ok(())
    }
}
