//! User-facing channels.
//!
//! Each channel implements [`Component`] and captures an
//! `Arc<AssistantState>` at construction. [`channels`] decides which ones to
//! load; the caller spawns them with [`crate::runtime::spawn_components`].

#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;
mod state;

pub use state::{AssistantState, SessionSnapshot};

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::runtime::Component;

/// Build the configured channel components.
///
/// HTTP loads when enabled. The console loads when `interactive` is set and
/// the console is enabled, or when no other channel would run.
pub fn channels(config: &Config, state: Arc<AssistantState>, interactive: bool) -> Vec<Box<dyn Component>> {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-axum")]
    {
        if config.comms.http.enabled {
            info!(bind = %config.comms.http.bind, "loading http channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                state.clone(),
            )));
        }
    }
    #[cfg(not(feature = "channel-axum"))]
    {
        if config.comms.http.enabled {
            warn!("http channel enabled in config but built without the channel-axum feature");
        }
    }

    let console_wanted = (interactive && config.comms.pty.enabled) || components.is_empty();

    #[cfg(feature = "channel-pty")]
    {
        if console_wanted {
            info!("loading console channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state)));
        }
    }
    #[cfg(not(feature = "channel-pty"))]
    {
        let _ = state;
        if console_wanted {
            warn!("console requested but built without the channel-pty feature");
        }
    }

    if components.is_empty() {
        warn!("no channels loaded; waiting for shutdown");
    }
    components
}
