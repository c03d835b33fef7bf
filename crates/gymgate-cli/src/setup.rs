//! PIN setup, settings resolution and status reporting.

use std::time::Duration;

use gymgate_core::{
    GateConfig, GateError, GateSettings, Pin, PinVerifier, SettingsStore, StoreError,
    env::Environment, gate::MAX_IDLE_TIMEOUT,
};
use thiserror::Error;

/// Errors from setup commands.
#[derive(Debug, Error)]
pub enum SetupError {
    /// `run` before any PIN was set.
    #[error("no PIN set, run `gymgate set-pin <PIN>` first")]
    NoPin,

    /// Changing an existing PIN without the current one.
    #[error("a PIN is already set, pass --current <PIN> to change it")]
    CurrentPinRequired,

    /// PIN or configuration rejected by the gate.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Settings could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-run settings that win over persisted ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Inactivity period in seconds.
    pub idle_timeout_secs: Option<u64>,
    /// Countdown length in ticks.
    pub countdown_ticks: Option<u32>,
}

/// Persisted settings, or defaults on first run.
pub fn load_settings<S: SettingsStore>(store: &S) -> Result<GateSettings, SetupError> {
    Ok(store.load_settings()?.unwrap_or_default())
}

/// Gate configuration from persisted settings and overrides.
///
/// A shorter countdown pulls the haptic threshold down with it so the pulse
/// still fires.
///
/// # Errors
///
/// - `SetupError::Gate` if the result is not a valid [`GateConfig`], including
///   idle timeouts longer than [`MAX_IDLE_TIMEOUT`] from either source
pub fn effective_config(
    settings: &GateSettings,
    overrides: Overrides,
) -> Result<GateConfig, SetupError> {
    let mut config = settings.to_config();
    if let Some(secs) = overrides.idle_timeout_secs {
        if secs > MAX_IDLE_TIMEOUT.as_secs() {
            let reason = "idle timeout longer than a day";
            return Err(GateError::InvalidConfig { reason }.into());
        }
        config.idle_timeout = Duration::from_secs(secs);
    }
    if let Some(ticks) = overrides.countdown_ticks {
        config.countdown_ticks = ticks;
        config.haptic_at = config.haptic_at.min(ticks.saturating_sub(1));
    }
    config.validate()?;
    Ok(config)
}

/// Verifier for the stored PIN.
pub fn verifier(settings: &GateSettings) -> Result<PinVerifier, SetupError> {
    settings.pin.clone().map(PinVerifier::from_digest).ok_or(SetupError::NoPin)
}

/// Set the PIN, or change it if one is stored.
///
/// # Errors
///
/// - `SetupError::Gate` if either PIN is malformed or `current` is wrong
/// - `SetupError::CurrentPinRequired` if a PIN is stored and `current` is
///   missing
pub fn set_pin<S, E>(
    store: &S,
    env: &E,
    new: &str,
    current: Option<&str>,
) -> Result<(), SetupError>
where
    S: SettingsStore,
    E: Environment,
{
    let new = Pin::parse(new)?;
    let mut settings = load_settings(store)?;

    let verifier = match (settings.pin.take(), current) {
        (None, _) => PinVerifier::new(env, &new),
        (Some(_), None) => return Err(SetupError::CurrentPinRequired),
        (Some(digest), Some(current)) => {
            let mut verifier = PinVerifier::from_digest(digest);
            verifier.change_pin(env, &Pin::parse(current)?, &new)?;
            verifier
        },
    };

    settings.pin = Some(verifier.digest().clone());
    store.save_settings(&settings)?;
    tracing::info!("PIN updated");
    Ok(())
}

/// Human-readable summary of the stored settings and last session.
pub fn status<S: SettingsStore>(store: &S) -> Result<String, SetupError> {
    let settings = load_settings(store)?;

    let pin = if settings.pin.is_some() { "set" } else { "not set" };
    let session = match store.load_session()? {
        Some(record) if record.authenticated => {
            format!("unlocked at {} (unix)", record.changed_at_secs)
        },
        Some(record) => format!("locked at {} (unix)", record.changed_at_secs),
        None => "no session recorded".to_string(),
    };

    Ok(format!(
        "PIN: {pin}\nidle timeout: {}s\ncountdown: {} ticks (haptic at {})\nlast session: {session}",
        settings.idle_timeout_secs, settings.countdown_ticks, settings.haptic_at
    ))
}
