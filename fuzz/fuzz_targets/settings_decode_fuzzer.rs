//! Fuzz target for persisted settings decoding
//!
//! Stored bytes come from a file the app does not control. Decoding must
//! reject garbage with an error, never panic, and anything it accepts must
//! survive a second encode.
//!
//! # Invariants
//!
//! - `GateSettings::from_bytes` / `SessionRecord::from_bytes` never panic
//! - Accepted values re-encode to bytes that decode to the same value
//! - Decoded configs go through validation without panicking

#![no_main]

use gymgate_core::{GateSettings, SessionRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(settings) = GateSettings::from_bytes(data) {
        let bytes = settings.to_bytes().unwrap();
        assert_eq!(GateSettings::from_bytes(&bytes).unwrap(), settings);

        // Validation decides, never a panic
        let _ = settings.to_config().validate();
    }

    if let Ok(record) = SessionRecord::from_bytes(data) {
        let bytes = record.to_bytes().unwrap();
        assert_eq!(SessionRecord::from_bytes(&bytes).unwrap(), record);
    }
});
