//! Fuzz testing for path normalisation, field sanitisation and window
//! validation.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```
//!
//! # Properties
//!
//! - `normalize_path` always yields a path starting with `/` and without `//`
//! - `sanitize_field` never yields a control character
//! - `AllowedWindow::new` accepts exactly `start < end <= 24`

#![no_main]

use audit_gate::policy::AllowedWindow;
use audit_gate::validation::{normalize_path, sanitize_field, validate_bypass_path};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let path = normalize_path(s);
        assert!(path.starts_with('/'));
        assert!(!path.contains("//"));
        assert_eq!(normalize_path(&path), path);

        assert!(!sanitize_field(s).chars().any(char::is_control));

        let _ = validate_bypass_path(s);
    }

    if data.len() >= 2 {
        let (start, end) = (data[0], data[1]);
        let valid = start < end && end <= 24;
        assert_eq!(AllowedWindow::new(start, end).is_ok(), valid);
    }
});
