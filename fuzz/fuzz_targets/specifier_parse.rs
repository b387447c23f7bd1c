#![no_main]
use libfuzzer_sys::fuzz_target;
use quiver::{DepSpec, Definition};

fuzz_target!(|data: &[u8]| {
    // Fuzz the dependency specifier grammar with arbitrary input
    // Parsing must never panic and parsed specs must be well formed

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(spec) = DepSpec::parse(text) {
        assert!(!spec.key.is_empty());
        assert!(spec.pull.iter().all(|segment| !segment.is_empty()));
    }

    // The builder drops unusable specifiers instead of panicking
    let _ = Definition::anonymous().dependency(text);
    let _ = Definition::named(text).dependency(text);
});
