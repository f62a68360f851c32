#![no_main]

use libfuzzer_sys::fuzz_target;

// Any text either parses or fails with a located syntax error, never panics
fuzz_target!(|source: &str| {
    if let Err(error) = lamb::parse(source) {
        assert!(error.pos().is_some(), "parse error without a position: {:?}", error);
    }
});
