//! Fuzz target for sample file parsing.

#![no_main]

use dpgmm_core::io::parse_samples;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = parse_samples(data);
});
