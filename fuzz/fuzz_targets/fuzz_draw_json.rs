//! Fuzz target for persisted draw files.
//!
//! Anything that deserialises must be safe to evaluate: record validation
//! is the only gate between a file and the density code.

#![no_main]

use dpgmm_core::io::parse_draws;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(draws) = parse_draws(text) {
        for draw in &draws {
            let centre = draw.bounds().centre();
            let _ = draw.logpdf(&centre);
            let _ = draw.cdf(centre[0]);
            let _ = draw.marginalise(&[0]);
        }
    }
});
