#![no_main]

use libfuzzer_sys::fuzz_target;
use shade_core::NearToken;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(amount) = NearToken::parse_near(s) {
        // Display output is itself a valid amount for the same value
        let reparsed = NearToken::parse_near(&amount.to_string()).unwrap();
        assert_eq!(reparsed, amount);
    }
});
