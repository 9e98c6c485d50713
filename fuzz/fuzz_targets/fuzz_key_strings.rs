#![no_main]

use libfuzzer_sys::fuzz_target;
use shade_core::{KeyMaterial, Provenance, PublicKey};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(key) = KeyMaterial::from_secret_str(s, Provenance::Random) {
        // Re-encoding must parse back to the same key
        let reparsed = KeyMaterial::from_secret_str(&key.secret_key_string(), Provenance::Random)
            .expect("re-encoded secret key must parse");
        assert_eq!(reparsed, key);

        let signature = key.signer().sign(data).expect("parsed key must sign");
        key.public_key()
            .verify(data, &signature)
            .expect("own signature must verify");
    }

    if let Ok(public_key) = s.parse::<PublicKey>() {
        let reparsed: PublicKey = public_key.to_string().parse().unwrap();
        assert_eq!(reparsed, public_key);
    }
});
