#![no_main]

use libfuzzer_sys::fuzz_target;
use shade_core::{
    attestation_for_contract, transform_collateral, transform_quote, transform_tcb_info,
    AttestationEvidence, RawCollateral, RawTcbInfo,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = transform_quote(s);
    }

    if let Ok(raw) = serde_json::from_slice::<RawCollateral>(data) {
        if let Ok(collateral) = transform_collateral(&raw) {
            let evidence = AttestationEvidence {
                collateral,
                ..AttestationEvidence::default()
            };
            let wire = attestation_for_contract(&evidence);
            assert_eq!(wire.collateral.pck_crl, hex_lower(raw.pck_crl.as_deref()));
        }
    }

    if let Ok(raw) = serde_json::from_slice::<RawTcbInfo>(data) {
        if let Ok(tcb_info) = transform_tcb_info(&raw) {
            // Anything accepted once must validate again
            tcb_info.validate().unwrap();
        }
    }
});

fn hex_lower(field: Option<&str>) -> String {
    field.unwrap_or_default().to_ascii_lowercase()
}
