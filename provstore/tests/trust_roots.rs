use std::path::Path;

use der::{DecodePem, Encode};
use provstore::*;
use x509_cert::Certificate;

#[test]
fn two_cas_one_leaf() {
    let roots = load_trust_roots(Path::new("tests/examples/two_cas_one_leaf.pem")).unwrap();
    assert_eq!(2, roots.len());
    for root in &roots {
        let cert = Certificate::from_pem(root).unwrap();
        assert!(is_ca(&cert));
    }
    assert_ne!(roots[0], roots[1]);

    // each re-encoded root yields exactly one certificate when split again
    let bundle = concat_trust_roots(&roots);
    assert_eq!(2, parse_certificates(&bundle).unwrap().len());
}

#[test]
fn leaves_only() {
    let path = Path::new("tests/examples/leaves_only.pem");
    let r = load_trust_roots(path);
    assert_eq!(
        Err(Error::NoCaFound {
            path: path.display().to_string()
        }),
        r
    );
    assert!(r.unwrap_err().to_string().contains("leaves_only.pem"));
}

#[test]
fn truncated_final_block() {
    let r = load_trust_roots(Path::new("tests/examples/truncated.pem"));
    match r {
        Err(Error::CertificateParse { path, .. }) => assert!(path.ends_with("truncated.pem")),
        _ => panic!("expected CertificateParse error"),
    }
}

#[test]
fn missing_chain_file() {
    let r = load_trust_roots(Path::new("tests/examples/missing.pem"));
    assert!(matches!(r, Err(Error::FileRead { .. })));
}

#[test]
fn pem_round_trip() {
    let original = std::fs::read("tests/examples/root_ca_one.pem").unwrap();
    let original = Certificate::from_pem(&original).unwrap();

    let roots = load_trust_roots(Path::new("tests/examples/root_ca_one.pem")).unwrap();
    assert_eq!(1, roots.len());
    let reloaded = Certificate::from_pem(&roots[0]).unwrap();
    assert_eq!(original, reloaded);
    assert_eq!(original.to_der().unwrap(), reloaded.to_der().unwrap());
}

#[test]
fn explanatory_text_is_skipped() {
    let roots = load_trust_roots(Path::new("tests/examples/ca_with_text.pem")).unwrap();
    assert_eq!(1, roots.len());
}
