use std::cell::Cell;
use std::path::Path;

use provstore::*;

struct OfflineConnector {
    calls: Cell<usize>,
}

impl AdminConnector for OfflineConnector {
    fn connect(&self) -> Result<Box<dyn AdminClient>> {
        self.calls.set(self.calls.get() + 1);
        Err(Error::InvalidArgument("offline".to_string()))
    }
}

fn offline() -> OfflineConnector {
    OfflineConnector {
        calls: Cell::new(0),
    }
}

fn nebula(name: &str) -> Provisioner {
    let mut prov = Provisioner::new(ProvisionerType::Nebula, name);
    let roots = load_trust_roots(Path::new("tests/examples/two_cas_one_leaf.pem")).unwrap();
    prov.set_nebula_roots(&concat_trust_roots(&roots));
    prov
}

#[test]
fn file_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ca.json");
    std::fs::write(
        &path,
        r#"{"address": ":9000", "authority": {"claims": {"enableSSHCA": true}}}"#,
    )
    .unwrap();
    let connector = offline();

    let mut store = select_store(&connector, &path).unwrap();
    let created = store.create(nebula("nebula")).unwrap();

    let store = select_store(&connector, &path).unwrap();
    let fetched = store
        .get(&ProvisionerSelector::Name("nebula".to_string()))
        .unwrap();
    assert_eq!(created, fetched);
    let bundle = fetched.nebula_roots().unwrap().unwrap();
    assert_eq!(2, parse_certificates(&bundle).unwrap().len());

    // unrelated content survives the rewrite
    let config = load_configuration(&path).unwrap();
    assert_eq!(Some(&serde_json::json!(":9000")), config.other.get("address"));
    assert!(config.authority.other.contains_key("claims"));
    assert_eq!(0, connector.calls.get());
}

#[test]
fn conflict_is_reported_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ca.json");
    let mut config = Config::default();
    config.authority.enable_admin = true;
    config.authority.provisioners.push(nebula("nebula"));
    config.save(&path).unwrap();

    let connector = offline();
    let err = select_store(&connector, &path).err().unwrap();
    assert!(matches!(err, Error::ConfigConflict { .. }));
    assert!(err.to_string().contains("enableAdmin"));
    assert_eq!(0, connector.calls.get());
}

#[test]
fn list_after_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ca.json");
    Config::default().save(&path).unwrap();
    let connector = offline();

    let mut store = select_store(&connector, &path).unwrap();
    for name in ["a", "b", "c"] {
        store
            .create(Provisioner::new(ProvisionerType::Acme, name))
            .unwrap();
    }
    store
        .remove(&ProvisionerSelector::Name("b".to_string()))
        .unwrap();
    let mut c = store
        .get(&ProvisionerSelector::Name("c".to_string()))
        .unwrap();
    c.accounts = merge_elements(c.accounts, &["1".to_string(), "2".to_string()], &[]);
    store.update("c", c).unwrap();

    let store = select_store(&connector, &path).unwrap();
    let provs = store.list().unwrap();
    let names: Vec<&str> = provs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(vec!["a", "c"], names);
    assert_eq!(vec!["1".to_string(), "2".to_string()], provs[1].accounts);
}
