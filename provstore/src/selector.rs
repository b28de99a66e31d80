//! Selection of the provisioner store used for an invocation.
//!
//! The choice depends on the authority configuration file:
//!
//! | configuration file                       | store          |
//! |------------------------------------------|----------------|
//! | absent                                   | [`AdminStore`] |
//! | `enableAdmin: true`, no static list      | [`AdminStore`] |
//! | `enableAdmin: true`, static provisioners | error          |
//! | `enableAdmin: false`                     | [`FileStore`]  |
//!
//! The conflicting case is reported as [Error::ConfigConflict] before any connection to the
//! administration API is attempted. It is left to the operator to either disable the
//! administration API or migrate the static provisioners.

use std::path::Path;

use log::{debug, error};

use crate::admin::AdminConnector;
use crate::config::load_configuration;
use crate::store::{AdminStore, FileStore, ProvisionerStore};
use crate::util::error::*;
use crate::util::file_utils::file_exists;

/// `select_store` returns the store to use given a connector for the administration API and the
/// location of the authority configuration file.
///
/// Errors:
/// - [Error::FileAccess] if `config_file` cannot be inspected
/// - [Error::FileRead] or [Error::ConfigLoad] if `config_file` cannot be loaded
/// - [Error::ConfigConflict] if the administration API is enabled alongside static provisioners
/// - any error returned by `connector` when the administration API is selected
pub fn select_store(
    connector: &dyn AdminConnector,
    config_file: &Path,
) -> Result<Box<dyn ProvisionerStore>> {
    if !file_exists(config_file)? {
        debug!(
            "{} not found, using administration API",
            config_file.display()
        );
        return Ok(Box::new(AdminStore::new(connector.connect()?)));
    }

    let config = load_configuration(config_file)?;
    if config.authority.enable_admin {
        if !config.authority.provisioners.is_empty() {
            let err = Error::ConfigConflict {
                path: config_file.display().to_string(),
            };
            error!("{}", err);
            return Err(err);
        }
        debug!(
            "Administration API enabled in {}",
            config_file.display()
        );
        return Ok(Box::new(AdminStore::new(connector.connect()?)));
    }

    debug!("Using static provisioners from {}", config_file.display());
    Ok(Box::new(FileStore::new(config, config_file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminClient;
    use crate::provisioner::{Provisioner, ProvisionerSelector, ProvisionerType};
    use std::cell::Cell;

    // Counts connection attempts. Connections always fail so a test can tell which backend was
    // chosen without a network.
    #[derive(Default)]
    struct CountingConnector {
        calls: Cell<usize>,
    }

    impl AdminConnector for CountingConnector {
        fn connect(&self) -> Result<Box<dyn AdminClient>> {
            self.calls.set(self.calls.get() + 1);
            Err(Error::InvalidArgument("offline".to_string()))
        }
    }

    fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
        let path = dir.join("ca.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn absent_file_uses_admin_api() {
        let dir = tempfile::tempdir().unwrap();
        let connector = CountingConnector::default();
        let r = select_store(&connector, &dir.path().join("ca.json"));
        assert!(matches!(r, Err(Error::InvalidArgument(_))));
        assert_eq!(1, connector.calls.get());
    }

    #[test]
    fn admin_enabled_uses_admin_api() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"authority": {"enableAdmin": true}}"#);
        let connector = CountingConnector::default();
        assert!(select_store(&connector, &path).is_err());
        assert_eq!(1, connector.calls.get());
    }

    #[test]
    fn admin_enabled_with_static_provisioners() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"authority": {"enableAdmin": true, "provisioners": [{"type": "ACME", "name": "acme"}]}}"#,
        );
        let connector = CountingConnector::default();
        let r = select_store(&connector, &path);
        assert_eq!(
            Some(Error::ConfigConflict {
                path: path.display().to_string()
            }),
            r.err()
        );
        assert_eq!(0, connector.calls.get());
    }

    #[test]
    fn admin_disabled_uses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"authority": {"provisioners": []}}"#);
        let connector = CountingConnector::default();

        let mut store = select_store(&connector, &path).unwrap();
        let mut prov = Provisioner::new(ProvisionerType::Acme, "acme");
        prov.require_eab = true;
        store.create(prov.clone()).unwrap();

        let store = select_store(&connector, &path).unwrap();
        assert_eq!(
            prov,
            store
                .get(&ProvisionerSelector::Name("acme".to_string()))
                .unwrap()
        );
        assert_eq!(0, connector.calls.get());
    }

    #[test]
    fn malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{\"authority\": [");
        let connector = CountingConnector::default();
        assert!(matches!(
            select_store(&connector, &path),
            Err(Error::ConfigLoad { .. })
        ));
        assert_eq!(0, connector.calls.get());
    }

    #[cfg(unix)]
    #[test]
    fn uninspectable_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(dir.path(), "{}");
        let connector = CountingConnector::default();
        let r = select_store(&connector, &file.join("ca.json"));
        match r {
            Err(Error::FileAccess { path, .. }) => assert!(path.ends_with("ca.json")),
            _ => panic!("expected FileAccess error"),
        }
        assert_eq!(0, connector.calls.get());
    }
}
