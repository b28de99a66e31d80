//! Provisioner store backed by the static provisioner list of an authority configuration file.
//!
//! Each successful create, update or remove writes the entire configuration back to its file. The
//! write replaces the file atomically, so an interrupted write never leaves a partially written
//! configuration behind. There is no inter-process locking; two concurrent invocations editing the
//! same file can lose one another's changes.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::Config;
use crate::provisioner::{Provisioner, ProvisionerSelector};
use crate::store::ProvisionerStore;
use crate::util::error::*;

/// `FileStore` manages the `authority.provisioners` list of a configuration file.
#[derive(Clone, Debug)]
pub struct FileStore {
    config: Config,
    path: PathBuf,
}

impl FileStore {
    /// `new` returns a store bound to `config`, which was read from `path`.
    pub fn new(config: Config, path: &Path) -> Self {
        FileStore {
            config,
            path: path.to_path_buf(),
        }
    }

    /// `config` returns the configuration as currently held by the store.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `path` returns the location of the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `commit` saves `config` and adopts it only if saving succeeds.
    fn commit(&mut self, config: Config) -> Result<()> {
        config.save(&self.path)?;
        self.config = config;
        Ok(())
    }

    fn position(&self, selector: &ProvisionerSelector) -> Result<usize> {
        self.config
            .authority
            .provisioners
            .iter()
            .position(|p| p.matches(selector))
            .ok_or_else(|| Error::NotFound(format!("provisioner {}", selector)))
    }
}

impl ProvisionerStore for FileStore {
    fn create(&mut self, prov: Provisioner) -> Result<Provisioner> {
        if let Some(existing) = self
            .config
            .authority
            .provisioners
            .iter()
            .find(|p| p.conflicts_with(&prov))
        {
            return Err(Error::AlreadyExists(format!(
                "provisioner with name {}",
                existing.name
            )));
        }

        let mut config = self.config.clone();
        config.authority.provisioners.push(prov.clone());
        self.commit(config)?;
        info!("Added provisioner {} to {}", prov.name, self.path.display());
        Ok(prov)
    }

    fn get(&self, selector: &ProvisionerSelector) -> Result<Provisioner> {
        let i = self.position(selector)?;
        Ok(self.config.authority.provisioners[i].clone())
    }

    fn update(&mut self, name: &str, prov: Provisioner) -> Result<()> {
        let i = self.position(&ProvisionerSelector::Name(name.to_string()))?;
        let collision = self
            .config
            .authority
            .provisioners
            .iter()
            .enumerate()
            .any(|(j, p)| j != i && p.conflicts_with(&prov));
        if collision {
            return Err(Error::AlreadyExists(format!(
                "provisioner with name {}",
                prov.name
            )));
        }

        let mut config = self.config.clone();
        config.authority.provisioners[i] = prov;
        self.commit(config)?;
        info!("Updated provisioner {} in {}", name, self.path.display());
        Ok(())
    }

    fn remove(&mut self, selector: &ProvisionerSelector) -> Result<()> {
        let i = self.position(selector)?;
        let mut config = self.config.clone();
        let removed = config.authority.provisioners.remove(i);
        self.commit(config)?;
        info!(
            "Removed provisioner {} from {}",
            removed.name,
            self.path.display()
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<Provisioner>> {
        Ok(self.config.authority.provisioners.clone())
    }
}

#[cfg(test)]
fn jwk(name: &str, kid: &str) -> Provisioner {
    let mut p = Provisioner::new(crate::provisioner::ProvisionerType::Jwk, name);
    p.key = Some(crate::provisioner::ProvisionerKey {
        kid: Some(kid.to_string()),
        ..Default::default()
    });
    p.encrypted_key = Some(format!("{}-jwe", kid));
    p
}

#[cfg(test)]
fn store_in(dir: &Path) -> FileStore {
    let path = dir.join("ca.json");
    let config = Config::default();
    config.save(&path).unwrap();
    FileStore::new(config, &path)
}

#[test]
fn create_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    let created = store.create(jwk("one", "kid1")).unwrap();
    assert_eq!("one", created.name);

    let by_name = store
        .get(&ProvisionerSelector::Name("one".to_string()))
        .unwrap();
    let by_kid = store
        .get(&ProvisionerSelector::Id("kid1".to_string()))
        .unwrap();
    assert_eq!(created, by_name);
    assert_eq!(created, by_kid);

    // persisted
    let reloaded = crate::config::load_configuration(store.path()).unwrap();
    assert_eq!(vec![created], reloaded.authority.provisioners);
}

#[test]
fn create_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.create(jwk("one", "kid1")).unwrap();
    assert!(matches!(
        store.create(jwk("one", "kid2")),
        Err(Error::AlreadyExists(_))
    ));
    assert!(matches!(
        store.create(jwk("two", "kid1")),
        Err(Error::AlreadyExists(_))
    ));
    assert_eq!(1, store.list().unwrap().len());
}

#[test]
fn update_and_rename() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.create(jwk("one", "kid1")).unwrap();
    store.create(jwk("two", "kid2")).unwrap();

    let mut p = store
        .get(&ProvisionerSelector::Name("one".to_string()))
        .unwrap();
    p.accounts = vec!["123".to_string()];
    store.update("one", p.clone()).unwrap();
    assert_eq!(
        p,
        store
            .get(&ProvisionerSelector::Name("one".to_string()))
            .unwrap()
    );

    // renaming onto another record's name is refused
    p.name = "two".to_string();
    assert!(matches!(
        store.update("one", p.clone()),
        Err(Error::AlreadyExists(_))
    ));

    p.name = "uno".to_string();
    store.update("one", p).unwrap();
    assert!(store
        .get(&ProvisionerSelector::Name("uno".to_string()))
        .is_ok());
    assert!(matches!(
        store.update("one", jwk("one", "kid1")),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn remove_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.create(jwk("one", "kid1")).unwrap();
    store.create(jwk("two", "kid2")).unwrap();
    store.create(jwk("three", "kid3")).unwrap();

    store
        .remove(&ProvisionerSelector::Id("kid2".to_string()))
        .unwrap();
    let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(vec!["one".to_string(), "three".to_string()], names);

    assert_eq!(
        Err(Error::NotFound("provisioner with name two".to_string())),
        store.remove(&ProvisionerSelector::Name("two".to_string()))
    );
}

#[test]
fn encrypted_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.create(jwk("one", "kid1")).unwrap();
    let mut acme = Provisioner::new(crate::provisioner::ProvisionerType::Acme, "acme");
    acme.id = Some("acme-id".to_string());
    store.create(acme).unwrap();

    assert_eq!(Ok("kid1-jwe".to_string()), store.get_encrypted_key("kid1"));
    assert!(matches!(
        store.get_encrypted_key("acme-id"),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        store.get_encrypted_key("missing"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn failed_save_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("ca.json");
    let mut store = FileStore::new(Config::default(), &path);
    assert!(matches!(
        store.create(jwk("one", "kid1")),
        Err(Error::FileWrite { .. })
    ));
    assert!(store.list().unwrap().is_empty());
}
