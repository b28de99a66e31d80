//! The [`ProvisionerStore`] trait and its two implementations.
//!
//! - [`AdminStore`] delegates to a remote administration API via an [`AdminClient`](crate::AdminClient).
//! - [`FileStore`] edits the static provisioner list of an authority configuration file.
//!
//! Callers normally obtain a store from [`select_store`](crate::select_store) rather than
//! constructing one directly.

pub mod admin_store;
pub mod file_store;

pub use crate::{store::admin_store::*, store::file_store::*};

use crate::provisioner::{Provisioner, ProvisionerSelector};
use crate::util::error::*;

/// The `ProvisionerStore` trait defines the operations used to manage provisioner records
/// independent of where those records are kept.
pub trait ProvisionerStore {
    /// `create` adds a provisioner. An [Error::AlreadyExists] is returned if a provisioner with the
    /// same name or key identifier is present.
    fn create(&mut self, prov: Provisioner) -> Result<Provisioner>;

    /// `get` returns the provisioner matching `selector` or [Error::NotFound].
    fn get(&self, selector: &ProvisionerSelector) -> Result<Provisioner>;

    /// `update` replaces the provisioner named `name` with `prov`, or returns [Error::NotFound].
    fn update(&mut self, name: &str, prov: Provisioner) -> Result<()>;

    /// `remove` deletes the one provisioner matching `selector`, or returns [Error::NotFound].
    fn remove(&mut self, selector: &ProvisionerSelector) -> Result<()>;

    /// `list` returns all provisioners.
    fn list(&self) -> Result<Vec<Provisioner>>;

    /// `get_encrypted_key` returns the encrypted private key of the provisioner whose key identifier
    /// is `kid`.
    fn get_encrypted_key(&self, kid: &str) -> Result<String> {
        let prov = self.get(&ProvisionerSelector::Id(kid.to_string()))?;
        match prov.encrypted_key {
            Some(k) => Ok(k),
            None => Err(Error::NotFound(format!(
                "encrypted key for provisioner with id {}",
                kid
            ))),
        }
    }
}
