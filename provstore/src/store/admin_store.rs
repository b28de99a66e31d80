//! Provisioner store backed by a certificate authority's administration API.

use log::info;

use crate::admin::AdminClient;
use crate::provisioner::{Provisioner, ProvisionerSelector};
use crate::store::ProvisionerStore;
use crate::util::error::*;

/// `AdminStore` forwards each operation to an [`AdminClient`]. Nothing is cached locally; each call
/// results in one request (or, for `list`, one request per page).
pub struct AdminStore {
    client: Box<dyn AdminClient>,
}

impl AdminStore {
    /// `new` returns a store that delegates to `client`.
    pub fn new(client: Box<dyn AdminClient>) -> Self {
        AdminStore { client }
    }
}

// Errors already attributed to an operation by the client pass through untouched, anything else is
// wrapped with the operation that was attempted.
fn annotate(op: AdminOperation, err: Error) -> Error {
    match err {
        Error::Admin { .. } => err,
        other => Error::Admin {
            op,
            reason: other.to_string(),
        },
    }
}

impl ProvisionerStore for AdminStore {
    fn create(&mut self, prov: Provisioner) -> Result<Provisioner> {
        let created = self
            .client
            .create_provisioner(&prov)
            .map_err(|e| annotate(AdminOperation::Create, e))?;
        info!("Created provisioner {} via administration API", created.name);
        Ok(created)
    }

    fn get(&self, selector: &ProvisionerSelector) -> Result<Provisioner> {
        self.client
            .get_provisioner(selector)
            .map_err(|e| annotate(AdminOperation::Get, e))
    }

    fn update(&mut self, name: &str, prov: Provisioner) -> Result<()> {
        self.client
            .update_provisioner(name, &prov)
            .map_err(|e| annotate(AdminOperation::Update, e))?;
        info!("Updated provisioner {} via administration API", name);
        Ok(())
    }

    fn remove(&mut self, selector: &ProvisionerSelector) -> Result<()> {
        self.client
            .remove_provisioner(selector)
            .map_err(|e| annotate(AdminOperation::Remove, e))?;
        info!("Removed provisioner {} via administration API", selector);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Provisioner>> {
        self.client
            .list_provisioners()
            .map_err(|e| annotate(AdminOperation::List, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::ProvisionerType;
    use std::cell::RefCell;
    use std::rc::Rc;

    // in-memory stand-in for a remote authority
    #[derive(Default)]
    struct MockClient {
        provs: Rc<RefCell<Vec<Provisioner>>>,
    }

    impl AdminClient for MockClient {
        fn create_provisioner(&self, prov: &Provisioner) -> Result<Provisioner> {
            let mut provs = self.provs.borrow_mut();
            if provs.iter().any(|p| p.conflicts_with(prov)) {
                return Err(Error::Admin {
                    op: AdminOperation::Create,
                    reason: format!("provisioner with name {} already exists", prov.name),
                });
            }
            let mut created = prov.clone();
            created.id = Some(format!("id-{}", prov.name));
            provs.push(created.clone());
            Ok(created)
        }

        fn get_provisioner(&self, selector: &ProvisionerSelector) -> Result<Provisioner> {
            self.provs
                .borrow()
                .iter()
                .find(|p| p.matches(selector))
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("provisioner {}", selector)))
        }

        fn update_provisioner(&self, name: &str, prov: &Provisioner) -> Result<()> {
            let mut provs = self.provs.borrow_mut();
            match provs.iter_mut().find(|p| p.name == name) {
                Some(p) => {
                    *p = prov.clone();
                    Ok(())
                }
                None => Err(Error::NotFound(format!("provisioner with name {}", name))),
            }
        }

        fn remove_provisioner(&self, selector: &ProvisionerSelector) -> Result<()> {
            let mut provs = self.provs.borrow_mut();
            let before = provs.len();
            provs.retain(|p| !p.matches(selector));
            if before == provs.len() {
                return Err(Error::NotFound(format!("provisioner {}", selector)));
            }
            Ok(())
        }

        fn list_provisioners(&self) -> Result<Vec<Provisioner>> {
            Ok(self.provs.borrow().clone())
        }
    }

    fn store() -> (AdminStore, Rc<RefCell<Vec<Provisioner>>>) {
        let client = MockClient::default();
        let provs = client.provs.clone();
        (AdminStore::new(Box::new(client)), provs)
    }

    #[test]
    fn delegates_to_client() {
        let (mut store, provs) = store();
        let created = store
            .create(Provisioner::new(ProvisionerType::Acme, "acme"))
            .unwrap();
        assert_eq!(Some("id-acme".to_string()), created.id);
        assert_eq!(1, provs.borrow().len());

        let fetched = store
            .get(&ProvisionerSelector::Id("id-acme".to_string()))
            .unwrap();
        assert_eq!(created, fetched);

        let mut changed = fetched.clone();
        changed.force_cn = true;
        store.update("acme", changed.clone()).unwrap();
        assert_eq!(vec![changed], store.list().unwrap());

        store
            .remove(&ProvisionerSelector::Name("acme".to_string()))
            .unwrap();
        assert!(provs.borrow().is_empty());
    }

    #[test]
    fn errors_name_the_operation() {
        let (mut store, _) = store();
        store
            .create(Provisioner::new(ProvisionerType::Acme, "acme"))
            .unwrap();

        let err = store
            .create(Provisioner::new(ProvisionerType::Acme, "acme"))
            .unwrap_err();
        assert_eq!(
            Error::Admin {
                op: AdminOperation::Create,
                reason: "provisioner with name acme already exists".to_string()
            },
            err
        );

        let err = store
            .remove(&ProvisionerSelector::Name("other".to_string()))
            .unwrap_err();
        assert_eq!(
            Error::Admin {
                op: AdminOperation::Remove,
                reason: "provisioner with name other not found".to_string()
            },
            err
        );
        assert!(err.to_string().contains("remove"));

        let err = store
            .get(&ProvisionerSelector::Id("nope".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Admin {
                op: AdminOperation::Get,
                ..
            }
        ));
    }

    #[test]
    fn encrypted_key_via_api() {
        let (mut store, _) = store();
        let mut jwk = Provisioner::new(ProvisionerType::Jwk, "jwk");
        jwk.key = Some(crate::provisioner::ProvisionerKey {
            kid: Some("kid1".to_string()),
            ..Default::default()
        });
        jwk.encrypted_key = Some("eyJhbGciOi".to_string());
        store.create(jwk).unwrap();
        assert_eq!(Ok("eyJhbGciOi".to_string()), store.get_encrypted_key("kid1"));
    }
}
