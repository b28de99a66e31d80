//! Dispatches provisioner commands to the selected store.

use serde::Serialize;

use provstore::{
    select_store, AdminConnector, Error, Provisioner, ProvisionerSelector, ProvisionerStore,
    Result,
};

use crate::args::{ProvctlArgs, ProvisionerCommand};
use crate::attr_utils::apply_attributes;

use cfg_if::cfg_if;
cfg_if! {
    if #[cfg(feature = "remote")] {
        use provstore::AdminContext;

        fn connector(args: &ProvctlArgs) -> Box<dyn AdminConnector> {
            Box::new(AdminContext::new(
                args.ca_url.as_deref().unwrap_or_default(),
                args.admin_token.as_deref().unwrap_or_default(),
                args.root.as_deref(),
            ))
        }
    } else {
        use provstore::AdminClient;

        struct NoAdminSupport;

        impl AdminConnector for NoAdminSupport {
            fn connect(&self) -> Result<Box<dyn AdminClient>> {
                Err(Error::InvalidArgument(
                    "administration API support is not available in this build".to_string(),
                ))
            }
        }

        fn connector(_args: &ProvctlArgs) -> Box<dyn AdminConnector> {
            Box::new(NoAdminSupport)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::InvalidArgument(format!("error serializing output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// `provisioner_command` selects a store based on the authority configuration then performs the
/// indicated command.
pub fn provisioner_command(args: &ProvctlArgs, cmd: &ProvisionerCommand) -> Result<()> {
    let connector = connector(args);
    let mut store = select_store(connector.as_ref(), &args.ca_config)?;
    run(store.as_mut(), cmd)
}

fn run(store: &mut dyn ProvisionerStore, cmd: &ProvisionerCommand) -> Result<()> {
    match cmd {
        ProvisionerCommand::List => print_json(&store.list()?),
        ProvisionerCommand::GetEncryptedKey { kid } => {
            println!("{}", store.get_encrypted_key(kid)?);
            Ok(())
        }
        ProvisionerCommand::Add { name, kind, attrs } => {
            let mut prov = Provisioner::new(*kind, name);
            apply_attributes(&mut prov, attrs)?;
            let created = store.create(prov)?;
            print_json(&created)
        }
        ProvisionerCommand::Update {
            name,
            new_name,
            attrs,
        } => {
            let mut prov = store.get(&ProvisionerSelector::Name(name.clone()))?;
            apply_attributes(&mut prov, attrs)?;
            if let Some(new_name) = new_name {
                prov.name = new_name.clone();
            }
            store.update(name, prov)
        }
        ProvisionerCommand::Remove { name, kid } => {
            let selector = match (kid, name) {
                (Some(kid), _) => ProvisionerSelector::Id(kid.clone()),
                (None, Some(name)) => ProvisionerSelector::Name(name.clone()),
                (None, None) => {
                    return Err(Error::InvalidArgument(
                        "a provisioner name or key identifier is required".to_string(),
                    ))
                }
            };
            store.remove(&selector)
        }
    }
}
