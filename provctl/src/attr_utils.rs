//! Applies attribute flags to provisioner records.

use std::path::Path;

use serde_json::Value;

use provstore::{
    concat_trust_roots, get_file_as_byte_vec, load_trust_roots, merge_elements,
    parse_instance_age, validate_duration, Claims, Error, Provisioner, ProvisionerKey,
    ProvisionerOptions, Result, TemplateOptions,
};

use crate::args::AttributeArgs;

fn read_json(flag: &str, path: &Path) -> Result<Value> {
    let bytes = get_file_as_byte_vec(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        Error::InvalidArgument(format!(
            "error parsing {} given by '{}': {}",
            path.display(),
            flag,
            e
        ))
    })
}

fn set_duration(target: &mut Option<String>, flag: &str, value: &Option<String>) -> Result<()> {
    if let Some(v) = value {
        // an empty value clears the claim
        *target = if v.is_empty() {
            None
        } else {
            Some(validate_duration(flag, v)?)
        };
    }
    Ok(())
}

fn apply_claims(claims: &mut Claims, attrs: &AttributeArgs) -> Result<()> {
    set_duration(&mut claims.min_tls_dur, "x509-min-dur", &attrs.x509_min_dur)?;
    set_duration(&mut claims.max_tls_dur, "x509-max-dur", &attrs.x509_max_dur)?;
    set_duration(
        &mut claims.default_tls_dur,
        "x509-default-dur",
        &attrs.x509_default_dur,
    )?;
    set_duration(
        &mut claims.min_user_ssh_dur,
        "ssh-user-min-dur",
        &attrs.ssh_user_min_dur,
    )?;
    set_duration(
        &mut claims.max_user_ssh_dur,
        "ssh-user-max-dur",
        &attrs.ssh_user_max_dur,
    )?;
    set_duration(
        &mut claims.default_user_ssh_dur,
        "ssh-user-default-dur",
        &attrs.ssh_user_default_dur,
    )?;
    set_duration(
        &mut claims.min_host_ssh_dur,
        "ssh-host-min-dur",
        &attrs.ssh_host_min_dur,
    )?;
    set_duration(
        &mut claims.max_host_ssh_dur,
        "ssh-host-max-dur",
        &attrs.ssh_host_max_dur,
    )?;
    set_duration(
        &mut claims.default_host_ssh_dur,
        "ssh-host-default-dur",
        &attrs.ssh_host_default_dur,
    )?;

    if attrs.disable_renewal.is_some() {
        claims.disable_renewal = attrs.disable_renewal;
    }
    if attrs.allow_renewal_after_expiry.is_some() {
        claims.allow_renewal_after_expiry = attrs.allow_renewal_after_expiry;
    }
    if attrs.ssh.is_some() {
        claims.enable_ssh_ca = attrs.ssh;
    }
    Ok(())
}

fn apply_template(
    target: &mut Option<TemplateOptions>,
    file_flag: &str,
    file: &Option<String>,
    data_flag: &str,
    data: &Option<std::path::PathBuf>,
) -> Result<()> {
    if file.is_none() && data.is_none() {
        return Ok(());
    }
    let opts = target.get_or_insert_with(TemplateOptions::default);
    if let Some(f) = file {
        if f.is_empty() {
            opts.template_file = None;
        } else if !Path::new(f).is_file() {
            return Err(Error::InvalidArgument(format!(
                "file {} given by '{}' does not exist",
                f, file_flag
            )));
        } else {
            opts.template_file = Some(f.clone());
        }
    }
    if let Some(d) = data {
        opts.template_data = Some(read_json(data_flag, d)?);
    }
    if *opts == TemplateOptions::default() {
        *target = None;
    }
    Ok(())
}

/// `apply_attributes` updates `prov` with the values given by attribute flags. Flags that were not
/// given leave the corresponding attribute untouched.
pub fn apply_attributes(prov: &mut Provisioner, attrs: &AttributeArgs) -> Result<()> {
    if let Some(pk) = &attrs.public_key {
        let jwk = read_json("public-key", pk)?;
        let key: ProvisionerKey = serde_json::from_value(jwk).map_err(|e| {
            Error::InvalidArgument(format!("error parsing public key {}: {}", pk.display(), e))
        })?;
        prov.key = Some(key);
    }
    if let Some(ek) = &attrs.encrypted_key {
        let bytes = get_file_as_byte_vec(ek)?;
        let key = String::from_utf8(bytes).map_err(|_| {
            Error::InvalidArgument(format!("encrypted key {} is not text", ek.display()))
        })?;
        prov.encrypted_key = Some(key.trim().to_string());
    }

    let mut claims = prov.claims.clone().unwrap_or_default();
    apply_claims(&mut claims, attrs)?;
    prov.claims = if claims == Claims::default() {
        None
    } else {
        Some(claims)
    };

    if let Some(force_cn) = attrs.force_cn {
        prov.force_cn = force_cn;
    }
    if attrs.require_eab {
        prov.require_eab = true;
    }
    if attrs.disable_eab {
        prov.require_eab = false;
    }

    prov.accounts = merge_elements(
        std::mem::take(&mut prov.accounts),
        &attrs.aws_accounts,
        &attrs.remove_aws_accounts,
    );
    prov.resource_groups = merge_elements(
        std::mem::take(&mut prov.resource_groups),
        &attrs.azure_resource_groups,
        &attrs.remove_azure_resource_groups,
    );
    prov.subscription_ids = merge_elements(
        std::mem::take(&mut prov.subscription_ids),
        &attrs.azure_subscription_ids,
        &attrs.remove_azure_subscription_ids,
    );
    prov.object_ids = merge_elements(
        std::mem::take(&mut prov.object_ids),
        &attrs.azure_object_ids,
        &attrs.remove_azure_object_ids,
    );
    prov.service_accounts = merge_elements(
        std::mem::take(&mut prov.service_accounts),
        &attrs.gcp_service_accounts,
        &attrs.remove_gcp_service_accounts,
    );
    prov.project_ids = merge_elements(
        std::mem::take(&mut prov.project_ids),
        &attrs.gcp_projects,
        &attrs.remove_gcp_projects,
    );

    if let Some(tenant) = &attrs.azure_tenant {
        prov.tenant_id = Some(tenant.clone());
    }
    if let Some(age) = &attrs.instance_age {
        prov.instance_age = Some(parse_instance_age(age)?);
    }
    if let Some(roots) = &attrs.iid_roots {
        prov.iid_roots = Some(roots.clone());
    }
    if let Some(b) = attrs.disable_custom_sans {
        prov.disable_custom_sans = b;
    }
    if let Some(b) = attrs.disable_trust_on_first_use {
        prov.disable_trust_on_first_use = b;
    }

    if let Some(nebula_root) = &attrs.nebula_root {
        let roots = load_trust_roots(nebula_root)?;
        prov.set_nebula_roots(&concat_trust_roots(&roots));
    }

    let mut options = prov.options.clone().unwrap_or_default();
    apply_template(
        &mut options.x509,
        "x509-template",
        &attrs.x509_template,
        "x509-template-data",
        &attrs.x509_template_data,
    )?;
    apply_template(
        &mut options.ssh,
        "ssh-template",
        &attrs.ssh_template,
        "ssh-template-data",
        &attrs.ssh_template_data,
    )?;
    prov.options = if options == ProvisionerOptions::default() {
        None
    } else {
        Some(options)
    };
    Ok(())
}

#[cfg(test)]
fn attrs() -> AttributeArgs {
    AttributeArgs::default()
}

#[test]
fn no_flags_no_change() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Aws, "aws");
    prov.accounts = vec!["1".to_string(), "2".to_string()];
    let before = prov.clone();
    apply_attributes(&mut prov, &attrs()).unwrap();
    assert_eq!(before, prov);
}

#[test]
fn cloud_lists() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Aws, "aws");
    prov.accounts = vec!["1".to_string(), "2".to_string(), "3".to_string()];
    let mut a = attrs();
    a.aws_accounts = vec!["4".to_string()];
    a.remove_aws_accounts = vec!["1".to_string()];
    apply_attributes(&mut prov, &a).unwrap();
    // removal swaps in the last element
    assert_eq!(
        vec!["4".to_string(), "2".to_string(), "3".to_string()],
        prov.accounts
    );
}

#[test]
fn durations_and_toggles() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.x509_max_dur = Some("48h".to_string());
    a.ssh = Some(true);
    a.force_cn = Some(true);
    apply_attributes(&mut prov, &a).unwrap();
    let claims = prov.claims.clone().unwrap();
    assert_eq!(Some("48h".to_string()), claims.max_tls_dur);
    assert_eq!(Some(true), claims.enable_ssh_ca);
    assert!(prov.force_cn);

    let mut a = attrs();
    a.x509_max_dur = Some(String::new());
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(None, prov.claims.unwrap().max_tls_dur);

    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.ssh_host_min_dur = Some("5 minutes".to_string());
    assert_eq!(
        Err(Error::InvalidDuration {
            flag: "ssh-host-min-dur".to_string(),
            value: "5 minutes".to_string()
        }),
        apply_attributes(&mut prov, &a)
    );
}

#[test]
fn clearing_only_claim() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.x509_max_dur = Some("48h".to_string());
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(
        Some("48h".to_string()),
        prov.claims.as_ref().and_then(|c| c.max_tls_dur.clone())
    );

    a.x509_max_dur = Some(String::new());
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(None, prov.claims);
}

#[test]
fn instance_age() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Gcp, "gcp");
    let mut a = attrs();
    a.instance_age = Some("1h30m".to_string());
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(Some("1h30m".to_string()), prov.instance_age);

    a.instance_age = Some("-1h".to_string());
    assert!(matches!(
        apply_attributes(&mut prov, &a),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn eab() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Acme, "acme");
    let mut a = attrs();
    a.require_eab = true;
    apply_attributes(&mut prov, &a).unwrap();
    assert!(prov.require_eab);
    let mut a = attrs();
    a.disable_eab = true;
    apply_attributes(&mut prov, &a).unwrap();
    assert!(!prov.require_eab);
}

#[test]
fn nebula_roots() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Nebula, "nebula");
    let mut a = attrs();
    a.nebula_root = Some("tests/examples/two_cas_one_leaf.pem".into());
    apply_attributes(&mut prov, &a).unwrap();
    let bundle = prov.nebula_roots().unwrap().unwrap();
    assert_eq!(2, provstore::parse_certificates(&bundle).unwrap().len());

    let mut a = attrs();
    a.nebula_root = Some("tests/examples/leaves_only.pem".into());
    assert!(matches!(
        apply_attributes(&mut prov, &a),
        Err(Error::NoCaFound { .. })
    ));
}

#[test]
fn templates() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.json");
    std::fs::write(&data, r#"{"role": "web"}"#).unwrap();

    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.x509_template = Some("tests/examples/root_ca_one.pem".to_string());
    a.x509_template_data = Some(data);
    apply_attributes(&mut prov, &a).unwrap();
    let x509 = prov.options.unwrap().x509.unwrap();
    assert_eq!(
        Some("tests/examples/root_ca_one.pem".to_string()),
        x509.template_file
    );
    assert_eq!(Some(serde_json::json!({"role": "web"})), x509.template_data);

    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.ssh_template = Some("tests/examples/missing.tpl".to_string());
    assert!(matches!(
        apply_attributes(&mut prov, &a),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn keys_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let pk = dir.path().join("pub.json");
    std::fs::write(&pk, r#"{"kty": "EC", "crv": "P-256", "kid": "kid1", "x": "X", "y": "Y"}"#)
        .unwrap();
    let ek = dir.path().join("key.jwe");
    std::fs::write(&ek, "eyJhbGciOi\n").unwrap();

    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.public_key = Some(pk);
    a.encrypted_key = Some(ek);
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(Some("kid1"), prov.kid());
    assert_eq!(Some("eyJhbGciOi".to_string()), prov.encrypted_key);
}

#[test]
fn clearing_only_template() {
    let mut prov = Provisioner::new(provstore::ProvisionerType::Jwk, "jwk");
    let mut a = attrs();
    a.x509_template = Some(String::new());
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(None, prov.options);

    a.x509_template = Some("tests/examples/root_ca_one.pem".to_string());
    apply_attributes(&mut prov, &a).unwrap();
    assert!(prov.options.is_some());

    a.x509_template = Some(String::new());
    apply_attributes(&mut prov, &a).unwrap();
    assert_eq!(None, prov.options);
    let json = serde_json::to_value(&prov).unwrap();
    assert!(json.get("options").is_none());
}
