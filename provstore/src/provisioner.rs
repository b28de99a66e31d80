//! Provisioner records as stored in the authority configuration and exchanged with the
//! administration API.
//!
//! Only the attributes edited by this crate are modeled as fields. Everything else present in a
//! record is retained in [`Provisioner::other`] so that records round-trip without loss.

use core::fmt;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::error::*;

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

/// Provisioner types understood by the certificate authority. Type names are matched without regard
/// for case when read.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProvisionerType {
    /// JSON Web Key provisioner
    #[default]
    Jwk,
    /// OpenID Connect provisioner
    Oidc,
    /// Google Cloud instance identity provisioner
    Gcp,
    /// Amazon Web Services instance identity provisioner
    Aws,
    /// Microsoft Azure instance identity provisioner
    Azure,
    /// ACME provisioner
    Acme,
    /// X.509 certificate provisioner
    X5c,
    /// Kubernetes service account provisioner
    K8sSa,
    /// SSH certificate provisioner
    SshPop,
    /// SCEP provisioner
    Scep,
    /// Nebula certificate provisioner
    Nebula,
}

impl ProvisionerType {
    /// `parse` accepts a provisioner type name without regard for case.
    pub fn parse(s: &str) -> Result<Self> {
        let t = match s.to_ascii_uppercase().as_str() {
            "JWK" => ProvisionerType::Jwk,
            "OIDC" => ProvisionerType::Oidc,
            "GCP" => ProvisionerType::Gcp,
            "AWS" => ProvisionerType::Aws,
            "AZURE" => ProvisionerType::Azure,
            "ACME" => ProvisionerType::Acme,
            "X5C" => ProvisionerType::X5c,
            "K8SSA" => ProvisionerType::K8sSa,
            "SSHPOP" => ProvisionerType::SshPop,
            "SCEP" => ProvisionerType::Scep,
            "NEBULA" => ProvisionerType::Nebula,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported provisioner type '{}'",
                    s
                )))
            }
        };
        Ok(t)
    }
}

impl TryFrom<String> for ProvisionerType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        ProvisionerType::parse(&s)
    }
}

impl From<ProvisionerType> for String {
    fn from(t: ProvisionerType) -> String {
        t.to_string()
    }
}

impl fmt::Display for ProvisionerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisionerType::Jwk => "JWK",
            ProvisionerType::Oidc => "OIDC",
            ProvisionerType::Gcp => "GCP",
            ProvisionerType::Aws => "AWS",
            ProvisionerType::Azure => "AZURE",
            ProvisionerType::Acme => "ACME",
            ProvisionerType::X5c => "X5C",
            ProvisionerType::K8sSa => "K8SSA",
            ProvisionerType::SshPop => "SSHPOP",
            ProvisionerType::Scep => "SCEP",
            ProvisionerType::Nebula => "NEBULA",
        };
        write!(f, "{}", s)
    }
}

/// Public JSON Web Key used to verify provisioning tokens. Only the key identifier is interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerKey {
    /// Key identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Remaining JWK members
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// Certificate duration and renewal claims.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Minimum duration of an X.509 certificate
    #[serde(rename = "minTLSCertDuration", skip_serializing_if = "Option::is_none")]
    pub min_tls_dur: Option<String>,
    /// Maximum duration of an X.509 certificate
    #[serde(rename = "maxTLSCertDuration", skip_serializing_if = "Option::is_none")]
    pub max_tls_dur: Option<String>,
    /// Default duration of an X.509 certificate
    #[serde(rename = "defaultTLSCertDuration", skip_serializing_if = "Option::is_none")]
    pub default_tls_dur: Option<String>,
    /// Minimum duration of an SSH user certificate
    #[serde(rename = "minUserSSHCertDuration", skip_serializing_if = "Option::is_none")]
    pub min_user_ssh_dur: Option<String>,
    /// Maximum duration of an SSH user certificate
    #[serde(rename = "maxUserSSHCertDuration", skip_serializing_if = "Option::is_none")]
    pub max_user_ssh_dur: Option<String>,
    /// Default duration of an SSH user certificate
    #[serde(rename = "defaultUserSSHCertDuration", skip_serializing_if = "Option::is_none")]
    pub default_user_ssh_dur: Option<String>,
    /// Minimum duration of an SSH host certificate
    #[serde(rename = "minHostSSHCertDuration", skip_serializing_if = "Option::is_none")]
    pub min_host_ssh_dur: Option<String>,
    /// Maximum duration of an SSH host certificate
    #[serde(rename = "maxHostSSHCertDuration", skip_serializing_if = "Option::is_none")]
    pub max_host_ssh_dur: Option<String>,
    /// Default duration of an SSH host certificate
    #[serde(rename = "defaultHostSSHCertDuration", skip_serializing_if = "Option::is_none")]
    pub default_host_ssh_dur: Option<String>,
    /// Disables renewal of issued certificates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_renewal: Option<bool>,
    /// Allows renewal of expired certificates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_renewal_after_expiry: Option<bool>,
    /// Enables issuance of SSH certificates
    #[serde(rename = "enableSSHCA", skip_serializing_if = "Option::is_none")]
    pub enable_ssh_ca: Option<bool>,
    /// Remaining claims
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Reference to a certificate template and the data supplied to it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOptions {
    /// Path of the template file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<String>,
    /// JSON object made available to the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_data: Option<Value>,
    /// Remaining options
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Template options for X.509 and SSH certificates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerOptions {
    /// X.509 template options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x509: Option<TemplateOptions>,
    /// SSH template options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<TemplateOptions>,
    /// Remaining options
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A provisioner record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioner {
    /// Provisioner type
    #[serde(rename = "type")]
    pub kind: ProvisionerType,
    /// Provisioner name, unique within an authority
    pub name: String,
    /// Identifier assigned by the administration API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Public key used to verify provisioning tokens (JWK provisioners)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<ProvisionerKey>,
    /// JWE compact serialization of the private key (JWK provisioners)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    /// Duration and renewal claims
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    /// Template options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ProvisionerOptions>,

    /// AWS account identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<String>,
    /// Google service accounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<String>,
    /// Google project identifiers
    #[serde(rename = "projectIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub project_ids: Vec<String>,
    /// Azure tenant identifier
    #[serde(rename = "tenantID", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Azure resource group names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_groups: Vec<String>,
    /// Azure subscription identifiers
    #[serde(rename = "subscriptionIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub subscription_ids: Vec<String>,
    /// Azure AD object identifiers
    #[serde(rename = "objectIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub object_ids: Vec<String>,
    /// Maximum instance age for AWS and GCP provisioners
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_age: Option<String>,
    /// File containing certificates used to validate AWS instance identity documents
    #[serde(rename = "iidRoots", skip_serializing_if = "Option::is_none")]
    pub iid_roots: Option<String>,
    /// Cloud provisioners only add the internal DNS name and IP as SANs
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "is_false")]
    pub disable_custom_sans: bool,
    /// Cloud provisioners accept multiple requests from the same instance
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_trust_on_first_use: bool,
    /// ACME provisioners always set the common name
    #[serde(rename = "forceCN", default, skip_serializing_if = "is_false")]
    pub force_cn: bool,
    /// ACME provisioners require external account binding
    #[serde(rename = "requireEAB", default, skip_serializing_if = "is_false")]
    pub require_eab: bool,
    /// Base64 encoding of the PEM bundle of Nebula roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<String>,

    /// Remaining attributes
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Provisioner {
    /// `new` returns a record with the given type and name and no other attributes.
    pub fn new(kind: ProvisionerType, name: &str) -> Self {
        Provisioner {
            kind,
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// `kid` returns the key identifier of the provisioner's public key, if any.
    pub fn kid(&self) -> Option<&str> {
        self.key.as_ref().and_then(|k| k.kid.as_deref())
    }

    /// `matches` returns true if the record is selected by `selector`.
    pub fn matches(&self, selector: &ProvisionerSelector) -> bool {
        match selector {
            ProvisionerSelector::Name(name) => &self.name == name,
            ProvisionerSelector::Id(id) => {
                self.id.as_deref() == Some(id.as_str()) || self.kid() == Some(id.as_str())
            }
        }
    }

    /// `conflicts_with` returns true if the records share a name or a non-empty key identifier.
    pub fn conflicts_with(&self, other: &Provisioner) -> bool {
        if self.name == other.name {
            return true;
        }
        match (self.kid(), other.kid()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// `set_nebula_roots` stores a PEM bundle in the `roots` attribute.
    pub fn set_nebula_roots(&mut self, pem_bundle: &[u8]) {
        self.roots = Some(Base64::encode_string(pem_bundle));
    }

    /// `nebula_roots` returns the PEM bundle stored in the `roots` attribute.
    pub fn nebula_roots(&self) -> Result<Option<Vec<u8>>> {
        match &self.roots {
            Some(r) => Base64::decode_vec(r)
                .map(Some)
                .map_err(|e| Error::InvalidArgument(format!("invalid roots attribute: {}", e))),
            None => Ok(None),
        }
    }
}

/// Identifies a single provisioner by name or by identifier.
///
/// An identifier matches either the `id` assigned by the administration API or the key identifier
/// of the provisioner's public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProvisionerSelector {
    /// Select by provisioner name
    Name(String),
    /// Select by identifier or key identifier
    Id(String),
}

impl fmt::Display for ProvisionerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionerSelector::Name(name) => write!(f, "with name {}", name),
            ProvisionerSelector::Id(id) => write!(f, "with id {}", id),
        }
    }
}

#[test]
fn provisioner_round_trip_keeps_unknown_fields() {
    let json = r#"{
        "type": "JWK",
        "name": "admin@example.com",
        "key": {"use": "sig", "kty": "EC", "kid": "abc123", "crv": "P-256", "x": "X", "y": "Y"},
        "encryptedKey": "eyJhbGciOi",
        "claims": {"maxTLSCertDuration": "24h", "disableRenewal": true, "somethingNew": 1},
        "options": {"x509": {"templateFile": "leaf.tpl"}, "ssh": {"template": "{}"}},
        "unknownAttribute": [1, 2, 3]
    }"#;
    let p: Provisioner = serde_json::from_str(json).unwrap();
    assert_eq!(ProvisionerType::Jwk, p.kind);
    assert_eq!(Some("abc123"), p.kid());
    assert_eq!(Some("eyJhbGciOi".to_string()), p.encrypted_key);
    let claims = p.claims.clone().unwrap();
    assert_eq!(Some("24h".to_string()), claims.max_tls_dur);
    assert_eq!(Some(true), claims.disable_renewal);
    assert!(claims.other.contains_key("somethingNew"));
    assert!(p.other.contains_key("unknownAttribute"));

    let ser = serde_json::to_string(&p).unwrap();
    let p2: Provisioner = serde_json::from_str(&ser).unwrap();
    assert_eq!(p, p2);
}

#[test]
fn cloud_attributes() {
    let json = r#"{"type": "AWS", "name": "aws", "accounts": ["111", "222"],
        "disableCustomSANs": true, "instanceAge": "1h"}"#;
    let p: Provisioner = serde_json::from_str(json).unwrap();
    assert_eq!(ProvisionerType::Aws, p.kind);
    assert_eq!(vec!["111".to_string(), "222".to_string()], p.accounts);
    assert!(p.disable_custom_sans);
    assert!(!p.disable_trust_on_first_use);

    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(Some(&Value::Bool(true)), v.get("disableCustomSANs"));
    assert!(v.get("disableTrustOnFirstUse").is_none());
    assert!(v.get("serviceAccounts").is_none());
}

#[test]
fn selectors() {
    let mut p = Provisioner::new(ProvisionerType::Jwk, "jwk");
    assert!(p.matches(&ProvisionerSelector::Name("jwk".to_string())));
    assert!(!p.matches(&ProvisionerSelector::Id("kid".to_string())));
    p.key = Some(ProvisionerKey {
        kid: Some("kid".to_string()),
        ..Default::default()
    });
    assert!(p.matches(&ProvisionerSelector::Id("kid".to_string())));
    p.id = Some("uuid".to_string());
    assert!(p.matches(&ProvisionerSelector::Id("uuid".to_string())));

    let mut q = Provisioner::new(ProvisionerType::Oidc, "other");
    assert!(!p.conflicts_with(&q));
    q.key = p.key.clone();
    assert!(p.conflicts_with(&q));
}

#[test]
fn types() {
    assert_eq!(Ok(ProvisionerType::K8sSa), ProvisionerType::parse("k8ssa"));
    assert_eq!(Ok(ProvisionerType::Nebula), ProvisionerType::parse("Nebula"));
    assert!(ProvisionerType::parse("unknown").is_err());
    assert_eq!(
        "\"SSHPOP\"",
        serde_json::to_string(&ProvisionerType::SshPop).unwrap()
    );
    assert_eq!("X5C", ProvisionerType::X5c.to_string());
}

#[test]
fn nebula_roots() {
    let mut p = Provisioner::new(ProvisionerType::Nebula, "nebula");
    assert_eq!(Ok(None), p.nebula_roots());
    p.set_nebula_roots(b"-----BEGIN CERTIFICATE-----\n");
    assert_eq!(
        Ok(Some(b"-----BEGIN CERTIFICATE-----\n".to_vec())),
        p.nebula_roots()
    );
}
