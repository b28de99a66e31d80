//! Authority configuration file support.
//!
//! Only the attributes consulted when managing provisioners are modeled: `authority.enableAdmin`
//! and `authority.provisioners`. All other content is carried in flattened maps so that saving a
//! loaded configuration does not discard anything.
//!
//! A minimal configuration is shown below.
//!
//! ```json
//! {
//!   "root": "/home/user/.step/certs/root_ca.crt",
//!   "address": ":443",
//!   "authority": {
//!     "enableAdmin": false,
//!     "provisioners": [
//!       {"type": "JWK", "name": "admin@example.com", "key": {"kid": "abc123"}}
//!     ]
//!   }
//! }
//! ```

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provisioner::{is_false, Provisioner};
use crate::util::error::*;
use crate::util::file_utils::{get_file_as_byte_vec, write_file_atomically};

/// The `authority` section of the configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Indicates provisioners are managed through the administration API
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_admin: bool,
    /// Static provisioners, used only when the administration API is disabled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provisioners: Vec<Provisioner>,
    /// Remaining authority attributes
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Authority configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// The `authority` section
    #[serde(default)]
    pub authority: AuthConfig,
    /// Remaining top-level attributes
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// `load_configuration` reads and parses the configuration file at `path`.
///
/// Errors:
/// - [Error::FileRead] if the file cannot be read
/// - [Error::ConfigLoad] if the file is not a well-formed configuration
pub fn load_configuration(path: &Path) -> Result<Config> {
    let json = get_file_as_byte_vec(path)?;
    let config: Config = serde_json::from_slice(&json).map_err(|e| Error::ConfigLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    debug!(
        "Loaded {} with enableAdmin={} and {} provisioners",
        path.display(),
        config.authority.enable_admin,
        config.authority.provisioners.len()
    );
    Ok(config)
}

impl Config {
    /// `save` writes the configuration to `path` as indented JSON. The existing file, if any, is
    /// replaced atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(self).map_err(|e| {
            Error::InvalidArgument(format!("error serializing configuration: {}", e))
        })?;
        json.push(b'\n');
        write_file_atomically(path, &json)
    }
}

#[test]
fn load_save_preserves_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ca.json");
    let json = r#"{
        "root": "/certs/root_ca.crt",
        "db": {"type": "badgerv2", "dataSource": "/db"},
        "authority": {
            "claims": {"maxTLSCertDuration": "48h"},
            "provisioners": [{"type": "ACME", "name": "acme", "forceCN": true}]
        }
    }"#;
    std::fs::write(&path, json).unwrap();

    let config = load_configuration(&path).unwrap();
    assert!(!config.authority.enable_admin);
    assert_eq!(1, config.authority.provisioners.len());
    assert!(config.authority.provisioners[0].force_cn);
    assert!(config.authority.other.contains_key("claims"));
    assert!(config.other.contains_key("db"));

    config.save(&path).unwrap();
    let reloaded = load_configuration(&path).unwrap();
    assert_eq!(config, reloaded);
    let v: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(v["authority"].get("enableAdmin").is_none());
    assert_eq!("badgerv2", v["db"]["type"]);
}

#[test]
fn load_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ca.json");
    std::fs::write(&path, "{\"authority\": ").unwrap();
    let r = load_configuration(&path);
    assert!(matches!(r, Err(Error::ConfigLoad { .. })));

    let r = load_configuration(&dir.path().join("missing.json"));
    assert!(matches!(r, Err(Error::FileRead { .. })));
}
