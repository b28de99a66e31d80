//! Arguments for the provctl utility

use std::env;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use provstore::ProvisionerType;

/// Returns the location of the authority configuration file used when `--ca-config` is absent,
/// i.e., `$STEPPATH/config/ca.json` with `STEPPATH` defaulting to `$HOME/.step`.
pub fn default_ca_config() -> PathBuf {
    let step_path = match env::var_os("STEPPATH") {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".step"),
            None => PathBuf::from(".step"),
        },
    };
    step_path.join("config").join("ca.json")
}

fn parse_provisioner_type(s: &str) -> Result<ProvisionerType, String> {
    ProvisionerType::parse(s).map_err(|e| e.to_string())
}

/// Certificate authority provisioner management utility
#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct ProvctlArgs {
    /// Full path and filename of the authority configuration file. When the file is absent or enables
    /// the administration API, provisioners are managed remotely.
    #[clap(long, default_value_os_t = default_ca_config(), help_heading = "COMMON OPTIONS")]
    pub ca_config: PathBuf,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,

    /// URI of the certificate authority
    #[clap(long, help_heading = "ADMINISTRATION API")]
    pub ca_url: Option<String>,

    /// Token used to authenticate to the administration API
    #[clap(long, help_heading = "ADMINISTRATION API")]
    pub admin_token: Option<String>,

    /// Full path and filename of a PEM file containing the root certificates of the certificate
    /// authority
    #[clap(long, help_heading = "ADMINISTRATION API")]
    pub root: Option<PathBuf>,

    /// Action to perform
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, update, remove and list provisioners
    #[command(subcommand)]
    Provisioner(ProvisionerCommand),
}

/// Provisioner commands
#[derive(Subcommand, Debug)]
pub enum ProvisionerCommand {
    /// Print all provisioners as a JSON array
    List,

    /// Print the encrypted private key of the provisioner with the given key identifier
    GetEncryptedKey {
        /// Key identifier of the provisioner
        kid: String,
    },

    /// Add a provisioner
    Add {
        /// Name of the new provisioner
        name: String,

        /// Type of the new provisioner, e.g., JWK, ACME, AWS, NEBULA
        #[clap(long = "type", value_parser = parse_provisioner_type)]
        kind: ProvisionerType,

        #[command(flatten)]
        attrs: AttributeArgs,
    },

    /// Update a provisioner
    Update {
        /// Name of the provisioner to update
        name: String,

        /// New name for the provisioner
        #[clap(long = "name")]
        new_name: Option<String>,

        #[command(flatten)]
        attrs: AttributeArgs,
    },

    /// Remove a provisioner
    Remove {
        /// Name of the provisioner to remove
        #[clap(required_unless_present = "kid")]
        name: Option<String>,

        /// Remove the provisioner with this key identifier instead of by name
        #[clap(long, conflicts_with = "name")]
        kid: Option<String>,
    },
}

/// Attributes that may be set when adding or updating a provisioner
#[derive(Args, Debug, Default)]
pub struct AttributeArgs {
    /// Full path and filename of a file containing the JWK-formatted public key
    #[clap(long, help_heading = "KEYS")]
    pub public_key: Option<PathBuf>,

    /// Full path and filename of a file containing the encrypted private key
    #[clap(long, help_heading = "KEYS")]
    pub encrypted_key: Option<PathBuf>,

    /// Minimum duration of X.509 certificates, e.g., 5m
    #[clap(long, help_heading = "CLAIMS")]
    pub x509_min_dur: Option<String>,

    /// Maximum duration of X.509 certificates, e.g., 24h
    #[clap(long, help_heading = "CLAIMS")]
    pub x509_max_dur: Option<String>,

    /// Default duration of X.509 certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub x509_default_dur: Option<String>,

    /// Minimum duration of SSH user certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub ssh_user_min_dur: Option<String>,

    /// Maximum duration of SSH user certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub ssh_user_max_dur: Option<String>,

    /// Default duration of SSH user certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub ssh_user_default_dur: Option<String>,

    /// Minimum duration of SSH host certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub ssh_host_min_dur: Option<String>,

    /// Maximum duration of SSH host certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub ssh_host_max_dur: Option<String>,

    /// Default duration of SSH host certificates
    #[clap(long, help_heading = "CLAIMS")]
    pub ssh_host_default_dur: Option<String>,

    /// Disable renewal of certificates issued by the provisioner
    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "CLAIMS")]
    pub disable_renewal: Option<bool>,

    /// Allow renewal of expired certificates issued by the provisioner
    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "CLAIMS")]
    pub allow_renewal_after_expiry: Option<bool>,

    /// Enable issuance of SSH certificates
    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "CLAIMS")]
    pub ssh: Option<bool>,

    /// Require the common name to appear among the subject alternative names (ACME)
    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "ACME")]
    pub force_cn: Option<bool>,

    /// Require external account binding for new ACME accounts
    #[clap(long, conflicts_with = "disable_eab", help_heading = "ACME")]
    pub require_eab: bool,

    /// Do not require external account binding for new ACME accounts
    #[clap(long, help_heading = "ACME")]
    pub disable_eab: bool,

    /// AWS account authorized to use the provisioner (may be repeated)
    #[clap(long = "aws-account", help_heading = "CLOUD")]
    pub aws_accounts: Vec<String>,

    /// AWS account to remove (may be repeated)
    #[clap(long = "remove-aws-account", help_heading = "CLOUD")]
    pub remove_aws_accounts: Vec<String>,

    /// Azure tenant identifier
    #[clap(long, help_heading = "CLOUD")]
    pub azure_tenant: Option<String>,

    /// Azure resource group authorized to use the provisioner (may be repeated)
    #[clap(long = "azure-resource-group", help_heading = "CLOUD")]
    pub azure_resource_groups: Vec<String>,

    /// Azure resource group to remove (may be repeated)
    #[clap(long = "remove-azure-resource-group", help_heading = "CLOUD")]
    pub remove_azure_resource_groups: Vec<String>,

    /// Azure subscription identifier authorized to use the provisioner (may be repeated)
    #[clap(long = "azure-subscription-id", help_heading = "CLOUD")]
    pub azure_subscription_ids: Vec<String>,

    /// Azure subscription identifier to remove (may be repeated)
    #[clap(long = "remove-azure-subscription-id", help_heading = "CLOUD")]
    pub remove_azure_subscription_ids: Vec<String>,

    /// Azure object identifier authorized to use the provisioner (may be repeated)
    #[clap(long = "azure-object-id", help_heading = "CLOUD")]
    pub azure_object_ids: Vec<String>,

    /// Azure object identifier to remove (may be repeated)
    #[clap(long = "remove-azure-object-id", help_heading = "CLOUD")]
    pub remove_azure_object_ids: Vec<String>,

    /// GCP service account authorized to use the provisioner (may be repeated)
    #[clap(long = "gcp-service-account", help_heading = "CLOUD")]
    pub gcp_service_accounts: Vec<String>,

    /// GCP service account to remove (may be repeated)
    #[clap(long = "remove-gcp-service-account", help_heading = "CLOUD")]
    pub remove_gcp_service_accounts: Vec<String>,

    /// GCP project authorized to use the provisioner (may be repeated)
    #[clap(long = "gcp-project", help_heading = "CLOUD")]
    pub gcp_projects: Vec<String>,

    /// GCP project to remove (may be repeated)
    #[clap(long = "remove-gcp-project", help_heading = "CLOUD")]
    pub remove_gcp_projects: Vec<String>,

    /// Maximum age of an instance that may use the provisioner, e.g., 1h
    #[clap(long, help_heading = "CLOUD")]
    pub instance_age: Option<String>,

    /// Full path and filename of the roots used to verify instance identity documents
    #[clap(long, help_heading = "CLOUD")]
    pub iid_roots: Option<String>,

    /// Reject custom subject alternative names in instance identity requests
    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "CLOUD")]
    pub disable_custom_sans: Option<bool>,

    /// Allow only one certificate per instance
    #[clap(long, visible_alias = "disable-tofu", num_args = 0..=1, require_equals = true, default_missing_value = "true", help_heading = "CLOUD")]
    pub disable_trust_on_first_use: Option<bool>,

    /// Full path and filename of a PEM file containing the Nebula CA certificates. Only CA
    /// certificates are kept.
    #[clap(long, help_heading = "NEBULA")]
    pub nebula_root: Option<PathBuf>,

    /// Full path and filename of the X.509 certificate template
    #[clap(long, help_heading = "TEMPLATES")]
    pub x509_template: Option<String>,

    /// Full path and filename of a JSON file containing X.509 template data
    #[clap(long, help_heading = "TEMPLATES")]
    pub x509_template_data: Option<PathBuf>,

    /// Full path and filename of the SSH certificate template
    #[clap(long, help_heading = "TEMPLATES")]
    pub ssh_template: Option<String>,

    /// Full path and filename of a JSON file containing SSH template data
    #[clap(long, help_heading = "TEMPLATES")]
    pub ssh_template_data: Option<PathBuf>,
}

#[test]
fn verify_args() {
    use clap::CommandFactory;
    ProvctlArgs::command().debug_assert();
}

#[test]
fn parse_update() {
    let args = ProvctlArgs::parse_from([
        "provctl",
        "--ca-config",
        "ca.json",
        "provisioner",
        "update",
        "aws",
        "--name",
        "aws2",
        "--aws-account",
        "1",
        "--aws-account",
        "2",
        "--remove-aws-account",
        "3",
        "--disable-custom-sans",
        "--force-cn=false",
    ]);
    assert_eq!(PathBuf::from("ca.json"), args.ca_config);
    match args.command {
        Command::Provisioner(ProvisionerCommand::Update {
            name,
            new_name,
            attrs,
        }) => {
            assert_eq!("aws", name);
            assert_eq!(Some("aws2".to_string()), new_name);
            assert_eq!(vec!["1".to_string(), "2".to_string()], attrs.aws_accounts);
            assert_eq!(vec!["3".to_string()], attrs.remove_aws_accounts);
            assert_eq!(Some(true), attrs.disable_custom_sans);
            assert_eq!(Some(false), attrs.force_cn);
            assert_eq!(None, attrs.ssh);
        }
        _ => panic!("expected update"),
    }
}

#[test]
fn parse_add_type() {
    let args = ProvctlArgs::parse_from(["provctl", "provisioner", "add", "acme", "--type", "acme"]);
    match args.command {
        Command::Provisioner(ProvisionerCommand::Add { kind, .. }) => {
            assert_eq!(ProvisionerType::Acme, kind)
        }
        _ => panic!("expected add"),
    }
    assert!(ProvctlArgs::try_parse_from(["provctl", "provisioner", "add", "x", "--type", "bogus"])
        .is_err());
}

#[test]
fn parse_remove() {
    let args = ProvctlArgs::parse_from(["provctl", "provisioner", "remove", "--kid", "kid1"]);
    match args.command {
        Command::Provisioner(ProvisionerCommand::Remove { name, kid }) => {
            assert_eq!(None, name);
            assert_eq!(Some("kid1".to_string()), kid);
        }
        _ => panic!("expected remove"),
    }
    assert!(ProvctlArgs::try_parse_from(["provctl", "provisioner", "remove"]).is_err());
    assert!(ProvctlArgs::try_parse_from([
        "provctl",
        "provisioner",
        "remove",
        "admin",
        "--kid",
        "kid1"
    ])
    .is_err());
}
