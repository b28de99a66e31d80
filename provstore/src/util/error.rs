//! Error types

use core::fmt;
use std::io::ErrorKind;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Operations that can be attempted against a remote administration API.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum AdminOperation {
    /// Create a provisioner
    Create,
    /// Retrieve a provisioner
    Get,
    /// Replace a provisioner
    Update,
    /// Delete a provisioner
    Remove,
    /// Enumerate provisioners
    List,
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// FileAccess occurs when checking for the existence of a file fails for a reason other than
    /// the file not being present, i.e., permissions.
    FileAccess {
        /// Path that could not be inspected
        path: String,
        /// Underlying I/O error kind
        kind: ErrorKind,
    },
    /// FileRead occurs when the contents of a file could not be read.
    FileRead {
        /// Path that could not be read
        path: String,
        /// Underlying I/O error kind
        kind: ErrorKind,
    },
    /// FileWrite occurs when a file could not be written or atomically replaced.
    FileWrite {
        /// Path that could not be written
        path: String,
        /// Underlying I/O error kind
        kind: ErrorKind,
    },
    /// ConfigLoad occurs when an authority configuration file is not well-formed.
    ConfigLoad {
        /// Path of the configuration file
        path: String,
        /// Description of the parse failure
        reason: String,
    },
    /// ConfigConflict occurs when a configuration enables the administration API while also
    /// listing static provisioners. The operator must resolve this by hand.
    ConfigConflict {
        /// Path of the configuration file
        path: String,
    },
    /// CertificateParse occurs when a trust chain file contains a block that is not a well-formed
    /// PEM-encoded certificate.
    CertificateParse {
        /// Path of the trust chain file
        path: String,
        /// Description of the parse failure
        reason: String,
    },
    /// NoCaFound occurs when a trust chain file parses cleanly but contains no CA certificates.
    NoCaFound {
        /// Path of the trust chain file
        path: String,
    },
    /// CertificateEncode occurs when a certificate could not be re-encoded as PEM.
    CertificateEncode(String),
    /// NotFound occurs when no provisioner matches the given name or key identifier. The value
    /// describes what was sought.
    NotFound(String),
    /// AlreadyExists occurs when a provisioner with the same name or key identifier is present. The
    /// value describes the conflicting record.
    AlreadyExists(String),
    /// Admin wraps an error returned by the administration API along with the attempted operation.
    Admin {
        /// Operation that was attempted
        op: AdminOperation,
        /// Error text returned by or derived from the remote service
        reason: String,
    },
    /// InvalidDuration occurs when a duration attribute does not parse or is out of range.
    InvalidDuration {
        /// Name of the attribute or flag
        flag: String,
        /// Offending value
        value: String,
    },
    /// InvalidArgument occurs when an attribute value is unusable for some other reason.
    InvalidArgument(String),
    /// Asn1Error is used to propagate error information from the der crate.
    Asn1Error(der::Error),
    /// PemError is used to propagate error information from the pem-rfc7468 crate.
    PemError(pem_rfc7468::Error),
    /// MalformedPem occurs when PEM encapsulation boundaries are missing or incomplete.
    MalformedPem(&'static str),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<pem_rfc7468::Error> for Error {
    fn from(err: pem_rfc7468::Error) -> Error {
        Error::PemError(err)
    }
}

impl fmt::Display for AdminOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminOperation::Create => write!(f, "create"),
            AdminOperation::Get => write!(f, "get"),
            AdminOperation::Update => write!(f, "update"),
            AdminOperation::Remove => write!(f, "remove"),
            AdminOperation::List => write!(f, "list"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileAccess { path, kind } => {
                write!(f, "error accessing {}: {:?}", path, kind)
            }
            Error::FileRead { path, kind } => write!(f, "error reading {}: {:?}", path, kind),
            Error::FileWrite { path, kind } => write!(f, "error writing {}: {:?}", path, kind),
            Error::ConfigLoad { path, reason } => {
                write!(f, "error loading configuration {}: {}", path, reason)
            }
            Error::ConfigConflict { path } => write!(
                f,
                "when 'enableAdmin' attribute set to 'true', provisioners list in {} must be empty",
                path
            ),
            Error::CertificateParse { path, reason } => {
                write!(f, "error reading {}: {}", path, reason)
            }
            Error::NoCaFound { path } => {
                write!(f, "error reading {}: no CA certificates found", path)
            }
            Error::CertificateEncode(reason) => {
                write!(f, "error marshaling certificate: {}", reason)
            }
            Error::NotFound(what) => write!(f, "{} not found", what),
            Error::AlreadyExists(what) => write!(f, "{} already exists", what),
            Error::Admin { op, reason } => {
                write!(f, "error performing {} provisioner request: {}", op, reason)
            }
            Error::InvalidDuration { flag, value } => {
                write!(f, "value '{}' of '{}' is not a valid duration", value, flag)
            }
            Error::InvalidArgument(reason) => write!(f, "{}", reason),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::PemError(err) => write!(f, "PemError: {}", err),
            Error::MalformedPem(reason) => write!(f, "MalformedPem: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn error_test() {
    let _s = format!("{}", AdminOperation::Create);
    let _s = format!("{}", AdminOperation::List);

    let s = format!(
        "{}",
        Error::ConfigConflict {
            path: "ca.json".to_string()
        }
    );
    assert!(s.contains("'enableAdmin'"));
    assert!(s.contains("ca.json"));

    let s = format!(
        "{}",
        Error::NoCaFound {
            path: "roots.pem".to_string()
        }
    );
    assert_eq!(s, "error reading roots.pem: no CA certificates found");

    let s = format!(
        "{}",
        Error::Admin {
            op: AdminOperation::Remove,
            reason: "unauthorized".to_string()
        }
    );
    assert!(s.contains("remove"));
    assert!(s.contains("unauthorized"));

    let _s = format!(
        "{}",
        Error::FileAccess {
            path: "ca.json".to_string(),
            kind: ErrorKind::PermissionDenied
        }
    );
    let _s = format!("{}", Error::NotFound("x".to_string()));
    let _s = format!("{}", Error::AlreadyExists("x".to_string()));
    let _s = format!("{}", Error::MalformedPem("missing END"));
}
