//! Access to a certificate authority's administration API.
//!
//! The [`AdminClient`] trait is the seam between [`AdminStore`](crate::AdminStore) and the network.
//! The [`AdminConnector`] trait stands in for the connection context held by a caller: the backend
//! selector asks it for a client only once it has decided the administration API is in use.
//!
//! With the `remote` feature, [`HttpAdminClient`] implements [`AdminClient`] using blocking HTTP
//! requests and [`AdminContext`] implements [`AdminConnector`].

use crate::provisioner::{Provisioner, ProvisionerSelector};
use crate::util::error::*;

use cfg_if::cfg_if;
cfg_if! {
    if #[cfg(feature = "remote")] {
        use std::path::{Path, PathBuf};
        use std::time::Duration;

        use log::debug;
        use reqwest::blocking::{Client, RequestBuilder};
        use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
        use reqwest::Url;
        use serde::Deserialize;

        use crate::roots::{load_trust_roots, TrustRootSet};
    }
}

/// The `AdminClient` trait defines the provisioner operations offered by an administration API.
pub trait AdminClient {
    /// Creates a provisioner and returns the record as stored by the authority.
    fn create_provisioner(&self, prov: &Provisioner) -> Result<Provisioner>;
    /// Retrieves the provisioner matching `selector`.
    fn get_provisioner(&self, selector: &ProvisionerSelector) -> Result<Provisioner>;
    /// Replaces the provisioner named `name`.
    fn update_provisioner(&self, name: &str, prov: &Provisioner) -> Result<()>;
    /// Deletes the provisioner matching `selector`.
    fn remove_provisioner(&self, selector: &ProvisionerSelector) -> Result<()>;
    /// Retrieves all provisioners.
    fn list_provisioners(&self) -> Result<Vec<Provisioner>>;
}

/// The `AdminConnector` trait produces an [`AdminClient`] on demand.
pub trait AdminConnector {
    /// Returns a client for the administration API.
    fn connect(&self) -> Result<Box<dyn AdminClient>>;
}

/// Timeout applied to each request sent to the administration API
#[cfg(feature = "remote")]
pub const ADMIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// number of records requested per page when listing
#[cfg(feature = "remote")]
const LIST_PAGE_SIZE: &str = "100";

#[cfg(feature = "remote")]
#[derive(Deserialize)]
struct AdminErrorBody {
    #[serde(default)]
    message: String,
}

#[cfg(feature = "remote")]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionersPage {
    #[serde(default)]
    provisioners: Vec<Provisioner>,
    #[serde(default)]
    next_cursor: String,
}

/// `HttpAdminClient` sends blocking HTTP requests to the administration API rooted at a CA URL.
///
/// The admin token is presented in the `Authorization` header of every request. Requests are not
/// retried.
#[cfg(feature = "remote")]
pub struct HttpAdminClient {
    client: Client,
    base: Url,
    token: String,
}

#[cfg(feature = "remote")]
impl HttpAdminClient {
    /// `new` prepares a client for the CA at `ca_url`. When `roots` is provided, the roots are
    /// trusted when establishing TLS connections to the CA.
    pub fn new(ca_url: &str, token: &str, roots: Option<&TrustRootSet>) -> Result<Self> {
        let base = Url::parse(ca_url)
            .map_err(|e| Error::InvalidArgument(format!("invalid CA URL '{}': {}", ca_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidArgument(format!(
                "invalid CA URL '{}'",
                ca_url
            )));
        }

        let mut builder = Client::builder().timeout(ADMIN_REQUEST_TIMEOUT);
        if let Some(roots) = roots {
            for root in roots {
                let cert = reqwest::Certificate::from_pem(root).map_err(|e| {
                    Error::InvalidArgument(format!("error adding root certificate: {}", e))
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }
        let client = builder.build().map_err(|e| {
            Error::InvalidArgument(format!("error preparing HTTP client: {}", e))
        })?;

        Ok(HttpAdminClient {
            client,
            base,
            token: token.to_string(),
        })
    }

    /// `provisioners_url` returns the URL of the provisioners collection, or of the named provisioner.
    pub fn provisioners_url(&self, name: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["admin", "provisioners"]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        url
    }

    fn selector_url(&self, selector: &ProvisionerSelector) -> Url {
        match selector {
            ProvisionerSelector::Name(name) => self.provisioners_url(Some(name)),
            ProvisionerSelector::Id(id) => {
                let mut url = self.provisioners_url(None);
                url.query_pairs_mut().append_pair("id", id);
                url
            }
        }
    }

    fn send(&self, op: AdminOperation, request: RequestBuilder) -> Result<Vec<u8>> {
        let to_err = |reason: String| Error::Admin { op, reason };

        let response = request
            .header(AUTHORIZATION, self.token.as_str())
            .send()
            .map_err(|e| to_err(e.to_string()))?;
        let status = response.status();
        let body = response.bytes().map_err(|e| to_err(e.to_string()))?;
        debug!("Admin API {} request returned {}", op, status);

        if !status.is_success() {
            let reason = match serde_json::from_slice::<AdminErrorBody>(&body) {
                Ok(b) if !b.message.is_empty() => b.message,
                _ => status.to_string(),
            };
            return Err(to_err(reason));
        }
        Ok(body.to_vec())
    }

    fn send_json(
        &self,
        op: AdminOperation,
        request: RequestBuilder,
        prov: &Provisioner,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(prov).map_err(|e| Error::Admin {
            op,
            reason: e.to_string(),
        })?;
        self.send(
            op,
            request.header(CONTENT_TYPE, "application/json").body(body),
        )
    }

    fn decode<T: for<'de> Deserialize<'de>>(op: AdminOperation, body: &[u8]) -> Result<T> {
        serde_json::from_slice(body).map_err(|e| Error::Admin {
            op,
            reason: format!("error parsing response: {}", e),
        })
    }
}

#[cfg(feature = "remote")]
impl AdminClient for HttpAdminClient {
    fn create_provisioner(&self, prov: &Provisioner) -> Result<Provisioner> {
        let op = AdminOperation::Create;
        let request = self.client.post(self.provisioners_url(None));
        let body = self.send_json(op, request, prov)?;
        Self::decode(op, &body)
    }

    fn get_provisioner(&self, selector: &ProvisionerSelector) -> Result<Provisioner> {
        let op = AdminOperation::Get;
        let body = self.send(op, self.client.get(self.selector_url(selector)))?;
        Self::decode(op, &body)
    }

    fn update_provisioner(&self, name: &str, prov: &Provisioner) -> Result<()> {
        let request = self.client.put(self.provisioners_url(Some(name)));
        self.send_json(AdminOperation::Update, request, prov)?;
        Ok(())
    }

    fn remove_provisioner(&self, selector: &ProvisionerSelector) -> Result<()> {
        let request = self.client.delete(self.selector_url(selector));
        self.send(AdminOperation::Remove, request)?;
        Ok(())
    }

    fn list_provisioners(&self) -> Result<Vec<Provisioner>> {
        let op = AdminOperation::List;
        let mut provs = vec![];
        let mut cursor = String::new();
        loop {
            let mut url = self.provisioners_url(None);
            url.query_pairs_mut()
                .append_pair("cursor", &cursor)
                .append_pair("limit", LIST_PAGE_SIZE);
            let body = self.send(op, self.client.get(url))?;
            let page: ProvisionersPage = Self::decode(op, &body)?;
            provs.extend(page.provisioners);
            if page.next_cursor.is_empty() || page.next_cursor == cursor {
                break;
            }
            cursor = page.next_cursor;
        }
        Ok(provs)
    }
}

/// `AdminContext` holds what is needed to reach an administration API: the CA URL, an admin token
/// and, optionally, a file containing the CA's root certificates.
#[cfg(feature = "remote")]
#[derive(Clone, Debug, Default)]
pub struct AdminContext {
    /// Base URL of the certificate authority
    pub ca_url: String,
    /// Admin token presented with each request
    pub token: String,
    /// PEM file containing root certificates to trust for TLS
    pub root_file: Option<PathBuf>,
}

#[cfg(feature = "remote")]
impl AdminContext {
    /// `new` returns a context for the given CA URL, token and root file.
    pub fn new(ca_url: &str, token: &str, root_file: Option<&Path>) -> Self {
        AdminContext {
            ca_url: ca_url.to_string(),
            token: token.to_string(),
            root_file: root_file.map(Path::to_path_buf),
        }
    }
}

#[cfg(feature = "remote")]
impl AdminConnector for AdminContext {
    fn connect(&self) -> Result<Box<dyn AdminClient>> {
        if self.ca_url.is_empty() {
            return Err(Error::InvalidArgument(
                "a CA URL is required to use the administration API".to_string(),
            ));
        }
        if self.token.is_empty() {
            return Err(Error::InvalidArgument(
                "an admin token is required to use the administration API".to_string(),
            ));
        }
        let roots = match &self.root_file {
            Some(f) => Some(load_trust_roots(f)?),
            None => None,
        };
        debug!("Connecting to administration API at {}", self.ca_url);
        Ok(Box::new(HttpAdminClient::new(
            &self.ca_url,
            &self.token,
            roots.as_ref(),
        )?))
    }
}

#[cfg(feature = "remote")]
#[test]
fn provisioner_urls() {
    let client = HttpAdminClient::new("https://ca.example.com:9000", "token", None).unwrap();
    assert_eq!(
        "https://ca.example.com:9000/admin/provisioners",
        client.provisioners_url(None).as_str()
    );
    assert_eq!(
        "https://ca.example.com:9000/admin/provisioners/my%20prov",
        client.provisioners_url(Some("my prov")).as_str()
    );
    assert_eq!(
        "https://ca.example.com:9000/admin/provisioners?id=abc",
        client
            .selector_url(&ProvisionerSelector::Id("abc".to_string()))
            .as_str()
    );

    let client = HttpAdminClient::new("https://ca.example.com/step/", "token", None).unwrap();
    assert_eq!(
        "https://ca.example.com/step/admin/provisioners",
        client.provisioners_url(None).as_str()
    );
}

#[cfg(feature = "remote")]
#[test]
fn bad_context() {
    assert!(matches!(
        HttpAdminClient::new("not a url", "token", None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        AdminContext::new("", "token", None).connect(),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        AdminContext::new("https://ca.example.com", "", None).connect(),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        AdminContext::new(
            "https://ca.example.com",
            "token",
            Some(Path::new("tests/examples/leaves_only.pem"))
        )
        .connect(),
        Err(Error::NoCaFound { .. })
    ));
    assert!(AdminContext::new(
        "https://ca.example.com",
        "token",
        Some(Path::new("tests/examples/root_ca_one.pem"))
    )
    .connect()
    .is_ok());
}
