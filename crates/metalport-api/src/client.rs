// Hand-crafted async HTTP client for the Equinix Metal API.
//
// Base path: /metal/v1/
// Auth: X-Auth-Token header

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    AddressRequest, PortResponse, VirtualNetworkCreateRequest, VirtualNetworkList,
    VirtualNetworkResponse,
};

/// Expansions requested on every port read so that native and attached
/// virtual networks come back with ids, VXLAN tags, and locations.
const PORT_INCLUDES: &str = "native_virtual_network,virtual_networks";

/// Expansions needed to find every port a virtual network is attached to.
const VLAN_ATTACHMENT_INCLUDES: &str = "instances,instances.network_ports.virtual_networks";

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Metal port and virtual network endpoints.
pub struct MetalClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MetalClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an auth token and transport config.
    ///
    /// Injects `X-Auth-Token` as a sensitive default header on every request.
    pub fn from_auth_token(
        base_url: &str,
        auth_token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(auth_token.expose_secret()).map_err(|e| {
            Error::Authentication {
                message: format!("invalid auth token header value: {e}"),
            }
        })?;
        token.set_sensitive(true);
        headers.insert("X-Auth-Token", token);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with a slash so relative joins append.
    ///
    /// `https://api.equinix.com/metal/v1` and `.../metal/v1/` are equivalent.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"ports/{id}"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).query(params).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self.http.delete(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn delete_no_response(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: "auth token missing or rejected".into(),
            };
        }

        let headers = resp.headers();
        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let request_id = headers
            .get("X-Request-Id")
            .and_then(|v| v.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_owned);

        let raw = resp.text().await.unwrap_or_default();

        let mut errors = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(body) => {
                let mut errors = body.errors;
                errors.extend(body.error);
                errors
            }
            Err(_) if !raw.is_empty() => vec![raw],
            Err(_) => Vec::new(),
        };
        if errors.is_empty() {
            errors.push(status.to_string());
        }

        Error::Api {
            status: status.as_u16(),
            request_id: if is_json { request_id } else { None },
            errors,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Ports ────────────────────────────────────────────────────────

    pub async fn get_port(&self, port_id: &str) -> Result<PortResponse, Error> {
        self.get(&format!("ports/{port_id}"), &[("include", PORT_INCLUDES)])
            .await
    }

    pub async fn assign_vlan(&self, port_id: &str, vlan: &str) -> Result<PortResponse, Error> {
        self.post(
            &format!("ports/{port_id}/assign"),
            &[("include", PORT_INCLUDES)],
            &VnidBody { vnid: vlan },
        )
        .await
    }

    pub async fn unassign_vlan(&self, port_id: &str, vlan: &str) -> Result<PortResponse, Error> {
        self.post(
            &format!("ports/{port_id}/unassign"),
            &[("include", PORT_INCLUDES)],
            &VnidBody { vnid: vlan },
        )
        .await
    }

    /// Bond the port. With `bulk_enable` the whole bond group is bonded.
    pub async fn bond(&self, port_id: &str, bulk_enable: bool) -> Result<PortResponse, Error> {
        #[derive(Serialize)]
        struct Body {
            bulk_enable: bool,
        }

        self.post(
            &format!("ports/{port_id}/bond"),
            &[("include", PORT_INCLUDES)],
            &Body { bulk_enable },
        )
        .await
    }

    /// Remove the port from its bond. With `bulk_disable` the whole bond
    /// group is disbonded.
    pub async fn disbond(&self, port_id: &str, bulk_disable: bool) -> Result<PortResponse, Error> {
        #[derive(Serialize)]
        struct Body {
            bulk_disable: bool,
        }

        self.post(
            &format!("ports/{port_id}/disbond"),
            &[("include", PORT_INCLUDES)],
            &Body { bulk_disable },
        )
        .await
    }

    pub async fn convert_to_layer2(&self, port_id: &str) -> Result<PortResponse, Error> {
        self.post(
            &format!("ports/{port_id}/convert/layer-2"),
            &[("include", PORT_INCLUDES)],
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn convert_to_layer3(
        &self,
        port_id: &str,
        request_ips: &[AddressRequest],
    ) -> Result<PortResponse, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            request_ips: &'a [AddressRequest],
        }

        self.post(
            &format!("ports/{port_id}/convert/layer-3"),
            &[("include", PORT_INCLUDES)],
            &Body { request_ips },
        )
        .await
    }

    pub async fn assign_native_vlan(
        &self,
        port_id: &str,
        vlan: &str,
    ) -> Result<PortResponse, Error> {
        self.post(
            &format!("ports/{port_id}/native-vlan"),
            &[("vnid", vlan), ("include", PORT_INCLUDES)],
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn unassign_native_vlan(&self, port_id: &str) -> Result<PortResponse, Error> {
        self.delete(
            &format!("ports/{port_id}/native-vlan"),
            &[("include", PORT_INCLUDES)],
        )
        .await
    }

    // ── Virtual networks ─────────────────────────────────────────────

    /// List a project's virtual networks, optionally restricted to a metro.
    pub async fn list_virtual_networks(
        &self,
        project_id: &str,
        metro: Option<&str>,
    ) -> Result<Vec<VirtualNetworkResponse>, Error> {
        let params: Vec<(&str, &str)> = metro.map(|m| ("metro", m)).into_iter().collect();
        let list: VirtualNetworkList = self
            .get(&format!("projects/{project_id}/virtual-networks"), &params)
            .await?;
        Ok(list.virtual_networks)
    }

    pub async fn get_virtual_network(&self, vlan_id: &str) -> Result<VirtualNetworkResponse, Error> {
        self.get(&format!("virtual-networks/{vlan_id}"), &[]).await
    }

    /// Fetch a virtual network with the devices and ports that carry it.
    pub async fn get_virtual_network_attachments(
        &self,
        vlan_id: &str,
    ) -> Result<VirtualNetworkResponse, Error> {
        self.get(
            &format!("virtual-networks/{vlan_id}"),
            &[("include", VLAN_ATTACHMENT_INCLUDES)],
        )
        .await
    }

    pub async fn create_virtual_network(
        &self,
        body: &VirtualNetworkCreateRequest,
    ) -> Result<VirtualNetworkResponse, Error> {
        self.post(
            &format!("projects/{}/virtual-networks", body.project_id),
            &[],
            body,
        )
        .await
    }

    pub async fn delete_virtual_network(&self, vlan_id: &str) -> Result<(), Error> {
        self.delete_no_response(&format!("virtual-networks/{vlan_id}"))
            .await
    }
}

#[derive(Serialize)]
struct VnidBody<'a> {
    vnid: &'a str,
}
