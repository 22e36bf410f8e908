//! NetScaler Nitro REST Client
//!
//! Typed access to the Nitro API of one appliance. Every call goes through the
//! shared [`NitroConnection`], so all modules of a target share one session.
//!
//! # Architecture
//!
//! - **Transport**: HTTPS GET to `/nitro/v1/stat/<type>` or `/nitro/v1/config/<type>`
//! - **Authentication**: session cookie from `POST config/login`, renewed on expiry
//! - **Payload**: `{"errorcode":0,"message":"Done","<type>":[...]}`; single objects
//!   are returned for singleton stats such as `ns`
//!
//! # Example
//!
//! ```no_run
//! use netscaler_exporter::config::Target;
//! use netscaler_exporter::netscaler::NitroClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let target = Target::new("https://ns.example.com").with_credentials("nsroot", "secret");
//! let client = NitroClient::new(Arc::new(target))?;
//! let vservers = client.query_lb_vservers().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Target;
use crate::error::Result;
use crate::netscaler::connection::NitroConnection;
use crate::netscaler::types::*;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const BULK_BINDINGS: &[(&str, &str)] = &[("bulkbindings", "yes")];

/// Client for the Nitro API of a single appliance
///
/// `Send + Sync`; one instance is shared by every module of its target and is
/// kept across scrapes so the session survives between them.
pub struct NitroClient {
    target: Arc<Target>,
    connection: NitroConnection,
}

impl NitroClient {
    pub fn new(target: Arc<Target>) -> Result<Self> {
        let connection = NitroConnection::new(target.clone())?;
        Ok(Self { target, connection })
    }

    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }

    pub async fn login(&self) -> Result<()> {
        self.connection.login().await
    }

    pub async fn has_session(&self) -> bool {
        self.connection.has_session().await
    }

    /// Release pooled connections; the session is kept.
    pub fn close(&self) -> Result<()> {
        self.connection.close()
    }

    /// Raw body of `<path>?<query>`
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        self.connection.get(path, query).await
    }

    /// `GET stat/<kind>` decoded into a list
    pub async fn get_stats<T: DeserializeOwned>(
        &self,
        kind: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let body = self.get(&format!("stat/{kind}"), query).await?;
        extract_list(&body, payload_key(kind))
    }

    /// `GET config/<kind>` decoded into a list
    pub async fn get_config<T: DeserializeOwned>(
        &self,
        kind: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let body = self.get(&format!("config/{kind}"), query).await?;
        extract_list(&body, payload_key(kind))
    }

    async fn first_stat<T: DeserializeOwned + Default>(&self, kind: &str) -> Result<T> {
        Ok(self
            .get_stats::<T>(kind, &[])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    pub async fn query_ns_stats(&self) -> Result<NsStats> {
        self.first_stat("ns").await
    }

    pub async fn query_ns_license(&self) -> Result<NsLicense> {
        Ok(self
            .get_config::<NsLicense>("nslicense", &[])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    pub async fn query_interfaces(&self) -> Result<Vec<InterfaceStats>> {
        self.get_stats("Interface", &[]).await
    }

    pub async fn query_lb_vservers(&self) -> Result<Vec<LbVserverStats>> {
        self.get_stats("lbvserver", &[]).await
    }

    pub async fn query_cs_vservers(&self) -> Result<Vec<CsVserverStats>> {
        self.get_stats("csvserver", &[]).await
    }

    pub async fn query_vpn_vservers(&self) -> Result<Vec<VpnVserverStats>> {
        self.get_stats("vpnvserver", &[]).await
    }

    pub async fn query_gslb_vservers(&self) -> Result<Vec<GslbVserverStats>> {
        self.get_stats("gslbvserver", &[]).await
    }

    pub async fn query_services(&self) -> Result<Vec<ServiceStats>> {
        self.get_stats("service", &[]).await
    }

    pub async fn query_gslb_services(&self) -> Result<Vec<GslbServiceStats>> {
        self.get_stats("gslbservice", &[]).await
    }

    pub async fn query_service_group_names(&self) -> Result<Vec<ServiceGroupConfig>> {
        self.get_config("servicegroup", &[("attrs", "servicegroupname")])
            .await
    }

    /// Per-group stats including member bindings. The name is sent as one
    /// escaped path segment; group names may contain `#`, `?` or spaces.
    pub async fn query_service_group(&self, name: &str) -> Result<Option<ServiceGroupStats>> {
        Ok(self
            .get_stats::<ServiceGroupStats>(
                &format!("servicegroup/{}", urlencoding::encode(name)),
                &[("statbindings", "yes")],
            )
            .await?
            .into_iter()
            .next())
    }

    pub async fn query_aaa_stats(&self) -> Result<AaaStats> {
        self.first_stat("aaa").await
    }

    pub async fn query_protocol_http(&self) -> Result<ProtocolHttpStats> {
        self.first_stat("protocolhttp").await
    }

    pub async fn query_protocol_tcp(&self) -> Result<ProtocolTcpStats> {
        self.first_stat("protocoltcp").await
    }

    pub async fn query_protocol_ip(&self) -> Result<ProtocolIpStats> {
        self.first_stat("protocolip").await
    }

    pub async fn query_ssl_stats(&self) -> Result<SslStats> {
        self.first_stat("ssl").await
    }

    pub async fn query_ssl_certs(&self) -> Result<Vec<SslCertKey>> {
        self.get_config("sslcertkey", &[]).await
    }

    pub async fn query_ssl_vservers(&self) -> Result<Vec<SslVserverStats>> {
        self.get_stats("sslvserver", &[]).await
    }

    pub async fn query_system_cpus(&self) -> Result<Vec<SystemCpuStats>> {
        self.get_stats("systemcpu", &[]).await
    }

    pub async fn query_ns_capacity(&self) -> Result<NsCapacityStats> {
        self.first_stat("nscapacity").await
    }

    pub async fn query_ha_nodes(&self) -> Result<Vec<HaNodeConfig>> {
        self.get_config("hanode", &[]).await
    }

    pub async fn query_ha_stats(&self) -> Result<HaNodeStats> {
        self.first_stat("hanode").await
    }

    pub async fn query_lb_service_bindings(&self) -> Result<Vec<LbServiceBinding>> {
        self.get_config("lbvserver_service_binding", BULK_BINDINGS)
            .await
    }

    pub async fn query_lb_servicegroup_bindings(&self) -> Result<Vec<LbServiceGroupBinding>> {
        self.get_config("lbvserver_servicegroup_binding", BULK_BINDINGS)
            .await
    }

    pub async fn query_cs_lb_bindings(&self) -> Result<Vec<CsLbBinding>> {
        self.get_config("csvserver_lbvserver_binding", BULK_BINDINGS)
            .await
    }

    pub async fn query_cs_policy_bindings(&self) -> Result<Vec<CsPolicyBinding>> {
        self.get_config("csvserver_cspolicy_binding", BULK_BINDINGS)
            .await
    }

    pub async fn query_cs_policies(&self) -> Result<Vec<CsPolicy>> {
        self.get_config("cspolicy", &[]).await
    }

    pub async fn query_cs_actions(&self) -> Result<Vec<CsAction>> {
        self.get_config("csaction", &[]).await
    }

    pub async fn query_mps_health(&self) -> Result<MpsHealth> {
        self.first_stat("mps_health").await
    }
}

/// The category key of the response payload: `servicegroup/web` answers under
/// `servicegroup`.
fn payload_key(kind: &str) -> &str {
    kind.split('/').next().unwrap_or(kind)
}

/// Pull `<key>` out of a Nitro response as a list. Singleton payloads become a
/// one-element list; an absent or null key is an empty list.
pub fn extract_list<T: DeserializeOwned>(body: &[u8], key: &str) -> Result<Vec<T>> {
    let mut envelope: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
    match envelope.remove(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value @ serde_json::Value::Array(_)) => Ok(serde_json::from_value(value)?),
        Some(value) => Ok(vec![serde_json::from_value(value)?]),
    }
}
