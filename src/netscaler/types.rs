//! Nitro API Type Definitions
//!
//! Rust structs for the Nitro v1 (ADC) and v2 (ADM) payloads the exporter reads.
//! Nitro returns counters inconsistently: the same field may arrive as `"123"`,
//! `123` or `123.5` depending on firmware, so every numeric field is a
//! [`NitroValue`] and is coerced only when it is published.
//!
//! # Design Notes
//!
//! - **Defaults**: every struct is `#[serde(default)]`; older firmware omits fields
//!   freely and a missing field must not fail the whole response.
//! - **Envelope**: responses are `{"errorcode":0,"message":"Done",<category>:...}`;
//!   the category payload is pulled out by key in [`crate::netscaler::client`].

#![allow(dead_code)] // Keep complete payload shapes for documentation
use serde::Deserialize;

/// A Nitro field that may be a JSON string, number or boolean.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NitroValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl NitroValue {
    /// Numeric view of the value. Numeric strings are parsed; blanks and
    /// non-numeric text yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    /// Label view of the value; integral numbers print without a fraction.
    pub fn to_label(&self) -> String {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
            Self::Flag(b) => b.to_string(),
        }
    }
}

/// Coerce an optional field
pub fn num(value: &Option<NitroValue>) -> Option<f64> {
    value.as_ref().and_then(NitroValue::as_f64)
}

/// Map an appliance state string to a gauge value
pub fn state_value(state: &str) -> f64 {
    if state.eq_ignore_ascii_case("UP") {
        1.0
    } else {
        0.0
    }
}

/// Common response envelope, used to look for in-band errors
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NitroEnvelope {
    pub errorcode: i64,
    pub message: String,
    pub severity: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub sessionid: Option<String>,
    pub errorcode: i64,
    pub message: String,
}

/// `stat/ns`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NsStats {
    pub cpuusagepcnt: Option<NitroValue>,
    pub memusagepcnt: Option<NitroValue>,
    pub mgmtcpuusagepcnt: Option<NitroValue>,
    pub pktcpuusagepcnt: Option<NitroValue>,
    pub disk0perusage: Option<NitroValue>,
    pub disk1perusage: Option<NitroValue>,
    pub totrxmbits: Option<NitroValue>,
    pub tottxmbits: Option<NitroValue>,
    pub httptotrequests: Option<NitroValue>,
    pub httptotresponses: Option<NitroValue>,
    pub tcpcurclientconn: Option<NitroValue>,
    pub tcpcurclientconnestablished: Option<NitroValue>,
    pub tcpcurserverconn: Option<NitroValue>,
    pub tcpcurserverconnestablished: Option<NitroValue>,
}

/// `config/nslicense`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NsLicense {
    pub modelid: Option<NitroValue>,
}

/// `stat/Interface`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterfaceStats {
    pub id: String,
    pub interfacealias: String,
    pub totrxbytes: Option<NitroValue>,
    pub tottxbytes: Option<NitroValue>,
    pub totrxpkts: Option<NitroValue>,
    pub tottxpkts: Option<NitroValue>,
    pub jumbopktsreceived: Option<NitroValue>,
    pub jumbopktstransmitted: Option<NitroValue>,
    pub errpktrx: Option<NitroValue>,
}

/// `stat/lbvserver`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LbVserverStats {
    pub name: String,
    pub state: String,
    pub vsvrsurgecount: Option<NitroValue>,
    pub vslbhealth: Option<NitroValue>,
    pub inactsvcs: Option<NitroValue>,
    pub actsvcs: Option<NitroValue>,
    pub tothits: Option<NitroValue>,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
    pub curclntconnections: Option<NitroValue>,
    pub cursrvrconnections: Option<NitroValue>,
}

/// `stat/csvserver`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsVserverStats {
    pub name: String,
    pub state: String,
    pub tothits: Option<NitroValue>,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
    pub curclntconnections: Option<NitroValue>,
    pub cursrvrconnections: Option<NitroValue>,
    pub establishedconn: Option<NitroValue>,
    pub totalpktsrecvd: Option<NitroValue>,
    pub totalpktssent: Option<NitroValue>,
    pub totspillovers: Option<NitroValue>,
    pub deferredreq: Option<NitroValue>,
    pub invalidrequestresponse: Option<NitroValue>,
    pub invalidrequestresponsedropped: Option<NitroValue>,
    pub totvserverdownbackuphits: Option<NitroValue>,
    pub curmptcpsessions: Option<NitroValue>,
    pub cursubflowconn: Option<NitroValue>,
}

/// `stat/vpnvserver`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VpnVserverStats {
    pub name: String,
    pub state: String,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
}

/// `stat/gslbvserver`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GslbVserverStats {
    pub name: String,
    pub state: String,
    pub vslbhealth: Option<NitroValue>,
    pub inactsvcs: Option<NitroValue>,
    pub actsvcs: Option<NitroValue>,
    pub tothits: Option<NitroValue>,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
    pub curclntconnections: Option<NitroValue>,
    pub cursrvrconnections: Option<NitroValue>,
}

/// `stat/service`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceStats {
    pub name: String,
    pub state: String,
    pub throughput: Option<NitroValue>,
    pub avgsvrttfb: Option<NitroValue>,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
    pub curclntconnections: Option<NitroValue>,
    pub surgecount: Option<NitroValue>,
    pub cursrvrconnections: Option<NitroValue>,
    pub svrestablishedconn: Option<NitroValue>,
    pub curreusepool: Option<NitroValue>,
    pub maxclients: Option<NitroValue>,
    pub curload: Option<NitroValue>,
    pub vsvrservicehits: Option<NitroValue>,
    pub activetransactions: Option<NitroValue>,
}

/// `stat/gslbservice`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GslbServiceStats {
    pub servicename: String,
    pub state: String,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
    pub curclntconnections: Option<NitroValue>,
    pub cursrvrconnections: Option<NitroValue>,
    pub establishedconn: Option<NitroValue>,
    pub curload: Option<NitroValue>,
    pub vsvrservicehits: Option<NitroValue>,
}

/// `config/servicegroup?attrs=servicegroupname`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceGroupConfig {
    pub servicegroupname: String,
}

/// `stat/servicegroup/<name>?statbindings=yes`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceGroupStats {
    pub servicegroupname: String,
    pub state: String,
    pub servicegroupmember: Vec<ServiceGroupMemberStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceGroupMemberStats {
    /// `<group>?<server>` on most firmware
    pub servicegroupname: String,
    pub primaryipaddress: String,
    pub primaryport: Option<NitroValue>,
    pub state: String,
    pub avgsvrttfb: Option<NitroValue>,
    pub totalrequests: Option<NitroValue>,
    pub totalresponses: Option<NitroValue>,
    pub totalrequestbytes: Option<NitroValue>,
    pub totalresponsebytes: Option<NitroValue>,
    pub curclntconnections: Option<NitroValue>,
    pub surgecount: Option<NitroValue>,
    pub cursrvrconnections: Option<NitroValue>,
    pub svrestablishedconn: Option<NitroValue>,
    pub curreusepool: Option<NitroValue>,
    pub maxclients: Option<NitroValue>,
}

impl ServiceGroupMemberStats {
    /// Server name from `<group>?<server>`, falling back to the member IP.
    pub fn member_name(&self) -> String {
        match self.servicegroupname.split_once('?') {
            Some((_, server)) if !server.is_empty() => server.to_string(),
            _ => self.primaryipaddress.clone(),
        }
    }

    pub fn port(&self) -> String {
        self.primaryport
            .as_ref()
            .map(NitroValue::to_label)
            .unwrap_or_default()
    }
}

/// `stat/aaa`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AaaStats {
    pub aaaauthsuccess: Option<NitroValue>,
    pub aaaauthfail: Option<NitroValue>,
    pub aaaauthonlyhttpsuccess: Option<NitroValue>,
    pub aaaauthonlyhttpfail: Option<NitroValue>,
    pub aaacuricasessions: Option<NitroValue>,
    pub aaacuricaonlyconn: Option<NitroValue>,
}

/// `stat/protocolhttp`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProtocolHttpStats {
    pub httptotrequests: Option<NitroValue>,
    pub httptotresponses: Option<NitroValue>,
    pub httptotposts: Option<NitroValue>,
    pub httptotgets: Option<NitroValue>,
    pub httptotothers: Option<NitroValue>,
    pub httptotrxrequestbytes: Option<NitroValue>,
    pub httptotrxresponsebytes: Option<NitroValue>,
    pub httptottxrequestbytes: Option<NitroValue>,
    pub httptotchunkedrequests: Option<NitroValue>,
    pub httptotchunkedresponses: Option<NitroValue>,
    pub httperrincompleteheaders: Option<NitroValue>,
    pub httperrincompleterequests: Option<NitroValue>,
    pub httperrincompleteresponses: Option<NitroValue>,
    pub httperrserverbusy: Option<NitroValue>,
    pub httperrlargecontent: Option<NitroValue>,
    pub httperrlargechunk: Option<NitroValue>,
    pub httprequestsrate: Option<NitroValue>,
    pub httpresponsesrate: Option<NitroValue>,
    pub httppostsrate: Option<NitroValue>,
    pub httpgetsrate: Option<NitroValue>,
    pub httprxrequestbytesrate: Option<NitroValue>,
    pub httprxresponsebytesrate: Option<NitroValue>,
}

/// `stat/protocoltcp`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProtocolTcpStats {
    pub tcptotrxpkts: Option<NitroValue>,
    pub tcptotrxbytes: Option<NitroValue>,
    pub tcptottxbytes: Option<NitroValue>,
    pub tcptottxpkts: Option<NitroValue>,
    pub tcptotclientconnopened: Option<NitroValue>,
    pub tcptotserverconnopened: Option<NitroValue>,
    pub tcptotsyn: Option<NitroValue>,
    pub tcptotsynprobe: Option<NitroValue>,
    pub tcptotsvrfin: Option<NitroValue>,
    pub tcptotcltfin: Option<NitroValue>,
    pub tcpactiveserverconn: Option<NitroValue>,
    pub tcpcurclientconnestablished: Option<NitroValue>,
    pub tcpcurserverconnestablished: Option<NitroValue>,
    pub tcprxpktsrate: Option<NitroValue>,
    pub tcptxpktsrate: Option<NitroValue>,
    pub tcperrbadchecksum: Option<NitroValue>,
    pub tcperranyportfail: Option<NitroValue>,
    pub tcperrbadstateconn: Option<NitroValue>,
    pub tcperrrstthreshold: Option<NitroValue>,
}

/// `stat/protocolip`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProtocolIpStats {
    pub iptotrxpkts: Option<NitroValue>,
    pub iptotrxbytes: Option<NitroValue>,
    pub iptottxpkts: Option<NitroValue>,
    pub iptottxbytes: Option<NitroValue>,
    pub iptotrxmbits: Option<NitroValue>,
    pub iptottxmbits: Option<NitroValue>,
    pub iptotroutedpkts: Option<NitroValue>,
    pub iptotfragments: Option<NitroValue>,
    pub iptotbadchecksums: Option<NitroValue>,
    pub iptotttlexpired: Option<NitroValue>,
    pub iptotvipdown: Option<NitroValue>,
    pub iptotaddrlookupfail: Option<NitroValue>,
    pub iprxpktsrate: Option<NitroValue>,
    pub iptxpktsrate: Option<NitroValue>,
    pub iprxbytesrate: Option<NitroValue>,
    pub iptxbytesrate: Option<NitroValue>,
}

/// `stat/ssl`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SslStats {
    pub ssltotsessions: Option<NitroValue>,
    pub ssltotnewsessions: Option<NitroValue>,
    pub ssltottlsv11sessions: Option<NitroValue>,
    pub ssltotenc: Option<NitroValue>,
    pub sslcryptoutilizationstat: Option<NitroValue>,
    pub sslsessionsrate: Option<NitroValue>,
    pub sslnewsessionsrate: Option<NitroValue>,
    pub ssldecrate: Option<NitroValue>,
    pub sslencrate: Option<NitroValue>,
}

/// `config/sslcertkey`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SslCertKey {
    pub certkey: String,
    pub daystoexpiration: Option<NitroValue>,
}

/// `stat/sslvserver`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SslVserverStats {
    pub vservername: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub primaryipaddress: String,
    pub state: String,
    pub sslctxtotdecbytes: Option<NitroValue>,
    pub sslctxtotencbytes: Option<NitroValue>,
    pub sslctxtotsessionnew: Option<NitroValue>,
    pub sslctxtotsessionhits: Option<NitroValue>,
    pub ssltotclientauthsuccess: Option<NitroValue>,
    pub ssltotclientauthfailure: Option<NitroValue>,
    pub vslbhealth: Option<NitroValue>,
    pub actsvcs: Option<NitroValue>,
    pub sslctxencbytesrate: Option<NitroValue>,
    pub sslctxdecbytesrate: Option<NitroValue>,
}

/// `stat/systemcpu`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemCpuStats {
    pub id: String,
    pub percpuuse: Option<NitroValue>,
}

/// `stat/nscapacity`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NsCapacityStats {
    pub maxbandwidth: Option<NitroValue>,
    pub minbandwidth: Option<NitroValue>,
    pub actualbandwidth: Option<NitroValue>,
    pub bandwidth: Option<NitroValue>,
}

/// `config/hanode`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HaNodeConfig {
    pub id: Option<NitroValue>,
    pub name: String,
    pub ipaddress: String,
    pub state: String,
    pub hastatus: String,
    pub hasync: String,
    pub masterstatetime: Option<NitroValue>,
}

/// `stat/hanode`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HaNodeStats {
    pub hacurstate: String,
    pub hatotpktrx: Option<NitroValue>,
    pub hatotpkttx: Option<NitroValue>,
    pub haerrsyncfailure: Option<NitroValue>,
    pub haerrproptimeout: Option<NitroValue>,
}

/// `config/lbvserver_service_binding?bulkbindings=yes`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LbServiceBinding {
    pub name: String,
    pub servicename: String,
    pub weight: Option<NitroValue>,
}

/// `config/lbvserver_servicegroup_binding?bulkbindings=yes`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LbServiceGroupBinding {
    pub name: String,
    pub servicegroupname: String,
    pub weight: Option<NitroValue>,
}

/// `config/csvserver_lbvserver_binding?bulkbindings=yes`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CsLbBinding {
    pub name: String,
    pub lbvserver: String,
    pub priority: Option<NitroValue>,
}

/// `config/csvserver_cspolicy_binding?bulkbindings=yes`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CsPolicyBinding {
    pub name: String,
    pub policyname: String,
    pub targetlbvserver: Option<String>,
    pub priority: Option<NitroValue>,
    /// REQUEST or RESPONSE
    pub bindpoint: Option<String>,
}

/// `config/cspolicy`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CsPolicy {
    pub policyname: String,
    pub action: Option<String>,
}

/// `config/csaction`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CsAction {
    pub name: String,
    pub targetlbvserver: Option<String>,
}

/// `stat/mps_health` (Nitro v2)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MpsHealth {
    pub node_type: String,
    pub cpu_usage: Option<NitroValue>,
    pub disk_usage: Option<NitroValue>,
    pub disk_free: Option<NitroValue>,
    pub disk_total: Option<NitroValue>,
    pub disk_used: Option<NitroValue>,
    pub memory_usage: Option<NitroValue>,
    pub memory_free: Option<NitroValue>,
    pub memory_total: Option<NitroValue>,
}
