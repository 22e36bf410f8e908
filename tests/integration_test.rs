//! End-to-end collection with the full module set
//!
//! One ADC and one ADM appliance, configured from TOML the way the binary is.

mod common;

use common::FakeNitro;
use netscaler_exporter::collectors::adc_modules;
use netscaler_exporter::config::Config;
use netscaler_exporter::exporter::Exporter;
use serde_json::json;

fn config(adc: &FakeNitro, mps: &FakeNitro) -> Config {
    let toml = format!(
        r#"
        [credentials]
        username = "nsroot"
        password = "secret"

        [labels]
        env = "prod"

        [[targets]]
        url = "{adc}"

        [[targets]]
        url = "{mps}"
        type = "mps"
        labels = {{ site = "ams" }}
        "#,
        adc = adc.url(),
        mps = mps.url(),
    );
    config::Config::builder()
        .add_source(config::File::from_str(&toml, config::FileFormat::Toml))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

fn seed_adc(nitro: &FakeNitro) {
    nitro.respond("stat/ns", json!({ "ns": { "cpuusagepcnt": 7, "memusagepcnt": "41.5" } }));
    nitro.respond(
        "config/csvserver_lbvserver_binding",
        json!({ "csvserver_lbvserver_binding": [{ "name": "cs_web", "lbvserver": "lb_web" }] }),
    );
    nitro.respond(
        "config/lbvserver_service_binding",
        json!({ "lbvserver_service_binding": [{ "name": "lb_web", "servicename": "svc_web" }] }),
    );
    nitro.respond(
        "stat/csvserver",
        json!({ "csvserver": [{ "name": "cs_web", "state": "UP", "totalrequests": "10" }] }),
    );
    nitro.respond(
        "stat/lbvserver",
        json!({ "lbvserver": [{ "name": "lb_web", "state": "UP", "totalrequests": "10" }] }),
    );
    nitro.respond(
        "stat/service",
        json!({ "service": [{ "name": "svc_web", "state": "DOWN" }] }),
    );
}

#[tokio::test]
async fn test_full_collection_across_adc_and_adm() {
    // Given: a seeded ADC and an ADM appliance
    let adc = FakeNitro::start().await;
    seed_adc(&adc);
    let mps = FakeNitro::start().await;
    mps.respond(
        "stat/mps_health",
        json!({ "mps_health": [{ "node_type": "agent", "cpu_usage": "3.5" }] }),
    );
    let config = config(&adc, &mps);
    config.validate().unwrap();
    let exporter = Exporter::new(&config);
    assert_eq!(exporter.target_count(), 2);

    // When: one collection runs
    let collection = exporter.collect().await.unwrap();

    // Then: every ADC module succeeded and both targets are up
    let adc_report = &collection.reports[0];
    assert!(adc_report.failed.is_empty(), "{:?}", adc_report.failed);
    assert!(adc_report.timed_out.is_empty());
    assert_eq!(adc_report.succeeded.len(), adc_modules().len());
    assert_eq!(collection.reports[1].succeeded, ["mps_health"]);
    assert_eq!(mps.logins(), 0);

    let output = collection.metrics.render().unwrap();
    let adc_labels = format!(r#"env="prod",ns_instance="{}",site="""#, adc.url());
    let mps_labels = format!(r#"env="prod",ns_instance="{}",site="ams""#, mps.url());
    assert!(output.contains(&format!("netscaler_up{{{adc_labels}}} 1")), "{output}");
    assert!(output.contains(&format!("netscaler_up{{{mps_labels}}} 1")));
    assert!(output.contains(&format!("netscaler_cpu_usage_percent{{{adc_labels}}} 7")));
    assert!(output.contains(&format!("netscaler_mem_usage_percent{{{adc_labels}}} 41.5")));
    assert!(output.contains("netscaler_mps_cpu_usage{"));

    // And: the topology chain runs from the content switch to the service
    let nodes: Vec<&str> = output
        .lines()
        .filter(|l| l.starts_with("netscaler_topology_node{"))
        .collect();
    for id in ["csvserver:cs_web", "lbvserver:lb_web", "service:svc_web"] {
        assert!(
            nodes
                .iter()
                .any(|l| l.contains(&format!(r#"id="{id}""#)) && l.contains(r#"chain="cs_web""#)),
            "missing {id} in {nodes:#?}"
        );
    }
    assert!(nodes
        .iter()
        .any(|l| l.contains(r#"id="service:svc_web""#) && l.ends_with(" 0")));
}

#[tokio::test]
async fn test_sessions_persist_across_collections() {
    // Given: an exporter over one ADC
    let adc = FakeNitro::start().await;
    let mps = FakeNitro::start().await;
    let exporter = Exporter::new(&config(&adc, &mps));

    // When: two collections run
    let first = exporter.collect().await.unwrap();
    let second = exporter.collect().await.unwrap();

    // Then: one login served both, and each collection has its own sink
    assert_eq!(adc.logins(), 1);
    assert!(first.reports[0].is_up());
    assert!(second.reports[0].is_up());
    assert!(!std::sync::Arc::ptr_eq(&first.metrics, &second.metrics));
}

#[tokio::test]
async fn test_disabled_modules_are_not_requested() {
    // Given: the ADC with ns_stats disabled globally
    let adc = FakeNitro::start().await;
    let mps = FakeNitro::start().await;
    let mut config = config(&adc, &mps);
    config.scrape.disabled_modules = vec!["ns_stats".to_string(), "topology".to_string()];

    // When: a collection runs
    let collection = Exporter::new(&config).collect().await.unwrap();

    // Then: neither module ran nor touched the appliance
    let report = &collection.reports[0];
    assert!(!report.succeeded.iter().any(|m| m == "ns_stats" || m == "topology"));
    assert_eq!(adc.requests_for("stat/ns"), 0);
    assert_eq!(adc.requests_for("config/csvserver_lbvserver_binding"), 0);
}

#[tokio::test]
async fn test_ns_and_protocol_tcp_connection_counts_are_distinct() {
    // Given: the ns summary and the TCP protocol table report different counts
    let adc = FakeNitro::start().await;
    let mps = FakeNitro::start().await;
    adc.respond(
        "stat/ns",
        json!({ "ns": { "tcpcurclientconnestablished": 10, "tcpcurserverconnestablished": 20 } }),
    );
    adc.respond(
        "stat/protocoltcp",
        json!({ "protocoltcp": { "tcpcurclientconnestablished": 99, "tcpcurserverconnestablished": 98 } }),
    );

    // When: a collection runs
    let collection = Exporter::new(&config(&adc, &mps)).collect().await.unwrap();

    // Then: both values are published under their own families
    let output = collection.metrics.render().unwrap();
    let labels = format!(r#"env="prod",ns_instance="{}",site="""#, adc.url());
    for (family, value) in [
        ("tcp_current_client_connections_established", 10),
        ("tcp_current_server_connections_established", 20),
        ("tcp_cur_client_connections_established", 99),
        ("tcp_cur_server_connections_established", 98),
    ] {
        let line = format!("netscaler_{family}{{{labels}}} {value}");
        assert!(output.contains(&line), "missing {line}");
    }
}

#[tokio::test]
async fn test_topology_degrades_when_one_source_fails() {
    // Given: direct bindings plus a policy binding whose policy table errors
    let adc = FakeNitro::start().await;
    let mps = FakeNitro::start().await;
    seed_adc(&adc);
    adc.respond(
        "config/csvserver_cspolicy_binding",
        json!({ "csvserver_cspolicy_binding": [{ "name": "cs_web", "policyname": "pol_api" }] }),
    );
    adc.respond("config/cspolicy", json!({ "errorcode": 258, "severity": "ERROR" }));
    adc.respond(
        "config/csaction",
        json!({ "csaction": [{ "name": "act_api", "targetlbvserver": "lb_api" }] }),
    );
    adc.respond(
        "stat/lbvserver",
        json!({ "lbvserver": [
            { "name": "lb_web", "state": "UP" },
            { "name": "lb_api", "state": "UP" }
        ] }),
    );

    // When: a collection runs
    let collection = Exporter::new(&config(&adc, &mps)).collect().await.unwrap();

    // Then: topology still succeeds
    let report = &collection.reports[0];
    assert!(report.succeeded.iter().any(|m| m == "topology"), "{report:?}");
    assert_eq!(adc.requests_for("config/cspolicy"), 1);

    // And: the direct chain is published
    let output = collection.metrics.render().unwrap();
    let nodes: Vec<&str> = output
        .lines()
        .filter(|l| l.starts_with("netscaler_topology_node{"))
        .collect();
    for id in ["csvserver:cs_web", "lbvserver:lb_web", "service:svc_web"] {
        assert!(
            nodes
                .iter()
                .any(|l| l.contains(&format!(r#"id="{id}""#)) && l.contains(r#"chain="cs_web""#)),
            "missing {id} in {nodes:#?}"
        );
    }

    // And: no edge was resolved through the failed policy table
    let edges: Vec<&str> = output
        .lines()
        .filter(|l| l.starts_with("netscaler_topology_edge{"))
        .collect();
    assert!(!edges.is_empty());
    assert!(edges.iter().all(|l| !l.contains("lb_api")), "{edges:#?}");
    assert!(edges
        .iter()
        .any(|l| l.contains(r#"id="csvserver:cs_web->lbvserver:lb_web""#)));
}
