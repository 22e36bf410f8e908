//! Service group collection against a fake appliance
//!
//! The listing repeats groups and members; the published series must not.

mod common;

use common::FakeNitro;
use netscaler_exporter::collectors::collect_service_groups;
use netscaler_exporter::metrics::MetricsCollector;
use netscaler_exporter::scrape::{Module, ScrapeOrchestrator};
use netscaler_exporter::topology::collect_topology;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn member(group: &str, server: &str, ip: &str, port: u16, state: &str) -> serde_json::Value {
    json!({
        "servicegroupname": format!("{group}?{server}"),
        "primaryipaddress": ip,
        "primaryport": port,
        "state": state,
        "totalrequests": "120",
        "curclntconnections": 3
    })
}

fn seed(nitro: &FakeNitro) {
    nitro.respond(
        "config/servicegroup",
        json!({ "servicegroup": [
            { "servicegroupname": "web" },
            { "servicegroupname": "web" },
            { "servicegroupname": "api" }
        ]}),
    );
    nitro.respond(
        "stat/servicegroup/web",
        json!({ "servicegroup": [{
            "servicegroupname": "web",
            "state": "UP",
            "servicegroupmember": [
                member("web", "srv1", "10.0.0.1", 80, "UP"),
                member("web", "srv1", "10.0.0.1", 80, "UP"),
                member("web", "srv2", "10.0.0.2", 80, "DOWN")
            ]
        }]}),
    );
    nitro.respond(
        "stat/servicegroup/api",
        json!({ "servicegroup": [{
            "servicegroupname": "api",
            "state": "UP",
            "servicegroupmember": [member("api", "srv1", "10.0.0.1", 8443, "UP")]
        }]}),
    );
    nitro.respond(
        "config/lbvserver_servicegroup_binding",
        json!({ "lbvserver_servicegroup_binding": [
            { "name": "lb_web", "servicegroupname": "web" }
        ]}),
    );
    nitro.respond(
        "stat/lbvserver",
        json!({ "lbvserver": [{ "name": "lb_web", "state": "UP" }] }),
    );
}

fn series<'a>(output: &'a str, family: &str) -> Vec<&'a str> {
    let prefix = format!("{family}{{");
    output.lines().filter(|l| l.starts_with(&prefix)).collect()
}

#[tokio::test]
async fn test_duplicate_groups_and_members_publish_once() {
    // Given: a listing with a repeated group and a repeated member
    let nitro = FakeNitro::start().await;
    seed(&nitro);
    let metrics = Arc::new(MetricsCollector::new(&[]).unwrap());
    let modules = vec![Module::new("service_groups", collect_service_groups)];
    let orchestrator = ScrapeOrchestrator::new(2, Duration::from_secs(10));

    // When: the module runs
    let report = orchestrator
        .scrape(nitro.client(), metrics.clone(), &modules)
        .await;

    // Then: one series per unique (group, member, port), one fetch per group
    assert_eq!(report.succeeded, ["service_groups"]);
    let output = metrics.render().unwrap();
    let states = series(&output, "netscaler_servicegroup_state");
    assert_eq!(states.len(), 3, "{states:#?}");
    // Label pairs render sorted by name, so ns_instance sits between member and port
    assert!(states.iter().any(|l| l.contains(r#"member="srv2""#)
        && l.contains(r#"port="80",servicegroup="web"}"#)
        && l.ends_with(" 0")));
    assert!(states.iter().any(|l| l.contains(r#"member="srv1""#)
        && l.contains(r#"port="8443",servicegroup="api"}"#)
        && l.ends_with(" 1")));
    assert_eq!(series(&output, "netscaler_servicegroup_total_requests").len(), 3);
    assert_eq!(nitro.requests_for("stat/servicegroup/web"), 1);
    assert_eq!(nitro.requests_for("stat/servicegroup/api"), 1);
}

#[tokio::test]
async fn test_nested_fetches_do_not_deadlock_at_parallelism_one() {
    // Given: a single slot
    let nitro = FakeNitro::start().await;
    seed(&nitro);
    let metrics = Arc::new(MetricsCollector::new(&[]).unwrap());
    let modules = vec![Module::new("service_groups", collect_service_groups)];
    let orchestrator = ScrapeOrchestrator::new(1, Duration::from_secs(5));

    // When: the module runs
    let report = orchestrator.scrape(nitro.client(), metrics, &modules).await;

    // Then: it completes rather than timing out
    assert!(report.timed_out.is_empty());
    assert_eq!(report.succeeded, ["service_groups"]);
    assert!(nitro.state.max_in_flight.load(std::sync::atomic::Ordering::SeqCst) <= 1);
}

#[tokio::test]
async fn test_members_join_topology_with_group_chain() {
    // Given: topology plus service groups, with lb_web -> web
    let nitro = FakeNitro::start().await;
    seed(&nitro);
    let metrics = Arc::new(MetricsCollector::new(&[]).unwrap());
    let modules = vec![
        Module::new("topology", collect_topology),
        Module::new("service_groups", collect_service_groups),
    ];
    let orchestrator = ScrapeOrchestrator::new(3, Duration::from_secs(10));

    // When: the target is scraped
    let report = orchestrator
        .scrape(nitro.client(), metrics.clone(), &modules)
        .await;

    // Then: group and server nodes carry the chain, edges connect them
    assert_eq!(report.failed, Vec::<String>::new());
    let output = metrics.render().unwrap();
    let nodes = series(&output, "netscaler_topology_node");
    assert!(nodes.iter().any(|l| l.contains(r#"id="servicegroup:web""#)
        && l.contains(r#"chain="lb_web""#)));
    assert!(nodes.iter().any(|l| l.contains(r#"id="server:10.0.0.1:80""#)
        && l.contains(r#"title="srv1:80""#)
        && l.contains(r#"chain="lb_web""#)));
    assert!(nodes.iter().any(|l| l.contains(r#"id="server:10.0.0.2:80""#)
        && l.contains(r#"state="DOWN""#)));

    let edges = series(&output, "netscaler_topology_edge");
    assert!(edges
        .iter()
        .any(|l| l.contains(r#"id="lbvserver:lb_web->servicegroup:web""#)));
    assert!(edges
        .iter()
        .any(|l| l.contains(r#"id="servicegroup:web->server:10.0.0.1:80""#)));
    // api is not bound to any load balancer, so it belongs to no chain
    assert!(nodes.iter().any(|l| l.contains(r#"id="servicegroup:api""#)
        && l.contains(r#"chain="""#)));
}

#[tokio::test]
async fn test_group_names_with_reserved_characters_are_escaped() {
    // Given: two groups where one name would otherwise end the path at '#'
    let nitro = FakeNitro::start().await;
    nitro.respond(
        "config/servicegroup",
        json!({ "servicegroup": [
            { "servicegroupname": "web" },
            { "servicegroupname": "web#2" }
        ]}),
    );
    nitro.respond(
        "stat/servicegroup/web",
        json!({ "servicegroup": [{
            "servicegroupname": "web",
            "servicegroupmember": [member("web", "srv1", "10.0.0.1", 80, "UP")]
        }]}),
    );
    nitro.respond(
        "stat/servicegroup/web#2",
        json!({ "servicegroup": [{
            "servicegroupname": "web#2",
            "servicegroupmember": [member("web#2", "srv9", "10.0.0.9", 8080, "DOWN")]
        }]}),
    );
    let metrics = Arc::new(MetricsCollector::new(&[]).unwrap());
    let modules = vec![Module::new("service_groups", collect_service_groups)];
    let orchestrator = ScrapeOrchestrator::new(2, Duration::from_secs(10));

    // When: the module runs
    let report = orchestrator
        .scrape(nitro.client(), metrics.clone(), &modules)
        .await;

    // Then: each group was fetched under its own name
    assert_eq!(report.succeeded, ["service_groups"]);
    assert_eq!(nitro.requests_for("stat/servicegroup/web"), 1);
    assert_eq!(nitro.requests_for("stat/servicegroup/web#2"), 1);

    // And: each member is published under its own group
    let output = metrics.render().unwrap();
    let states = series(&output, "netscaler_servicegroup_state");
    assert_eq!(states.len(), 2, "{states:#?}");
    assert!(states.iter().any(|l| l.contains(r#"member="srv1""#)
        && l.contains(r#"servicegroup="web"}"#)
        && l.ends_with(" 1")));
    assert!(states.iter().any(|l| l.contains(r#"member="srv9""#)
        && l.contains(r#"servicegroup="web#2"}"#)
        && l.ends_with(" 0")));
}
