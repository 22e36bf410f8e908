//! Topology resolution tests
//!
//! Chain membership and policy indirection over hand-built binding tables, plus
//! property tests over random binding sets.

use netscaler_exporter::netscaler::types::{
    CsAction, CsLbBinding, CsPolicy, CsPolicyBinding, CsVserverStats, LbServiceBinding,
    LbServiceGroupBinding, LbVserverStats, NitroValue, ServiceStats,
};
use netscaler_exporter::topology::{
    build_graph, resolve_cs_to_lb, BindingTables, Node, NodeListings, NodeState, NodeType,
    TopologyIndex,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn cs_lb(cs: &str, lb: &str) -> CsLbBinding {
    CsLbBinding {
        name: cs.into(),
        lbvserver: lb.into(),
        priority: None,
    }
}

fn lb_service(lb: &str, service: &str) -> LbServiceBinding {
    LbServiceBinding {
        name: lb.into(),
        servicename: service.into(),
        weight: None,
    }
}

fn lb_group(lb: &str, group: &str) -> LbServiceGroupBinding {
    LbServiceGroupBinding {
        name: lb.into(),
        servicegroupname: group.into(),
        weight: None,
    }
}

fn cs_vserver(name: &str) -> CsVserverStats {
    CsVserverStats {
        name: name.into(),
        state: "UP".into(),
        ..Default::default()
    }
}

fn lb_vserver(name: &str) -> LbVserverStats {
    LbVserverStats {
        name: name.into(),
        state: "UP".into(),
        ..Default::default()
    }
}

fn service(name: &str) -> ServiceStats {
    ServiceStats {
        name: name.into(),
        state: "UP".into(),
        ..Default::default()
    }
}

#[test]
fn test_chain_membership_direct_and_standalone() {
    // Given: CS1 -> LB1 -> SVC1, and a standalone LB2 -> SG1
    let tables = BindingTables {
        cs_lb: vec![cs_lb("CS1", "LB1")],
        lb_services: vec![lb_service("LB1", "SVC1")],
        lb_service_groups: vec![lb_group("LB2", "SG1")],
        ..Default::default()
    };
    let listings = NodeListings {
        cs_vservers: vec![cs_vserver("CS1")],
        lb_vservers: vec![lb_vserver("LB1"), lb_vserver("LB2")],
        services: vec![service("SVC1")],
    };

    // When: the graph is resolved
    let (chains, _) = build_graph(&tables, &listings);

    // Then: every node carries the chain of its entry point
    assert_eq!(chains.label("csvserver:CS1"), "CS1");
    assert_eq!(chains.label("lbvserver:LB1"), "CS1");
    assert_eq!(chains.label("service:SVC1"), "CS1");
    assert_eq!(chains.label("lbvserver:LB2"), "LB2");
    assert_eq!(chains.label("servicegroup:SG1"), "LB2");
}

#[test]
fn test_policy_indirection_resolves_through_action() {
    // Given: CS2 binds policy P1 without a target, P1 -> A1, A1 -> LB3
    let tables = BindingTables {
        cs_policies: vec![CsPolicyBinding {
            name: "CS2".into(),
            policyname: "P1".into(),
            targetlbvserver: None,
            priority: Some(NitroValue::Number(90.0)),
            bindpoint: Some("REQUEST".into()),
        }],
        policies: vec![CsPolicy {
            policyname: "P1".into(),
            action: Some("A1".into()),
        }],
        actions: vec![CsAction {
            name: "A1".into(),
            targetlbvserver: Some("LB3".into()),
        }],
        ..Default::default()
    };

    // When: the mappings and chains are resolved
    let mappings = resolve_cs_to_lb(&tables);
    let chains = TopologyIndex::build(&tables).chain_membership(&[], &[]);

    // Then: exactly one (CS2, LB3) mapping, and LB3 joins the CS2 chain
    let pairs: Vec<(&str, &str)> = mappings
        .iter()
        .map(|m| (m.cs.as_str(), m.lb.as_str()))
        .collect();
    assert_eq!(pairs, [("CS2", "LB3")]);
    assert_eq!(chains.label("lbvserver:LB3"), "CS2");
}

#[test]
fn test_shared_backend_lists_every_chain_sorted() {
    // Given: two content switches fronting load balancers that share SG1
    let tables = BindingTables {
        cs_lb: vec![cs_lb("CS_B", "LB1"), cs_lb("CS_A", "LB2")],
        lb_service_groups: vec![lb_group("LB1", "SG1"), lb_group("LB2", "SG1")],
        ..Default::default()
    };

    // When
    let chains = TopologyIndex::build(&tables).chain_membership(&[], &[]);

    // Then: the label is the sorted union
    assert_eq!(chains.label("servicegroup:SG1"), "CS_A,CS_B");
    assert_eq!(chains.label("lbvserver:LB1"), "CS_B");
}

#[test]
fn test_fronted_load_balancer_is_not_its_own_chain() {
    let tables = BindingTables {
        cs_lb: vec![cs_lb("CS1", "LB1")],
        lb_services: vec![lb_service("LB1", "SVC1")],
        ..Default::default()
    };

    let chains = TopologyIndex::build(&tables).chain_membership(&[], &["LB1".to_string()]);

    assert_eq!(chains.label("lbvserver:LB1"), "CS1");
    assert_eq!(chains.label("service:SVC1"), "CS1");
}

#[test]
fn test_edges_default_weight_and_priority() {
    // Given: bindings that omit weight and priority
    let tables = BindingTables {
        cs_lb: vec![cs_lb("CS1", "LB1")],
        lb_services: vec![lb_service("LB1", "SVC1")],
        ..Default::default()
    };

    // When
    let edges = TopologyIndex::build(&tables).edges();

    // Then
    assert_eq!(edges.len(), 2);
    for edge in &edges {
        assert_eq!(edge.weight, "1");
        assert_eq!(edge.priority, "0");
        assert_eq!(edge.id, format!("{}->{}", edge.source, edge.target));
    }
}

#[test]
fn test_missing_node_listing_drops_edges_on_conclude() {
    // Given: bindings for CS1 -> LB1 but the lbvserver listing failed
    let tables = BindingTables {
        cs_lb: vec![cs_lb("CS1", "LB1")],
        ..Default::default()
    };
    let listings = NodeListings {
        cs_vservers: vec![cs_vserver("CS1")],
        ..Default::default()
    };

    // When: the graph is concluded
    let (_, mut graph) = build_graph(&tables, &listings);
    let dropped = graph.conclude();

    // Then: the dangling edge is gone
    assert_eq!(dropped, 1);
    assert_eq!(graph.edges().count(), 0);
}

#[test]
fn test_conclude_copies_source_chain_onto_edges() {
    let tables = BindingTables {
        lb_service_groups: vec![lb_group("LB1", "SG1")],
        ..Default::default()
    };
    let listings = NodeListings {
        lb_vservers: vec![lb_vserver("LB1")],
        ..Default::default()
    };
    let (chains, mut graph) = build_graph(&tables, &listings);
    graph.add_node(
        Node::new(NodeType::ServiceGroup, "SG1", NodeState::Up)
            .with_chain(chains.label("servicegroup:SG1")),
    );

    assert_eq!(graph.conclude(), 0);

    let edge = graph.edges().next().unwrap();
    assert_eq!(edge.id, "lbvserver:LB1->servicegroup:SG1");
    assert_eq!(edge.chain, "LB1");
}

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(|s| s.to_string())
}

prop_compose! {
    fn binding_tables()(
        direct in prop::collection::vec((name(), name()), 0..6),
        lb_svc in prop::collection::vec((name(), name()), 0..6),
        lb_sg in prop::collection::vec((name(), name()), 0..6),
        cs_pol in prop::collection::vec((name(), name(), prop::option::of(name())), 0..6),
        pol in prop::collection::vec((name(), name()), 0..4),
        act in prop::collection::vec((name(), prop::option::of(name())), 0..4),
    ) -> BindingTables {
        BindingTables {
            cs_lb: direct.into_iter().map(|(c, l)| cs_lb(&format!("cs_{c}"), &format!("lb_{l}"))).collect(),
            lb_services: lb_svc.into_iter().map(|(l, s)| lb_service(&format!("lb_{l}"), &format!("svc_{s}"))).collect(),
            lb_service_groups: lb_sg.into_iter().map(|(l, g)| lb_group(&format!("lb_{l}"), &format!("sg_{g}"))).collect(),
            cs_policies: cs_pol.into_iter().map(|(c, p, t)| CsPolicyBinding {
                name: format!("cs_{c}"),
                policyname: format!("pol_{p}"),
                targetlbvserver: t.map(|t| format!("lb_{t}")),
                priority: None,
                bindpoint: None,
            }).collect(),
            policies: pol.into_iter().map(|(p, a)| CsPolicy {
                policyname: format!("pol_{p}"),
                action: Some(format!("act_{a}")),
            }).collect(),
            actions: act.into_iter().map(|(a, t)| CsAction {
                name: format!("act_{a}"),
                targetlbvserver: t.map(|t| format!("lb_{t}")),
            }).collect(),
        }
    }
}

prop_compose! {
    fn listings()(
        cs in prop::collection::btree_set(name(), 0..4),
        lb in prop::collection::btree_set(name(), 0..4),
        svc in prop::collection::btree_set(name(), 0..4),
    ) -> NodeListings {
        NodeListings {
            cs_vservers: cs.iter().map(|c| cs_vserver(&format!("cs_{c}"))).collect(),
            lb_vservers: lb.iter().map(|l| lb_vserver(&format!("lb_{l}"))).collect(),
            services: svc.iter().map(|s| service(&format!("svc_{s}"))).collect(),
        }
    }
}

proptest! {
    #[test]
    fn test_concluded_graph_has_no_dangling_edges(tables in binding_tables(), listings in listings()) {
        // Given: random bindings and partial listings
        let (_, mut graph) = build_graph(&tables, &listings);

        // When: the graph is concluded
        graph.conclude();

        // Then: every edge endpoint is a node
        let ids: BTreeSet<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
        for edge in graph.edges() {
            prop_assert!(ids.contains(edge.source.as_str()));
            prop_assert!(ids.contains(edge.target.as_str()));
        }
    }

    #[test]
    fn test_mappings_are_unique_per_pair(tables in binding_tables()) {
        let mappings = resolve_cs_to_lb(&tables);
        let pairs: BTreeSet<(&str, &str)> = mappings.iter().map(|m| (m.cs.as_str(), m.lb.as_str())).collect();
        prop_assert_eq!(pairs.len(), mappings.len());
    }

    #[test]
    fn test_chain_labels_ignore_binding_order(tables in binding_tables()) {
        // Given: the same bindings in reverse order
        let mut reversed = tables.clone();
        reversed.cs_lb.reverse();
        reversed.lb_services.reverse();
        reversed.lb_service_groups.reverse();
        reversed.cs_policies.reverse();

        // When: chains are computed for both
        let forward = TopologyIndex::build(&tables).chain_membership(&[], &[]);
        let backward = TopologyIndex::build(&reversed).chain_membership(&[], &[]);

        // Then: membership is identical, labels sorted
        prop_assert_eq!(&forward, &backward);
    }
}
