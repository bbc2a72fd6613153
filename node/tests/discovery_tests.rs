//! Discovery engine scenarios against scripted peers: founding bootstrap,
//! seed admission by distance, world fill, stall handling, greedy descent,
//! and the neighbourhood cap.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use meridian_node::{Node, NodeError, NEIGHBOURHOOD_MAX_NODE_COUNT};
use meridian_nullables::{NullConnectionFactory, NullRemoteNode};
use meridian_store::{MemorySpatialDb, SpatialDatabase};
use meridian_types::{
    GpsLocation, NetworkContact, NodeDbEntry, NodeId, NodeInfo, NodeProfile, RelationType,
    RoleType,
};

fn info(id: &str, lat: f64, lon: f64) -> NodeInfo {
    NodeInfo::new(
        NodeProfile::new(
            NodeId::new(id),
            NetworkContact::ipv4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 5555)),
        ),
        GpsLocation::new(lat, lon),
    )
}

struct Overlay {
    node: Node,
    db: Arc<MemorySpatialDb>,
    factory: Arc<NullConnectionFactory>,
}

fn overlay(self_info: NodeInfo, seeds: Vec<NodeInfo>) -> Overlay {
    let db = Arc::new(MemorySpatialDb::new(self_info.location));
    let factory = Arc::new(NullConnectionFactory::new());
    let node = Node::new(
        self_info,
        Arc::clone(&db) as _,
        Arc::clone(&factory) as _,
        seeds,
    )
    .unwrap();
    Overlay { node, db, factory }
}

// ── Founding ────────────────────────────────────────────────────────────

#[tokio::test]
async fn founding_node_bootstraps_with_empty_views() {
    // Self is the first entry of the seed list; every seed is unreachable.
    let seeds = vec![info("FirstSeedNodeId", 1.0, 2.0), info("SecondSeedNodeId", 3.0, 4.0)];
    let o = overlay(info("FirstSeedNodeId", 1.0, 2.0), seeds);

    o.node.bootstrap().await.expect("founding bootstrap must succeed");

    assert_eq!(o.node.node_count(RelationType::Colleague).unwrap(), 0);
    assert_eq!(o.node.node_count(RelationType::Neighbour).unwrap(), 0);
    // The node still serves requests normally.
    assert_eq!(o.node.neighbourhood_radius_km().unwrap(), 0.0);
}

#[tokio::test]
async fn all_seeds_dead_is_fatal_for_a_non_founding_node() {
    let seeds = vec![info("FirstSeedNodeId", 1.0, 2.0), info("SecondSeedNodeId", 3.0, 4.0)];
    let o = overlay(info("stranger", 10.0, 10.0), seeds);

    let result = o.node.bootstrap().await;
    assert!(matches!(result, Err(NodeError::Discovery(_))));
    // Both seeds were actually tried.
    assert_eq!(o.factory.connect_attempts().len(), 2);
}

// ── Seed admission by distance ──────────────────────────────────────────

#[tokio::test]
async fn nearby_seed_is_stored_as_neighbour() {
    let seed = info("FirstSeedNodeId", 1.0, 2.0);
    let o = overlay(info("self", 1.0, 2.0), vec![seed.clone()]);

    let remote = Arc::new(
        NullRemoteNode::new()
            .with_colleague_count(1)
            .with_random_nodes(vec![info("far", 50.0, 50.0)])
            .with_closest_nodes(vec![seed.clone()]),
    );
    o.factory.register(seed.id().clone(), Arc::clone(&remote));

    o.node.bootstrap().await.expect("bootstrap");

    // Distance 0 < 100 km: the seed lands in the neighbourhood view.
    assert_eq!(o.node.node_count(RelationType::Neighbour).unwrap(), 1);
    assert_eq!(o.node.node_count(RelationType::Colleague).unwrap(), 0);
    assert!(remote.accept_neighbour_calls() >= 1);
    assert_eq!(remote.accept_colleague_calls(), 0);
}

#[tokio::test]
async fn distant_seed_is_stored_as_colleague() {
    let seed = info("FirstSeedNodeId", 1.0, 2.0);
    let o = overlay(info("self", 50.0, 50.0), vec![seed.clone()]);

    let remote = Arc::new(
        NullRemoteNode::new()
            .with_colleague_count(1)
            .with_random_nodes(vec![info("far", 40.0, -40.0)])
            .with_closest_nodes(vec![seed.clone()]),
    );
    o.factory.register(seed.id().clone(), Arc::clone(&remote));

    o.node.bootstrap().await.expect("bootstrap");

    assert_eq!(o.node.node_count(RelationType::Colleague).unwrap(), 1);
    assert_eq!(o.node.node_count(RelationType::Neighbour).unwrap(), 0);
    assert_eq!(remote.accept_colleague_calls(), 1);
    // The BFS rejected the distant seed locally, before any handshake.
    assert_eq!(remote.accept_neighbour_calls(), 0);
}

// ── World fill ──────────────────────────────────────────────────────────

#[tokio::test]
async fn world_fill_admits_candidates_until_the_target() {
    let seed = info("FirstSeedNodeId", 1.0, 2.0);
    let o = overlay(info("self", 0.0, 0.0), vec![seed.clone()]);

    // Candidates spread far enough apart that no bubbles collide.
    let candidates = vec![
        info("x1", 40.0, 40.0),
        info("x2", 40.0, -40.0),
        info("x3", -40.0, 40.0),
        info("x4", -40.0, -40.0),
    ];
    let fakes: Vec<Arc<NullRemoteNode>> = candidates
        .iter()
        .map(|c| {
            let fake = Arc::new(NullRemoteNode::new());
            o.factory.register(c.id().clone(), Arc::clone(&fake));
            fake
        })
        .collect();

    // The seed advertises a world of 4: the fill target is 3.
    let remote = Arc::new(
        NullRemoteNode::new()
            .with_colleague_count(4)
            .with_random_nodes(candidates.clone())
            .with_closest_nodes(vec![seed.clone()]),
    );
    o.factory.register(seed.id().clone(), remote);

    o.node.bootstrap().await.expect("bootstrap");

    // Seed + 3 filled candidates.
    assert_eq!(o.node.node_count(RelationType::Colleague).unwrap(), 4);
    let handshakes: usize = fakes.iter().map(|f| f.accept_colleague_calls()).sum();
    assert_eq!(handshakes, 3, "exactly three candidates were asked");
}

#[tokio::test]
async fn world_fill_surfaces_failure_instead_of_spinning() {
    let seed = info("FirstSeedNodeId", 1.0, 2.0);
    let o = overlay(info("self", 0.0, 0.0), vec![seed.clone()]);

    // The only candidate on offer refuses every handshake, and the seed
    // keeps serving that same candidate: the fill can never make progress.
    let stubborn = info("stubborn", 30.0, 30.0);
    let refusing = Arc::new(NullRemoteNode::new().refusing_colleagues());
    o.factory.register(stubborn.id().clone(), Arc::clone(&refusing));

    let remote = Arc::new(
        NullRemoteNode::new()
            .with_colleague_count(10)
            .with_random_nodes(vec![stubborn])
            .with_closest_nodes(vec![seed.clone()]),
    );
    o.factory.register(seed.id().clone(), remote);

    let result = o.node.bootstrap().await;
    assert!(matches!(result, Err(NodeError::Discovery(_))));
    assert!(refusing.accept_colleague_calls() >= 1);
}

// ── Neighbourhood discovery ─────────────────────────────────────────────

#[tokio::test]
async fn greedy_descent_walks_to_the_fixed_point() {
    // Founding world phase, then descent P1 → P2 → P3 (fixed point).
    let o = overlay(info("FirstSeedNodeId", 0.0, 0.0), vec![info("FirstSeedNodeId", 0.0, 0.0)]);

    let p1 = info("p1", 0.0, 0.5);
    let p2 = info("p2", 0.0, 0.3);
    let p3 = info("p3", 0.0, 0.2);
    o.db.store(NodeDbEntry::new(
        p1.clone(),
        RelationType::Neighbour,
        RoleType::Acceptor,
    ))
    .unwrap();

    let r1 = Arc::new(NullRemoteNode::new().with_closest_nodes(vec![p2.clone()]));
    let r2 = Arc::new(NullRemoteNode::new().with_closest_nodes(vec![p3.clone()]));
    let r3 = Arc::new(NullRemoteNode::new().with_closest_nodes(vec![p3.clone()]));
    o.factory.register(p1.id().clone(), Arc::clone(&r1));
    o.factory.register(p2.id().clone(), Arc::clone(&r2));
    o.factory.register(p3.id().clone(), Arc::clone(&r3));

    o.node.bootstrap().await.expect("bootstrap");

    // The descent dialled p1, p2, p3; the BFS dialled p3 again.
    let attempts = o.factory.connect_attempts();
    let ids: Vec<&str> = attempts.iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p3"]);

    // Only the fixed point entered the BFS frontier and was admitted.
    assert_eq!(r3.accept_neighbour_calls(), 1);
    assert_eq!(r1.accept_neighbour_calls(), 0);
    assert_eq!(r2.accept_neighbour_calls(), 0);
    assert_eq!(o.node.node_count(RelationType::Neighbour).unwrap(), 2);
}

#[tokio::test]
async fn full_neighbourhood_stops_the_expansion_before_any_handshake() {
    let o = overlay(info("FirstSeedNodeId", 0.0, 0.0), vec![info("FirstSeedNodeId", 0.0, 0.0)]);

    // A full neighbourhood, nearest first.
    for i in 0..NEIGHBOURHOOD_MAX_NODE_COUNT {
        o.db.store(NodeDbEntry::new(
            info(&format!("n{i:03}"), 0.0, 0.0001 * (i as f64 + 1.0)),
            RelationType::Neighbour,
            RoleType::Acceptor,
        ))
        .unwrap();
    }

    let nearest = info("n000", 0.0, 0.0001);
    let remote = Arc::new(NullRemoteNode::new().with_closest_nodes(vec![nearest.clone()]));
    o.factory.register(nearest.id().clone(), Arc::clone(&remote));

    o.node.bootstrap().await.expect("bootstrap");

    // The 101st admission never happens: the cap check precedes the dial,
    // so the only connection was the greedy-descent hop.
    assert_eq!(o.factory.connect_attempts().len(), 1);
    assert_eq!(remote.handshake_calls(), 0);
    assert_eq!(
        o.node.node_count(RelationType::Neighbour).unwrap(),
        NEIGHBOURHOOD_MAX_NODE_COUNT
    );
}

#[tokio::test]
async fn unreachable_closest_node_aborts_neighbourhood_discovery() {
    let o = overlay(info("FirstSeedNodeId", 0.0, 0.0), vec![info("FirstSeedNodeId", 0.0, 0.0)]);
    // One known peer, but nothing answers at its contact.
    o.db.store(NodeDbEntry::new(
        info("gone", 0.0, 0.5),
        RelationType::Neighbour,
        RoleType::Acceptor,
    ))
    .unwrap();

    let result = o.node.bootstrap().await;
    assert!(matches!(result, Err(NodeError::Discovery(_))));
}

#[tokio::test]
async fn bootstrap_is_skipped_when_the_world_view_is_populated() {
    let o = overlay(info("self", 0.0, 0.0), vec![info("FirstSeedNodeId", 1.0, 2.0)]);
    o.db.store(NodeDbEntry::new(
        info("existing", 40.0, 40.0),
        RelationType::Colleague,
        RoleType::Acceptor,
    ))
    .unwrap();

    // No seed is reachable, yet bootstrap succeeds: discovery is skipped.
    o.node.bootstrap().await.expect("bootstrap");
    assert!(o.factory.connect_attempts().is_empty());
}
