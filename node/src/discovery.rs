//! Network discovery: populating the world and neighbourhood views.
//!
//! World discovery contacts seed peers to learn the advertised world size
//! and an initial candidate list, then fills the Colleague view towards the
//! target rate. Neighbourhood discovery descends greedily towards the peer
//! closest to our own location and expands from its fixed point with a BFS
//! until the Neighbour view is full or the frontier runs dry.

use std::collections::{HashSet, VecDeque};

use rand::seq::SliceRandom;

use meridian_types::{
    Distance, NeighboursFilter, NodeDbEntry, NodeId, NodeInfo, RelationType, RoleType,
};

use crate::error::NodeError;
use crate::node::{
    Node, INIT_NEIGHBOURHOOD_QUERY_NODE_COUNT, INIT_WORLD_NODE_FILL_TARGET_RATE,
    INIT_WORLD_RANDOM_NODE_COUNT, NEIGHBOURHOOD_MAX_NODE_COUNT, NEIGHBOURHOOD_MAX_RANGE_KM,
};

/// Upper bound on consecutive fruitless admission/refill attempts during the
/// world fill phase. Exhausted or adversarial peers must surface failure
/// instead of spinning forever.
const WORLD_FILL_STALL_LIMIT: usize = 10 * INIT_WORLD_RANDOM_NODE_COUNT;

impl Node {
    /// Run network discovery unless the world view is already populated.
    ///
    /// Failure is fatal for a non-founding node: with no colleagues and no
    /// reachable seed there is no overlay to join.
    pub async fn bootstrap(&self) -> Result<(), NodeError> {
        if self.db().node_count(RelationType::Colleague)? > 0 {
            tracing::debug!("world view already populated, skipping discovery");
            return Ok(());
        }
        self.discover_world().await?;
        self.discover_neighbourhood().await?;
        Ok(())
    }

    /// Populate the Colleague view from the seed peers.
    pub(crate) async fn discover_world(&self) -> Result<(), NodeError> {
        let mut tried: Vec<NodeId> = Vec::new();
        let mut seed_colleague_count: u64 = 0;
        let mut candidates: Vec<NodeInfo> = Vec::new();

        // Seed phase: at most one attempt per seed, in random order.
        while tried.len() < self.seeds().len() {
            let seed = {
                let untried: Vec<&NodeInfo> = self
                    .seeds()
                    .iter()
                    .filter(|s| !tried.contains(s.id()))
                    .collect();
                match untried.choose(&mut rand::thread_rng()) {
                    Some(seed) => (*seed).clone(),
                    None => break,
                }
            };
            tried.push(seed.id().clone());

            let Some(connection) = self.safe_connect(&seed.profile).await else {
                continue;
            };

            // Query a target world size and an initial candidate list.
            let count = match connection.node_count(RelationType::Colleague).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(seed = %seed.id(), error = %e, "seed query failed, trying other seeds");
                    continue;
                }
            };
            let want = count.min(INIT_WORLD_RANDOM_NODE_COUNT as u64) as u32;
            let random = match connection
                .random_nodes(want, NeighboursFilter::Excluded)
                .await
            {
                Ok(nodes) => nodes,
                Err(e) => {
                    tracing::warn!(seed = %seed.id(), error = %e, "seed query failed, trying other seeds");
                    continue;
                }
            };

            // A reasonable response: stop contacting other seeds.
            if count > 0 && !random.is_empty() {
                seed_colleague_count = count;
                candidates = random;

                // Try to admit the seed itself into the fitting view.
                let distance = self
                    .db()
                    .distance_km(&self.info().location, &seed.location);
                let relation = if distance <= NEIGHBOURHOOD_MAX_RANGE_KM {
                    RelationType::Neighbour
                } else {
                    RelationType::Colleague
                };
                self.safe_store_node(
                    NodeDbEntry::new(seed.clone(), relation, RoleType::Initiator),
                    Some(connection),
                )
                .await;
                break;
            }
        }

        if seed_colleague_count == 0 && candidates.is_empty() && tried.len() == self.seeds().len()
        {
            let founding = self.seeds().iter().any(|s| s.id() == self.info().id());
            if !founding {
                tracing::error!("all seed nodes have been tried and failed, giving up");
                return Err(NodeError::Discovery("no seed node reachable".into()));
            }
            tracing::info!("no seed reachable, but this node is itself a seed: founding the network");
        }

        // Fill phase: admit colleagues until the target rate of the seed's
        // advertised world size is reached.
        let target = (INIT_WORLD_NODE_FILL_TARGET_RATE * seed_colleague_count as f64) as usize;
        let mut added = 0usize;
        let mut stalled = 0usize;

        while added < target {
            if stalled >= WORLD_FILL_STALL_LIMIT {
                tracing::error!(
                    added,
                    target,
                    "world discovery stalled with no admissible candidates, giving up"
                );
                return Err(NodeError::Discovery(
                    "world discovery ran out of admissible candidates".into(),
                ));
            }

            if let Some(candidate) = candidates.pop() {
                let entry =
                    NodeDbEntry::new(candidate, RelationType::Colleague, RoleType::Initiator);
                if self.safe_store_node(entry, None).await {
                    added += 1;
                    stalled = 0;
                } else {
                    stalled += 1;
                }
                continue;
            }

            // Ran out of candidates: ask a random known peer for more.
            let picked = self.db().random_nodes(1, NeighboursFilter::Excluded)?;
            let Some(pick) = picked.into_iter().next() else {
                tracing::error!("no known peers left to ask for candidates, giving up");
                return Err(NodeError::Discovery(
                    "world discovery exhausted all candidates".into(),
                ));
            };
            stalled += 1;
            let Some(connection) = self.safe_connect(&pick.profile).await else {
                continue;
            };
            match connection
                .random_nodes(INIT_WORLD_RANDOM_NODE_COUNT as u32, NeighboursFilter::Excluded)
                .await
            {
                Ok(nodes) => candidates = nodes,
                Err(e) => {
                    tracing::warn!(peer = %pick.id(), error = %e, "failed to fetch more random nodes");
                }
            }
        }

        tracing::info!(added, target, "world discovery finished");
        Ok(())
    }

    /// Populate the Neighbour view around our own location.
    pub(crate) async fn discover_neighbourhood(&self) -> Result<(), NodeError> {
        // Start from the closest node known to us so far.
        let start = self.db().closest_nodes(
            &self.info().location,
            Distance::MAX,
            1,
            NeighboursFilter::Included,
        )?;
        let Some(mut closest) = start.into_iter().next() else {
            // A founding node knows nobody: nothing to discover.
            tracing::debug!("no known peers, neighbourhood is trivially complete");
            return Ok(());
        };

        // Greedy descent: ask the closest node for an even closer one until
        // the answer stops changing. A peer echoing a node we already walked
        // through (ourselves included) counts as the fixed point.
        let mut walked: HashSet<NodeId> = HashSet::from([closest.id().clone()]);
        loop {
            let Some(connection) = self.safe_connect(&closest.profile).await else {
                return Err(NodeError::Discovery(format!(
                    "closest node {} is unreachable",
                    closest.id()
                )));
            };
            let reported = match connection
                .closest_nodes(
                    self.info().location,
                    Distance::MAX,
                    1,
                    NeighboursFilter::Included,
                )
                .await
            {
                Ok(nodes) => nodes,
                Err(e) => {
                    tracing::warn!(peer = %closest.id(), error = %e, "failed to fetch neighbours");
                    break;
                }
            };

            match reported.into_iter().next() {
                Some(node)
                    if node.id() != self.info().id() && walked.insert(node.id().clone()) =>
                {
                    closest = node;
                }
                _ => break,
            }
        }

        // BFS expansion from the fixed point. Queue duplicates are tolerated;
        // the visited check dedupes at dequeue.
        let mut queue: VecDeque<NodeInfo> = VecDeque::from([closest]);
        let mut visited: HashSet<NodeId> = HashSet::new();

        while let Some(candidate) = queue.pop_front() {
            if self.db().node_count(RelationType::Neighbour)? >= NEIGHBOURHOOD_MAX_NODE_COUNT {
                break;
            }
            if visited.contains(candidate.id()) {
                continue;
            }

            let Some(connection) = self.safe_connect(&candidate.profile).await else {
                continue;
            };

            // Try to admit the node, re-using the just-opened connection.
            self.safe_store_node(
                NodeDbEntry::new(
                    candidate.clone(),
                    RelationType::Neighbour,
                    RoleType::Initiator,
                ),
                Some(std::sync::Arc::clone(&connection)),
            )
            .await;

            // Ask the same peer for its closest nodes to us and widen the frontier.
            match connection
                .closest_nodes(
                    self.info().location,
                    Distance::MAX,
                    INIT_NEIGHBOURHOOD_QUERY_NODE_COUNT as u32,
                    NeighboursFilter::Included,
                )
                .await
            {
                Ok(more) => queue.extend(more),
                Err(e) => {
                    tracing::warn!(peer = %candidate.id(), error = %e, "failed to fetch neighbour candidates");
                }
            }

            visited.insert(candidate.id().clone());
        }

        tracing::info!(
            neighbours = self.db().node_count(RelationType::Neighbour)?,
            "neighbourhood discovery finished"
        );
        Ok(())
    }
}
