//! In-memory spatial database.
//!
//! A mutex-guarded map keyed by [`NodeId`] with the neighbourhood radius
//! cached across mutations. Thread-safe for use from concurrent request
//! handlers and the discovery task.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::seq::SliceRandom;

use meridian_types::{
    Distance, GpsLocation, NeighboursFilter, NodeDbEntry, NodeId, NodeInfo, RelationType,
};

use crate::error::StoreError;
use crate::geo;
use crate::SpatialDatabase;

struct Inner {
    entries: HashMap<NodeId, NodeDbEntry>,
    /// Cached maximum self-distance over current Neighbours.
    neighbourhood_radius_km: Distance,
}

/// The bundled spatial database backend.
pub struct MemorySpatialDb {
    /// Location of the owning node; neighbourhood radius is measured from here.
    home: GpsLocation,
    inner: Mutex<Inner>,
}

impl MemorySpatialDb {
    pub fn new(home: GpsLocation) -> Self {
        Self {
            home,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                neighbourhood_radius_km: 0.0,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("spatial database lock poisoned".into()))
    }

    fn recompute_radius(home: &GpsLocation, inner: &mut Inner) {
        inner.neighbourhood_radius_km = inner
            .entries
            .values()
            .filter(|e| e.relation == RelationType::Neighbour)
            .map(|e| geo::distance_km(home, &e.info.location))
            .fold(0.0, Distance::max);
    }
}

impl SpatialDatabase for MemorySpatialDb {
    fn store(&self, entry: NodeDbEntry) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let id = entry.info.id().clone();
        let touches_neighbours = entry.relation == RelationType::Neighbour
            || matches!(
                inner.entries.get(&id),
                Some(old) if old.relation == RelationType::Neighbour
            );
        inner.entries.insert(id, entry);
        if touches_neighbours {
            Self::recompute_radius(&self.home, &mut inner);
        }
        Ok(true)
    }

    fn load(&self, id: &NodeId) -> Result<Option<NodeInfo>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.entries.get(id).map(|e| e.info.clone()))
    }

    fn update(&self, info: &NodeInfo) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let relation = match inner.entries.get_mut(info.id()) {
            Some(entry) => {
                entry.info = info.clone();
                entry.relation
            }
            None => return Ok(false),
        };
        if relation == RelationType::Neighbour {
            Self::recompute_radius(&self.home, &mut inner);
        }
        Ok(true)
    }

    fn remove(&self, id: &NodeId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.entries.remove(id) {
            Some(removed) => {
                if removed.relation == RelationType::Neighbour {
                    Self::recompute_radius(&self.home, &mut inner);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn node_count(&self, relation: RelationType) -> Result<usize, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .values()
            .filter(|e| e.relation == relation)
            .count())
    }

    fn neighbourhood_radius_km(&self) -> Result<Distance, StoreError> {
        let inner = self.lock()?;
        Ok(inner.neighbourhood_radius_km)
    }

    fn random_nodes(
        &self,
        max_count: usize,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, StoreError> {
        let inner = self.lock()?;
        let mut matching: Vec<&NodeDbEntry> = inner
            .entries
            .values()
            .filter(|e| filter.matches(e.relation))
            .collect();
        matching.shuffle(&mut rand::thread_rng());
        Ok(matching
            .into_iter()
            .take(max_count)
            .map(|e| e.info.clone())
            .collect())
    }

    fn closest_nodes(
        &self,
        center: &GpsLocation,
        radius_km: Distance,
        max_count: usize,
        filter: NeighboursFilter,
    ) -> Result<Vec<NodeInfo>, StoreError> {
        let inner = self.lock()?;
        let mut matching: Vec<(Distance, &NodeDbEntry)> = inner
            .entries
            .values()
            .filter(|e| filter.matches(e.relation))
            .map(|e| (geo::distance_km(center, &e.info.location), e))
            .filter(|(d, _)| *d <= radius_km)
            .collect();
        matching.sort_by(|(da, ea), (db, eb)| {
            da.total_cmp(db).then_with(|| ea.info.id().cmp(eb.info.id()))
        });
        Ok(matching
            .into_iter()
            .take(max_count)
            .map(|(_, e)| e.info.clone())
            .collect())
    }
}
