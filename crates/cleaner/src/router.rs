use generational_arena::{Arena, Index};
use hass_energy_proto::EntityId;
use std::{collections::BTreeMap, sync::Arc};

/// Keys a routed value is reachable by.
#[derive(Debug, Clone)]
pub(crate) struct Routes {
	pub device_id: Arc<str>,
	pub raw_entity_id: EntityId,
	pub entity_ids: Vec<EntityId>,
}

#[derive(Debug)]
struct Node<T> {
	routes: Routes,
	value: T,
}

/// Owns the managed devices and finds them by raw entity, managed entity or
/// device id.
///
/// Several devices may share a raw entity, so raw lookups yield every match.
/// Managed entity ids and device ids are unique; inserting a second value
/// under the same key replaces the route, not the earlier value.
#[derive(Debug)]
pub(crate) struct Router<T> {
	arena: Arena<Node<T>>,
	raw: BTreeMap<EntityId, Vec<Index>>,
	entities: BTreeMap<EntityId, Index>,
	devices: BTreeMap<Arc<str>, Index>,
}

impl<T> Default for Router<T> {
	fn default() -> Self {
		Self {
			arena: Arena::new(),
			raw: BTreeMap::new(),
			entities: BTreeMap::new(),
			devices: BTreeMap::new(),
		}
	}
}

impl<T> Router<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, routes: Routes, value: T) -> Index {
		let id = self.arena.insert(Node {
			routes: routes.clone(),
			value,
		});

		self.raw.entry(routes.raw_entity_id).or_default().push(id);
		for entity_id in routes.entity_ids {
			self.entities.insert(entity_id, id);
		}
		self.devices.insert(routes.device_id, id);

		id
	}

	pub fn remove(&mut self, id: Index) -> Option<T> {
		let Node { routes, value } = self.arena.remove(id)?;

		if let Some(nodes) = self.raw.get_mut(&routes.raw_entity_id) {
			nodes.retain(|node| *node != id);
			if nodes.is_empty() {
				self.raw.remove(&routes.raw_entity_id);
			}
		}

		for entity_id in &routes.entity_ids {
			if self.entities.get(entity_id) == Some(&id) {
				self.entities.remove(entity_id);
			}
		}

		if self.devices.get(&routes.device_id) == Some(&id) {
			self.devices.remove(&routes.device_id);
		}

		Some(value)
	}

	pub fn by_raw(&self, raw_entity_id: &EntityId) -> Vec<Index> {
		self
			.raw
			.get(raw_entity_id)
			.map(|nodes| nodes.to_vec())
			.unwrap_or_default()
	}

	pub fn by_entity(&self, entity_id: &EntityId) -> Option<Index> {
		self.entities.get(entity_id).copied()
	}

	pub fn by_device(&self, device_id: &str) -> Option<Index> {
		self.devices.get(device_id).copied()
	}

	pub fn get(&self, id: Index) -> Option<&T> {
		self.arena.get(id).map(|node| &node.value)
	}

	pub fn get_mut(&mut self, id: Index) -> Option<&mut T> {
		self.arena.get_mut(id).map(|node| &mut node.value)
	}

	pub fn values(&self) -> impl Iterator<Item = &T> {
		self.arena.iter().map(|(_, node)| &node.value)
	}

	pub fn len(&self) -> usize {
		self.arena.len()
	}

	/// Remove everything, handing back the values.
	pub fn drain(&mut self) -> Vec<T> {
		self.raw.clear();
		self.entities.clear();
		self.devices.clear();
		self.arena.drain().map(|(_, node)| node.value).collect()
	}
}
