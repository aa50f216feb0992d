use crate::host::StateStore;
use hass_energy_proto::{EntityId, EntityState};

/// Pick the cumulative energy sensor among the candidate entities of one
/// device.
///
/// A candidate qualifies when its current state has a kWh unit and the
/// `energy` device class. The first qualifying `total_increasing` sensor wins,
/// otherwise the first qualifying one. Candidates without a state are skipped.
pub fn find_energy_entity<'a, S>(
	states: &S,
	candidates: impl IntoIterator<Item = &'a EntityId>,
) -> Option<EntityId>
where
	S: StateStore + ?Sized,
{
	let mut fallback = None;

	for entity_id in candidates {
		let Some(state) = states.state(entity_id) else {
			continue;
		};

		if !is_energy_sensor(&state) {
			continue;
		}

		if state.attributes.state_class().is_total_increasing() {
			return Some(entity_id.clone());
		}

		fallback.get_or_insert_with(|| entity_id.clone());
	}

	fallback
}

fn is_energy_sensor(state: &EntityState) -> bool {
	state.attributes.energy_unit().is_some()
		&& state
			.attributes
			.device_class()
			.is_some_and(|class| class.is_energy())
}
