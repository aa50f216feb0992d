use clap::Parser;
use error_stack::{Report, ResultExt};
use hass_energy_cleaner::{
	CONF_BACKWARD_THRESHOLD_KWH, CONF_DROP_POLICY, CONF_FORWARD_OVERRIDES,
	CONF_FORWARD_THRESHOLD_KWH, CONF_REJECT_RUN_LIMIT, ConfigEntry, EnergyCleaner, HostEvent,
	SERVICE_RESET_FILTERED,
	host::{DeviceEntry, EntityEntry, MemoryHost},
	proto::{Attributes, EntityId, EntityState, state::STATE_UNAVAILABLE},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
	fs::File,
	io::{self, BufRead, BufReader, Write},
	path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, Registry, prelude::*};
use tracing_tree::HierarchicalLayer;

const ENTRY_ID: &str = "replay";
const DEVICE_ID: &str = "replay-plug";

#[derive(Debug, Error)]
enum ReplayError {
	#[error("open reading log")]
	OpenLog,

	#[error("read reading log")]
	ReadLog,

	#[error("parse reading log")]
	ParseRecord,

	#[error("set up energy cleaner")]
	Setup,

	#[error("no metering device was set up")]
	NoDevice,

	#[error("queue host event")]
	QueueEvent,

	#[error("write output")]
	WriteOutput,
}

/// Replay a log of raw energy readings through the filter and print the
/// states it writes, one JSON document per line.
#[derive(Debug, Parser)]
#[command(name = "energy-replay")]
struct Args {
	/// JSON-lines reading log, `-` for stdin
	log: PathBuf,

	/// Device name of the simulated plug
	#[arg(long, default_value = "Replay Plug")]
	name: String,

	/// Largest plausible increase between two readings, in kWh
	#[arg(long)]
	forward: Option<f64>,

	/// Largest tolerated decrease between two readings, in kWh
	#[arg(long)]
	backward: Option<f64>,

	/// Consecutive ignored readings before the raw value is adopted, 0 to never adopt
	#[arg(long)]
	reject_run_limit: Option<u32>,

	/// `rollover` or `reject`
	#[arg(long)]
	drop_policy: Option<String>,

	/// Per-device forward thresholds, `Name = value` separated by newlines
	#[arg(long)]
	forward_overrides: Option<String>,

	/// Also print the spike indicator states
	#[arg(long)]
	all: bool,
}

impl Args {
	fn entry_data(&self) -> Map<String, Value> {
		let mut data = Map::new();
		if let Some(forward) = self.forward {
			data.insert(CONF_FORWARD_THRESHOLD_KWH.into(), forward.into());
		}
		if let Some(backward) = self.backward {
			data.insert(CONF_BACKWARD_THRESHOLD_KWH.into(), backward.into());
		}
		if let Some(limit) = self.reject_run_limit {
			data.insert(CONF_REJECT_RUN_LIMIT.into(), limit.into());
		}
		if let Some(drop) = &self.drop_policy {
			data.insert(CONF_DROP_POLICY.into(), drop.as_str().into());
		}
		if let Some(overrides) = &self.forward_overrides {
			data.insert(CONF_FORWARD_OVERRIDES.into(), overrides.as_str().into());
		}
		data
	}
}

/// One line of the reading log.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record {
	Reading { state: RawValue },
	Reset,
	Options { options: Map<String, Value> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
	Number(f64),
	Text(String),
}

impl RawValue {
	fn into_state(self) -> String {
		match self {
			RawValue::Number(value) => value.to_string(),
			RawValue::Text(value) => value,
		}
	}
}

#[derive(Serialize)]
struct Output<'a> {
	entity_id: &'a EntityId,
	state: &'a str,
	attributes: &'a Attributes,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Report<ReplayError>> {
	Registry::default()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(HierarchicalLayer::new(2).with_writer(io::stderr))
		.init();

	let args = Args::parse();
	let records = read_records(&args.log)?;

	let host = MemoryHost::new();
	let raw_entity_id = simulate_plug(&host, &args.name);

	let data = args.entry_data();
	let mut cleaner = EnergyCleaner::setup(host, ConfigEntry::new(ENTRY_ID).with_data(data.clone()))
		.await
		.change_context(ReplayError::Setup)?;

	let filtered = cleaner
		.devices()
		.next()
		.map(|device| device.sensor().entity_id.clone())
		.ok_or_else(|| Report::new(ReplayError::NoDevice))?;

	let (sender, receiver) = flume::unbounded();
	for record in records {
		let event = match record {
			Record::Reading { state } => HostEvent::StateChanged {
				entity_id: raw_entity_id.clone(),
				new_state: Some(EntityState::new(state.into_state()).with_attributes(energy_attributes())),
			},
			Record::Reset => HostEvent::ServiceCall {
				service: SERVICE_RESET_FILTERED.into(),
				entity_id: filtered.clone(),
			},
			Record::Options { options } => HostEvent::OptionsUpdated(
				ConfigEntry::new(ENTRY_ID)
					.with_data(data.clone())
					.with_options(options),
			),
		};

		sender.send(event).change_context(ReplayError::QueueEvent)?;
	}
	drop(sender);

	cleaner.run(receiver).await;

	let stdout = io::stdout();
	let mut out = stdout.lock();
	for update in cleaner.host().written() {
		if !args.all && update.entity_id != filtered {
			continue;
		}

		let output = Output {
			entity_id: &update.entity_id,
			state: &update.state,
			attributes: &update.attributes,
		};
		serde_json::to_writer(&mut out, &output).change_context(ReplayError::WriteOutput)?;
		writeln!(out).change_context(ReplayError::WriteOutput)?;
	}

	if let Some(device) = cleaner.device(&filtered) {
		let state = device.state();
		info!(
			total = state.virtual_total(),
			spikes = state.spike_ignored_count(),
			"replay finished",
		);
	}

	Ok(())
}

fn read_records(path: &Path) -> Result<Vec<Record>, Report<ReplayError>> {
	let reader: Box<dyn BufRead> = if path == Path::new("-") {
		Box::new(io::stdin().lock())
	} else {
		let file = File::open(path)
			.change_context(ReplayError::OpenLog)
			.attach_printable_lazy(|| format!("path: {}", path.display()))?;
		Box::new(BufReader::new(file))
	};

	let mut records = Vec::new();
	for (index, line) in reader.lines().enumerate() {
		let line = line.change_context(ReplayError::ReadLog)?;
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let record = serde_json::from_str(line)
			.change_context(ReplayError::ParseRecord)
			.attach_printable_lazy(|| format!("line {}", index + 1))?;
		records.push(record);
	}

	Ok(records)
}

fn energy_attributes() -> Attributes {
	Attributes::new()
		.with(Attributes::UNIT_OF_MEASUREMENT, "kWh")
		.with(Attributes::DEVICE_CLASS, "energy")
		.with(Attributes::STATE_CLASS, "total_increasing")
}

/// Register a ZEN15 with a raw energy sensor that has not reported yet.
fn simulate_plug(host: &MemoryHost, name: &str) -> EntityId {
	let raw_entity_id = EntityId::from_parts("sensor", "replay_plug_electric_consumption_kwh");

	host.add_device(
		DeviceEntry::new(DEVICE_ID)
			.manufacturer("Zooz")
			.model("ZEN15")
			.name(name),
	);
	host.add_entity(EntityEntry::new(raw_entity_id.clone(), DEVICE_ID));
	host.set_state(
		raw_entity_id.clone(),
		EntityState::new(STATE_UNAVAILABLE).with_attributes(energy_attributes()),
	);

	raw_entity_id
}
