//! Recorded tracking datasets.
//!
//! Two on-disk shapes exist:
//!
//! - **Raw export**: the document-store dump produced by the tracker. Each
//!   frame carries an extended-JSON timestamp and a map of instances with
//!   whatever fields the tracker emitted.
//!   ```text
//!   [{ "timestamp": { "$date": { "$numberLong": "1662896400000" } },
//!      "instances": { "7": { "pos_x": 1.2, "pos_y": 3.4, ..., "track_age": 12 } } }, ...]
//!   ```
//! - **Cleaned dataset**: one object per frame with a plain millisecond
//!   timestamp and only the measurement fields the dashboard uses.
//!   ```text
//!   [{ "timestamp": 1662896400000,
//!      "instances": { "7": { "pos_x": 1.2, "pos_y": 3.4, "vel_x": ..., "confidence": ... } } }, ...]
//!   ```
//!
//! [`convert_export`] turns the first into the second. Instance order inside a
//! frame is preserved; it decides the `human_id` assigned during replay.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};
use trackview_core::record::{parse_timestamp, RawRow};

use crate::error::ReplayError;

/// Measurement fields kept for each tracked instance.
///
/// Values stay untyped here; typing happens at the store boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceFields {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub pos_x: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub pos_y: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub vel_x: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub vel_y: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub confidence: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub sensors: Value,
}

impl InstanceFields {
    /// Picks the known fields out of an arbitrary instance object.
    pub fn pick(value: &Value) -> Self {
        let field = |name: &str| value.get(name).cloned().unwrap_or(Value::Null);
        Self {
            pos_x: field("pos_x"),
            pos_y: field("pos_y"),
            vel_x: field("vel_x"),
            vel_y: field("vel_y"),
            confidence: field("confidence"),
            sensors: field("sensors"),
        }
    }
}

/// One tracked instance inside a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Tracker-assigned key of the instance within the frame
    pub key: String,
    pub fields: InstanceFields,
}

/// All detections sharing one timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Milliseconds since epoch; `None` (serialized as `null`) if the export
    /// had no readable timestamp
    pub timestamp: Option<u64>,

    #[serde(default, with = "instance_map")]
    pub instances: Vec<Instance>,
}

impl Frame {
    /// Store rows for this frame, one per instance. `human_id` is the
    /// instance's position within the frame.
    pub fn rows(&self) -> impl Iterator<Item = RawRow> + '_ {
        let timestamp = self.timestamp.map(Value::from).unwrap_or(Value::Null);
        self.instances.iter().enumerate().map(move |(idx, inst)| RawRow {
            human_id: idx as u32,
            timestamp: timestamp.clone(),
            pos_x: inst.fields.pos_x.clone(),
            pos_y: inst.fields.pos_y.clone(),
            vel_x: inst.fields.vel_x.clone(),
            vel_y: inst.fields.vel_y.clone(),
            confidence: inst.fields.confidence.clone(),
        })
    }
}

/// A cleaned dataset: frames in recording order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    frames: Vec<Frame>,
}

impl Dataset {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of instances across all frames.
    pub fn instance_count(&self) -> usize {
        self.frames.iter().map(|f| f.instances.len()).sum()
    }

    /// Time span covered by frames with a valid timestamp.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        let mut stamps = self.frames.iter().filter_map(|f| f.timestamp);
        let first = stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    /// Loads a cleaned dataset.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let dataset: Dataset = serde_json::from_reader(reader)?;
        debug!(frames = dataset.len(), path = %path.as_ref().display(), "dataset loaded");
        Ok(dataset)
    }

    /// Writes the dataset as pretty-printed JSON.
    pub fn write_pretty(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Converts a raw tracker export into a cleaned dataset.
pub fn convert_export<R: Read>(reader: R) -> Result<Dataset, ReplayError> {
    let root: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = root else {
        return Err(ReplayError::Dataset(format!(
            "expected a top-level array of frames, found {}",
            kind_of(&root)
        )));
    };

    let frames: Vec<Frame> = items.iter().map(convert_frame).collect();
    let missing = frames.iter().filter(|f| f.timestamp.is_none()).count();
    if missing > 0 {
        warn!(missing, "frames without a readable timestamp");
    }
    Ok(Dataset::new(frames))
}

/// Converts one raw export frame.
pub fn convert_frame(value: &Value) -> Frame {
    let timestamp = value
        .pointer("/timestamp/$date/$numberLong")
        .or_else(|| value.pointer("/timestamp/$date"))
        .and_then(parse_timestamp);

    let instances = match value.get("instances") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, inst)| Instance {
                key: key.clone(),
                fields: InstanceFields::pick(inst),
            })
            .collect(),
        _ => Vec::new(),
    };

    Frame {
        timestamp,
        instances,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// (De)serializes instances as an ordered JSON object keyed by instance key.
mod instance_map {
    use super::{Instance, InstanceFields};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::{Map, Value};

    pub fn serialize<S: Serializer>(instances: &[Instance], s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(instances.len()))?;
        for inst in instances {
            map.serialize_entry(&inst.key, &inst.fields)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Instance>, D::Error> {
        let map = Option::<Map<String, Value>>::deserialize(d)?.unwrap_or_default();
        Ok(map
            .into_iter()
            .map(|(key, value)| Instance {
                key,
                fields: InstanceFields::pick(&value),
            })
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
