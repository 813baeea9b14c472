//! DynDCOP - a constraint problem that changes over simulated cycles.
//!
//! Modeled as an ordered sequence of `(start_cycle, snapshot)` pairs. For a
//! cycle `c` the active snapshot is the last entry whose `start_cycle <= c`.
//! Model and Simulator both go through [`DynDcop::activate`] so they always
//! agree on which snapshot is active.

use crate::error::CoreError;

use pydynds_env::DcopSnapshot;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One snapshot and the cycle it becomes active at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynDcopEntry {
    pub start_cycle: u64,
    pub dcop: DcopSnapshot,
}

impl DynDcopEntry {
    pub fn new(start_cycle: u64, dcop: DcopSnapshot) -> Self {
        Self { start_cycle, dcop }
    }
}

/// Result of looking up the active snapshot for a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activation<'a> {
    /// Position of the active entry in the sequence.
    pub index: Option<usize>,

    pub entry: Option<&'a DynDcopEntry>,

    /// True when no entry starts after the active one.
    pub finished: bool,
}

/// On-disk layout: `{"snapshots": [{"start_cycle": 0, "dcop": {...}}, ...]}`.
#[derive(Debug, Serialize, Deserialize)]
struct DynDcopFile {
    snapshots: Vec<DynDcopEntry>,
}

/// Immutable, ordered snapshot sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DynDcop {
    entries: Vec<DynDcopEntry>,
}

impl DynDcop {
    /// Builds a DynDCOP, rejecting empty or unordered sequences.
    pub fn new(entries: Vec<DynDcopEntry>) -> Result<Self, CoreError> {
        if entries.is_empty() {
            return Err(CoreError::EmptyDynDcop);
        }
        for (index, pair) in entries.windows(2).enumerate() {
            if pair[1].start_cycle <= pair[0].start_cycle {
                return Err(CoreError::UnorderedStartCycle {
                    index: index + 1,
                    start_cycle: pair[1].start_cycle,
                    previous: pair[0].start_cycle,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Parses the JSON layout.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let file: DynDcopFile = serde_json::from_str(json)?;
        Self::new(file.snapshots)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serializes back to the JSON layout.
    pub fn to_json_string(&self) -> Result<String, CoreError> {
        let file = DynDcopFile {
            snapshots: self.entries.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn entries(&self) -> &[DynDcopEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start cycle of the last snapshot.
    pub fn last_start_cycle(&self) -> u64 {
        self.entries.last().map_or(0, |entry| entry.start_cycle)
    }

    /// Index of the entry active at `cycle`, if any has started yet.
    pub fn active_index(&self, cycle: u64) -> Option<usize> {
        let started = self.entries.partition_point(|entry| entry.start_cycle <= cycle);
        started.checked_sub(1)
    }

    /// Snapshot active at `cycle`.
    pub fn active_at(&self, cycle: u64) -> Option<&DcopSnapshot> {
        self.active_index(cycle).map(|index| &self.entries[index].dcop)
    }

    /// Looks up the active entry and whether the sequence is exhausted.
    pub fn activate(&self, cycle: u64) -> Activation<'_> {
        let index = self.active_index(cycle);
        Activation {
            index,
            entry: index.map(|i| &self.entries[i]),
            finished: index == Some(self.entries.len() - 1),
        }
    }
}
