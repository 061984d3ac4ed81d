//! Race result sources
//!
//! A source hands the replay driver races oldest first. Races on the same
//! date are ordered by name so a replay over the same data is deterministic.

use crate::error::Result;
use crate::types::Race;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for ordered race providers
pub trait RaceResultSource: Send + Sync {
    /// Races oldest first, after skipping `skip` and taking at most `limit`
    fn races(&self, skip: usize, limit: Option<usize>) -> Result<Vec<Race>>;
}

/// Sort races by date, then name; stable for identical keys
pub fn sort_races(races: &mut [Race]) {
    races.sort_by(|a, b| {
        a.info
            .date
            .cmp(&b.info.date)
            .then_with(|| a.info.name.cmp(&b.info.name))
    });
}

fn window(races: Vec<Race>, skip: usize, limit: Option<usize>) -> Vec<Race> {
    races
        .into_iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Races held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRaceSource {
    races: Vec<Race>,
}

impl InMemoryRaceSource {
    pub fn new(mut races: Vec<Race>) -> Self {
        sort_races(&mut races);
        Self { races }
    }

    pub fn len(&self) -> usize {
        self.races.len()
    }

    pub fn is_empty(&self) -> bool {
        self.races.is_empty()
    }
}

impl RaceResultSource for InMemoryRaceSource {
    fn races(&self, skip: usize, limit: Option<usize>) -> Result<Vec<Race>> {
        Ok(window(self.races.clone(), skip, limit))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RaceFile {
    Many(Vec<Race>),
    One(Box<Race>),
}

/// Races read from a JSON file or a directory of JSON files
///
/// Each file holds either one race object or an array of races.
#[derive(Debug, Clone)]
pub struct JsonRaceSource {
    path: PathBuf,
}

impl JsonRaceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.path.is_dir() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.path)
            .with_context(|| format!("Failed to list races in {}", self.path.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to list races in {}", self.path.display()))?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(path: &Path) -> Result<Vec<Race>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read races from {}", path.display()))?;
        let parsed: RaceFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse races from {}", path.display()))?;

        Ok(match parsed {
            RaceFile::Many(races) => races,
            RaceFile::One(race) => vec![*race],
        })
    }
}

impl RaceResultSource for JsonRaceSource {
    fn races(&self, skip: usize, limit: Option<usize>) -> Result<Vec<Race>> {
        let mut races = Vec::new();
        for file in self.files()? {
            let loaded = Self::read_file(&file)?;
            debug!("loaded {} races from {}", loaded.len(), file.display());
            races.extend(loaded);
        }

        sort_races(&mut races);
        Ok(window(races, skip, limit))
    }
}
