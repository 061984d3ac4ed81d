//! Partition of one race's results into rating cohorts

use crate::cohort::division::DivisionKey;
use crate::config::RatingConfig;
use crate::types::RaceResult;
use std::collections::BTreeMap;
use tracing::debug;

/// One division of one race, with the set it is compared against
#[derive(Debug, Clone)]
pub struct Cohort<'a> {
    pub label: String,
    /// Results of this division, in source order
    pub members: Vec<&'a RaceResult>,
    /// Labels of borrowed neighbour divisions (empty when not extended)
    pub neighbors: Vec<String>,
    /// Members followed by borrowed neighbour results; used only for seed and rank math
    pub comparison: Vec<&'a RaceResult>,
    /// Comparison size padded up to the minimum group size
    pub virtual_size: usize,
}

impl<'a> Cohort<'a> {
    pub fn real_size(&self) -> usize {
        self.members.len()
    }

    pub fn comparison_size(&self) -> usize {
        self.comparison.len()
    }

    pub fn is_extended(&self) -> bool {
        !self.neighbors.is_empty()
    }
}

/// Groups results by division label
#[derive(Debug, Clone)]
pub struct CohortGrouper {
    min_group_size: usize,
    extend: bool,
}

impl CohortGrouper {
    pub fn new(min_group_size: usize, extend: bool) -> Self {
        Self {
            min_group_size,
            extend,
        }
    }

    pub fn from_config(config: &RatingConfig) -> Self {
        Self::new(config.min_group_size, config.extend_cohorts)
    }

    /// Bucket a race's results; cohorts come out ordered by label
    pub fn group<'a>(&self, results: &'a [RaceResult]) -> Vec<Cohort<'a>> {
        let mut by_label: BTreeMap<&'a str, Vec<&'a RaceResult>> = BTreeMap::new();
        for result in results {
            by_label
                .entry(result.cohort.as_str())
                .or_default()
                .push(result);
        }

        let neighbors = if self.extend {
            Self::neighbor_labels(by_label.keys().copied())
        } else {
            BTreeMap::new()
        };

        by_label
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(label, members)| {
                let borrowed: Vec<&'a str> = neighbors.get(label).cloned().unwrap_or_default();

                let mut comparison = members.clone();
                for neighbor in &borrowed {
                    if let Some(neighbor_members) = by_label.get(neighbor) {
                        comparison.extend(neighbor_members.iter().copied());
                    }
                }

                let virtual_size = comparison.len().max(self.min_group_size);
                debug!(
                    "cohort {} real size: {} comparison: {} virtual: {} neighbors: {:?}",
                    label,
                    members.len(),
                    comparison.len(),
                    virtual_size,
                    borrowed
                );

                Cohort {
                    label: label.to_string(),
                    members: members.clone(),
                    neighbors: borrowed.iter().map(|n| n.to_string()).collect(),
                    comparison,
                    virtual_size,
                }
            })
            .collect()
    }

    /// Immediate lower and upper orderable divisions of the same gender
    fn neighbor_labels<'a>(
        labels: impl Iterator<Item = &'a str>,
    ) -> BTreeMap<&'a str, Vec<&'a str>> {
        let mut ordered: Vec<(DivisionKey, &'a str)> = labels
            .filter_map(|label| DivisionKey::parse(label).map(|key| (key, label)))
            .collect();
        ordered.sort();

        let mut neighbors = BTreeMap::new();
        for (i, (key, label)) in ordered.iter().enumerate() {
            let mut borrowed = Vec::new();
            if i > 0 && ordered[i - 1].0.gender == key.gender {
                borrowed.push(ordered[i - 1].1);
            }
            if let Some((next_key, next_label)) = ordered.get(i + 1) {
                if next_key.gender == key.gender {
                    borrowed.push(*next_label);
                }
            }
            neighbors.insert(*label, borrowed);
        }
        neighbors
    }
}
