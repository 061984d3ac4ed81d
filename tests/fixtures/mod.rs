//! Test fixtures and race builders for integration testing

#![allow(dead_code)]

use chrono::NaiveDate;
use triscore::types::{FinishStatus, Placement, Race, RaceInfo, RaceResult, MAX_TIME};

/// Builder for one race; results must be added in division finishing order
pub struct RaceBuilder {
    info: RaceInfo,
    results: Vec<RaceResult>,
}

impl RaceBuilder {
    pub fn new(name: &str, date: &str, race_type: &str) -> Self {
        Self {
            info: RaceInfo {
                name: name.to_string(),
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                race_type: race_type.to_string(),
                country: "GER".to_string(),
            },
            results: Vec::new(),
        }
    }

    pub fn finisher(mut self, athlete_id: &str, cohort: &str, finish_time: u32) -> Self {
        self.results
            .push(result(athlete_id, cohort, FinishStatus::Ok, finish_time));
        self
    }

    pub fn non_finisher(mut self, athlete_id: &str, cohort: &str, status: FinishStatus) -> Self {
        self.results
            .push(result(athlete_id, cohort, status, MAX_TIME));
        self
    }

    pub fn build(self) -> Race {
        Race {
            info: self.info,
            results: self.results,
        }
    }
}

pub fn result(athlete_id: &str, cohort: &str, status: FinishStatus, finish_time: u32) -> RaceResult {
    RaceResult {
        athlete_id: athlete_id.to_string(),
        display_name: format!("Athlete {}", athlete_id),
        gender: cohort.chars().next().map(String::from).unwrap_or_default(),
        country: "GER".to_string(),
        bib: String::new(),
        cohort: cohort.to_string(),
        status,
        finish_time,
        division: Placement::default(),
        gender_place: Placement::default(),
        overall: Placement::default(),
        legs: vec![],
    }
}

/// A small season: three races, overlapping fields, one DNF and one DNS
pub fn season() -> Vec<Race> {
    vec![
        RaceBuilder::new("Challenge Roth", "2019-07-07", "full")
            .finisher("anna", "F30-34", 34_000)
            .finisher("berta", "F30-34", 35_500)
            .finisher("carla", "F30-34", 37_000)
            .non_finisher("dora", "F30-34", FinishStatus::Dnf)
            .finisher("emil", "M30-34", 31_000)
            .finisher("fritz", "M30-34", 31_900)
            .build(),
        RaceBuilder::new("Ironman 70.3 Kraichgau", "2019-06-02", "Half")
            .finisher("berta", "F30-34", 16_800)
            .finisher("anna", "F30-34", 17_100)
            .non_finisher("carla", "F30-34", FinishStatus::Dns)
            .finisher("fritz", "M30-34", 15_000)
            .finisher("emil", "M30-34", 15_400)
            .finisher("gustav", "M35-39", 15_900)
            .build(),
        RaceBuilder::new("Hamburg City Triathlon", "2019-07-14", "Olympic Distance")
            .finisher("anna", "F30-34", 7_600)
            .finisher("dora", "F30-34", 7_700)
            .finisher("emil", "M30-34", 6_900)
            .finisher("gustav", "M35-39", 7_000)
            .finisher("hans", "M35-39", 7_050)
            .build(),
    ]
}
