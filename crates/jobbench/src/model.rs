//! Strongly-typed job model.
//!
//! Mirrors the job document the template describes. Records are generated
//! and stored as untyped JSON; this model is used to validate a template up
//! front and to decode records when a caller wants typed access.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A transport job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    pub job_id: u64,
    pub transport_id: i64,
    pub customer_name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(with = "timestamp")]
    pub time1: NaiveDateTime,
    pub time2: Option<String>,
    pub time3: Option<String>,
    pub service_fee: Option<String>,
    pub service_fee_value: f64,
    pub line_info: Option<String>,
    pub instruction: Option<String>,
    pub phone_number: Option<String>,
    pub test6: Option<String>,
    pub test7: Option<String>,
    pub test8: Option<String>,
    pub test9: Option<String>,
    pub test10: bool,
    pub test11: Option<String>,
    pub test12: Option<String>,
    pub test13: Option<String>,
    #[serde(with = "timestamp")]
    pub time4: NaiveDateTime,
    pub cost: f64,
}

/// A stop on a job's route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    pub address: Option<Address>,
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,
    pub test: Option<String>,
    pub test2: i64,
    pub test3: Option<String>,
    pub driver_assistance: Option<String>,
    pub test4: Option<i64>,
    pub test5: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    pub geo_location: Option<GeoLocation>,
    pub id: i64,
    pub road_name: Option<String>,
    pub number: Option<String>,
    pub muni: Option<String>,
    pub city: Option<String>,
    pub reference: Option<String>,
    pub comment: Option<String>,
    pub name: Option<String>,
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Timestamps appear both with and without an offset; both decode to UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(NAIVE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, NAIVE_FORMAT))
            .map_err(serde::de::Error::custom)
    }
}
