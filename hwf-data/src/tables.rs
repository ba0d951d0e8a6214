//! Row structs for the events and heatwave summary tables.
//!
//! All structs derive `Serialize` so they can be written with `csv` or
//! `serde_json` by whichever collaborator persists them.

use crate::aggregate::HeatwaveComponent;
use crate::pipeline::Detection;
use hwf_core::labels::Season;
use hwf_core::record::EventRecord;
use hwf_utils::dates::format_date;
use serde::Serialize;

/// One extreme event belonging to a retained heatwave.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventRow {
    /// Dense event id, ordered by (itime, x, y).
    pub id: usize,
    /// Component (heatwave) id.
    pub cp: u32,
    pub g_id: u32,
    pub x: u32,
    pub y: u32,
    pub longitude: f64,
    pub latitude: f64,
    /// Calendar date (YYYY-MM-DD).
    pub time: String,
    pub itime: u32,
    pub ytime: u32,
    /// Temperature in degrees Celsius.
    pub t2m: f64,
    /// Threshold the temperature was compared against.
    pub thresh: f64,
    pub magnitude: f64,
    /// Fixed meteorological season of the heatwave's mean day of year.
    pub season: Season,
    pub family: Option<u32>,
    pub family_name: Option<String>,
    pub subfamily: Option<u32>,
}

impl EventRow {
    pub fn new(event: &EventRecord, component: &HeatwaveComponent) -> Self {
        EventRow {
            id: event.id,
            cp: component.cp.0,
            g_id: event.g_id,
            x: event.cell.x,
            y: event.cell.y,
            longitude: event.longitude,
            latitude: event.latitude,
            time: format_date(&event.date),
            itime: event.itime,
            ytime: event.ytime,
            t2m: event.temperature,
            thresh: event.threshold,
            magnitude: event.magnitude,
            season: component.season(),
            family: component.family.as_ref().map(|f| f.id),
            family_name: component.family.as_ref().map(|f| f.name.clone()),
            subfamily: component.subfamily,
        }
    }
}

/// Summary of one retained heatwave.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeatwaveRow {
    pub cp: u32,
    pub n_events: usize,
    /// First day (YYYY-MM-DD).
    pub time_min: String,
    /// Last day (YYYY-MM-DD).
    pub time_max: String,
    pub itime_min: u32,
    pub itime_max: u32,
    /// Duration in days, first and last day included.
    pub timespan: u32,
    /// Number of distinct grid cells touched.
    pub n_unique_g_ids: usize,
    pub lat_mean: f64,
    pub lon_mean: f64,
    pub ytime_mean: f64,
    pub temperature_mean: f64,
    pub temperature_max: f64,
    /// Sum of member event magnitudes.
    pub magnitude_sum: f64,
    pub season: Season,
    pub family: Option<u32>,
    pub family_name: Option<String>,
    pub subfamily: Option<u32>,
}

impl From<&HeatwaveComponent> for HeatwaveRow {
    fn from(component: &HeatwaveComponent) -> Self {
        HeatwaveRow {
            cp: component.cp.0,
            n_events: component.n_events,
            time_min: format_date(&component.time_min),
            time_max: format_date(&component.time_max),
            itime_min: component.itime_min,
            itime_max: component.itime_max,
            timespan: component.timespan,
            n_unique_g_ids: component.n_unique_g_ids,
            lat_mean: component.lat_mean,
            lon_mean: component.lon_mean,
            ytime_mean: component.ytime_mean,
            temperature_mean: component.temperature_mean,
            temperature_max: component.temperature_max,
            magnitude_sum: component.magnitude_sum,
            season: component.season(),
            family: component.family.as_ref().map(|f| f.id),
            family_name: component.family.as_ref().map(|f| f.name.clone()),
            subfamily: component.subfamily,
        }
    }
}

pub fn event_rows(detection: &Detection) -> Vec<EventRow> {
    detection
        .heatwave_events()
        .map(|(event, component)| EventRow::new(event, component))
        .collect()
}

pub fn heatwave_rows(detection: &Detection) -> Vec<HeatwaveRow> {
    detection.heatwaves().map(HeatwaveRow::from).collect()
}
