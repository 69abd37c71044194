// lib.rs

pub use std::{
    net,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use askama::Template;
pub use chrono::{DateTime, Local};
pub use serde::{Deserialize, Serialize};
pub use tracing::*;

mod units;
pub use units::*;

mod config;
pub use config::*;

mod controller;
pub use controller::*;

mod state;
pub use state::*;

mod apiserver;
pub use apiserver::*;

pub const SW_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Readings as served by `/temp`, both in the display unit and in Kelvin.
#[derive(Clone, Debug, Serialize)]
pub struct TempValues {
    pub timestamp: i64,
    pub last_update: String,
    pub units: TempUnit,
    pub suffix: String,
    pub temperature: f64,
    pub setpoint: f64,
    pub temperature_k: Kelvin,
    pub setpoint_k: Kelvin,
}

impl TempValues {
    pub fn new(units: TempUnit, temperature: Kelvin, setpoint: Kelvin) -> Self {
        let now = Local::now();
        TempValues {
            timestamp: now.timestamp(),
            last_update: now.format(TIME_FORMAT).to_string(),
            units,
            suffix: units.suffix().to_string(),
            temperature: from_kelvin(temperature.0, units),
            setpoint: from_kelvin(setpoint.0, units),
            temperature_k: temperature,
            setpoint_k: setpoint,
        }
    }
}

#[derive(Clone, Debug, Template)]
#[template(path = "index.html.ask", escape = "html")]
pub struct IndexPage {
    pub temperature: String,
    pub setpoint: String,
    pub suffix: &'static str,
    pub last_update: String,
    pub started: String,
    pub version: &'static str,
}

impl IndexPage {
    pub fn new(values: &TempValues, started: &DateTime<Local>) -> Self {
        IndexPage {
            temperature: values.units.format(values.temperature_k),
            setpoint: values.units.format(values.setpoint_k),
            suffix: values.units.suffix(),
            last_update: values.last_update.clone(),
            started: started.format(TIME_FORMAT).to_string(),
            version: SW_VERSION,
        }
    }
}

/// Body of the settings form post. Missing fields are reported by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettings {
    pub units: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub logfile: Option<String>,
}

/// Body of the setpoint form post, value in the display unit.
#[derive(Debug, Deserialize)]
pub struct UpdateSetpoint {
    pub setpoint: String,
}


// EOF
