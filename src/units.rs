// units.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const KELVIN_OFFSET: f64 = 273.15;
const FAHRENHEIT_SCALE: f64 = 1.8;
const FAHRENHEIT_OFFSET: f64 = 32.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UnitError {
    #[error("invalid temperature unit code {0}, expected 0..=2")]
    InvalidUnit(i64),
    #[error("unknown temperature unit name {0:?}")]
    UnknownName(String),
}

/// Temperature unit system, stored in the settings file as its integer code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TempUnit {
    Kelvin = 0,
    Celsius = 1,
    #[default]
    Fahrenheit = 2,
}

impl TempUnit {
    pub const ALL: [TempUnit; 3] = [TempUnit::Kelvin, TempUnit::Celsius, TempUnit::Fahrenheit];

    pub fn suffix(self) -> &'static str {
        match self {
            TempUnit::Kelvin => " K",
            TempUnit::Celsius => " C",
            TempUnit::Fahrenheit => " F",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TempUnit::Kelvin => "Kelvin",
            TempUnit::Celsius => "Celsius",
            TempUnit::Fahrenheit => "Fahrenheit",
        }
    }

    /// Lowercase name, used as the html form value.
    pub fn form_value(self) -> &'static str {
        match self {
            TempUnit::Kelvin => "kelvin",
            TempUnit::Celsius => "celsius",
            TempUnit::Fahrenheit => "fahrenheit",
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Render a Kelvin reading in this unit, one decimal plus suffix.
    pub fn format(self, kelvin: Kelvin) -> String {
        format!("{:.1}{}", from_kelvin(kelvin.0, self), self.suffix())
    }
}

impl TryFrom<i64> for TempUnit {
    type Error = UnitError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TempUnit::Kelvin),
            1 => Ok(TempUnit::Celsius),
            2 => Ok(TempUnit::Fahrenheit),
            c => Err(UnitError::InvalidUnit(c)),
        }
    }
}

impl From<TempUnit> for i64 {
    fn from(unit: TempUnit) -> Self {
        unit.code()
    }
}

impl FromStr for TempUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kelvin" => Ok(TempUnit::Kelvin),
            "celsius" => Ok(TempUnit::Celsius),
            "fahrenheit" => Ok(TempUnit::Fahrenheit),
            _ => Err(UnitError::UnknownName(s.to_string())),
        }
    }
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Absolute temperature as exchanged with the controller.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kelvin(pub f64);

pub fn from_kelvin(value: f64, unit: TempUnit) -> f64 {
    match unit {
        TempUnit::Kelvin => value,
        TempUnit::Celsius => value - KELVIN_OFFSET,
        TempUnit::Fahrenheit => (value - KELVIN_OFFSET) * FAHRENHEIT_SCALE + FAHRENHEIT_OFFSET,
    }
}

pub fn to_kelvin(value: f64, unit: TempUnit) -> f64 {
    match unit {
        TempUnit::Kelvin => value,
        TempUnit::Celsius => value + KELVIN_OFFSET,
        TempUnit::Fahrenheit => (value - FAHRENHEIT_OFFSET) / FAHRENHEIT_SCALE + KELVIN_OFFSET,
    }
}


// EOF
