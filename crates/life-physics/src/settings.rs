//! Runtime-selectable simulation settings

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::*;

/// GPU adapter power preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    LowPower,
    #[default]
    HighPerformance,
}

impl PowerPreference {
    pub const ALL: [PowerPreference; 2] = [PowerPreference::LowPower, PowerPreference::HighPerformance];

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerPreference::LowPower => "low-power",
            PowerPreference::HighPerformance => "high-performance",
        }
    }
}

impl fmt::Display for PowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerPreference {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low-power" => Ok(PowerPreference::LowPower),
            "high-performance" => Ok(PowerPreference::HighPerformance),
            other => Err(SettingsError::UnknownPowerPreference(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("body count must be at least 1")]
    NoBodies,
    #[error("body count {0} exceeds the maximum of {max}", max = MAX_BODY_COUNT)]
    TooManyBodies(u32),
    #[error("{bodies} bodies at workgroup size {workgroup_size} need {count} workgroups, more than {max}", max = MAX_WORKGROUPS_PER_DIMENSION)]
    TooManyWorkgroups {
        bodies: u32,
        workgroup_size: u32,
        count: u32,
    },
    #[error("workgroup size {0} must be a power of two between 1 and {max}", max = MAX_WORKGROUP_SIZE)]
    InvalidWorkgroupSize(u32),
    #[error("type count {0} must be between 1 and {max}", max = MAX_TYPE_COUNT)]
    InvalidTypeCount(u32),
    #[error("unknown power preference '{0}' (expected 'low-power' or 'high-performance')")]
    UnknownPowerPreference(String),
}

/// What has to be rebuilt after the settings were edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    /// Drop the device and acquire a new adapter
    RecreateDevice,
    /// Reseed all bodies and rebuild the pipelines
    Reset,
    /// Recompile the compute pipeline, keeping the current bodies
    RebuildPipelines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    pub body_count: u32,
    pub workgroup_size: u32,
    pub type_count: u32,
    pub power_preference: PowerPreference,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            body_count: DEFAULT_BODY_COUNT,
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            type_count: DEFAULT_TYPE_COUNT,
            power_preference: PowerPreference::default(),
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.body_count == 0 {
            return Err(SettingsError::NoBodies);
        }
        if !self.workgroup_size.is_power_of_two() || self.workgroup_size > MAX_WORKGROUP_SIZE {
            return Err(SettingsError::InvalidWorkgroupSize(self.workgroup_size));
        }
        if self.body_count > MAX_BODY_COUNT {
            return Err(SettingsError::TooManyBodies(self.body_count));
        }
        if self.type_count == 0 || self.type_count > MAX_TYPE_COUNT {
            return Err(SettingsError::InvalidTypeCount(self.type_count));
        }
        // One dispatch covers every body along x
        let count = self.body_count.div_ceil(self.workgroup_size);
        if count > MAX_WORKGROUPS_PER_DIMENSION {
            return Err(SettingsError::TooManyWorkgroups {
                bodies: self.body_count,
                workgroup_size: self.workgroup_size,
                count,
            });
        }
        Ok(())
    }

    /// Classify an edit relative to `previous`.
    ///
    /// A power preference change outranks a reset, which outranks a pipeline rebuild.
    pub fn change_from(&self, previous: &SimulationSettings) -> Option<SettingsChange> {
        if self.power_preference != previous.power_preference {
            Some(SettingsChange::RecreateDevice)
        } else if self.body_count != previous.body_count || self.type_count != previous.type_count
        {
            Some(SettingsChange::Reset)
        } else if self.workgroup_size != previous.workgroup_size {
            Some(SettingsChange::RebuildPipelines)
        } else {
            None
        }
    }
}
