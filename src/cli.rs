use clap::Parser;
use life_physics::{
    PowerPreference, SimulationSettings, DEFAULT_BODY_COUNT, DEFAULT_TYPE_COUNT,
    DEFAULT_WORKGROUP_SIZE,
};

/// Default billboard half-extent in clip-space units
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.008;

#[derive(Parser, Debug)]
#[command(author, version, about = "GPU particle life simulation", long_about = None)]
pub struct Args {
    /// Number of bodies to simulate
    #[arg(short, long, default_value_t = DEFAULT_BODY_COUNT)]
    pub bodies: u32,

    /// Compute shader workgroup size (power of two, at most 256)
    #[arg(short, long, default_value_t = DEFAULT_WORKGROUP_SIZE)]
    pub workgroup_size: u32,

    /// Number of body types in the attraction matrix
    #[arg(short, long, default_value_t = DEFAULT_TYPE_COUNT)]
    pub types: u32,

    /// GPU adapter preference: low-power or high-performance
    #[arg(short, long, default_value_t = PowerPreference::HighPerformance)]
    pub power_preference: PowerPreference,

    /// Seed for body placement and attractions (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Billboard size
    #[arg(long, default_value_t = DEFAULT_PARTICLE_SIZE, value_parser = parse_particle_size)]
    pub particle_size: f32,

    /// Present without waiting for vertical sync
    #[arg(long)]
    pub no_vsync: bool,
}

fn parse_particle_size(s: &str) -> Result<f32, String> {
    let size: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if size.is_finite() && size > 0.0 {
        Ok(size)
    } else {
        Err(format!("particle size must be a positive number, got {s}"))
    }
}

impl Args {
    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            body_count: self.bodies,
            workgroup_size: self.workgroup_size,
            type_count: self.types,
            power_preference: self.power_preference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_settings_defaults() {
        let args = Args::try_parse_from(["particle-life"]).unwrap();
        assert_eq!(args.settings(), SimulationSettings::default());
        assert_eq!(args.seed, None);
        assert!(!args.no_vsync);
    }

    #[test]
    fn test_parse_all_flags() {
        let args = Args::try_parse_from([
            "particle-life",
            "--bodies",
            "8192",
            "--workgroup-size",
            "128",
            "--types",
            "16",
            "--power-preference",
            "low-power",
            "--seed",
            "99",
            "--no-vsync",
        ])
        .unwrap();

        let settings = args.settings();
        assert_eq!(settings.body_count, 8192);
        assert_eq!(settings.workgroup_size, 128);
        assert_eq!(settings.type_count, 16);
        assert_eq!(settings.power_preference, PowerPreference::LowPower);
        assert_eq!(args.seed, Some(99));
        assert!(args.no_vsync);
    }

    #[test]
    fn test_unknown_power_preference_is_rejected() {
        let result = Args::try_parse_from(["particle-life", "--power-preference", "turbo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_particle_size_must_be_positive() {
        let args = Args::try_parse_from(["particle-life", "--particle-size", "0.02"]).unwrap();
        assert_eq!(args.particle_size, 0.02);

        for bad in ["0", "-0.01", "NaN", "inf", "big"] {
            let result = Args::try_parse_from(["particle-life", "--particle-size", bad]);
            assert!(result.is_err(), "accepted --particle-size {bad}");
        }
    }
}
