use std::time::{Duration, Instant};

/// How often the FPS readout refreshes
pub const FPS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Frame-rate counter averaged over fixed reporting intervals.
pub struct FpsCounter {
    interval: Duration,
    frames_since_update: u32,
    last_update: Option<Instant>,
}

impl FpsCounter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            frames_since_update: 0,
            last_update: None,
        }
    }

    /// Count one frame at `now`.
    ///
    /// Returns a new reading once per interval. The first frame only starts the clock.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let mut reading = None;

        match self.last_update {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.interval {
                    reading = Some(self.frames_since_update as f32 / elapsed.as_secs_f32());
                    self.last_update = Some(now);
                    self.frames_since_update = 0;
                }
            }
            None => self.last_update = Some(now),
        }

        self.frames_since_update += 1;
        reading
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(FPS_UPDATE_INTERVAL)
    }
}
