use std::time::{Duration, Instant};

/// How often the frame rate is reported
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

pub struct Time {
    delta: Duration,
    last_update: Instant,
    frames_since_report: u32,
    time_since_report: Duration,
}

impl Time {
    pub fn new() -> Time {
        Time {
            delta: Duration::ZERO,
            last_update: Instant::now(),
            frames_since_report: 0,
            time_since_report: Duration::ZERO,
        }
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Starts a new frame. Returns the average frames per second once per report interval.
    pub fn update(&mut self) -> Option<f32> {
        let now = Instant::now();
        self.advance(now - self.last_update);
        self.last_update = now;
        self.take_report()
    }

    fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.frames_since_report += 1;
        self.time_since_report += delta;
    }

    fn take_report(&mut self) -> Option<f32> {
        if self.time_since_report < REPORT_INTERVAL {
            return None;
        }
        let frames_per_second =
            self.frames_since_report as f32 / self.time_since_report.as_secs_f32();
        self.frames_since_report = 0;
        self.time_since_report = Duration::ZERO;
        Some(frames_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_average_frame_rate_once_per_interval() {
        let mut time = Time::new();
        for _ in 0..9 {
            time.advance(Duration::from_millis(100));
            assert_eq!(time.take_report(), None);
        }
        time.advance(Duration::from_millis(100));
        let fps = time.take_report().unwrap();
        assert!((fps - 10.0).abs() < 1e-3);
        assert_eq!(time.delta_seconds(), 0.1);

        time.advance(Duration::from_millis(100));
        assert_eq!(time.take_report(), None);
    }
}
