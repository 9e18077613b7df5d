//! Session statistics.

use std::fmt;
use std::time::Duration;

use observability::CaptureSummary;

/// Why the idle loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Ctrl+C or SIGTERM
    Interrupted,
    /// Tick budget spent
    MaxTicks,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => f.write_str("interrupted"),
            Self::MaxTicks => f.write_str("tick limit reached"),
        }
    }
}

/// Statistics from a capture run
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Why the capture stopped
    pub exit: ExitReason,

    /// Simulator ticks observed, including the first one
    pub ticks: u64,

    /// Last simulator frame observed
    pub last_frame: Option<u64>,

    /// Actors destroyed by teardown
    pub actors_destroyed: usize,

    /// Whether teardown stopped an active recording
    pub recorder_stopped: bool,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-sensor write counts
    pub capture: CaptureSummary,
}

impl SessionStats {
    /// Frames written per second of wall time
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.capture.total_frames() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        println!("Capture stopped: {}", self.exit);
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Ticks: {}", self.ticks);
        if let Some(frame) = self.last_frame {
            println!("  Last frame: {frame:06}");
        }
        println!("  Frames/s written: {:.2}", self.fps());
        println!("  Actors destroyed: {}", self.actors_destroyed);
        if self.recorder_stopped {
            println!("  Recorder stopped");
        }
        println!();
        print!("{}", self.capture);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_zero_duration() {
        let stats = SessionStats {
            exit: ExitReason::MaxTicks,
            ticks: 0,
            last_frame: None,
            actors_destroyed: 0,
            recorder_stopped: false,
            duration: Duration::ZERO,
            capture: CaptureSummary::default(),
        };
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.exit.to_string(), "tick limit reached");
    }
}
