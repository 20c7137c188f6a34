//! Wall clock and CPU time measurement.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Return the elapsed seconds between `start` and `end`, or zero if `end` is before `start`.
#[must_use]
pub fn elapsed_seconds(start: Instant, end: Instant) -> f64 {
    end.saturating_duration_since(start).as_secs_f64()
}

/// Process CPU time, the sum of user and system time.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct CpuTime(Duration);

impl CpuTime {
    /// Read the CPU time consumed by this process so far.
    ///
    /// Returns [`None`] if the CPU time is not available on this platform.
    #[must_use]
    pub fn now() -> Option<Self> {
        cpu_time_now().map(Self)
    }

    /// The CPU time as a [`Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Return the CPU seconds consumed between `earlier` and `self`.
    #[must_use]
    pub fn seconds_since(&self, earlier: CpuTime) -> f64 {
        self.0.saturating_sub(earlier.0).as_secs_f64()
    }
}

#[cfg(unix)]
fn cpu_time_now() -> Option<Duration> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
    // SAFETY: getrusage fills the struct when it returns 0
    let usage = unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) != 0 {
            return None;
        }
        usage.assume_init()
    };
    Some(timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime))
}

#[cfg(not(unix))]
fn cpu_time_now() -> Option<Duration> {
    None
}

#[cfg(unix)]
fn timeval_to_duration(time: libc::timeval) -> Duration {
    let secs = u64::try_from(time.tv_sec).unwrap_or(0);
    let micros = u64::try_from(time.tv_usec).unwrap_or(0);
    Duration::from_secs(secs) + Duration::from_micros(micros)
}

/// The wall clock and CPU time of one benchmark phase.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimingSample {
    /// Elapsed wall clock seconds.
    pub wall: f64,
    /// Elapsed CPU seconds, if measured.
    pub cpu: Option<f64>,
}

/// Measures one phase.
///
/// ```rust
/// use chunkbench::bench::timing::Stopwatch;
/// let stopwatch = Stopwatch::start(true);
/// let sample = stopwatch.stop();
/// assert!(sample.wall >= 0.0);
/// ```
#[derive(Debug)]
pub struct Stopwatch {
    wall: Instant,
    cpu: Option<CpuTime>,
}

impl Stopwatch {
    /// Start measuring. CPU time is only read if `cpu_time` is true.
    #[must_use]
    pub fn start(cpu_time: bool) -> Self {
        Self {
            cpu: if cpu_time { CpuTime::now() } else { None },
            wall: Instant::now(),
        }
    }

    /// Stop measuring and return the elapsed times.
    #[must_use]
    pub fn stop(self) -> TimingSample {
        let wall = elapsed_seconds(self.wall, Instant::now());
        let cpu = self
            .cpu
            .and_then(|start| CpuTime::now().map(|end| end.seconds_since(start)));
        TimingSample { wall, cpu }
    }
}
