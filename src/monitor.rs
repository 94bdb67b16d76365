use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use sysinfo::System;

/// Averages above this percentage are reported as high usage.
pub const HIGH_USAGE_THRESHOLD: f32 = 80.0;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

pub trait Sampler {
    fn sample(&mut self) -> Sample;
}

pub struct SysinfoSampler {
    system: System,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta; the first refresh only sets the baseline
        system.refresh_cpu_usage();
        Self { system }
    }
}

impl Sampler for SysinfoSampler {
    fn sample(&mut self) -> Sample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            (self.system.used_memory() as f64 / total as f64 * 100.0) as f32
        };

        Sample {
            cpu_percent: self.system.global_cpu_usage(),
            memory_percent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorReport {
    pub samples: usize,
    pub avg_cpu: f32,
    pub avg_memory: f32,
    pub peak_cpu: f32,
    pub peak_memory: f32,
    pub interrupted: bool,
}

impl MonitorReport {
    pub fn from_samples(samples: &[Sample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let n = samples.len() as f32;
        Self {
            samples: samples.len(),
            avg_cpu: samples.iter().map(|s| s.cpu_percent).sum::<f32>() / n,
            avg_memory: samples.iter().map(|s| s.memory_percent).sum::<f32>() / n,
            peak_cpu: samples.iter().map(|s| s.cpu_percent).fold(0.0, f32::max),
            peak_memory: samples.iter().map(|s| s.memory_percent).fold(0.0, f32::max),
            interrupted: false,
        }
    }

    pub fn high_usage(&self) -> bool {
        self.avg_cpu > HIGH_USAGE_THRESHOLD || self.avg_memory > HIGH_USAGE_THRESHOLD
    }
}

/// Sleep for `duration` in short slices so an interrupt is noticed quickly.
/// Returns false when interrupted.
fn sleep_responsive(duration: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

/// Take one sample per `interval` until `duration` has elapsed or `running`
/// is cleared. A zero duration returns an empty report immediately.
pub fn run(
    sampler: &mut dyn Sampler,
    duration: Duration,
    interval: Duration,
    running: &AtomicBool,
) -> MonitorReport {
    if duration.is_zero() {
        return MonitorReport::default();
    }

    let start = Instant::now();
    let mut samples = Vec::new();
    let mut interrupted = false;

    while start.elapsed() < duration {
        let step = interval.min(duration.saturating_sub(start.elapsed()));
        if !sleep_responsive(step, running) {
            interrupted = true;
            break;
        }

        let sample = sampler.sample();
        print!(
            "\rCPU: {:5.1}% | RAM: {:5.1}%",
            sample.cpu_percent, sample.memory_percent
        );
        let _ = std::io::stdout().flush();
        samples.push(sample);
    }

    if !samples.is_empty() {
        println!();
    }

    let mut report = MonitorReport::from_samples(&samples);
    report.interrupted = interrupted;
    report
}
