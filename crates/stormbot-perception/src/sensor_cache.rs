//! [`SensorCache`] – debounced, thread-safe view over the raw sensors.
//!
//! Raw reads are noisy and slow, and several tasks poll the sensors
//! concurrently. The cache serializes hardware access behind an internal
//! lock, serves repeat reads from the last value inside a short TTL window,
//! and filters single-sample spikes by taking the median of three raw reads.
//! Reads never fail upward: if every sample errors, the caller gets the last
//! known-good value.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use stormbot_hal::{ColorSense, Gyro, Proximity, Touch};
use stormbot_types::{Color, Limits, SensorSnapshot};

/// Delay between the raw samples of one median read.
const SAMPLE_DELAY: Duration = Duration::from_millis(10);

/// Number of raw samples per distance refresh.
const SAMPLES_PER_READ: usize = 3;

/// Distance reported when no proximity sensor is configured and nothing has
/// been cached yet ("nothing ahead").
const DEFAULT_DISTANCE: u8 = 100;

struct CacheState {
    ir_distance: u8,
    ir_refreshed_at: Option<Instant>,
    color: Color,
    color_refreshed_at: Option<Instant>,
}

/// Shared sensor front-end. Safe to call from any number of concurrent
/// tasks; at most one hardware read is in flight at a time.
pub struct SensorCache {
    proximity: Option<Arc<dyn Proximity>>,
    color: Option<Arc<dyn ColorSense>>,
    gyro: Option<Arc<dyn Gyro>>,
    touch: Option<Arc<dyn Touch>>,
    ttl: Duration,
    obstacle_distance: u8,
    state: Mutex<CacheState>,
}

impl SensorCache {
    /// Cache with no sensors wired; attach devices with the `with_*` methods.
    /// A missing sensor is tolerated by substituting defaults.
    pub fn new(limits: &Limits) -> Self {
        Self {
            proximity: None,
            color: None,
            gyro: None,
            touch: None,
            ttl: Duration::from_secs_f64(limits.cache_ttl),
            obstacle_distance: limits.obstacle_distance,
            state: Mutex::new(CacheState {
                ir_distance: DEFAULT_DISTANCE,
                ir_refreshed_at: None,
                color: Color::NoColor,
                color_refreshed_at: None,
            }),
        }
    }

    pub fn with_proximity(mut self, sensor: Arc<dyn Proximity>) -> Self {
        self.proximity = Some(sensor);
        self
    }

    pub fn with_color(mut self, sensor: Arc<dyn ColorSense>) -> Self {
        self.color = Some(sensor);
        self
    }

    pub fn with_gyro(mut self, sensor: Arc<dyn Gyro>) -> Self {
        self.gyro = Some(sensor);
        self
    }

    pub fn with_touch(mut self, sensor: Arc<dyn Touch>) -> Self {
        self.touch = Some(sensor);
        self
    }

    /// `true` when a gyro is wired, i.e. closed-loop turns are available.
    pub fn has_gyro(&self) -> bool {
        self.gyro.is_some()
    }

    /// Debounced proximity reading, clamped to 0–100.
    ///
    /// Takes up to three raw samples with short inter-sample delays, discards
    /// failed samples, and returns the median of the rest. If every sample
    /// fails, returns the previous cached value unchanged.
    pub async fn read_distance(&self) -> u8 {
        let mut state = self.state.lock().await;
        if let Some(at) = state.ir_refreshed_at {
            if at.elapsed() < self.ttl {
                return state.ir_distance;
            }
        }
        let Some(sensor) = &self.proximity else {
            return state.ir_distance;
        };

        let mut samples: Vec<u8> = Vec::with_capacity(SAMPLES_PER_READ);
        for i in 0..SAMPLES_PER_READ {
            match sensor.read_proximity() {
                Ok(raw) => samples.push(raw.clamp(0, 100) as u8),
                Err(e) => debug!(error = %e, "discarding failed proximity sample"),
            }
            if i + 1 < SAMPLES_PER_READ {
                tokio::time::sleep(SAMPLE_DELAY).await;
            }
        }

        if samples.is_empty() {
            warn!(cached = state.ir_distance, "all proximity samples failed, using last known value");
            return state.ir_distance;
        }

        samples.sort_unstable();
        let median = samples[samples.len() / 2];
        state.ir_distance = median;
        state.ir_refreshed_at = Some(Instant::now());
        median
    }

    /// Debounced color reading plus its prompt description.
    pub async fn read_color(&self) -> (Color, &'static str) {
        let mut state = self.state.lock().await;
        if let Some(at) = state.color_refreshed_at {
            if at.elapsed() < self.ttl {
                return (state.color, state.color.description());
            }
        }
        let Some(sensor) = &self.color else {
            return (Color::NoColor, Color::NoColor.description());
        };

        match sensor.read_color() {
            Ok(color) => {
                state.color = color;
                state.color_refreshed_at = Some(Instant::now());
                (color, color.description())
            }
            Err(e) => {
                warn!(error = %e, "color read failed");
                (Color::NoColor, Color::NoColor.description())
            }
        }
    }

    /// Current orientation angle, if a gyro is configured and readable.
    ///
    /// Serialized against the other hardware reads by the same internal lock.
    pub async fn read_gyro_angle(&self) -> Option<i32> {
        let sensor = self.gyro.as_ref()?;
        let _state = self.state.lock().await;
        match sensor.read_orientation_angle() {
            Ok(angle) => Some(angle),
            Err(e) => {
                warn!(error = %e, "gyro angle read failed");
                None
            }
        }
    }

    /// Button state; `false` when no touch sensor is configured.
    pub fn is_pressed(&self) -> bool {
        self.touch.as_ref().is_some_and(|t| t.is_pressed())
    }

    /// Capture an immutable snapshot of every sensor.
    pub async fn snapshot(&self) -> SensorSnapshot {
        let ir_distance = self.read_distance().await;
        let (color, _) = self.read_color().await;

        let (gyro_angle, gyro_rate) = match &self.gyro {
            Some(sensor) => {
                let _state = self.state.lock().await;
                let angle = sensor.read_orientation_angle().unwrap_or_else(|e| {
                    warn!(error = %e, "gyro angle read failed");
                    0
                });
                let rate = sensor.read_rotation_rate().unwrap_or_else(|e| {
                    warn!(error = %e, "gyro rate read failed");
                    0
                });
                (Some(angle), Some(rate))
            }
            None => (None, None),
        };

        SensorSnapshot {
            ir_distance,
            color,
            buttons_pressed: self.is_pressed(),
            gyro_angle,
            gyro_rate,
            captured_at: Local::now(),
            obstacle_detected: ir_distance < self.obstacle_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stormbot_hal::sim::{SimColor, SimGyro, SimProximity, SimTouch};

    fn limits() -> Limits {
        Limits::default()
    }

    #[tokio::test(start_paused = true)]
    async fn distance_is_median_of_three_samples() {
        let sensor = Arc::new(SimProximity::scripted(vec![Ok(5), Ok(97), Ok(6)], 50));
        let cache = SensorCache::new(&limits()).with_proximity(sensor);
        assert_eq!(cache.read_distance().await, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn samples_are_clamped_to_valid_range() {
        let sensor = Arc::new(SimProximity::scripted(vec![Ok(150), Ok(180), Ok(-5)], 50));
        let cache = SensorCache::new(&limits()).with_proximity(sensor);
        assert_eq!(cache.read_distance().await, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_samples_are_discarded_from_median() {
        let sensor = Arc::new(SimProximity::scripted(
            vec![SimProximity::bad_sample(), Ok(42), SimProximity::bad_sample()],
            50,
        ));
        let cache = SensorCache::new(&limits()).with_proximity(sensor);
        assert_eq!(cache.read_distance().await, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn total_failure_falls_back_to_last_known_value() {
        let sensor = Arc::new(SimProximity::scripted(
            vec![
                Ok(40),
                Ok(40),
                Ok(40),
                SimProximity::bad_sample(),
                SimProximity::bad_sample(),
                SimProximity::bad_sample(),
            ],
            50,
        ));
        let cache = SensorCache::new(&limits()).with_proximity(sensor);
        assert_eq!(cache.read_distance().await, 40);
        tokio::time::advance(Duration::from_millis(200)).await;
        // All three samples fail now; last known-good value survives.
        assert_eq!(cache.read_distance().await, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_within_ttl_are_served_from_cache() {
        let sensor = Arc::new(SimProximity::fixed(55));
        let cache = SensorCache::new(&limits()).with_proximity(sensor.clone());
        cache.read_distance().await;
        assert_eq!(sensor.read_count(), 3);
        cache.read_distance().await;
        cache.read_distance().await;
        assert_eq!(sensor.read_count(), 3);

        tokio::time::advance(Duration::from_millis(200)).await;
        cache.read_distance().await;
        assert_eq!(sensor.read_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_sensors_yield_defaults() {
        let cache = SensorCache::new(&limits());
        assert_eq!(cache.read_distance().await, 100);
        assert_eq!(cache.read_color().await.0, Color::NoColor);
        assert!(!cache.is_pressed());
        let snap = cache.snapshot().await;
        assert!(snap.gyro_angle.is_none());
        assert!(!snap.obstacle_detected);
    }

    #[tokio::test(start_paused = true)]
    async fn color_error_reads_as_no_color() {
        let sensor = Arc::new(SimColor::fixed(Color::Blue));
        sensor.set_failing(true);
        let cache = SensorCache::new(&limits()).with_color(sensor);
        assert_eq!(cache.read_color().await.0, Color::NoColor);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_derives_obstacle_flag() {
        let cache = SensorCache::new(&limits())
            .with_proximity(Arc::new(SimProximity::fixed(12)))
            .with_color(Arc::new(SimColor::fixed(Color::Red)))
            .with_gyro(Arc::new(SimGyro::fixed(7)))
            .with_touch(Arc::new(SimTouch::new()));
        let snap = cache.snapshot().await;
        assert_eq!(snap.ir_distance, 12);
        assert!(snap.obstacle_detected);
        assert_eq!(snap.color, Color::Red);
        assert_eq!(snap.gyro_angle, Some(7));
        assert!(!snap.buttons_pressed);
    }

    #[tokio::test(start_paused = true)]
    async fn gyro_angle_reads_through_the_lock() {
        let cache = SensorCache::new(&limits()).with_gyro(Arc::new(SimGyro::fixed(-30)));
        assert_eq!(cache.read_gyro_angle().await, Some(-30));
        assert!(cache.has_gyro());
    }
}
