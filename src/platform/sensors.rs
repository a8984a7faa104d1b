//! Sysfs-backed sensor source.
//!
//! Brightness goes through the backlight class device, scaled between the
//! hardware range and percent. Temperature comes from a thermal zone in
//! millidegrees. Uptime is the first field of /proc/uptime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::SensorSource;

/// Sentinel for a failed temperature read.
const TEMPERATURE_SENTINEL: f64 = -1.0;
/// Sentinel for failed brightness/uptime reads.
const SENTINEL: i64 = -1;

/// Number of steps used when fading the backlight to a new level.
const FADE_STEPS: u32 = 8;
/// Delay between fade steps.
const FADE_STEP_DELAY: Duration = Duration::from_millis(15);

pub struct SysfsSensors {
    backlight_dir: PathBuf,
    thermal_zone: PathBuf,
    uptime_path: PathBuf,
}

impl SysfsSensors {
    pub fn new(backlight_dir: impl Into<PathBuf>, thermal_zone: impl Into<PathBuf>) -> Self {
        Self {
            backlight_dir: backlight_dir.into(),
            thermal_zone: thermal_zone.into(),
            uptime_path: PathBuf::from("/proc/uptime"),
        }
    }

    async fn read_number(path: &Path) -> Result<i64> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        raw.trim()
            .parse::<i64>()
            .with_context(|| format!("parsing {}", path.display()))
    }

    async fn raw_brightness(&self) -> Result<(i64, i64)> {
        let current = Self::read_number(&self.backlight_dir.join("brightness")).await?;
        let max = Self::read_number(&self.backlight_dir.join("max_brightness")).await?;
        Ok((current, max))
    }
}

#[async_trait]
impl SensorSource for SysfsSensors {
    async fn temperature(&self) -> f64 {
        match Self::read_number(&self.thermal_zone.join("temp")).await {
            Ok(millidegrees) => millidegrees as f64 / 1000.0,
            Err(err) => {
                debug!(%err, "temperature read failed");
                TEMPERATURE_SENTINEL
            }
        }
    }

    async fn brightness(&self) -> i64 {
        match self.raw_brightness().await {
            Ok((_, max)) if max <= 0 => SENTINEL,
            Ok((current, max)) => (current * 100) / max,
            Err(err) => {
                debug!(%err, "brightness read failed");
                SENTINEL
            }
        }
    }

    async fn uptime(&self) -> i64 {
        let raw = match fs::read_to_string(&self.uptime_path).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!(%err, "uptime read failed");
                return SENTINEL;
            }
        };
        raw.split_whitespace()
            .next()
            .and_then(|field| field.parse::<f64>().ok())
            .map(|seconds| seconds as i64)
            .unwrap_or(SENTINEL)
    }

    async fn set_brightness(&self, percent: i64) -> Result<()> {
        let (current, max) = self.raw_brightness().await?;
        let target = (percent * max) / 100;
        let path = self.backlight_dir.join("brightness");

        // Step toward the target instead of jumping, so a remote slider does
        // not flash the panel.
        let delta = target - current;
        for step in 1..=FADE_STEPS as i64 {
            let level = current + delta * step / FADE_STEPS as i64;
            fs::write(&path, level.to_string())
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            if step < FADE_STEPS as i64 {
                tokio::time::sleep(FADE_STEP_DELAY).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).expect("write fixture");
    }

    #[tokio::test]
    async fn reads_brightness_as_percent_of_max() {
        let dir = std::env::temp_dir().join("kiosk-agent-sensors-pct");
        std::fs::create_dir_all(&dir).expect("fixture dir");
        fixture(&dir, "brightness", "120\n");
        fixture(&dir, "max_brightness", "240\n");

        let sensors = SysfsSensors::new(&dir, "/nonexistent");
        assert_eq!(sensors.brightness().await, 50);
    }

    #[tokio::test]
    async fn failed_reads_yield_sentinels() {
        let sensors = SysfsSensors::new("/nonexistent", "/nonexistent");
        assert_eq!(sensors.temperature().await, -1.0);
        assert_eq!(sensors.brightness().await, -1);
    }

    #[tokio::test]
    async fn set_brightness_lands_on_the_scaled_target() {
        let dir = std::env::temp_dir().join("kiosk-agent-sensors-set");
        std::fs::create_dir_all(&dir).expect("fixture dir");
        fixture(&dir, "brightness", "0\n");
        fixture(&dir, "max_brightness", "200\n");

        let sensors = SysfsSensors::new(&dir, "/nonexistent");
        sensors.set_brightness(50).await.expect("apply");

        let raw = std::fs::read_to_string(dir.join("brightness")).expect("read back");
        assert_eq!(raw.trim(), "100");
    }
}
