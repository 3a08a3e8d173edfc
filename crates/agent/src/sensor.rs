//! Sensor SCD30 simulado – random walk em torno dos valores de referência.
//!
//! Substitui o driver I2C enquanto não há hardware: mesma interface
//! [`SensorSource`], com falhas de leitura injetáveis por probabilidade.

use co2_core::config::SensorConfig;
use co2_core::device::{DeviceError, SensorSource};
use co2_core::types::Measurement;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Faixa física do SCD30.
const CO2_RANGE: (f32, f32) = (400.0, 10_000.0);
const HUMIDITY_RANGE: (f32, f32) = (0.0, 100.0);

pub struct SimulatedScd30 {
    rng: StdRng,
    current: Measurement,
    failure_rate: f64,
    running: bool,
}

impl SimulatedScd30 {
    pub fn new(config: &SensorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_rng(config: &SensorConfig, rng: StdRng) -> Self {
        info!(
            "SCD30 simulado: CO2 {:.0} ppm | {:.1}°C | {:.0}%",
            config.baseline_co2_ppm, config.baseline_temperature, config.baseline_humidity
        );
        Self {
            rng,
            current: Measurement {
                co2_ppm: config.baseline_co2_ppm,
                temperature: config.baseline_temperature,
                relative_humidity: config.baseline_humidity,
            },
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
            running: true,
        }
    }
}

impl SensorSource for SimulatedScd30 {
    fn read(&mut self) -> Result<Measurement, DeviceError> {
        if !self.running {
            return Err(DeviceError::NotReady);
        }
        if self.rng.random_bool(self.failure_rate) {
            return Err(DeviceError::Bus("CRC inválido na leitura do SCD30".into()));
        }

        let m = &mut self.current;
        m.co2_ppm = (m.co2_ppm + self.rng.random_range(-25.0..25.0)).clamp(CO2_RANGE.0, CO2_RANGE.1);
        m.temperature += self.rng.random_range(-0.2..0.2);
        m.relative_humidity =
            (m.relative_humidity + self.rng.random_range(-0.5..0.5)).clamp(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1);

        debug!("SCD30: {:?}", self.current);
        Ok(self.current)
    }

    fn stop(&mut self) {
        self.running = false;
        info!("SCD30: medição periódica parada");
    }
}
