//! Sistema de alerta – threshold de CO2 e indicador binário.

use crate::device::{AlarmIndicator, DeviceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Nível de alerta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Alarm,
}

/// Retorna o [`AlertLevel`] para um valor de CO2 dado o threshold.
pub fn level_for_value(co2_ppm: f32, threshold: f32) -> AlertLevel {
    if co2_ppm >= threshold {
        AlertLevel::Alarm
    } else {
        AlertLevel::Normal
    }
}

/// Destino dos alertas de CO2.
pub trait AlertSink {
    fn initialize(&mut self) -> Result<(), DeviceError>;

    /// Define o nível de disparo (ppm).
    fn update(&mut self, threshold: f32);

    fn threshold(&self) -> Option<f32>;

    /// Compara a leitura com o threshold e aciona o indicador.
    fn evaluate(&mut self, co2_ppm: f32) -> AlertLevel;

    /// Desliga o indicador no encerramento.
    fn clear(&mut self) {}
}

/// Alerta sonoro acionado por um [`AlarmIndicator`].
pub struct BuzzerAlert<I: AlarmIndicator> {
    indicator: I,
    threshold: Option<f32>,
    level: AlertLevel,
}

impl<I: AlarmIndicator> BuzzerAlert<I> {
    pub fn new(indicator: I) -> Self {
        Self {
            indicator,
            threshold: None,
            level: AlertLevel::Normal,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    fn drive(&mut self, level: AlertLevel) {
        if level == self.level {
            return;
        }
        // Nível só muda com a escrita confirmada; falha repete no próximo ciclo
        match self.indicator.set(level == AlertLevel::Alarm) {
            Ok(()) => self.level = level,
            Err(e) => warn!("Falha ao acionar indicador de alarme: {e}"),
        }
    }
}

impl<I: AlarmIndicator> AlertSink for BuzzerAlert<I> {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.indicator.initialize()?;
        self.indicator.set(false)?;
        self.level = AlertLevel::Normal;
        Ok(())
    }

    fn update(&mut self, threshold: f32) {
        if !threshold.is_finite() {
            warn!("Threshold de CO2 ignorado: {threshold}");
            return;
        }
        info!("Threshold de alerta de CO2: {threshold:.0} ppm");
        self.threshold = Some(threshold);
    }

    fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    fn evaluate(&mut self, co2_ppm: f32) -> AlertLevel {
        let level = match self.threshold {
            Some(t) => level_for_value(co2_ppm, t),
            None => AlertLevel::Normal,
        };
        if level != self.level {
            match level {
                AlertLevel::Alarm => warn!("CO2 {co2_ppm:.0} ppm acima do threshold – alarme ligado"),
                AlertLevel::Normal => info!("CO2 {co2_ppm:.0} ppm normalizado – alarme desligado"),
            }
        }
        self.drive(level);
        level
    }

    fn clear(&mut self) {
        self.drive(AlertLevel::Normal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingIndicator;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_value(1199.0, 1200.0), AlertLevel::Normal);
        assert_eq!(level_for_value(1200.0, 1200.0), AlertLevel::Alarm);
        assert_eq!(level_for_value(1500.0, 1200.0), AlertLevel::Alarm);
    }

    #[test]
    fn no_threshold_never_alarms() {
        let mut alert = BuzzerAlert::new(RecordingIndicator::default());
        assert_eq!(alert.evaluate(5000.0), AlertLevel::Normal);
        assert!(alert.indicator().states.is_empty());
    }

    #[test]
    fn drives_indicator_only_on_transitions() {
        let mut alert = BuzzerAlert::new(RecordingIndicator::default());
        alert.initialize().unwrap();
        alert.update(1000.0);

        alert.evaluate(900.0);
        alert.evaluate(1100.0);
        alert.evaluate(1200.0);
        alert.evaluate(800.0);

        assert!(alert.indicator().initialized);
        assert_eq!(alert.indicator().states, vec![false, true, false]);
    }

    #[test]
    fn failed_indicator_write_is_retried() {
        let indicator = RecordingIndicator {
            failures: 1,
            ..Default::default()
        };
        let mut alert = BuzzerAlert::new(indicator).with_threshold(Some(1000.0));

        assert_eq!(alert.evaluate(1500.0), AlertLevel::Alarm);
        assert_eq!(alert.level(), AlertLevel::Normal);
        assert!(alert.indicator().states.is_empty());

        for _ in 0..5 {
            alert.evaluate(1500.0);
        }
        assert_eq!(alert.level(), AlertLevel::Alarm);
        assert_eq!(alert.indicator().states, vec![true]);
    }

    #[test]
    fn ignores_non_finite_threshold() {
        let mut alert = BuzzerAlert::new(RecordingIndicator::default()).with_threshold(Some(900.0));
        alert.update(f32::NAN);
        assert_eq!(alert.threshold(), Some(900.0));
    }

    #[test]
    fn clear_turns_alarm_off() {
        let mut alert = BuzzerAlert::new(RecordingIndicator::default()).with_threshold(Some(500.0));
        alert.evaluate(600.0);
        alert.clear();
        assert_eq!(alert.level(), AlertLevel::Normal);
        assert_eq!(alert.indicator().states, vec![true, false]);
    }
}
