//! Interfaces dos dispositivos externos (sensor, alarme, geolocalização).

use crate::types::{Location, Measurement};

/// Erros reportados pelos drivers de dispositivo.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Sensor sem dado disponível")]
    NotReady,

    #[error("Falha de comunicação com o dispositivo: {0}")]
    Bus(String),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),
}

/// Fonte de medições ambientais (CO2, temperatura, umidade).
pub trait SensorSource {
    fn read(&mut self) -> Result<Measurement, DeviceError>;

    /// Encerra a medição periódica do sensor.
    fn stop(&mut self) {}
}

/// Indicador binário de alarme (buzzer, LED…).
pub trait AlarmIndicator {
    fn initialize(&mut self) -> Result<(), DeviceError>;
    fn set(&mut self, on: bool) -> Result<(), DeviceError>;
}

/// Provedor de localização. `None` é um estado válido e duradouro.
pub trait GeolocationProvider {
    fn locate(&mut self) -> Option<Location>;
}
