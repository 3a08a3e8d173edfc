//! Buzzer de alarme via sysfs GPIO (`/sys/class/gpio/gpioN/value`).
//!
//! Sem caminho configurado o buzzer só registra os estados no log.

use co2_core::device::{AlarmIndicator, DeviceError};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct GpioBuzzer {
    value_path: Option<PathBuf>,
}

impl GpioBuzzer {
    pub fn new(value_path: &str) -> Self {
        Self {
            value_path: (!value_path.is_empty()).then(|| PathBuf::from(value_path)),
        }
    }

    fn write(&self, on: bool) -> Result<(), DeviceError> {
        if let Some(path) = &self.value_path {
            std::fs::write(path, if on { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl AlarmIndicator for GpioBuzzer {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        match &self.value_path {
            Some(path) => info!("Buzzer em {}", path.display()),
            None => warn!("Buzzer sem GPIO configurado – alarmes apenas no log"),
        }
        self.write(false)
    }

    fn set(&mut self, on: bool) -> Result<(), DeviceError> {
        info!("Buzzer {}", if on { "LIGADO" } else { "desligado" });
        self.write(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_gpio_value_file() {
        let path = std::env::temp_dir().join(format!("co2_buzzer_{}", std::process::id()));
        let mut buzzer = GpioBuzzer::new(path.to_str().unwrap());

        buzzer.initialize().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
        buzzer.set(true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn log_only_without_path() {
        let mut buzzer = GpioBuzzer::new("");
        assert!(buzzer.initialize().is_ok());
        assert!(buzzer.set(true).is_ok());
    }
}
