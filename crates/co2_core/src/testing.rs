//! Dublês de teste compartilhados pelos módulos do crate.

use crate::device::{AlarmIndicator, DeviceError, SensorSource};
use crate::protocol::TelemetryMessage;
use crate::transport::{Transport, TransportError};
use crate::twin::{AckStatus, TwinValue};
use crate::types::Measurement;
use std::collections::VecDeque;

/// Sensor que devolve uma sequência roteirizada de leituras.
#[derive(Default)]
pub struct ScriptedSensor {
    pub script: VecDeque<Option<Measurement>>,
    pub reads: usize,
    pub stopped: bool,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Option<Measurement>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl SensorSource for ScriptedSensor {
    fn read(&mut self) -> Result<Measurement, DeviceError> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Some(m)) => Ok(m),
            Some(None) => Err(DeviceError::Bus("CRC inválido".into())),
            None => Err(DeviceError::NotReady),
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

pub fn measurement(co2_ppm: f32, temperature: f32, relative_humidity: f32) -> Measurement {
    Measurement {
        co2_ppm,
        temperature,
        relative_humidity,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Connect(String, String),
    Publish(String),
    Report(String, TwinValue),
    Ack(String, TwinValue, Option<i64>, AckStatus),
    Subscribe(Vec<String>),
    Unsubscribe,
}

/// Transporte que registra todas as chamadas, na ordem.
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Vec<TransportCall>,
    pub fail: bool,
    pub fail_publish: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Publish(body) => Some(body.as_str()),
                _ => None,
            })
            .collect()
    }

    fn outcome(&self) -> Result<(), TransportError> {
        if self.fail {
            Err(TransportError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self, scope_id: &str, network_interface: &str) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Connect(
            scope_id.to_owned(),
            network_interface.to_owned(),
        ));
        self.outcome()
    }

    fn publish(&mut self, message: &TelemetryMessage) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Publish(message.body.clone()));
        if self.fail_publish {
            return Err(TransportError::NotConnected);
        }
        self.outcome()
    }

    fn report_property(&mut self, name: &str, value: &TwinValue) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Report(name.to_owned(), value.clone()));
        self.outcome()
    }

    fn acknowledge_property(
        &mut self,
        name: &str,
        value: &TwinValue,
        version: Option<i64>,
        status: AckStatus,
    ) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Ack(
            name.to_owned(),
            value.clone(),
            version,
            status,
        ));
        self.outcome()
    }

    fn subscribe_properties(&mut self, names: &[&str]) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Subscribe(
            names.iter().map(|n| n.to_string()).collect(),
        ));
        self.outcome()
    }

    fn unsubscribe(&mut self) -> Result<(), TransportError> {
        self.calls.push(TransportCall::Unsubscribe);
        self.outcome()
    }
}

/// Indicador que guarda o histórico de estados.
#[derive(Default)]
pub struct RecordingIndicator {
    pub initialized: bool,
    pub states: Vec<bool>,
    /// Quantas chamadas a `set` ainda devem falhar
    pub failures: usize,
}

impl AlarmIndicator for RecordingIndicator {
    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.initialized = true;
        Ok(())
    }

    fn set(&mut self, on: bool) -> Result<(), DeviceError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(DeviceError::Bus("GPIO ocupado".into()));
        }
        self.states.push(on);
        Ok(())
    }
}
