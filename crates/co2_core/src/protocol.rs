//! Codec da mensagem de telemetria.
//!
//! Formato do corpo (JSON, ordem e precisão fixas):
//!
//! ```text
//! {"CO2": 812.50, "Temperature": 22.30, "Humidity": 41.0,
//!  "Pressure": 1100.0, "Longitude": -0.100000, "Latitude": 51.500000}
//! ```
//!
//! - Corpo limitado pela capacidade configurada (padrão [`JSON_MESSAGE_BYTES`])
//! - Metadados de roteamento estáticos em [`TELEMETRY_PROPERTIES`]
//! - A mensagem é montada inteira ou não é montada

use crate::types::{Location, Reading};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Capacidade padrão do corpo JSON (bytes).
pub const JSON_MESSAGE_BYTES: usize = 256;

/// Pressão fixa enviada enquanto não há sensor de pressão.
pub const DEFAULT_PRESSURE: f32 = 1100.0;

/// Propriedade de aplicação anexada à mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageProperty {
    pub key: &'static str,
    pub value: &'static str,
}

/// Propriedades de sistema (conteúdo) da mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentProperties {
    pub content_type: &'static str,
    pub content_encoding: &'static str,
}

pub const TELEMETRY_PROPERTIES: [MessageProperty; 3] = [
    MessageProperty { key: "appid", value: "co2monitor" },
    MessageProperty { key: "type", value: "telemetry" },
    MessageProperty { key: "schema", value: "1" },
];

pub const TELEMETRY_CONTENT: ContentProperties = ContentProperties {
    content_type: "application/json",
    content_encoding: "utf-8",
};

/// Erros do codec.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProtocolError {
    #[error("Buffer muito pequeno: mensagem de {needed} bytes, capacidade {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error("Leitura de CO2 inválida")]
    InvalidReading,

    #[error("Campo {0} não é finito")]
    NonFinite(&'static str),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Registro de telemetria com os nomes de campo estáveis do wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(rename = "CO2")]
    pub co2: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "Pressure")]
    pub pressure: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
}

/// Mensagem pronta para publicação.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    pub body: String,
    pub properties: &'static [MessageProperty],
    pub content: ContentProperties,
}

impl TelemetryMessage {
    pub fn as_bytes(&self) -> &[u8] {
        self.body.as_bytes()
    }
}

/// Serializa leituras no formato fixo de telemetria.
#[derive(Debug, Clone)]
pub struct TelemetryCodec {
    capacity: usize,
    pressure: f32,
}

impl Default for TelemetryCodec {
    fn default() -> Self {
        Self::new(JSON_MESSAGE_BYTES, DEFAULT_PRESSURE)
    }
}

impl TelemetryCodec {
    pub fn new(capacity: usize, pressure: f32) -> Self {
        Self { capacity, pressure }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Codifica leitura + localização.
    ///
    /// Determinístico: a mesma entrada sempre gera os mesmos bytes.
    pub fn encode(
        &self,
        reading: &Reading,
        location: &Location,
    ) -> Result<TelemetryMessage, ProtocolError> {
        let co2 = reading.co2_ppm.value().ok_or(ProtocolError::InvalidReading)?;

        let fields = [
            ("CO2", co2.is_finite()),
            ("Temperature", reading.temperature.is_finite()),
            ("Humidity", reading.relative_humidity.is_finite()),
            ("Pressure", self.pressure.is_finite()),
            ("Longitude", location.longitude.is_finite()),
            ("Latitude", location.latitude.is_finite()),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, finite)| !finite) {
            return Err(ProtocolError::NonFinite(*name));
        }

        let mut body = String::with_capacity(self.capacity);
        // Escrever em String não falha
        let _ = write!(
            body,
            "{{\"CO2\": {:.2}, \"Temperature\": {:.2}, \"Humidity\": {:.1}, \"Pressure\": {:.1}, \"Longitude\": {:.6}, \"Latitude\": {:.6}}}",
            co2,
            reading.temperature,
            reading.relative_humidity,
            self.pressure,
            location.longitude,
            location.latitude,
        );

        if body.len() > self.capacity {
            return Err(ProtocolError::BufferTooSmall {
                needed: body.len(),
                capacity: self.capacity,
            });
        }

        Ok(TelemetryMessage {
            body,
            properties: &TELEMETRY_PROPERTIES,
            content: TELEMETRY_CONTENT,
        })
    }
}

/// Decodifica o corpo de uma mensagem de telemetria.
pub fn decode_telemetry(data: &[u8]) -> Result<TelemetryRecord, ProtocolError> {
    serde_json::from_slice(data).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Measurement;
    use chrono::Utc;

    fn sample_reading() -> Reading {
        let mut reading = Reading::default();
        reading.apply(
            Measurement {
                co2_ppm: 812.5,
                temperature: 22.3,
                relative_humidity: 41.0,
            },
            Utc::now(),
        );
        reading
    }

    fn london() -> Location {
        Location {
            latitude: 51.5,
            longitude: -0.1,
        }
    }

    #[test]
    fn formats_fields_with_fixed_precision() {
        let msg = TelemetryCodec::default()
            .encode(&sample_reading(), &london())
            .unwrap();
        assert!(msg.body.contains("\"CO2\": 812.50"));
        assert!(msg.body.contains("\"Temperature\": 22.30"));
        assert!(msg.body.contains("\"Humidity\": 41.0"));
        assert!(msg.body.contains("\"Pressure\": 1100.0"));
        assert!(msg.body.contains("\"Longitude\": -0.100000"));
        assert!(msg.body.contains("\"Latitude\": 51.500000"));
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = TelemetryCodec::default();
        let reading = sample_reading();
        let a = codec.encode(&reading, &london()).unwrap();
        let b = codec.encode(&reading, &london()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn carries_routing_metadata() {
        let msg = TelemetryCodec::default()
            .encode(&sample_reading(), &london())
            .unwrap();
        assert_eq!(msg.properties.len(), 3);
        assert_eq!(msg.properties[0], MessageProperty { key: "appid", value: "co2monitor" });
        assert_eq!(msg.properties[2].value, "1");
        assert_eq!(msg.content.content_type, "application/json");
        assert_eq!(msg.content.content_encoding, "utf-8");
    }

    #[test]
    fn body_is_valid_json() {
        let msg = TelemetryCodec::default()
            .encode(&sample_reading(), &london())
            .unwrap();
        let record = decode_telemetry(msg.as_bytes()).unwrap();
        assert_eq!(record.co2, 812.5);
        assert_eq!(record.pressure, 1100.0);
        assert_eq!(record.latitude, 51.5);
    }

    #[test]
    fn rejects_small_buffer() {
        let codec = TelemetryCodec::new(32, DEFAULT_PRESSURE);
        assert_eq!(codec.capacity(), 32);
        assert_eq!(TelemetryCodec::default().capacity(), JSON_MESSAGE_BYTES);
        let err = codec.encode(&sample_reading(), &london()).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BufferTooSmall { capacity: 32, .. }
        ));
    }

    #[test]
    fn rejects_invalid_reading() {
        let reading = Reading::default();
        assert_eq!(
            TelemetryCodec::default().encode(&reading, &london()),
            Err(ProtocolError::InvalidReading)
        );
    }

    #[test]
    fn rejects_non_finite_field() {
        let mut reading = sample_reading();
        reading.temperature = f32::NAN;
        assert_eq!(
            TelemetryCodec::default().encode(&reading, &london()),
            Err(ProtocolError::NonFinite("Temperature"))
        );
    }

    #[test]
    fn message_fits_default_capacity() {
        let mut reading = sample_reading();
        reading.apply(
            Measurement {
                co2_ppm: 40_000.0,
                temperature: -40.0,
                relative_humidity: 100.0,
            },
            Utc::now(),
        );
        let loc = Location {
            latitude: -89.999999,
            longitude: -179.999999,
        };
        let msg = TelemetryCodec::default().encode(&reading, &loc).unwrap();
        assert!(msg.body.len() < JSON_MESSAGE_BYTES);
    }
}
