//! Definição de tipos/structs do estado de telemetria.
//!
//! A leitura corrente e a localização ficam em [`TelemetryState`], que é
//! propriedade exclusiva do [`ControlLoop`](crate::control::ControlLoop).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// CO2
// ──────────────────────────────────────────────

/// Concentração de CO2 com sentinela explícita de leitura inválida.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Co2Ppm {
    /// Nenhuma leitura válida desde a última falha do sensor.
    #[default]
    Invalid,
    /// Valor finito em ppm.
    Valid(f32),
}

impl Co2Ppm {
    /// Converte o valor bruto do driver; valores não finitos viram `Invalid`.
    pub fn from_raw(value: f32) -> Self {
        if value.is_finite() {
            Co2Ppm::Valid(value)
        } else {
            Co2Ppm::Invalid
        }
    }

    pub fn value(self) -> Option<f32> {
        match self {
            Co2Ppm::Valid(v) => Some(v),
            Co2Ppm::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Co2Ppm::Valid(_))
    }
}

// ──────────────────────────────────────────────
// Medição / Leitura
// ──────────────────────────────────────────────

/// Resultado bruto de uma leitura do sensor (SCD30).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// CO2 (ppm)
    pub co2_ppm: f32,
    /// Temperatura (°C)
    pub temperature: f32,
    /// Umidade relativa (%)
    pub relative_humidity: f32,
}

/// Última leitura conhecida (last-value-wins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    pub co2_ppm: Co2Ppm,
    /// Temperatura (°C)
    pub temperature: f32,
    /// Umidade relativa (%)
    pub relative_humidity: f32,
    /// Momento da última leitura bem sucedida
    pub sampled_at: Option<DateTime<Utc>>,
}

impl Reading {
    /// Sobrescreve a leitura com uma medição bem sucedida.
    pub fn apply(&mut self, measurement: Measurement, at: DateTime<Utc>) {
        self.co2_ppm = Co2Ppm::from_raw(measurement.co2_ppm);
        self.temperature = measurement.temperature;
        self.relative_humidity = measurement.relative_humidity;
        self.sampled_at = Some(at);
    }

    /// Marca apenas o CO2 como inválido; temperatura e umidade são mantidas.
    pub fn invalidate_co2(&mut self) {
        self.co2_ppm = Co2Ppm::Invalid;
    }
}

// ──────────────────────────────────────────────
// Localização
// ──────────────────────────────────────────────

/// Coordenadas geográficas do dispositivo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Cache da última localização resolvida.
#[derive(Debug, Clone, Default)]
pub struct LocationCache {
    location: Option<Location>,
    resolved_at: Option<DateTime<Utc>>,
}

impl LocationCache {
    pub fn get(&self) -> Option<Location> {
        self.location
    }

    pub fn is_present(&self) -> bool {
        self.location.is_some()
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Grava a localização. Retorna `true` se é a primeira resolução.
    pub fn store(&mut self, location: Location, at: DateTime<Utc>) -> bool {
        let first = self.location.is_none();
        self.location = Some(location);
        self.resolved_at = Some(at);
        first
    }
}

// ──────────────────────────────────────────────
// Estado compartilhado pelos handlers
// ──────────────────────────────────────────────

/// Estado mutável da telemetria, escrito apenas pelos handlers do loop.
#[derive(Debug, Clone, Default)]
pub struct TelemetryState {
    pub reading: Reading,
    pub location: LocationCache,
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
