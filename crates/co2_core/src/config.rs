//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável; argumentos de linha de
//! comando sobrescrevem os valores carregados.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::protocol::{DEFAULT_PRESSURE, JSON_MESSAGE_BYTES};

/// Erros ao carregar/salvar a configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao gravar {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Conexão com o plano de controle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Identificador de escopo do serviço de provisionamento (obrigatório)
    pub scope_id: String,
    /// Interface de rede usada pelo transporte
    pub network_interface: String,
    /// Endpoint UDP do gateway de nuvem
    pub endpoint: String,
    /// IP local para bind (vazio = auto)
    pub bind_ip: String,
    /// Porta local onde chegam os patches de propriedades desejadas
    pub listen_port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scope_id: String::new(),
            network_interface: "wlan0".into(),
            endpoint: "127.0.0.1:5005".into(),
            bind_ip: String::new(),
            listen_port: 5006,
        }
    }
}

/// Períodos dos timers do loop de controle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Intervalo de leitura do sensor em segundos
    pub measure_interval_secs: f64,
    /// Intervalo de publicação de telemetria em segundos
    pub publish_interval_secs: f64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            measure_interval_secs: 4.0,
            publish_interval_secs: 60.0,
        }
    }
}

impl TimerConfig {
    pub fn measure_interval(&self) -> Duration {
        Duration::from_secs_f64(self.measure_interval_secs)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs_f64(self.publish_interval_secs)
    }
}

/// Formato da mensagem de telemetria.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Capacidade máxima do corpo JSON (bytes)
    pub message_capacity: usize,
    /// Pressão fixa enviada no campo `Pressure`
    pub pressure: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            message_capacity: JSON_MESSAGE_BYTES,
            pressure: DEFAULT_PRESSURE,
        }
    }
}

/// Alarme de CO2.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Threshold inicial (ppm) até o plano de controle enviar um desejado
    pub initial_threshold_ppm: Option<f32>,
    /// Arquivo `value` do GPIO do buzzer (vazio = apenas log)
    pub gpio_value_path: String,
}

/// Localização fixa do dispositivo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Parâmetros do sensor simulado.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// CO2 de referência (ppm)
    pub baseline_co2_ppm: f32,
    /// Temperatura de referência (°C)
    pub baseline_temperature: f32,
    /// Umidade de referência (%)
    pub baseline_humidity: f32,
    /// Probabilidade de falha por leitura (0–1)
    pub failure_rate: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            baseline_co2_ppm: 600.0,
            baseline_temperature: 22.0,
            baseline_humidity: 45.0,
            failure_rate: 0.0,
        }
    }
}

/// Configuração raiz do agente.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub connection: ConnectionConfig,
    pub timers: TimerConfig,
    pub telemetry: TelemetryConfig,
    pub alert: AlertConfig,
    pub location: LocationConfig,
    pub sensor: SensorConfig,
}

impl AgentConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente → configuração padrão. Arquivo ilegível ou inválido → erro.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Usando configuração padrão ({} não existe)", path.display());
            return Ok(AgentConfig::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str::<AgentConfig>(&content).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("Configuração carregada de {}", path.display());
        Ok(config)
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.connection.scope_id.trim().is_empty() {
            errors.push("scope_id é obrigatório".into());
        }
        if self.connection.network_interface.trim().is_empty() {
            errors.push("network_interface não pode ser vazio".into());
        }
        if self.connection.endpoint.trim().is_empty() {
            errors.push("endpoint não pode ser vazio".into());
        }
        if !(0.1..=3600.0).contains(&self.timers.measure_interval_secs) {
            errors.push(format!(
                "Intervalo de medição inválido: {} (0.1–3600.0)",
                self.timers.measure_interval_secs
            ));
        }
        if !(1.0..=86400.0).contains(&self.timers.publish_interval_secs) {
            errors.push(format!(
                "Intervalo de publicação inválido: {} (1.0–86400.0)",
                self.timers.publish_interval_secs
            ));
        }
        if self.telemetry.message_capacity == 0 {
            errors.push("message_capacity não pode ser 0".into());
        }
        if !self.telemetry.pressure.is_finite() {
            errors.push(format!("Pressão inválida: {}", self.telemetry.pressure));
        }
        if self.location.latitude.is_some() != self.location.longitude.is_some() {
            errors.push("latitude e longitude devem ser informadas juntas".into());
        }
        if let Some(lat) = self.location.latitude
            && !(-90.0..=90.0).contains(&lat)
        {
            errors.push(format!("Latitude fora do intervalo: {lat}"));
        }
        if let Some(lng) = self.location.longitude
            && !(-180.0..=180.0).contains(&lng)
        {
            errors.push(format!("Longitude fora do intervalo: {lng}"));
        }
        if !(0.0..=1.0).contains(&self.sensor.failure_rate) {
            errors.push(format!(
                "failure_rate inválido: {} (0.0–1.0)",
                self.sensor.failure_rate
            ));
        }

        errors
    }
}
