use std::path::PathBuf;

use clap::Parser;
use co2_core::AgentConfig;

/// CO2 Monitor Agent
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Identificador de escopo do serviço de provisionamento
    #[arg(long, env = "CO2_SCOPE_ID")]
    pub scope_id: Option<String>,

    /// Caminho do config.toml (padrão: ao lado do executável)
    #[arg(long, env = "CO2_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface de rede do transporte
    #[arg(long)]
    pub network_interface: Option<String>,

    /// Endpoint UDP do gateway (host:porta)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Intervalo de medição (segundos)
    #[arg(long)]
    pub measure_interval: Option<f64>,

    /// Intervalo de publicação (segundos)
    #[arg(long)]
    pub publish_interval: Option<f64>,
}

impl Args {
    /// Sobrescreve a configuração carregada com os argumentos informados.
    pub fn apply(&self, config: &mut AgentConfig) {
        if let Some(scope_id) = &self.scope_id {
            config.connection.scope_id = scope_id.clone();
        }
        if let Some(iface) = &self.network_interface {
            config.connection.network_interface = iface.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.connection.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.measure_interval {
            config.timers.measure_interval_secs = secs;
        }
        if let Some(secs) = self.publish_interval {
            config.timers.publish_interval_secs = secs;
        }
    }
}
