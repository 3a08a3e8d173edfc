//! # CO2 Core
//!
//! Crate compartilhada com o loop de controle sense–publish–synchronize do
//! monitor de CO2: estado da leitura, codec de telemetria, device twin,
//! alarme, configuração TOML e o event loop que serializa os handlers.
//!
//! ## Módulos
//! - [`types`] – Leitura, localização e estado de telemetria
//! - [`protocol`] – Codec JSON da mensagem de telemetria
//! - [`twin`] – Registro de propriedades desired/reported com ack
//! - [`alerts`] – Threshold de CO2 e indicador de alarme
//! - [`device`] – Interfaces de sensor, alarme e geolocalização
//! - [`transport`] – Interface do cliente do plano de controle
//! - [`control`] – Handlers dos timers e do twin
//! - [`runtime`] – Event loop, eventos e término
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod protocol;
pub mod twin;
pub mod alerts;
pub mod device;
pub mod transport;
pub mod control;
pub mod runtime;
pub mod config;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports convenientes
pub use config::AgentConfig;
pub use control::{ControlLoop, PublishOutcome};
pub use protocol::{TelemetryCodec, TelemetryMessage};
pub use runtime::{Event, EventLoop, ExitReason, Termination};
pub use types::{Location, Reading};
