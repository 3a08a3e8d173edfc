//! Interface do cliente de transporte / plano de controle.
//!
//! Notificações de entrada (patches de propriedades desejadas) não passam
//! por aqui: chegam no event loop como [`Event::DesiredPatch`](crate::runtime::Event).

use crate::protocol::TelemetryMessage;
use crate::twin::{AckStatus, TwinValue};

/// Erros de transporte.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transporte não conectado")]
    NotConnected,

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    Serialize(String),
}

/// Cliente do plano de controle.
///
/// Todas as chamadas são fire-and-forget: não aguardam confirmação de entrega.
pub trait Transport {
    fn connect(&mut self, scope_id: &str, network_interface: &str) -> Result<(), TransportError>;

    fn publish(&mut self, message: &TelemetryMessage) -> Result<(), TransportError>;

    /// Envia o valor corrente de uma propriedade reportada.
    fn report_property(&mut self, name: &str, value: &TwinValue) -> Result<(), TransportError>;

    /// Confirma o recebimento de um valor desejado.
    fn acknowledge_property(
        &mut self,
        name: &str,
        value: &TwinValue,
        version: Option<i64>,
        status: AckStatus,
    ) -> Result<(), TransportError>;

    fn subscribe_properties(&mut self, names: &[&str]) -> Result<(), TransportError>;

    fn unsubscribe(&mut self) -> Result<(), TransportError>;
}
