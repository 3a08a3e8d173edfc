//! Loop de controle sense–publish–synchronize.
//!
//! Handlers síncronos, chamados pelo [`EventLoop`](crate::runtime::EventLoop)
//! um de cada vez:
//!
//! - [`ControlLoop::on_measure_tick`] – lê o sensor e avalia o alarme
//! - [`ControlLoop::on_publish_tick`] – publica telemetria e reporta o CO2
//! - [`ControlLoop::on_desired_patch`] – reconcilia propriedades desejadas
//! - [`ControlLoop::on_location`] – grava a localização resolvida

use crate::alerts::AlertSink;
use crate::device::{DeviceError, SensorSource};
use crate::protocol::{ProtocolError, TelemetryCodec};
use crate::transport::{Transport, TransportError};
use crate::twin::{
    DesiredHandler, PropertyDeclaration, PropertySyncStore, TwinError, TwinKind, TwinValue,
    parse_desired_patch,
};
use crate::types::{Location, TelemetryState};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Propriedade desejada: nível de alerta de CO2 (ppm).
pub const DESIRED_CO2_ALERT_LEVEL: &str = "DesiredCO2AlertLevel";

/// Propriedade reportada: último CO2 medido (ppm).
pub const REPORTED_CO2_LEVEL: &str = "ReportedCO2Level";

/// Atualiza o threshold do alert sink depois do ack.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertThresholdHandler;

impl<A: AlertSink> DesiredHandler<A> for AlertThresholdHandler {
    fn after_acknowledge(&mut self, value: &TwinValue, sink: &mut A) {
        match value.as_f32() {
            Some(threshold) => sink.update(threshold),
            None => warn!("Nível de alerta não numérico ignorado: {value}"),
        }
    }
}

/// Declarações do device twin do monitor de CO2.
pub fn default_declarations<A: AlertSink>() -> Vec<PropertyDeclaration<A>> {
    vec![
        PropertyDeclaration::desired(DESIRED_CO2_ALERT_LEVEL, TwinKind::Int, AlertThresholdHandler),
        PropertyDeclaration::reported(REPORTED_CO2_LEVEL, TwinKind::Float),
    ]
}

/// Erros de inicialização do loop.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Falha ao conectar transporte: {0}")]
    Connect(#[source] TransportError),

    #[error("Falha ao assinar propriedades: {0}")]
    Subscribe(#[source] TransportError),

    #[error("Falha ao inicializar alarme: {0}")]
    Alert(#[from] DeviceError),
}

/// Resultado de um ciclo de publicação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Pré-condições não atendidas (CO2 inválido ou sem localização)
    Skipped,
    Published,
    EncodeFailed,
    TransportFailed,
}

/// Identificação da conexão.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub scope_id: String,
    pub network_interface: String,
}

/// Dono exclusivo do estado de telemetria, do twin e dos dispositivos.
pub struct ControlLoop<S: SensorSource, T: Transport, A: AlertSink> {
    sensor: S,
    transport: T,
    alert: A,
    twins: PropertySyncStore<A>,
    codec: TelemetryCodec,
    state: TelemetryState,
}

impl<S: SensorSource, T: Transport, A: AlertSink> ControlLoop<S, T, A> {
    pub fn new(
        sensor: S,
        transport: T,
        alert: A,
        twins: PropertySyncStore<A>,
        codec: TelemetryCodec,
    ) -> Self {
        Self {
            sensor,
            transport,
            alert,
            twins,
            codec,
            state: TelemetryState::default(),
        }
    }

    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    pub fn twins(&self) -> &PropertySyncStore<A> {
        &self.twins
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn alert(&self) -> &A {
        &self.alert
    }

    /// Conecta, prepara o alarme, faz a primeira leitura e assina o twin.
    pub fn start(&mut self, connection: &ConnectionInfo) -> Result<(), StartupError> {
        self.transport
            .connect(&connection.scope_id, &connection.network_interface)
            .map_err(StartupError::Connect)?;
        info!(
            "Conectado (escopo {}, interface {})",
            connection.scope_id, connection.network_interface
        );

        // Alarme pronto antes da primeira leitura poder acioná-lo
        self.alert.initialize()?;
        self.on_measure_tick();

        let names = self.twins.names();
        self.transport
            .subscribe_properties(&names)
            .map_err(StartupError::Subscribe)?;
        info!("Twin assinado: {}", names.join(", "));
        Ok(())
    }

    /// Timer de medição: last-value-wins; falha só invalida o CO2.
    pub fn on_measure_tick(&mut self) {
        match self.sensor.read() {
            Ok(measurement) => {
                self.state.reading.apply(measurement, Utc::now());
                debug!(
                    "Leitura: CO2 {:.1} ppm | {:.1}°C | {:.1}%",
                    measurement.co2_ppm, measurement.temperature, measurement.relative_humidity
                );
                if let Some(co2) = self.state.reading.co2_ppm.value() {
                    self.alert.evaluate(co2);
                }
            }
            Err(e) => {
                debug!("Leitura do sensor falhou: {e}");
                self.state.reading.invalidate_co2();
            }
        }
    }

    /// Timer de publicação.
    ///
    /// Só publica com CO2 válido e localização presente; caso contrário o
    /// ciclo é pulado em silêncio. Com as pré-condições atendidas o CO2 é
    /// reportado no twin independentemente do resultado da publicação.
    pub fn on_publish_tick(&mut self) -> PublishOutcome {
        let (Some(co2), Some(location)) = (
            self.state.reading.co2_ppm.value(),
            self.state.location.get(),
        ) else {
            return PublishOutcome::Skipped;
        };

        let outcome = match self.codec.encode(&self.state.reading, &location) {
            Ok(message) => {
                debug!("{}", message.body);
                match self.transport.publish(&message) {
                    Ok(()) => PublishOutcome::Published,
                    Err(e) => {
                        warn!("Erro ao publicar telemetria: {e}");
                        PublishOutcome::TransportFailed
                    }
                }
            }
            Err(e @ ProtocolError::BufferTooSmall { .. }) => {
                warn!("Serialização JSON falhou: {e}");
                PublishOutcome::EncodeFailed
            }
            Err(e) => {
                warn!("Telemetria não codificada: {e}");
                PublishOutcome::EncodeFailed
            }
        };

        if let Err(e) = self.twins.report(
            REPORTED_CO2_LEVEL,
            TwinValue::Float(f64::from(co2)),
            &mut self.transport,
        ) {
            warn!("Falha ao reportar {REPORTED_CO2_LEVEL}: {e}");
        }

        outcome
    }

    /// Reconcilia uma única propriedade desejada.
    pub fn on_desired_update(
        &mut self,
        name: &str,
        value: TwinValue,
        version: Option<i64>,
    ) -> Result<(), TwinError> {
        self.twins
            .on_desired_update(name, value, version, &mut self.transport, &mut self.alert)
    }

    /// Notificação do transporte com um patch de propriedades desejadas.
    pub fn on_desired_patch(&mut self, text: &str) -> usize {
        match parse_desired_patch(text) {
            Ok(patch) => self
                .twins
                .apply_patch(&patch, &mut self.transport, &mut self.alert),
            Err(e) => {
                warn!("Patch de twin descartado: {e}");
                0
            }
        }
    }

    pub fn on_location(&mut self, location: Location) {
        let now = Utc::now();
        let previous = self.state.location.resolved_at();
        if self.state.location.store(location, now) {
            info!(
                "Localização resolvida: {:.6}, {:.6}",
                location.latitude, location.longitude
            );
        } else {
            let age = previous.map_or(0, |at| (now - at).num_seconds());
            debug!(
                "Localização atualizada: {:.6}, {:.6} (anterior há {age}s)",
                location.latitude, location.longitude
            );
        }
    }

    /// Desfaz o que `start` montou. Erros são apenas registrados.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.transport.unsubscribe() {
            warn!("Falha ao cancelar assinatura do twin: {e}");
        }
        self.sensor.stop();
        self.alert.clear();
        info!("Loop de controle encerrado");
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
