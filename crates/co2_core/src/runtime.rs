//! Event loop single-threaded.
//!
//! Um único ponto de espera (`select!`) atende os dois timers, as
//! notificações do transporte e pedidos de término. Os handlers rodam até o
//! fim na thread do loop, então o estado do [`ControlLoop`] não precisa de lock.
//! Threads auxiliares (listener UDP, geolocalização) só enviam [`Event`]s.

use crate::alerts::AlertSink;
use crate::control::ControlLoop;
use crate::device::SensorSource;
use crate::transport::Transport;
use crate::types::Location;
use crossbeam_channel::{Receiver, Sender, bounded, select, tick, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Códigos de saída do processo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitReason {
    Success = 0,
    InvalidConfig = 1,
    StartupFailure = 2,
    ConsumeTimerEvent = 3,
    EventLoopFailure = 4,
}

impl ExitReason {
    pub fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => ExitReason::InvalidConfig,
            2 => ExitReason::StartupFailure,
            3 => ExitReason::ConsumeTimerEvent,
            4 => ExitReason::EventLoopFailure,
            _ => ExitReason::Success,
        }
    }
}

/// Flag global de término + código de saída.
///
/// O primeiro pedido define o código; pedidos seguintes são ignorados.
#[derive(Clone)]
pub struct Termination {
    requested: Arc<AtomicBool>,
    code: Arc<AtomicU8>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Default for Termination {
    fn default() -> Self {
        Self::new()
    }
}

impl Termination {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            code: Arc::new(AtomicU8::new(ExitReason::Success.code())),
            wake_tx,
            wake_rx,
        }
    }

    pub fn request(&self, reason: ExitReason) {
        if self
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.code.store(reason.code(), Ordering::SeqCst);
            // Acorda o select; canal cheio significa que já foi acordado
            let _ = self.wake_tx.try_send(());
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn exit_reason(&self) -> ExitReason {
        ExitReason::from_code(self.code.load(Ordering::SeqCst))
    }
}

/// Notificações externas entregues ao loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Patch JSON de propriedades desejadas
    DesiredPatch(String),
    LocationResolved(Location),
}

/// Fontes periódicas do loop.
pub struct Timers {
    pub measure: Receiver<Instant>,
    pub publish: Receiver<Instant>,
}

impl Timers {
    pub fn periodic(measure: Duration, publish: Duration) -> Self {
        Self {
            measure: tick(measure),
            publish: tick(publish),
        }
    }
}

/// Cria o canal de eventos externos.
pub fn event_channel() -> (Sender<Event>, Receiver<Event>) {
    unbounded()
}

/// Reactor que serializa todos os handlers.
pub struct EventLoop {
    timers: Timers,
    events: Receiver<Event>,
    termination: Termination,
}

impl EventLoop {
    pub fn new(timers: Timers, events: Receiver<Event>, termination: Termination) -> Self {
        Self {
            timers,
            events,
            termination,
        }
    }

    /// Roda até alguém pedir término; retorna o motivo.
    pub fn run<S, T, A>(&mut self, control: &mut ControlLoop<S, T, A>) -> ExitReason
    where
        S: SensorSource,
        T: Transport,
        A: AlertSink,
    {
        info!("Event loop iniciado");
        let wake = self.termination.wake_rx.clone();

        while !self.termination.is_requested() {
            select! {
                recv(self.timers.measure) -> msg => match msg {
                    Ok(_) => control.on_measure_tick(),
                    Err(_) => {
                        error!("Falha ao consumir evento do timer de medição");
                        self.termination.request(ExitReason::ConsumeTimerEvent);
                    }
                },
                recv(self.timers.publish) -> msg => match msg {
                    Ok(_) => {
                        let outcome = control.on_publish_tick();
                        debug!("Ciclo de publicação: {outcome:?}");
                    }
                    Err(_) => {
                        error!("Falha ao consumir evento do timer de publicação");
                        self.termination.request(ExitReason::ConsumeTimerEvent);
                    }
                },
                recv(self.events) -> msg => match msg {
                    Ok(Event::DesiredPatch(text)) => {
                        control.on_desired_patch(&text);
                    }
                    Ok(Event::LocationResolved(location)) => control.on_location(location),
                    Err(_) => {
                        error!("Canal de eventos desconectado");
                        self.termination.request(ExitReason::EventLoopFailure);
                    }
                },
                recv(wake) -> _ => {}
            }
        }

        let reason = self.termination.exit_reason();
        info!("Event loop encerrado ({reason:?})");
        reason
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
