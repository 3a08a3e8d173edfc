//! Transporte UDP para o gateway de nuvem.
//!
//! Cada chamada vira um datagrama JSON enviado ao endpoint:
//!
//! ```text
//! {"scope_id": "...", "kind": "telemetry", "properties": {...},
//!  "content_type": "application/json", "content_encoding": "utf-8", "body": "{...}"}
//! {"scope_id": "...", "kind": "reported", "patch": {...}}
//! {"scope_id": "...", "kind": "subscribe", "properties": [...]}
//! {"scope_id": "...", "kind": "unsubscribe"}
//! ```
//!
//! Patches de propriedades desejadas chegam no mesmo socket e são repassados
//! ao event loop pela thread de escuta.

use co2_core::protocol::TelemetryMessage;
use co2_core::runtime::{Event, Termination};
use co2_core::transport::{Transport, TransportError};
use co2_core::twin::{AckStatus, TwinValue, ack_patch, reported_patch};
use crossbeam_channel::Sender;
use serde_json::{Map, Value, json};
use std::net::UdpSocket;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tamanho máximo de datagrama aceito pela thread de escuta.
const MAX_DATAGRAM: usize = 8192;

pub struct UdpTransport {
    endpoint: String,
    bind_addr: String,
    socket: Option<UdpSocket>,
    scope_id: String,
}

impl UdpTransport {
    pub fn new(endpoint: &str, bind_ip: &str, listen_port: u16) -> Self {
        let ip = if bind_ip.is_empty() { "0.0.0.0" } else { bind_ip };
        Self {
            endpoint: endpoint.to_owned(),
            bind_addr: format!("{ip}:{listen_port}"),
            socket: None,
            scope_id: String::new(),
        }
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::NotConnected)
    }

    fn send(&self, mut envelope: Value) -> Result<(), TransportError> {
        let socket = self.socket()?;
        if let Value::Object(obj) = &mut envelope {
            obj.insert("scope_id".into(), Value::from(self.scope_id.as_str()));
        }
        let bytes =
            serde_json::to_vec(&envelope).map_err(|e| TransportError::Serialize(e.to_string()))?;
        let sent = socket.send_to(&bytes, &self.endpoint)?;
        debug!("→ {sent} bytes para {}", self.endpoint);
        Ok(())
    }

    /// Inicia a thread que escuta patches desejados no socket conectado.
    pub fn spawn_listener(
        &self,
        events: Sender<Event>,
        termination: Termination,
    ) -> Result<std::thread::JoinHandle<()>, TransportError> {
        let socket = self.socket()?.try_clone()?;
        socket.set_read_timeout(Some(Duration::from_secs(1)))?;

        let handle = std::thread::Builder::new()
            .name("udp-twin-listener".into())
            .spawn(move || listener_loop(&socket, &events, &termination))?;
        Ok(handle)
    }
}

fn listener_loop(socket: &UdpSocket, events: &Sender<Event>, termination: &Termination) {
    let mut buf = [0u8; MAX_DATAGRAM];
    while !termination.is_requested() {
        match socket.recv_from(&mut buf) {
            Ok((size, addr)) => match std::str::from_utf8(&buf[..size]) {
                Ok(text) => {
                    debug!("Patch de twin recebido de {addr} ({size} bytes)");
                    if events.send(Event::DesiredPatch(text.to_owned())).is_err() {
                        break;
                    }
                }
                Err(e) => debug!("Datagrama não UTF-8 de {addr}: {e}"),
            },
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                // Timeout normal, confere término e continua
            }
            Err(e) => {
                warn!("Erro ao receber UDP: {e}");
                std::thread::sleep(Duration::from_millis(200));
            }
        }
    }
    debug!("Listener de twin encerrado");
}

impl Transport for UdpTransport {
    fn connect(&mut self, scope_id: &str, network_interface: &str) -> Result<(), TransportError> {
        let socket = UdpSocket::bind(&self.bind_addr)?;
        info!(
            "Socket UDP em {} → {} (interface {network_interface})",
            socket.local_addr()?,
            self.endpoint
        );
        self.socket = Some(socket);
        self.scope_id = scope_id.to_owned();
        Ok(())
    }

    fn publish(&mut self, message: &TelemetryMessage) -> Result<(), TransportError> {
        let properties: Map<String, Value> = message
            .properties
            .iter()
            .map(|p| (p.key.to_owned(), Value::from(p.value)))
            .collect();
        self.send(json!({
            "kind": "telemetry",
            "properties": properties,
            "content_type": message.content.content_type,
            "content_encoding": message.content.content_encoding,
            "body": message.body,
        }))
    }

    fn report_property(&mut self, name: &str, value: &TwinValue) -> Result<(), TransportError> {
        self.send(json!({
            "kind": "reported",
            "patch": reported_patch(name, value),
        }))
    }

    fn acknowledge_property(
        &mut self,
        name: &str,
        value: &TwinValue,
        version: Option<i64>,
        status: AckStatus,
    ) -> Result<(), TransportError> {
        self.send(json!({
            "kind": "reported",
            "patch": ack_patch(name, value, version, status),
        }))
    }

    fn subscribe_properties(&mut self, names: &[&str]) -> Result<(), TransportError> {
        self.send(json!({
            "kind": "subscribe",
            "properties": names,
        }))
    }

    fn unsubscribe(&mut self) -> Result<(), TransportError> {
        self.send(json!({ "kind": "unsubscribe" }))
    }
}
