//! Device twin – registro fixo de propriedades sincronizadas.
//!
//! Cada propriedade tem um slot *desired* (escrito pelo plano de controle) e
//! um slot *reported* (escrito pelo dispositivo). Atualizações desejadas
//! seguem o padrão echo-and-acknowledge:
//!
//! ```text
//! desired(name, v) → report(name, v) → ack(name, v, completed) → handler
//! ```
//!
//! O registro é montado uma vez no startup e não cresce em runtime.

use crate::transport::{Transport, TransportError};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

// ──────────────────────────────────────────────
// Valores
// ──────────────────────────────────────────────

/// Tipo declarado de uma propriedade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwinKind {
    Int,
    Float,
    String,
}

/// Valor de propriedade tipado.
#[derive(Debug, Clone, PartialEq)]
pub enum TwinValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl TwinValue {
    pub fn kind(&self) -> TwinKind {
        match self {
            TwinValue::Int(_) => TwinKind::Int,
            TwinValue::Float(_) => TwinKind::Float,
            TwinValue::String(_) => TwinKind::String,
        }
    }

    /// Converte um valor JSON para o tipo declarado.
    pub fn from_json(kind: TwinKind, value: &Value) -> Option<Self> {
        match kind {
            TwinKind::Int => value
                .as_i64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .map(TwinValue::Int),
            TwinKind::Float => value.as_f64().map(TwinValue::Float),
            TwinKind::String => value.as_str().map(|s| TwinValue::String(s.to_owned())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            TwinValue::Int(v) => Value::from(*v),
            TwinValue::Float(v) => Value::from(*v),
            TwinValue::String(v) => Value::from(v.as_str()),
        }
    }

    /// Valor numérico (Int ou Float) como f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            TwinValue::Int(v) => Some(*v as f32),
            TwinValue::Float(v) => Some(*v as f32),
            TwinValue::String(_) => None,
        }
    }
}

impl std::fmt::Display for TwinValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TwinValue::Int(v) => write!(f, "{v}"),
            TwinValue::Float(v) => write!(f, "{v}"),
            TwinValue::String(v) => write!(f, "\"{v}\""),
        }
    }
}

// ──────────────────────────────────────────────
// Estado de uma propriedade
// ──────────────────────────────────────────────

/// Estado de confirmação do último valor desejado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    Unacknowledged,
    Acknowledged,
}

/// Status enviado junto com a confirmação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Completed,
    Pending,
    Invalid,
    Error,
}

impl AckStatus {
    pub fn code(self) -> u16 {
        match self {
            AckStatus::Completed => 200,
            AckStatus::Pending => 202,
            AckStatus::Invalid => 404,
            AckStatus::Error => 500,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AckStatus::Completed => "completed",
            AckStatus::Pending => "pending",
            AckStatus::Invalid => "invalid",
            AckStatus::Error => "error",
        }
    }
}

/// Propriedade sincronizada.
#[derive(Debug, Clone, PartialEq)]
pub struct TwinProperty {
    pub name: &'static str,
    pub kind: TwinKind,
    pub desired_value: Option<TwinValue>,
    pub desired_version: Option<i64>,
    pub reported_value: Option<TwinValue>,
    pub ack_state: AckState,
}

impl TwinProperty {
    fn new(name: &'static str, kind: TwinKind) -> Self {
        Self {
            name,
            kind,
            desired_value: None,
            desired_version: None,
            reported_value: None,
            ack_state: AckState::Unacknowledged,
        }
    }
}

// ──────────────────────────────────────────────
// Handlers
// ──────────────────────────────────────────────

/// Efeito colateral executado após o echo-and-acknowledge.
///
/// `C` é o contexto mutável emprestado pelo dono do registro
/// (o alert sink, no caso do monitor de CO2).
pub trait DesiredHandler<C: ?Sized> {
    fn after_acknowledge(&mut self, _value: &TwinValue, _ctx: &mut C) {}
}

/// Handler padrão: apenas echo-and-acknowledge.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl<C: ?Sized> DesiredHandler<C> for EchoHandler {}

/// Declaração estática de uma propriedade.
pub struct PropertyDeclaration<C: ?Sized> {
    pub name: &'static str,
    pub kind: TwinKind,
    /// `None` = propriedade somente reportada (ignora updates desejados).
    pub handler: Option<Box<dyn DesiredHandler<C>>>,
}

impl<C: ?Sized> PropertyDeclaration<C> {
    pub fn reported(name: &'static str, kind: TwinKind) -> Self {
        Self {
            name,
            kind,
            handler: None,
        }
    }

    pub fn desired(
        name: &'static str,
        kind: TwinKind,
        handler: impl DesiredHandler<C> + 'static,
    ) -> Self {
        Self {
            name,
            kind,
            handler: Some(Box::new(handler)),
        }
    }
}

// ──────────────────────────────────────────────
// Erros
// ──────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum TwinError {
    #[error("Propriedade desconhecida: {0}")]
    UnknownProperty(String),

    #[error("Propriedade duplicada: {0}")]
    DuplicateProperty(&'static str),

    #[error("Propriedade {0} não aceita valores desejados")]
    ReportedOnly(&'static str),

    #[error("Tipo incompatível para {name}: esperado {expected:?}, recebido {found:?}")]
    KindMismatch {
        name: &'static str,
        expected: TwinKind,
        found: TwinKind,
    },

    #[error("Patch inválido: {0}")]
    InvalidPatch(String),

    #[error("Falha de transporte: {0}")]
    Transport(#[from] TransportError),
}

// ──────────────────────────────────────────────
// Registro
// ──────────────────────────────────────────────

struct Entry<C: ?Sized> {
    property: TwinProperty,
    handler: Option<Box<dyn DesiredHandler<C>>>,
}

/// Registro fixo de propriedades do device twin.
pub struct PropertySyncStore<C: ?Sized> {
    entries: Vec<Entry<C>>,
}

impl<C: ?Sized> PropertySyncStore<C> {
    /// Monta o registro a partir das declarações (ordem preservada).
    pub fn new(declarations: Vec<PropertyDeclaration<C>>) -> Result<Self, TwinError> {
        let mut entries: Vec<Entry<C>> = Vec::with_capacity(declarations.len());
        for decl in declarations {
            if entries.iter().any(|e| e.property.name == decl.name) {
                return Err(TwinError::DuplicateProperty(decl.name));
            }
            entries.push(Entry {
                property: TwinProperty::new(decl.name, decl.kind),
                handler: decl.handler,
            });
        }
        Ok(Self { entries })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.property.name).collect()
    }

    pub fn property(&self, name: &str) -> Option<&TwinProperty> {
        self.entries
            .iter()
            .find(|e| e.property.name == name)
            .map(|e| &e.property)
    }

    pub fn kind_of(&self, name: &str) -> Option<TwinKind> {
        self.property(name).map(|p| p.kind)
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Entry<C>, TwinError> {
        self.entries
            .iter_mut()
            .find(|e| e.property.name == name)
            .ok_or_else(|| TwinError::UnknownProperty(name.to_owned()))
    }

    /// Publica o valor corrente como reportado. Não espera confirmação.
    pub fn report<T: Transport + ?Sized>(
        &mut self,
        name: &str,
        value: TwinValue,
        transport: &mut T,
    ) -> Result<(), TwinError> {
        let entry = self.entry_mut(name)?;
        let property = &mut entry.property;
        if value.kind() != property.kind {
            return Err(TwinError::KindMismatch {
                name: property.name,
                expected: property.kind,
                found: value.kind(),
            });
        }

        debug!("Twin report {} = {}", property.name, value);
        let result = transport.report_property(property.name, &value);
        property.reported_value = Some(value);
        result.map_err(TwinError::from)
    }

    /// Reconcilia um valor desejado: grava, ecoa como reportado, confirma e
    /// então executa o handler da propriedade.
    ///
    /// O handler roda mesmo se o transporte falhar; `ack_state` só vira
    /// `Acknowledged` quando report e ack foram aceitos pelo transporte.
    pub fn on_desired_update<T: Transport + ?Sized>(
        &mut self,
        name: &str,
        value: TwinValue,
        version: Option<i64>,
        transport: &mut T,
        ctx: &mut C,
    ) -> Result<(), TwinError> {
        let entry = self.entry_mut(name)?;
        let property = &mut entry.property;
        let Some(handler) = entry.handler.as_mut() else {
            return Err(TwinError::ReportedOnly(property.name));
        };
        if value.kind() != property.kind {
            return Err(TwinError::KindMismatch {
                name: property.name,
                expected: property.kind,
                found: value.kind(),
            });
        }

        info!("Twin desired {} = {} (versão {:?})", property.name, value, version);
        property.desired_value = Some(value.clone());
        property.desired_version = version;
        property.ack_state = AckState::Unacknowledged;

        let reported = transport.report_property(property.name, &value);
        property.reported_value = Some(value.clone());
        let acked = transport.acknowledge_property(
            property.name,
            &value,
            version,
            AckStatus::Completed,
        );

        let round_trip = reported.and(acked);
        if round_trip.is_ok() {
            property.ack_state = AckState::Acknowledged;
        }

        handler.after_acknowledge(&value, ctx);
        round_trip.map_err(TwinError::from)
    }

    /// Aplica todas as entradas de um patch desejado. Retorna quantas foram aceitas.
    pub fn apply_patch<T: Transport + ?Sized>(
        &mut self,
        patch: &DesiredPatch,
        transport: &mut T,
        ctx: &mut C,
    ) -> usize {
        let mut applied = 0;
        for (name, raw) in &patch.entries {
            let Some(kind) = self.kind_of(name) else {
                debug!("Propriedade desejada desconhecida ignorada: {name}");
                continue;
            };
            let Some(value) = TwinValue::from_json(kind, raw) else {
                warn!("Valor de {name} não converte para {kind:?}: {raw}");
                continue;
            };
            match self.on_desired_update(name, value, patch.version, transport, ctx) {
                Ok(()) => applied += 1,
                Err(TwinError::ReportedOnly(n)) => debug!("Update desejado ignorado para {n}"),
                Err(e) => warn!("Falha ao reconciliar {name}: {e}"),
            }
        }
        applied
    }
}

// ──────────────────────────────────────────────
// Wire (JSON)
// ──────────────────────────────────────────────

/// Patch de propriedades desejadas recebido do plano de controle.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredPatch {
    pub version: Option<i64>,
    pub entries: Vec<(String, Value)>,
}

/// Interpreta um patch desejado.
///
/// Aceita o patch puro (`{"Prop": 1, "$version": 3}`) ou o documento
/// completo do twin (`{"desired": {...}, "reported": {...}}`).
pub fn parse_desired_patch(text: &str) -> Result<DesiredPatch, TwinError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| TwinError::InvalidPatch(e.to_string()))?;
    let Value::Object(mut root) = value else {
        return Err(TwinError::InvalidPatch("raiz não é um objeto".into()));
    };

    let desired = match root.remove("desired") {
        Some(Value::Object(inner)) => inner,
        _ => root,
    };

    let version = desired.get("$version").and_then(Value::as_i64);
    let entries = desired
        .into_iter()
        .filter(|(k, _)| !k.starts_with('$'))
        .collect();

    Ok(DesiredPatch { version, entries })
}

/// `{"<name>": value}`
pub fn reported_patch(name: &str, value: &TwinValue) -> Value {
    let mut map = Map::new();
    map.insert(name.to_owned(), value.to_json());
    Value::Object(map)
}

/// `{"<name>": {"value": v, "ac": code, "av": version, "ad": "status"}}`
pub fn ack_patch(name: &str, value: &TwinValue, version: Option<i64>, status: AckStatus) -> Value {
    let mut ack = json!({
        "value": value.to_json(),
        "ac": status.code(),
        "ad": status.description(),
    });
    if let (Some(v), Value::Object(obj)) = (version, &mut ack) {
        obj.insert("av".into(), Value::from(v));
    }
    let mut map = Map::new();
    map.insert(name.to_owned(), ack);
    Value::Object(map)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
