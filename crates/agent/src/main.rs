//! # CO2 Monitor Agent
//!
//! Lê o sensor de CO2 periodicamente, publica telemetria com a localização
//! do dispositivo e sincroniza o device twin com o plano de controle.
//!
//! ## Uso
//! ```bash
//! co2_agent --scope-id 0ne000ABC            # config.toml ao lado do executável
//! co2_agent --config ./config.toml --publish-interval 30
//! ```
//!
//! Códigos de saída em [`ExitReason`].

mod args;
mod geolocation;
mod indicator;
mod sensor;
mod udp;

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use co2_core::alerts::BuzzerAlert;
use co2_core::config::AgentConfig;
use co2_core::control::{ConnectionInfo, ControlLoop, default_declarations};
use co2_core::protocol::TelemetryCodec;
use co2_core::runtime::{EventLoop, ExitReason, Termination, Timers, event_channel};
use co2_core::twin::PropertySyncStore;
use geolocation::{ConfiguredLocation, spawn_geolocation};
use indicator::GpioBuzzer;
use sensor::SimulatedScd30;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};
use udp::UdpTransport;

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Argumentos ──
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(ExitReason::InvalidConfig.code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // ── Carregar config ──
    let config_path = args.config.clone().unwrap_or_else(AgentConfig::default_path);
    let config = match load_config(&args, &config_path) {
        Ok(config) => config,
        Err(reason) => return ExitCode::from(reason.code()),
    };

    match run(&config) {
        Ok(reason) => ExitCode::from(reason.code()),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(ExitReason::StartupFailure.code())
        }
    }
}

/// Carrega o arquivo, grava o padrão se faltar e aplica os argumentos.
///
/// O arquivo salvo nunca inclui os overrides da linha de comando.
fn load_config(args: &Args, path: &Path) -> std::result::Result<AgentConfig, ExitReason> {
    let mut config = AgentConfig::load(path).map_err(|e| {
        error!("{e}");
        ExitReason::InvalidConfig
    })?;

    // Salva config padrão se não existir
    if !path.exists() {
        if let Err(e) = config.save(path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    args.apply(&mut config);

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida: {e}");
        }
        return Err(ExitReason::InvalidConfig);
    }
    Ok(config)
}

fn run(config: &AgentConfig) -> Result<ExitReason> {
    let termination = Termination::new();
    let (events_tx, events_rx) = event_channel();

    // ── Componentes ──
    let sensor = SimulatedScd30::new(&config.sensor);
    let transport = UdpTransport::new(
        &config.connection.endpoint,
        &config.connection.bind_ip,
        config.connection.listen_port,
    );
    let alert = BuzzerAlert::new(GpioBuzzer::new(&config.alert.gpio_value_path))
        .with_threshold(config.alert.initial_threshold_ppm);
    let twins: PropertySyncStore<BuzzerAlert<GpioBuzzer>> =
        PropertySyncStore::new(default_declarations())
            .context("falha ao montar registro do twin")?;
    let codec = TelemetryCodec::new(config.telemetry.message_capacity, config.telemetry.pressure);
    info!("Mensagens de telemetria até {} bytes", codec.capacity());

    let mut control = ControlLoop::new(sensor, transport, alert, twins, codec);
    control
        .start(&ConnectionInfo {
            scope_id: config.connection.scope_id.clone(),
            network_interface: config.connection.network_interface.clone(),
        })
        .context("falha ao iniciar loop de controle")?;

    // ── Threads auxiliares ──
    let listener = control
        .transport()
        .spawn_listener(events_tx.clone(), termination.clone())
        .context("falha ao iniciar listener do twin")?;
    spawn_geolocation(ConfiguredLocation::new(&config.location), events_tx.clone())
        .context("falha ao iniciar geolocalização")?;

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   CO2 MONITOR AGENT – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Escopo:     {}", config.connection.scope_id);
    println!("  Endpoint:   {}", config.connection.endpoint);
    println!("  Medição:    {:.1}s", config.timers.measure_interval_secs);
    println!("  Publicação: {:.1}s", config.timers.publish_interval_secs);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let timers = Timers::periodic(
        config.timers.measure_interval(),
        config.timers.publish_interval(),
    );
    let mut event_loop = EventLoop::new(timers, events_rx, termination.clone());
    let reason = event_loop.run(&mut control);

    // ── Encerramento ──
    control.shutdown();
    drop(events_tx);
    if listener.join().is_err() {
        warn!("Listener do twin terminou com panic");
    }

    info!("Saindo com código {} ({reason:?})", reason.code());
    Ok(reason)
}
