//! Resolução de localização fora do event loop.

use co2_core::config::LocationConfig;
use co2_core::device::GeolocationProvider;
use co2_core::runtime::Event;
use co2_core::types::Location;
use crossbeam_channel::Sender;
use tracing::{debug, info};

/// Localização fixa vinda da configuração.
pub struct ConfiguredLocation {
    location: Option<Location>,
}

impl ConfiguredLocation {
    pub fn new(config: &LocationConfig) -> Self {
        let location = match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self { location }
    }
}

impl GeolocationProvider for ConfiguredLocation {
    fn locate(&mut self) -> Option<Location> {
        self.location
    }
}

/// Resolve a localização em outra thread e entrega ao loop como evento.
pub fn spawn_geolocation<P>(
    mut provider: P,
    events: Sender<Event>,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    P: GeolocationProvider + Send + 'static,
{
    std::thread::Builder::new()
        .name("geolocation".into())
        .spawn(move || match provider.locate() {
            Some(location) => {
                if events.send(Event::LocationResolved(location)).is_err() {
                    debug!("Loop encerrado antes da localização ser entregue");
                }
            }
            None => info!("Localização indisponível – telemetria aguardando"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn delivers_configured_location() {
        let config = LocationConfig {
            latitude: Some(51.5),
            longitude: Some(-0.1),
        };
        let (tx, rx) = unbounded();
        spawn_geolocation(ConfiguredLocation::new(&config), tx)
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            Event::LocationResolved(Location {
                latitude: 51.5,
                longitude: -0.1
            })
        );
    }

    #[test]
    fn absent_location_sends_nothing() {
        let (tx, rx) = unbounded();
        spawn_geolocation(ConfiguredLocation::new(&LocationConfig::default()), tx)
            .unwrap()
            .join()
            .unwrap();
        assert!(rx.try_recv().is_err());
    }
}
