//! A synchronization unit ready to run.

use crate::config::{Settings, SyncParams, UnitConfig};
use crate::models::{CameraStream, UnitKind};

use super::backend::MediaBackend;
use super::errors::UnitError;

/// One unit's probed camera streams and resolved parameters.
///
/// Exclusively owned by the run that processes it.
#[derive(Debug, Clone)]
pub struct SyncUnit {
    pub name: String,
    pub kind: UnitKind,
    pub params: SyncParams,
    /// Streams ordered by camera index.
    pub streams: Vec<CameraStream>,
}

impl SyncUnit {
    /// Validate a unit file and probe each camera.
    pub fn prepare(
        config: &UnitConfig,
        settings: &Settings,
        backend: &dyn MediaBackend,
    ) -> Result<Self, UnitError> {
        config
            .validate()
            .map_err(|e| UnitError::config(&config.name, e))?;

        let mut streams = Vec::with_capacity(config.cameras.len());
        for camera in &config.cameras {
            let info = backend.probe(&camera.path).map_err(|source| UnitError::Probe {
                unit: config.name.clone(),
                camera: camera.camera(),
                source,
            })?;
            tracing::debug!(
                "[Unit] {} {}: {} frames at {:.3} fps, {}x{}",
                config.name,
                camera.camera(),
                info.frame_count,
                info.fps,
                info.width,
                info.height
            );
            streams.push(CameraStream {
                index: camera.camera(),
                path: camera.path.clone(),
                roi: camera.roi(),
                led: camera.led,
                output_name: camera.output_name(&config.name),
                known_start: camera.known_start,
                info,
            });
        }
        streams.sort_by_key(|s| s.index);

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            params: SyncParams::resolve(settings, config),
            streams,
        })
    }
}
