//! FileSink - writes each sensor frame to `<base>/<subdir>/<frame:06>.<ext>`

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use contracts::{
    frame_file_name, CaptureProfile, ColorConverter, ContractError, FileFormat, FrameSink,
    ImageData, SensorPacket, SensorPayload,
};
use image::ImageFormat;
use tracing::{error, instrument, trace};

use crate::convert::to_rgb;
use crate::error::FrameSinkError;
use crate::ply::write_ply;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./output"),
        }
    }
}

/// Where and how one sensor's frames are written
#[derive(Debug, Clone)]
struct Route {
    dir: PathBuf,
    converter: ColorConverter,
    format: FileFormat,
}

/// Sink that writes frames to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    routes: HashMap<String, Route>,
    created_dirs: Mutex<HashSet<PathBuf>>,
}

impl FileSink {
    /// Create a new FileSink with no routes
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            routes: HashMap::new(),
            created_dirs: Mutex::new(HashSet::new()),
        })
    }

    /// Create a sink routing every sensor of `profile`
    pub fn for_profile(
        name: impl Into<String>,
        config: FileSinkConfig,
        profile: &CaptureProfile,
    ) -> std::io::Result<Self> {
        let mut sink = Self::new(name, config)?;
        for sensor in &profile.sensors {
            sink.add_route(
                &sensor.id,
                &sensor.output.subdir,
                sensor.output.converter,
                sensor.output.format_for(sensor.kind),
            );
        }
        Ok(sink)
    }

    /// Route `sensor_id` to `<base>/<subdir>`
    pub fn add_route(
        &mut self,
        sensor_id: impl Into<String>,
        subdir: impl AsRef<Path>,
        converter: ColorConverter,
        format: FileFormat,
    ) {
        let dir = self.config.base_path.join(subdir);
        self.routes.insert(
            sensor_id.into(),
            Route {
                dir,
                converter,
                format,
            },
        );
    }

    /// Base output directory
    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Path a frame of `sensor_id` would be written to
    pub fn frame_path(&self, sensor_id: &str, frame: u64) -> Option<PathBuf> {
        let route = self.routes.get(sensor_id)?;
        Some(route.dir.join(frame_file_name(frame, route.format)))
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), FrameSinkError> {
        let mut created = self.created_dirs.lock().unwrap_or_else(|e| e.into_inner());
        if !created.contains(dir) {
            fs::create_dir_all(dir).map_err(|e| FrameSinkError::io(dir, e))?;
            created.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn persist(&self, packet: &SensorPacket) -> Result<PathBuf, FrameSinkError> {
        let route = self
            .routes
            .get(&packet.sensor_id)
            .ok_or_else(|| FrameSinkError::Unrouted {
                sensor_id: packet.sensor_id.clone(),
            })?;

        self.ensure_dir(&route.dir)?;
        let path = route.dir.join(frame_file_name(packet.frame, route.format));

        match (&packet.payload, route.format) {
            (SensorPayload::Image(image), FileFormat::Jpeg) => {
                save_image(&path, image, route.converter, ImageFormat::Jpeg)?
            }
            (SensorPayload::Image(image), FileFormat::Png) => {
                save_image(&path, image, route.converter, ImageFormat::Png)?
            }
            (SensorPayload::PointCloud(cloud), FileFormat::Ply) => {
                write_ply(&path, &cloud.points).map_err(|e| FrameSinkError::io(&path, e))?
            }
            (_, format) => {
                return Err(FrameSinkError::PayloadMismatch {
                    sensor_id: packet.sensor_id.clone(),
                    format,
                })
            }
        }

        Ok(path)
    }
}

fn save_image(
    path: &Path,
    image: &ImageData,
    converter: ColorConverter,
    format: ImageFormat,
) -> Result<(), FrameSinkError> {
    let rgb = to_rgb(image, converter)?;
    rgb.save_with_format(path, format)
        .map_err(|source| FrameSinkError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, packet),
        fields(sink = %self.name, sensor_id = %packet.sensor_id, frame = packet.frame)
    )]
    fn write(&self, packet: &SensorPacket) -> Result<PathBuf, ContractError> {
        match self.persist(packet) {
            Ok(path) => {
                trace!(path = %path.display(), "frame written");
                Ok(path)
            }
            Err(FrameSinkError::Unrouted { sensor_id }) => Err(ContractError::UnroutedSensor {
                sink_name: self.name.clone(),
                sensor_id,
            }),
            Err(e) => {
                error!(error = %e, "write failed");
                Err(ContractError::frame_write(
                    &self.name,
                    &packet.sensor_id,
                    packet.frame,
                    e.to_string(),
                ))
            }
        }
    }
}
