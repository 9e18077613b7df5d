//! ASCII PLY point cloud writer
//!
//! Same layout CARLA's own `save_to_disk` produces for LIDAR measurements.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use contracts::LidarPoint;

/// Write `points` to `path` as an ASCII PLY file
pub fn write_ply(path: &Path, points: &[LidarPoint]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_ply_to(&mut out, points)?;
    out.flush()
}

/// Write `points` as ASCII PLY into any writer
pub fn write_ply_to<W: Write>(out: &mut W, points: &[LidarPoint]) -> std::io::Result<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", points.len())?;
    writeln!(out, "property float32 x")?;
    writeln!(out, "property float32 y")?;
    writeln!(out, "property float32 z")?;
    writeln!(out, "property float32 I")?;
    writeln!(out, "end_header")?;

    for point in points {
        writeln!(
            out,
            "{:.4} {:.4} {:.4} {:.4}",
            point.x, point.y, point.z, point.intensity
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let points = [
            LidarPoint {
                x: 1.0,
                y: -2.5,
                z: 0.25,
                intensity: 0.9,
            },
            LidarPoint::default(),
        ];
        let mut buf = Vec::new();
        write_ply_to(&mut buf, &points).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "ply");
        assert_eq!(lines[2], "element vertex 2");
        assert_eq!(lines[7], "end_header");
        assert_eq!(lines[8], "1.0000 -2.5000 0.2500 0.9000");
        assert_eq!(lines[9], "0.0000 0.0000 0.0000 0.0000");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_empty_cloud_has_header_only() {
        let mut buf = Vec::new();
        write_ply_to(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("element vertex 0"));
        assert!(text.ends_with("end_header\n"));
    }
}
