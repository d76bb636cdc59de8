use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no camera detected; a front-facing or external camera is required")]
    NoCameraDevice,
    #[error("camera device {0} is not available")]
    DeviceNotFound(u32),
    #[error("failed to enumerate cameras: {0}")]
    Enumerate(String),
    #[error("failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("failed to read frame: {0}")]
    Frame(String),
}

/// Hardware class of a camera, in descending order of preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CameraKind {
    DepthCapable,
    Dual,
    WideAngle,
}

/// Which way the camera faces relative to the user.
///
/// Desktop backends rarely report this, so most devices are `Unspecified`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CameraFacing {
    Front,
    Unspecified,
    Back,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub index: u32,
    pub name: String,
    pub kind: CameraKind,
    pub facing: CameraFacing,
}

impl CameraDescriptor {
    /// Describes a device from its backend name, inferring kind and facing
    /// from well-known naming conventions.
    pub fn from_name(index: u32, name: impl Into<String>) -> Self {
        let name = name.into();
        let lower = name.to_lowercase();
        Self {
            index,
            kind: infer_kind(&lower),
            facing: infer_facing(&lower),
            name,
        }
    }
}

impl fmt::Display for CameraDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({:?}, {:?})",
            self.index, self.name, self.kind, self.facing
        )
    }
}

fn infer_kind(lower: &str) -> CameraKind {
    const DEPTH: &[&str] = &["depth", "realsense", "kinect"];
    const DUAL: &[&str] = &["dual", "stereo"];
    if DEPTH.iter().any(|k| lower.contains(k)) {
        CameraKind::DepthCapable
    } else if DUAL.iter().any(|k| lower.contains(k)) {
        CameraKind::Dual
    } else {
        CameraKind::WideAngle
    }
}

fn infer_facing(lower: &str) -> CameraFacing {
    const FRONT: &[&str] = &["front", "facetime", "user-facing", "integrated", "built-in"];
    const BACK: &[&str] = &["back", "rear", "world-facing"];
    if FRONT.iter().any(|k| lower.contains(k)) {
        CameraFacing::Front
    } else if BACK.iter().any(|k| lower.contains(k)) {
        CameraFacing::Back
    } else {
        CameraFacing::Unspecified
    }
}

/// Picks the capture device.
///
/// An explicit `requested` index wins when present. Otherwise back-facing
/// devices are skipped and the rest are ranked by facing (front first), then
/// kind (depth > dual > wide-angle), then lowest index.
pub fn select_camera(
    devices: &[CameraDescriptor],
    requested: Option<u32>,
) -> Result<CameraDescriptor, CaptureError> {
    if let Some(index) = requested {
        return devices
            .iter()
            .find(|d| d.index == index)
            .cloned()
            .ok_or(CaptureError::DeviceNotFound(index));
    }

    devices
        .iter()
        .filter(|d| d.facing != CameraFacing::Back)
        .min_by_key(|d| (d.facing, d.kind, d.index))
        .cloned()
        .ok_or(CaptureError::NoCameraDevice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn device(index: u32, kind: CameraKind, facing: CameraFacing) -> CameraDescriptor {
        CameraDescriptor {
            index,
            name: format!("cam{index}"),
            kind,
            facing,
        }
    }

    #[rstest]
    #[case::truedepth("FaceTime TrueDepth Camera", CameraKind::DepthCapable, CameraFacing::Front)]
    #[case::realsense("Intel RealSense D435", CameraKind::DepthCapable, CameraFacing::Unspecified)]
    #[case::dual("Back Dual Camera", CameraKind::Dual, CameraFacing::Back)]
    #[case::integrated("Integrated Webcam", CameraKind::WideAngle, CameraFacing::Front)]
    #[case::usb("Logitech C920", CameraKind::WideAngle, CameraFacing::Unspecified)]
    fn test_from_name_infers_kind_and_facing(
        #[case] name: &str,
        #[case] kind: CameraKind,
        #[case] facing: CameraFacing,
    ) {
        let d = CameraDescriptor::from_name(0, name);
        assert_eq!(d.kind, kind);
        assert_eq!(d.facing, facing);
        assert_eq!(d.name, name);
    }

    #[test]
    fn test_select_prefers_depth_over_dual_over_wide() {
        let devices = vec![
            device(0, CameraKind::WideAngle, CameraFacing::Front),
            device(1, CameraKind::Dual, CameraFacing::Front),
            device(2, CameraKind::DepthCapable, CameraFacing::Front),
        ];
        assert_eq!(select_camera(&devices, None).unwrap().index, 2);
    }

    #[test]
    fn test_select_prefers_front_over_unspecified() {
        let devices = vec![
            device(0, CameraKind::DepthCapable, CameraFacing::Unspecified),
            device(1, CameraKind::WideAngle, CameraFacing::Front),
        ];
        assert_eq!(select_camera(&devices, None).unwrap().index, 1);
    }

    #[test]
    fn test_select_never_picks_back_camera() {
        let devices = vec![device(0, CameraKind::DepthCapable, CameraFacing::Back)];
        assert!(matches!(
            select_camera(&devices, None),
            Err(CaptureError::NoCameraDevice)
        ));
    }

    #[test]
    fn test_select_ties_break_on_lowest_index() {
        let devices = vec![
            device(3, CameraKind::WideAngle, CameraFacing::Unspecified),
            device(1, CameraKind::WideAngle, CameraFacing::Unspecified),
        ];
        assert_eq!(select_camera(&devices, None).unwrap().index, 1);
    }

    #[test]
    fn test_select_empty_is_no_camera() {
        assert!(matches!(
            select_camera(&[], None),
            Err(CaptureError::NoCameraDevice)
        ));
    }

    #[test]
    fn test_requested_index_overrides_ranking() {
        let devices = vec![
            device(0, CameraKind::DepthCapable, CameraFacing::Front),
            device(1, CameraKind::WideAngle, CameraFacing::Back),
        ];
        assert_eq!(select_camera(&devices, Some(1)).unwrap().index, 1);
    }

    #[test]
    fn test_requested_missing_index_errors() {
        let devices = vec![device(0, CameraKind::WideAngle, CameraFacing::Front)];
        assert!(matches!(
            select_camera(&devices, Some(7)),
            Err(CaptureError::DeviceNotFound(7))
        ));
    }
}
