use image::DynamicImage;
use image::metadata::Orientation;

/// Counter-clockwise rotation that puts a photo upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Ccw90,
    Ccw180,
    Ccw270,
}

impl Rotation {
    /// Maps a raw EXIF orientation value. Mirrored orientations (2, 4, 5, 7),
    /// the upright value 1 and anything out of range are left as they are.
    pub fn from_orientation_tag(tag: u8) -> Self {
        Orientation::from_exif(tag)
            .map(Self::from_orientation)
            .unwrap_or_default()
    }

    /// Reads the orientation entry from a raw EXIF block. A block that is
    /// unreadable or has no orientation entry means no rotation.
    pub fn from_exif_chunk(exif: &[u8]) -> Self {
        Orientation::from_exif_chunk(exif)
            .map(Self::from_orientation)
            .unwrap_or_default()
    }

    fn from_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Rotate180 => Rotation::Ccw180,
            Orientation::Rotate90 => Rotation::Ccw270,
            Orientation::Rotate270 => Rotation::Ccw90,
            _ => Rotation::None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Ccw90 => 90,
            Rotation::Ccw180 => 180,
            Rotation::Ccw270 => 270,
        }
    }

    /// Rotates with an expanded canvas; quarter turns swap width and height.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Rotation::None => image,
            Rotation::Ccw90 => image.rotate270(),
            Rotation::Ccw180 => image.rotate180(),
            Rotation::Ccw270 => image.rotate90(),
        }
    }
}
