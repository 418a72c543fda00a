pub mod decode;
pub mod normalize;
pub mod orientation;
pub mod preview;

pub use decode::{DecodeError, fix_rotation};
pub use normalize::normalize;
pub use orientation::Rotation;
pub use preview::preview_data_uri;
