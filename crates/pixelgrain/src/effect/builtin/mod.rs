mod change_image;
mod colorize;
mod converge;
mod dummy;
mod hue_displace;
mod wave;

use std::sync::Arc;

pub use change_image::{ChangeImage, ChangeImageConfig, ImageFuture, ImageProvider, MemoryImageProvider};
pub use colorize::{Colorize, ColorizeConfig};
pub use converge::{Converge, ConvergeConfig, ConvergeTarget};
pub use dummy::Dummy;
pub use hue_displace::{HueDisplace, HueDisplaceConfig};
pub use wave::{Wave, WaveConfig};

use super::Effect;

/// Every built-in effect, in menu order.
pub fn all(images: Arc<dyn ImageProvider>) -> Vec<Arc<dyn Effect>> {
    vec![
        Arc::new(Wave),
        Arc::new(HueDisplace),
        Arc::new(Converge),
        Arc::new(Colorize),
        Arc::new(ChangeImage::new(images)),
        Arc::new(Dummy),
    ]
}
