use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use image::RgbaImage;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, RegisterFuture, Registration};
use crate::error::EffectError;
use crate::params::ParamDef;
use crate::particle::ParticleGrid;
use crate::shader::GlslType;

pub type ImageFuture<'a> = Pin<Box<dyn Future<Output = Result<RgbaImage, String>> + 'a>>;

/// Source of the images `ChangeImage` blends to.
pub trait ImageProvider: Send + Sync {
    /// Names accepted by [`ImageProvider::fetch`], for the config form.
    fn names(&self) -> Vec<String>;

    fn fetch<'a>(&'a self, name: &'a str) -> ImageFuture<'a>;
}

/// Images decoded up front and kept in memory.
#[derive(Default)]
pub struct MemoryImageProvider {
    images: FxHashMap<String, RgbaImage>,
}

impl MemoryImageProvider {
    pub fn insert(&mut self, name: impl Into<String>, image: RgbaImage) {
        self.images.insert(name.into(), image);
    }

    pub fn with_image(mut self, name: impl Into<String>, image: RgbaImage) -> Self {
        self.insert(name, image);
        self
    }
}

impl ImageProvider for MemoryImageProvider {
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.images.keys().cloned().collect();
        names.sort();
        names
    }

    fn fetch<'a>(&'a self, name: &'a str) -> ImageFuture<'a> {
        let result = self
            .images
            .get(name)
            .cloned()
            .ok_or_else(|| format!("no image named '{name}'"));
        Box::pin(std::future::ready(result))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeImageConfig {
    pub image: String,
}

/// Cross-fades particle colors to a second image over each repetition.
pub struct ChangeImage {
    images: Arc<dyn ImageProvider>,
}

impl ChangeImage {
    pub fn new(images: Arc<dyn ImageProvider>) -> Self {
        Self { images }
    }

    async fn emit(&self, reg: &mut Registration<'_>) -> Result<(), EffectError> {
        let cfg: ChangeImageConfig = reg.config();
        if cfg.image.is_empty() {
            return Err(EffectError::new(self.id(), "no image selected"));
        }
        let image = self
            .images
            .fetch(&cfg.image)
            .await
            .map_err(|e| EffectError::new(self.id(), e))?;

        let grid = reg.props.state;
        let target = ParticleGrid::from_image(
            &image,
            grid.width(),
            grid.height(),
            reg.props.config.image_scaling,
        )
        .map_err(|e| EffectError::new(self.id(), e))?;

        let progress = reg.progress_expr();
        let rgb = reg.attributes.add("targetRgb", GlslType::Vec3, target.rgb());
        reg.vertex.add_main(&format!(
            "color = mix(color, {rgb}, smoothstep(0.0, 1.0, {progress}));"
        ));
        Ok(())
    }
}

impl Effect for ChangeImage {
    fn id(&self) -> &'static str {
        "ChangeImage"
    }

    fn display_name(&self) -> &'static str {
        "Change image"
    }

    fn params(&self) -> Vec<ParamDef> {
        let names = self.images.names();
        let options: Vec<&str> = names.iter().map(String::as_str).collect();
        let default = options.first().copied().unwrap_or_default();
        vec![ParamDef::choice("image", "Image", default, &options)]
    }

    fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
        Box::pin(async move { self.emit(&mut reg).await })
    }
}
