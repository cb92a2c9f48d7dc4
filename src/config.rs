use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

/// Every knob of the proposal core in one explicit structure. Defaults match
/// the classical 16-stride VGG setup; nothing here is global or mutable, a
/// caller constructs one and threads it through.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpnConfig {
    /// Side length of the unit anchor the templates are derived from.
    pub base_size: usize,
    /// Height/width aspect ratios, one template per ratio.
    pub ratios: Vec<f32>,
    /// Multipliers applied to each ratio template.
    pub scales: Vec<f32>,
    /// Feature-map stride in image pixels.
    pub stride: usize,
    /// IoU at or above which an anchor is labeled foreground.
    pub fg_threshold: f32,
    /// IoU below which an anchor is labeled background.
    pub bg_threshold: f32,
    /// Upper bound on labeled anchors per image after balancing.
    pub batch_size: usize,
    /// Fraction of the batch reserved for foreground labels.
    pub positive_fraction: f32,
    /// Minimum proposal side length, inclusive-pixel widths.
    pub min_box_size: f32,
    /// Optional score cut applied before NMS.
    pub score_threshold: Option<f32>,
    /// IoU at or above which NMS suppresses a lower-scoring box.
    pub nms_iou_threshold: f32,
    /// Fixed proposal count produced per image.
    pub max_proposals: usize,
    /// Side length of the resampled region feature patch.
    pub roi_output_size: usize,
}

impl Default for RpnConfig {
    fn default() -> Self {
        RpnConfig {
            base_size: 16,
            ratios: vec![0.5, 1.0, 2.0],
            scales: vec![8.0, 16.0, 32.0],
            stride: 16,
            fg_threshold: 0.7,
            bg_threshold: 0.3,
            batch_size: 256,
            positive_fraction: 0.5,
            min_box_size: 16.0,
            score_threshold: None,
            nms_iou_threshold: 0.7,
            max_proposals: 300,
            roi_output_size: 7,
        }
    }
}

impl RpnConfig {
    /// Number of anchor templates per grid cell.
    pub fn anchors_per_cell(&self) -> usize {
        self.ratios.len() * self.scales.len()
    }

    /// Loads overrides from `conf/rpn.toml` (optional) and `RPN__`-prefixed
    /// environment variables on top of the defaults.
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(
                File::with_name("conf/rpn")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("RPN").separator("__"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}
