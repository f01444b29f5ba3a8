use candle_core::Device;
use candle_nn::Module;
use kornia_image::Image;

use crate::{
    DetectorConfig, Detection, Y2mError,
    decoder::{decode_output, preprocess_image},
};

/// Produces the raw detections of one frame.
pub trait RawDetector {
    /// Run detection on an rgb8 frame.
    fn detect(&mut self, image: &Image<u8, 3>) -> Result<Vec<Detection>, Y2mError>;
}

/// Detector around any candle module with a YOLO style output head.
pub struct TensorDetector<M> {
    model: M,
    config: DetectorConfig,
    device: Device,
}

impl<M: Module> TensorDetector<M> {
    /// Create a new detector. `model` receives `[1, height, width, 3]` inputs.
    pub fn new(model: M, config: DetectorConfig, device: Device) -> Self {
        Self {
            model,
            config,
            device,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl<M: Module> RawDetector for TensorDetector<M> {
    fn detect(&mut self, image: &Image<u8, 3>) -> Result<Vec<Detection>, Y2mError> {
        let input = preprocess_image(image, self.config.input_size, &self.device)?;
        let output = self.model.forward(&input)?;
        decode_output(
            &output,
            self.config.confidence_threshold,
            &self.config.class_names,
        )
    }
}
