use candle_core::{DType, Device, IndexOp, Tensor};
use kornia_image::{Image, ImageSize};

use crate::{BoundingBox, ClassNames, Detection, InputSize, Y2mError};

/// Resize an rgb8 image to the model input size and lay it out as a
/// `[1, height, width, 3]` f32 tensor in `[0, 1]`.
pub fn preprocess_image(
    image: &Image<u8, 3>,
    input_size: InputSize,
    device: &Device,
) -> Result<Tensor, Y2mError> {
    let InputSize { height, width } = input_size;

    let mut image_resized = Image::from_size_val(ImageSize { width, height }, 0)?;
    kornia_imgproc::resize::resize_fast(
        image,
        &mut image_resized,
        kornia_imgproc::interpolation::InterpolationMode::Nearest,
    )?;

    let image_resized = image_resized.map(|&x| x as f32 / 255.0);

    let image_t =
        Tensor::from_vec::<_, f32>(image_resized.into_vec(), (height, width, 3), device)?
            .unsqueeze(0)?;

    Ok(image_t)
}

/// Index and score of the best class. The first maximum wins.
fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((index, score)),
        })
}

/// Decode the raw output tensor of a detector.
///
/// Two layouts are understood, both with a leading batch dimension of which
/// only the first entry is read:
///
/// * `[batch, boxes, 4 + classes]`: rows of `x_center, y_center, width,
///   height` followed by one score per class. Rows with fewer than two
///   classes are skipped.
/// * `[batch, classes]`: a plain classification head, decoded to a single
///   detection without geometry.
///
/// A detection is kept when the score of its best class is strictly greater
/// than `confidence_threshold`.
pub fn decode_output(
    output: &Tensor,
    confidence_threshold: f32,
    class_names: &ClassNames,
) -> Result<Vec<Detection>, Y2mError> {
    let output = output.to_dtype(DType::F32)?;
    let mut detections = Vec::new();

    match output.rank() {
        3 => {
            let predictions = output.i(0)?.to_vec2::<f32>()?;
            for pred in predictions {
                if pred.len() < 6 {
                    continue;
                }
                let Some((class_id, confidence)) = best_class(&pred[4..]) else {
                    continue;
                };
                if confidence > confidence_threshold {
                    let bbox = BoundingBox::from_center(pred[0], pred[1], pred[2], pred[3]);
                    detections
                        .push(Detection::new(class_names.label(class_id), confidence).with_bbox(bbox));
                }
            }
        }
        2 => {
            let scores = output.i(0)?.to_vec1::<f32>()?;
            if let Some((class_id, confidence)) = best_class(&scores) {
                if confidence > confidence_threshold {
                    detections.push(Detection::new(class_names.label(class_id), confidence));
                }
            }
        }
        _ => return Err(Y2mError::UnsupportedOutputShape(output.dims().to_vec())),
    }

    tracing::trace!("decoded {} detections", detections.len());
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Label;

    #[test]
    fn test_best_class_first_max() {
        assert_eq!(best_class(&[]), None);
        assert_eq!(best_class(&[0.2, 0.7, 0.7]), Some((1, 0.7)));
    }

    #[test]
    fn test_decode_boxes() -> Result<(), Box<dyn std::error::Error>> {
        let rows: Vec<f32> = vec![
            0.5, 0.5, 0.2, 0.2, 0.9, 0.1, // drowsy
            0.3, 0.3, 0.1, 0.1, 0.1, 0.2, // below threshold
            0.6, 0.6, 0.4, 0.4, 0.3, 0.8, // notdrowsy
        ];
        let output = Tensor::from_vec(rows, (1, 3, 6), &Device::Cpu)?;
        let detections = decode_output(&output, 0.25, &ClassNames::default())?;
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, Label::Drowsy);
        assert_eq!(detections[0].confidence, 0.9);
        let bbox = detections[0].bbox.ok_or("missing bbox")?;
        assert!((bbox.xmin - 0.4).abs() < 1e-6);
        assert_eq!(detections[1].label, Label::NotDrowsy);
        Ok(())
    }

    #[test]
    fn test_decode_unknown_class() -> Result<(), Box<dyn std::error::Error>> {
        let rows: Vec<f32> = vec![0.5, 0.5, 0.2, 0.2, 0.1, 0.2, 0.6];
        let output = Tensor::from_vec(rows, (1, 1, 7), &Device::Cpu)?;
        let detections = decode_output(&output, 0.25, &ClassNames::default())?;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, Label::Unknown(2));
        Ok(())
    }

    #[test]
    fn test_decode_skips_short_rows() -> Result<(), Box<dyn std::error::Error>> {
        let output = Tensor::from_vec(vec![0.5f32, 0.5, 0.2, 0.2, 0.9], (1, 1, 5), &Device::Cpu)?;
        assert!(decode_output(&output, 0.25, &ClassNames::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_classification() -> Result<(), Box<dyn std::error::Error>> {
        let output = Tensor::from_vec(vec![0.2f32, 0.8], (1, 2), &Device::Cpu)?;
        let detections = decode_output(&output, 0.25, &ClassNames::default())?;
        assert_eq!(detections, vec![Detection::new(Label::NotDrowsy, 0.8)]);

        // threshold is exclusive
        let output = Tensor::from_vec(vec![0.25f32, 0.25], (1, 2), &Device::Cpu)?;
        assert!(decode_output(&output, 0.25, &ClassNames::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_unsupported_rank() -> Result<(), Box<dyn std::error::Error>> {
        let output = Tensor::zeros((1, 2, 3, 4), DType::F32, &Device::Cpu)?;
        let result = decode_output(&output, 0.25, &ClassNames::default());
        assert!(matches!(result, Err(Y2mError::UnsupportedOutputShape(dims)) if dims == vec![1, 2, 3, 4]));
        Ok(())
    }

    #[test]
    fn test_preprocess_layout() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 64,
                height: 48,
            },
            255,
        )?;
        let input_size = InputSize {
            height: 32,
            width: 16,
        };
        let tensor = preprocess_image(&image, input_size, &Device::Cpu)?;
        assert_eq!(tensor.dims(), &[1, 32, 16, 3]);
        let max = tensor.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert_eq!(max, 1.0);
        Ok(())
    }
}
