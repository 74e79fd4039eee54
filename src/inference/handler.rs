//! Request orchestration
//!
//! [`RequestHandler`] runs one classification request end to end and always
//! answers with a [`PredictionResult`]: errors become the failure variant
//! instead of propagating to the transport.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{info, warn};

use crate::catalog::{filter, CropQuery, LabelCatalog};
use crate::inference::classifier::Classifier;
use crate::inference::decoder::ImageDecoder;
use crate::inference::selector::select;
use crate::utils::error::{InferenceError, Result};
use crate::utils::logging::StageTimer;

/// Static body of the health check
pub const HEALTH_STATUS: &str = "ML Server Running";

/// A successful crop-scoped prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Normalized crop query
    pub selected_crop: String,
    /// Label of the winning class
    pub predicted_class: String,
    /// Catalog index of the winning class
    pub class_index: usize,
    /// Probability as a percentage, 2 decimals
    pub confidence: f64,
}

/// Outcome of one request
///
/// Serializes to `{"success": true, "selected_crop", "predicted_class",
/// "confidence"}` or `{"success": false, "error"}`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Success(Prediction),
    Failure { error: String },
}

impl PredictionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        PredictionResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            PredictionResult::Success(prediction) => Some(prediction),
            PredictionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionResult::Success(_) => None,
            PredictionResult::Failure { error } => Some(error),
        }
    }
}

impl From<Result<Prediction>> for PredictionResult {
    fn from(result: Result<Prediction>) -> Self {
        match result {
            Ok(prediction) => PredictionResult::Success(prediction),
            Err(e) => PredictionResult::failure(e.to_string()),
        }
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PredictionResult::Success(p) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("selected_crop", &p.selected_crop)?;
                map.serialize_entry("predicted_class", &p.predicted_class)?;
                map.serialize_entry("confidence", &p.confidence)?;
                map.end()
            }
            PredictionResult::Failure { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Runs the decode → filter → classify → select pipeline
///
/// Holds the shared, read-only catalog and classifier; cheap to clone.
#[derive(Clone)]
pub struct RequestHandler {
    decoder: ImageDecoder,
    catalog: Arc<LabelCatalog>,
    classifier: Arc<dyn Classifier>,
}

impl RequestHandler {
    /// Wire the pipeline, checking that the classifier and catalog agree on
    /// the number of classes
    pub fn new(
        decoder: ImageDecoder,
        catalog: Arc<LabelCatalog>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self> {
        if classifier.num_classes() != catalog.len() {
            return Err(InferenceError::ModelLoad(format!(
                "classifier emits {} classes but the label catalog has {} entries",
                classifier.num_classes(),
                catalog.len()
            )));
        }

        Ok(Self {
            decoder,
            catalog,
            classifier,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn decoder(&self) -> &ImageDecoder {
        &self.decoder
    }

    /// Classify `image_bytes` among the labels of `crop`
    pub fn handle(&self, image_bytes: &[u8], crop: &str) -> PredictionResult {
        let timer = StageTimer::start("request");
        let result = PredictionResult::from(self.try_handle(image_bytes, crop));
        let elapsed_ms = timer.finish();

        match &result {
            PredictionResult::Success(p) => info!(
                crop = %p.selected_crop,
                class = %p.predicted_class,
                confidence = p.confidence,
                elapsed_ms,
                "prediction complete"
            ),
            PredictionResult::Failure { error } => {
                warn!(crop = %crop.trim(), elapsed_ms, "prediction failed: {}", error)
            }
        }

        result
    }

    fn try_handle(&self, image_bytes: &[u8], crop: &str) -> Result<Prediction> {
        let image = self.decoder.decode(image_bytes)?;

        let query = CropQuery::new(crop);
        let subset = filter(&query, &self.catalog);
        if subset.is_empty() {
            return Err(InferenceError::NoMatchingClasses(query.to_string()));
        }

        let probabilities = self.classifier.predict(&image)?;
        if probabilities.len() != self.catalog.len() {
            return Err(InferenceError::Inference(format!(
                "classifier returned {} scores for {} labels",
                probabilities.len(),
                self.catalog.len()
            )));
        }

        let selection = select(&probabilities, &subset)?;
        let predicted_class = self
            .catalog
            .get(selection.index)
            .ok_or_else(|| {
                InferenceError::Inference(format!("no label for class {}", selection.index))
            })?
            .to_string();

        Ok(Prediction {
            selected_crop: query.to_string(),
            predicted_class,
            class_index: selection.index,
            confidence: selection.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::inference::classifier::ProbabilityVector;
    use crate::inference::decoder::NormalizedImage;

    /// Returns fixed scores and counts its calls
    struct StubClassifier {
        scores: Vec<f32>,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for StubClassifier {
        fn predict(&self, _image: &NormalizedImage) -> Result<ProbabilityVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.clone())
        }

        fn num_classes(&self) -> usize {
            self.scores.len()
        }
    }

    /// Always fails, like a backend error mid-inference
    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn predict(&self, _image: &NormalizedImage) -> Result<ProbabilityVector> {
            Err(InferenceError::Inference("device lost".to_string()))
        }

        fn num_classes(&self) -> usize {
            3
        }
    }

    /// Claims 3 classes but returns 2 scores
    struct ShortClassifier;

    impl Classifier for ShortClassifier {
        fn predict(&self, _image: &NormalizedImage) -> Result<ProbabilityVector> {
            Ok(vec![0.5, 0.5])
        }

        fn num_classes(&self) -> usize {
            3
        }
    }

    fn catalog() -> Arc<LabelCatalog> {
        Arc::new(
            LabelCatalog::from_labels(["Apple__healthy", "Apple__scab", "Potato__blight"]).unwrap(),
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(30, 20, Rgb([40, 160, 60]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn handler_with(classifier: Arc<dyn Classifier>) -> RequestHandler {
        RequestHandler::new(ImageDecoder::new(8).unwrap(), catalog(), classifier).unwrap()
    }

    #[test]
    fn test_apple_scab_scenario() {
        let stub = Arc::new(StubClassifier::new(vec![0.2, 0.7, 0.1]));
        let handler = handler_with(stub.clone());

        let result = handler.handle(&png_bytes(), "apple");

        let prediction = result.prediction().unwrap();
        assert_eq!(prediction.selected_crop, "apple");
        assert_eq!(prediction.predicted_class, "Apple__scab");
        assert_eq!(prediction.class_index, 1);
        assert_eq!(prediction.confidence, 70.0);
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_crop_is_normalized() {
        let stub = Arc::new(StubClassifier::new(vec![0.2, 0.7, 0.1]));
        let handler = handler_with(stub);

        let result = handler.handle(&png_bytes(), "  POTATO ");
        let prediction = result.prediction().unwrap();
        assert_eq!(prediction.selected_crop, "potato");
        assert_eq!(prediction.predicted_class, "Potato__blight");
        assert_eq!(prediction.confidence, 10.0);
    }

    #[test]
    fn test_unknown_crop_skips_classifier() {
        let stub = Arc::new(StubClassifier::new(vec![0.2, 0.7, 0.1]));
        let handler = handler_with(stub.clone());

        let result = handler.handle(&png_bytes(), "tomato");

        assert_eq!(
            result,
            PredictionResult::failure("No matching classes found for crop 'tomato'.")
        );
        assert_eq!(stub.calls(), 0);

        let result = handler.handle(&png_bytes(), " Corn ");
        assert_eq!(
            result.error(),
            Some("No matching classes found for crop 'corn'.")
        );
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn test_malformed_image_then_recovery() {
        let stub = Arc::new(StubClassifier::new(vec![0.2, 0.7, 0.1]));
        let handler = handler_with(stub.clone());

        let result = handler.handle(b"\x89PNG not really", "apple");
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("Failed to decode image"));
        assert_eq!(stub.calls(), 0);

        let result = handler.handle(&png_bytes(), "apple");
        assert!(result.is_success());
    }

    #[test]
    fn test_classifier_failure_becomes_result() {
        let handler = handler_with(Arc::new(BrokenClassifier));
        let result = handler.handle(&png_bytes(), "apple");
        assert_eq!(result.error(), Some("Inference error: device lost"));
    }

    #[test]
    fn test_short_probability_vector_is_rejected() {
        let handler = handler_with(Arc::new(ShortClassifier));
        let result = handler.handle(&png_bytes(), "apple");
        assert!(result.error().unwrap().contains("2 scores for 3 labels"));
    }

    #[test]
    fn test_nan_scores_never_reported_as_success() {
        let stub = Arc::new(StubClassifier::new(vec![f32::NAN, f32::NAN, 0.9]));
        let handler = handler_with(stub);

        let result = handler.handle(&png_bytes(), "apple");
        assert!(!result.is_success());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], serde_json::json!(false));
        assert!(json.get("confidence").is_none());
    }

    #[test]
    fn test_idempotent() {
        let stub = Arc::new(StubClassifier::new(vec![0.3, 0.3, 0.4]));
        let handler = handler_with(stub.clone());
        let bytes = png_bytes();

        let first = handler.handle(&bytes, "apple");
        let second = handler.handle(&bytes, "apple");

        assert_eq!(first, second);
        // tie between 0 and 1 resolves to the first label
        assert_eq!(first.prediction().unwrap().predicted_class, "Apple__healthy");
        assert_eq!(stub.calls(), 2);
    }

    #[test]
    fn test_class_count_mismatch_rejected_at_construction() {
        let stub = Arc::new(StubClassifier::new(vec![0.5, 0.5]));
        let err = RequestHandler::new(ImageDecoder::new(8).unwrap(), catalog(), stub).err();
        assert!(matches!(err, Some(InferenceError::ModelLoad(_))));
    }

    #[test]
    fn test_serialized_shapes() {
        let success = PredictionResult::Success(Prediction {
            selected_crop: "apple".to_string(),
            predicted_class: "Apple__scab".to_string(),
            class_index: 1,
            confidence: 70.0,
        });
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({
                "success": true,
                "selected_crop": "apple",
                "predicted_class": "Apple__scab",
                "confidence": 70.0
            })
        );

        let failure = PredictionResult::failure("boom");
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({ "success": false, "error": "boom" })
        );
    }
}
