//! Prediction endpoint

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, error};

use plantvillage_infer::PredictionResult;

use crate::state::SharedState;

/// Fields of the multipart upload
struct PredictForm {
    image: Vec<u8>,
    crop: String,
}

async fn read_form(mut multipart: Multipart) -> Result<PredictForm, String> {
    let mut image = None;
    let mut crop = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart body: {}", e))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read uploaded file: {}", e))?;
                image = Some(bytes.to_vec());
            }
            Some("crop") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read crop field: {}", e))?;
                crop = Some(text);
            }
            other => debug!("ignoring multipart field {:?}", other),
        }
    }

    Ok(PredictForm {
        image: image.ok_or("Missing form field 'file'")?,
        crop: crop.ok_or("Missing form field 'crop'")?,
    })
}

/// POST /predict - classify the uploaded image among the labels of `crop`
///
/// Always answers 200 with a structured result; failures carry `success: false`.
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<PredictionResult> {
    let form = match multipart {
        Ok(multipart) => read_form(multipart).await,
        Err(rejection) => Err(rejection.body_text()),
    };

    let form = match form {
        Ok(form) => form,
        Err(message) => return Json(PredictionResult::failure(message)),
    };

    // Decoding and the forward pass are CPU-bound
    let handler = state.handler.clone();
    let result = tokio::task::spawn_blocking(move || handler.handle(&form.image, &form.crop))
        .await
        .unwrap_or_else(|e| {
            error!("Prediction task failed: {}", e);
            PredictionResult::failure(format!("Prediction task failed: {}", e))
        });

    Json(result)
}
