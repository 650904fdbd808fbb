//! CLIP ViT-B/32 image-text scorer (safetensors + tokenizer).
//!
//! Use [`ClipScorer::stub`] for tests without model files.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use image::imageops::FilterType;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::hashing::{hash_image, hash_image_phrase};

use super::SimilarityModel;
use super::config::SimilarityConfig;
use super::device::select_device;
use super::error::SimilarityError;
use super::utils::{load_tokenizer, softmax};

/// Token used to pad phrase batches to equal length.
const PAD_TOKEN: &str = "<|endoftext|>";

/// Context length of the CLIP text encoder.
const CLIP_MAX_TOKENS: usize = 77;

/// Logit range used by the stub backend.
const STUB_LOGIT_SCALE: f32 = 10.0;

enum ClipBackend {
    Model {
        model: ClipModel,
        tokenizer: Tokenizer,
        device: Device,
        image_size: usize,
        pad_id: u32,
    },
    Stub,
}

/// Image-text similarity model backed by CLIP (supports stub mode).
pub struct ClipScorer {
    backend: ClipBackend,
}

impl std::fmt::Debug for ClipScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipScorer")
            .field(
                "backend",
                &match &self.backend {
                    ClipBackend::Model { device, .. } => format!("Model({:?})", device),
                    ClipBackend::Stub => "Stub".to_string(),
                },
            )
            .finish()
    }
}

impl ClipScorer {
    /// Loads the model from a config (stub mode is supported).
    pub fn load(config: &SimilarityConfig) -> Result<Self, SimilarityError> {
        config.validate()?;

        if config.testing_stub {
            warn!("Similarity model running in STUB mode (testing only)");
            return Ok(Self::stub());
        }

        let model_dir = config
            .model_dir()
            .ok_or_else(|| SimilarityError::InvalidConfig {
                reason: "model_path is required outside stub mode".to_string(),
            })?;

        let device = select_device(config.device);
        debug!(?device, "Selected compute device for CLIP");

        let tokenizer = load_tokenizer(model_dir).map_err(|e| SimilarityError::TokenizationFailed {
            reason: format!("Failed to load tokenizer: {}", e),
        })?;

        let pad_id = *tokenizer.get_vocab(true).get(PAD_TOKEN).ok_or_else(|| {
            SimilarityError::TokenizationFailed {
                reason: format!("tokenizer has no {PAD_TOKEN} token"),
            }
        })?;

        let clip_config = ClipConfig::vit_base_patch32();
        let image_size = clip_config.image_size;

        let weights = config
            .weights_path()
            .ok_or_else(|| SimilarityError::ModelNotFound {
                path: model_dir.to_path_buf(),
            })?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model =
            ClipModel::new(vb, &clip_config).map_err(|e| SimilarityError::ModelLoadFailed {
                reason: format!("Failed to load CLIP model: {}", e),
            })?;

        info!(
            model_path = %model_dir.display(),
            image_size,
            "CLIP model loaded successfully"
        );

        Ok(Self {
            backend: ClipBackend::Model {
                model,
                tokenizer,
                device,
                image_size,
                pad_id,
            },
        })
    }

    /// Deterministic backend that needs no model files.
    pub fn stub() -> Self {
        Self {
            backend: ClipBackend::Stub,
        }
    }

    fn preprocess_image(
        bytes: &[u8],
        image_size: usize,
        device: &Device,
    ) -> Result<Tensor, SimilarityError> {
        let img = image::load_from_memory(bytes).map_err(|e| SimilarityError::ImageDecode {
            reason: e.to_string(),
        })?;

        let side = image_size as u32;
        let pixels = img
            .resize_to_fill(side, side, FilterType::Triangle)
            .to_rgb8()
            .into_raw();

        let tensor = Tensor::from_vec(pixels, (image_size, image_size, 3), device)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?
            .affine(2.0 / 255.0, -1.0)?
            .unsqueeze(0)?;

        Ok(tensor)
    }

    fn tokenize(
        tokenizer: &Tokenizer,
        phrases: &[String],
        pad_id: u32,
        device: &Device,
    ) -> Result<Tensor, SimilarityError> {
        let mut batch: Vec<Vec<u32>> = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            let encoding = tokenizer.encode(phrase.as_str(), true).map_err(|e| {
                SimilarityError::TokenizationFailed {
                    reason: e.to_string(),
                }
            })?;
            let mut ids = encoding.get_ids().to_vec();
            ids.truncate(CLIP_MAX_TOKENS);
            batch.push(ids);
        }

        let max_len = batch.iter().map(Vec::len).max().unwrap_or(0);
        for ids in &mut batch {
            ids.resize(max_len, pad_id);
        }

        Ok(Tensor::new(batch, device)?)
    }

    fn stub_probabilities(image: &[u8], phrases: &[String]) -> Vec<f32> {
        let digest = hash_image(image);
        let logits: Vec<f32> = phrases
            .iter()
            .map(|phrase| {
                let h = hash_image_phrase(&digest, phrase);
                (h % 10_000) as f32 / 10_000.0 * STUB_LOGIT_SCALE
            })
            .collect();
        softmax(&logits)
    }
}

impl SimilarityModel for ClipScorer {
    fn embed_and_score(&self, image: &[u8], phrases: &[String]) -> Result<Vec<f32>, SimilarityError> {
        if phrases.is_empty() {
            return Err(SimilarityError::NoCandidates);
        }

        match &self.backend {
            ClipBackend::Model {
                model,
                tokenizer,
                device,
                image_size,
                pad_id,
            } => {
                let pixels = Self::preprocess_image(image, *image_size, device)?;
                let input_ids = Self::tokenize(tokenizer, phrases, *pad_id, device)?;

                let (_logits_per_text, logits_per_image) = model.forward(&pixels, &input_ids)?;
                let probabilities = candle_nn::ops::softmax(&logits_per_image, 1)?
                    .squeeze(0)?
                    .to_vec1::<f32>()?;

                debug!(phrases = phrases.len(), "CLIP scoring complete");
                Ok(probabilities)
            }
            ClipBackend::Stub => Ok(Self::stub_probabilities(image, phrases)),
        }
    }

    fn name(&self) -> &str {
        match self.backend {
            ClipBackend::Model { .. } => "clip-vit-base-patch32",
            ClipBackend::Stub => "clip-stub",
        }
    }

    fn is_stub(&self) -> bool {
        matches!(self.backend, ClipBackend::Stub)
    }
}
