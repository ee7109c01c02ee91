//! ONNX inference through `tract-onnx`.

use std::path::Path;

use tract_onnx::prelude::*;

use crate::decode::OutputTensor;
use crate::preprocess::DEFAULT_INPUT_SIZE;
use crate::session::{InferenceRuntime, InferenceSession, InputTensor};
use crate::util::{DetectError, DetectResult};

fn inference_error(context: &str, err: impl std::fmt::Display) -> DetectError {
    DetectError::Inference {
        reason: format!("{context}: {err}"),
    }
}

/// Loads ONNX models with a fixed `[1, 3, S, S]` f32 input.
#[derive(Clone, Copy, Debug)]
pub struct TractRuntime {
    input_size: usize,
}

impl Default for TractRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl TractRuntime {
    pub fn new(input_size: usize) -> Self {
        Self { input_size }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }
}

impl InferenceRuntime for TractRuntime {
    type Session = TractSession;

    fn load(&self, path: &Path) -> DetectResult<TractSession> {
        let size = self.input_size;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|err| inference_error(&format!("failed to load {}", path.display()), err))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .map_err(|err| inference_error("failed to set input fact", err))?
            .into_optimized()
            .map_err(|err| inference_error("failed to optimize model", err))?
            .into_runnable()
            .map_err(|err| inference_error("failed to build runnable model", err))?;

        Ok(TractSession { model, size })
    }
}

/// Optimized, runnable tract plan.
pub struct TractSession {
    model: TypedRunnableModel<TypedModel>,
    size: usize,
}

impl InferenceSession for TractSession {
    fn run(&self, input: InputTensor<'_>) -> DetectResult<OutputTensor> {
        let expected = [1, 3, self.size, self.size];
        if input.shape != expected {
            return Err(DetectError::InvalidInput("input shape does not match the loaded model"));
        }

        let tensor = tract_ndarray::Array4::from_shape_vec(
            (1, 3, self.size, self.size),
            input.data.to_vec(),
        )
        .map_err(|err| inference_error("input buffer does not match shape", err))?
        .into_tensor();

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|err| inference_error("model run failed", err))?;
        let output = outputs
            .first()
            .ok_or_else(|| inference_error("model run failed", "no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|err| inference_error("output is not f32", err))?;

        let shape: [usize; 3] = view.shape().try_into().map_err(|_| DetectError::Inference {
            reason: format!("expected a rank-3 output, got shape {:?}", view.shape()),
        })?;
        OutputTensor::new(shape, view.iter().copied().collect())
    }
}
