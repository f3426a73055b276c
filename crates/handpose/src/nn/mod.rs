//! Neural Network inference.
//!
//! The pipeline only talks to networks through the [`PalmDetectionNetwork`] and
//! [`LandmarkNetwork`] traits. This module implements both for ONNX models, which are run on the
//! CPU using `tract`.

mod packed;

use std::{ops::RangeInclusive, path::Path, sync::Arc};

use anyhow::{bail, Context};
use handpose_image::{Color, Image, Resolution, CHANNELS};
use ndarray::{concatenate, Array2, Array4, ArrayD, Axis, IxDyn};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec, TypedFact, TypedOp,
};

use crate::hand::{
    detection::{PalmDetectionNetwork, VALUES_PER_ANCHOR},
    landmark::{LandmarkNetwork, LandmarkOutput, NUM_KEYPOINT_VALUES},
};

pub(crate) use packed::packed_convolution_override;

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!("neural network file must have `.onnx` extension"),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read network from '{}'", path.display()))?;
        log::debug!("loading network from {}", path.display());
        Self::from_onnx(&model_data)
    }

    /// Loads and optimizes a pre-trained model from an in-memory ONNX file.
    ///
    /// Returns an error if the network data is malformed, if the network data is incomplete, or if
    /// the network uses unimplemented operations.
    pub fn from_onnx(raw: &[u8]) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*raw)?
            .into_optimized()?;
        let model = SimplePlan::new(graph)?;
        Ok(Self(Arc::new(model)))
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.0.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.0.model().outputs.len()
    }

    /// Returns the tensor shape of input `index`.
    pub fn input_shape(&self, index: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.0.model().input_fact(index)?;
        match fact.shape.as_concrete() {
            Some(shape) => Ok(shape.to_vec()),
            None => bail!("network input {index} has a symbolic shape"),
        }
    }

    /// Returns the tensor shape of output `index`.
    pub fn output_shape(&self, index: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.0.model().output_fact(index)?;
        match fact.shape.as_concrete() {
            Some(shape) => Ok(shape.to_vec()),
            None => bail!("network output {index} has a symbolic shape"),
        }
    }

    /// Runs the network on a set of inputs, returning the estimated outputs.
    #[doc(alias = "infer")]
    pub fn estimate(&self, inputs: Vec<ArrayD<f32>>) -> anyhow::Result<Vec<ArrayD<f32>>> {
        let inputs = inputs
            .into_iter()
            .map(|array| {
                let data = array.iter().copied().collect::<Vec<_>>();
                let tensor = tract_onnx::prelude::Tensor::from_shape(array.shape(), &data)?;
                Ok(TValue::from_const(Arc::new(tensor)))
            })
            .collect::<anyhow::Result<TVec<_>>>()?;

        let outputs = self.0.run(inputs)?;
        outputs
            .iter()
            .map(|tensor| {
                let data = tensor.as_slice::<f32>()?.to_vec();
                Ok(ArrayD::from_shape_vec(IxDyn(tensor.shape()), data)?)
            })
            .collect()
    }
}

enum ColorMapperKind {
    Linear { target_range: RangeInclusive<f32> },
}

/// Maps sRGB colors to network input values.
pub struct ColorMapper {
    kind: ColorMapperKind,
}

impl ColorMapper {
    /// Creates a simple color mapper that uniformly maps sRGB values to `target_range`.
    ///
    /// Note that this operates on *non-linear* sRGB colors, but maps them linearly to the target
    /// range.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        let start = *target_range.start();
        let end = *target_range.end();
        assert!(end > start);

        Self {
            kind: ColorMapperKind::Linear { target_range },
        }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        match &self.kind {
            ColorMapperKind::Linear { target_range } => {
                let start = *target_range.start();
                let end = *target_range.end();

                let adjust_range = (end - start) / 255.0;
                let rgb = [color.r(), color.g(), color.b()];
                rgb.map(|col| col as f32 * adjust_range + start)
            }
        }
    }
}

/// Converts an image to a `[1, height, width, 3]` tensor, dropping the alpha channel.
pub fn image_to_tensor(image: &Image, color_mapper: &ColorMapper) -> Array4<f32> {
    let [_, h, w, _] = image.shape();
    let data = image
        .data()
        .chunks_exact(CHANNELS)
        .flat_map(|px| color_mapper.map(Color::from_rgba8(px[0], px[1], px[2], px[3])))
        .collect::<Vec<_>>();
    Array4::from_shape_vec((1, h, w, 3), data).expect("image data matches its resolution")
}

/// Memory layout of a CNN image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
    /// Shape is `[N, C, H, W]`.
    Nchw,
    /// Shape is `[N, H, W, C]`.
    Nhwc,
}

impl InputLayout {
    /// Rearranges an NHWC tensor into this layout.
    fn arrange(self, input: Array4<f32>) -> ArrayD<f32> {
        match self {
            InputLayout::Nhwc => input.into_dyn(),
            InputLayout::Nchw => input.permuted_axes([0, 3, 1, 2]).into_dyn(),
        }
    }
}

/// Determines the input layout and image size of a network taking a single RGB image.
fn image_input(nn: &NeuralNetwork) -> anyhow::Result<(InputLayout, Resolution)> {
    if nn.num_inputs() != 1 {
        bail!(
            "CNN network has to take exactly 1 input, this one takes {}",
            nn.num_inputs(),
        );
    }

    let shape = nn.input_shape(0)?;
    let (layout, w, h) = match shape[..] {
        [1, 3, h, w] => (InputLayout::Nchw, w, h),
        [1, h, w, 3] => (InputLayout::Nhwc, w, h),
        _ => bail!("invalid model input shape for CNN: {:?}", shape),
    };

    let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
    Ok((layout, Resolution::new(w, h)))
}

/// A palm detection network loaded from an ONNX file.
///
/// Both the combined output format (one `[N, 19]` tensor) and the split format (a box tensor with
/// 18 values and a score tensor with 1 value per anchor) are accepted.
#[derive(Clone)]
pub struct OnnxPalmNetwork {
    nn: NeuralNetwork,
    layout: InputLayout,
    input_res: Resolution,
}

impl OnnxPalmNetwork {
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        let (layout, input_res) = image_input(&nn)?;
        log::debug!("palm network input: {input_res} ({layout:?})");
        Ok(Self {
            nn,
            layout,
            input_res,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::new(NeuralNetwork::from_path(path)?)
    }
}

impl PalmDetectionNetwork for OnnxPalmNetwork {
    fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    fn infer(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>> {
        let outputs = self.nn.estimate(vec![self.layout.arrange(input)])?;
        merge_palm_outputs(outputs)
    }
}

fn merge_palm_outputs(outputs: Vec<ArrayD<f32>>) -> anyhow::Result<Array2<f32>> {
    fn rows(array: ArrayD<f32>, width: usize) -> anyhow::Result<Array2<f32>> {
        let len = array.len();
        if len % width != 0 {
            bail!("palm network output of size {len} is not a multiple of {width}");
        }
        Ok(array
            .as_standard_layout()
            .into_owned()
            .into_shape((len / width, width))?)
    }

    match <[_; 1]>::try_from(outputs) {
        Ok([combined]) => rows(combined, VALUES_PER_ANCHOR),
        Err(outputs) => {
            let Ok([a, b]) = <[_; 2]>::try_from(outputs) else {
                bail!("palm network must have 1 or 2 outputs");
            };
            let (scores, boxes) = if a.shape().last() == Some(&1) {
                (a, b)
            } else {
                (b, a)
            };
            let scores = rows(scores, 1)?;
            let boxes = rows(boxes, VALUES_PER_ANCHOR - 1)?;
            if scores.nrows() != boxes.nrows() {
                bail!(
                    "palm network produced {} scores for {} boxes",
                    scores.nrows(),
                    boxes.nrows()
                );
            }
            Ok(concatenate(Axis(1), &[scores.view(), boxes.view()])?)
        }
    }
}

/// A hand landmark network loaded from an ONNX file.
///
/// The landmarks are read from the first output with 63 values, the confidence from the first
/// output with a single value.
///
/// `tract` cannot toggle packed convolutions, so this network ignores `HANDPOSE_PACKED_CONV`.
#[derive(Clone)]
pub struct OnnxLandmarkNetwork {
    nn: NeuralNetwork,
    layout: InputLayout,
    input_res: Resolution,
    landmark_output: usize,
    confidence_output: usize,
}

impl OnnxLandmarkNetwork {
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        let (layout, input_res) = image_input(&nn)?;

        let mut landmark_output = None;
        let mut confidence_output = None;
        for index in 0..nn.num_outputs() {
            let len = nn.output_shape(index)?.iter().product::<usize>();
            if len == NUM_KEYPOINT_VALUES && landmark_output.is_none() {
                landmark_output = Some(index);
            } else if len == 1 && confidence_output.is_none() {
                confidence_output = Some(index);
            }
        }

        let (Some(landmark_output), Some(confidence_output)) = (landmark_output, confidence_output)
        else {
            bail!("network does not have landmark and confidence outputs");
        };
        log::debug!(
            "landmark network input: {input_res} ({layout:?}), landmarks at output \
            {landmark_output}, confidence at output {confidence_output}"
        );

        Ok(Self {
            nn,
            layout,
            input_res,
            landmark_output,
            confidence_output,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::new(NeuralNetwork::from_path(path)?)
    }

    /// Returns the expected input image size.
    ///
    /// The pipeline's landmark input size has to be set to this value.
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }
}

impl LandmarkNetwork for OnnxLandmarkNetwork {
    fn predict(&mut self, input: Array4<f32>) -> anyhow::Result<LandmarkOutput> {
        let outputs = self.nn.estimate(vec![self.layout.arrange(input)])?;
        let confidence = outputs[self.confidence_output]
            .iter()
            .next()
            .copied()
            .context("empty confidence output")?;
        let keypoints = outputs[self.landmark_output].iter().copied().collect();
        Ok(LandmarkOutput {
            confidence,
            keypoints,
        })
    }
}
