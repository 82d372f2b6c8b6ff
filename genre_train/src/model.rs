use burn::{
    module::Param,
    nn::{
        Linear, LinearConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
        loss::BinaryCrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    prelude::*,
    tensor::{
        ElementConversion, TensorData,
        activation::{relu, sigmoid},
    },
};
use genre_core::{MelConfig, MelExtractor};

use crate::rng::RngContext;

/// Channel widths of the four convolution blocks.
pub const CHANNELS: [usize; 5] = [1, 16, 32, 64, 128];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct GenreCnnConfig {
    pub num_classes: usize,
    #[config(default = 24000)]
    pub sample_rate: usize,
    #[config(default = 2048)]
    pub n_fft: usize,
    #[config(default = 240)]
    pub hop_length: usize,
    #[config(default = 128)]
    pub n_mels: usize,
    #[config(default = true)]
    pub normalized: bool,
}

impl GenreCnnConfig {
    pub fn from_mel(num_classes: usize, mel: &MelConfig) -> Self {
        Self::new(num_classes)
            .with_sample_rate(mel.sample_rate as usize)
            .with_n_fft(mel.n_fft)
            .with_hop_length(mel.hop_length)
            .with_n_mels(mel.n_mels)
            .with_normalized(mel.normalized)
    }

    /// Build the network with parameters drawn from `rng`.
    ///
    /// Weights and biases are uniform in ±1/sqrt(fan_in).
    pub fn init<B: Backend>(&self, rng: &mut RngContext, device: &B::Device) -> GenreCnn<B> {
        let conv1 = conv3x3(rng, CHANNELS[0], CHANNELS[1], device);
        let conv2 = conv3x3(rng, CHANNELS[1], CHANNELS[2], device);
        let conv3 = conv3x3(rng, CHANNELS[2], CHANNELS[3], device);
        let conv4 = conv3x3(rng, CHANNELS[3], CHANNELS[4], device);

        let mut fc = LinearConfig::new(CHANNELS[4], self.num_classes).init(device);
        let limit = 1.0 / (CHANNELS[4] as f32).sqrt();
        fc.weight = Param::from_tensor(rng.uniform([CHANNELS[4], self.num_classes], limit, device));
        fc.bias = Some(Param::from_tensor(rng.uniform([self.num_classes], limit, device)));

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        GenreCnn {
            conv1,
            conv2,
            conv3,
            conv4,
            pool,
            fc,
            sample_rate: self.sample_rate,
            n_fft: self.n_fft,
            hop_length: self.hop_length,
            n_mels: self.n_mels,
            normalized: self.normalized,
        }
    }
}

fn conv3x3<B: Backend>(
    rng: &mut RngContext,
    channels_in: usize,
    channels_out: usize,
    device: &B::Device,
) -> Conv2d<B> {
    // "same" padding is one cell on each side for a 3x3 kernel at stride 1
    let mut conv = Conv2dConfig::new([channels_in, channels_out], [3, 3])
        .with_padding(PaddingConfig2d::Same)
        .init(device);

    let limit = 1.0 / ((channels_in * 9) as f32).sqrt();
    conv.weight = Param::from_tensor(rng.uniform([channels_out, channels_in, 3, 3], limit, device));
    conv.bias = Some(Param::from_tensor(rng.uniform([channels_out], limit, device)));
    conv
}

/// Mel front end + four conv blocks + global max-pool + sigmoid head.
#[derive(Module, Debug)]
pub struct GenreCnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub conv4: Conv2d<B>,
    pub pool: MaxPool2d,
    pub fc: Linear<B>,
    pub sample_rate: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub normalized: bool,
}

impl<B: Backend> GenreCnn<B> {
    pub fn mel_config(&self) -> MelConfig {
        MelConfig {
            sample_rate: self.sample_rate as u32,
            n_fft: self.n_fft,
            hop_length: self.hop_length,
            n_mels: self.n_mels,
            normalized: self.normalized,
        }
    }

    /// waveforms: [batch, samples] → per-class scores in [0, 1]: [batch, classes]
    pub fn forward(&self, waveforms: Tensor<B, 2>) -> Tensor<B, 2> {
        let features = self.extract_features(waveforms);
        self.forward_features(features)
    }

    /// waveforms: [batch, samples] → power mel: [batch, n_mels, frames]
    ///
    /// The transform has no parameters, so it runs on the host and the result
    /// enters the graph as a constant.
    pub fn extract_features(&self, waveforms: Tensor<B, 2>) -> Tensor<B, 3> {
        let device = waveforms.device();
        let [_, num_samples] = waveforms.dims();
        let pcm: Vec<f32> = waveforms.into_data().iter::<f32>().collect();

        let mel = MelExtractor::new(self.mel_config()).extract_batch(&pcm, num_samples);
        let (batch, n_mels, frames) = mel.dim();
        let values: Vec<f32> = mel.iter().copied().collect();

        Tensor::from_data(TensorData::new(values, [batch, n_mels, frames]), &device)
    }

    /// mel: [batch, n_mels, frames] → scores: [batch, classes]
    pub fn forward_features(&self, mel: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, n_mels, frames] = mel.dims();

        // (B, F, T) -> (B, 1, F, T) -> (B, 1, T, F): time is height, frequency width
        let x = mel.reshape([batch, 1, n_mels, frames]).swap_dims(2, 3);

        let x = self.pool.forward(relu(self.conv1.forward(x)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.pool.forward(relu(self.conv3.forward(x)));
        let x = self.pool.forward(relu(self.conv4.forward(x)));

        let [batch, channels, _, _] = x.dims();
        let x = x.max_dim(3).max_dim(2).reshape([batch, channels]);

        sigmoid(self.fc.forward(x))
    }

    /// Binary cross-entropy of the scores against one-hot targets.
    ///
    /// Every class is scored as an independent binary decision, even though
    /// each clip has exactly one genre. Log terms are floored at -100 by the
    /// loss itself; scores are not clamped.
    pub fn forward_loss(
        &self,
        waveforms: Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let scores = self.forward(waveforms);
        let bce = BinaryCrossEntropyLossConfig::new().init(&scores.device());
        let loss = bce.forward(scores.clone(), targets.int());
        (loss, scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn small_config(num_classes: usize) -> GenreCnnConfig {
        GenreCnnConfig::new(num_classes)
            .with_sample_rate(8000)
            .with_n_fft(256)
            .with_hop_length(64)
            .with_n_mels(32)
    }

    #[test]
    fn feature_head_outputs_one_score_per_class() {
        let device = Default::default();
        let model: GenreCnn<B> = small_config(10).init(&mut RngContext::new(1), &device);

        let mel = RngContext::new(2).uniform::<B, 3>([3, 32, 40], 1.0, &device).abs();
        let scores = model.forward_features(mel);

        assert_eq!(scores.dims(), [3, 10]);
    }

    #[test]
    fn scores_are_probabilities() {
        let device = Default::default();
        let model: GenreCnn<B> = small_config(4).init(&mut RngContext::new(5), &device);

        let waveforms = RngContext::new(6).uniform::<B, 2>([2, 4000], 1.0, &device);
        let scores = model.forward(waveforms);

        assert_eq!(scores.dims(), [2, 4]);
        let values: Vec<f32> = scores.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn extracted_features_match_the_mel_layout() {
        let device = Default::default();
        let model: GenreCnn<B> = small_config(2).init(&mut RngContext::new(1), &device);

        let waveforms = Tensor::<B, 2>::zeros([2, 4000], &device);
        let [batch, n_mels, frames] = model.extract_features(waveforms).dims();

        assert_eq!(batch, 2);
        assert_eq!(n_mels, 32);
        assert!(frames >= 16);
    }

    #[test]
    fn same_seed_builds_identical_weights() {
        let device = Default::default();
        let a: GenreCnn<B> = small_config(3).init(&mut RngContext::new(11), &device);
        let b: GenreCnn<B> = small_config(3).init(&mut RngContext::new(11), &device);

        let wa: Vec<f32> = a.conv2.weight.val().into_data().iter::<f32>().collect();
        let wb: Vec<f32> = b.conv2.weight.val().into_data().iter::<f32>().collect();
        assert_eq!(wa, wb);
    }

    #[test]
    fn loss_is_finite_and_positive() {
        let device = Default::default();
        let model: GenreCnn<B> = small_config(2).init(&mut RngContext::new(4), &device);

        let waveforms = RngContext::new(8).uniform::<B, 2>([2, 4000], 1.0, &device);
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 0.0, 1.0], [2, 2]),
            &device,
        );
        let (loss, _) = model.forward_loss(waveforms, targets);
        let loss = loss.into_scalar().elem::<f32>();

        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn saturated_wrong_scores_are_not_capped() {
        let device = Default::default();
        let mut model: GenreCnn<B> = small_config(2).init(&mut RngContext::new(4), &device);
        model.fc.weight = Param::from_tensor(Tensor::zeros([CHANNELS[4], 2], &device));
        model.fc.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(vec![50.0f32, -50.0], [2]),
            &device,
        )));

        let waveforms = RngContext::new(8).uniform::<B, 2>([1, 4000], 1.0, &device);
        let targets =
            Tensor::<B, 2>::from_data(TensorData::new(vec![0.0f32, 1.0], [1, 2]), &device);
        let (loss, _) = model.forward_loss(waveforms, targets);
        let loss = loss.into_scalar().elem::<f32>();

        // clamping scores to 1e-7 would cap every term at -ln(1e-7) ~ 16.1
        assert!(loss.is_finite());
        assert!(loss > 40.0, "loss {loss}");
    }
}
