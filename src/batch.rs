//! Trajectory transition batches.
//!
//! A batch of B independent trajectories of T time steps each, stored as
//! flat `f32` buffers plus the dimensions needed to reassemble them into
//! device tensors. Construction validates buffer lengths against the
//! declared dimensions so shape errors surface before any tensor op runs.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::ModelError;

/// Batch of trajectories over (obs, action, next_obs, reward, done).
#[derive(Debug, Clone)]
pub struct TransitionBatch {
    /// Number of trajectories.
    pub batch_size: usize,
    /// Time steps per trajectory.
    pub trajectory_length: usize,
    /// Observation shape (channels, height, width).
    pub obs_shape: (usize, usize, usize),
    /// Action vector width.
    pub action_size: usize,
    /// Observations, [B * T * C * H * W] row-major.
    pub obs: Vec<f32>,
    /// Actions, [B * T * A] row-major.
    pub act: Vec<f32>,
    /// Next observations, [B * T * C * H * W] row-major.
    pub next_obs: Vec<f32>,
    /// Rewards, [B * T].
    pub rewards: Vec<f32>,
    /// Terminal flags, [B * T].
    pub dones: Vec<bool>,
}

impl TransitionBatch {
    /// Build a batch, validating every buffer length against the dimensions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        batch_size: usize,
        trajectory_length: usize,
        obs_shape: (usize, usize, usize),
        action_size: usize,
        obs: Vec<f32>,
        act: Vec<f32>,
        next_obs: Vec<f32>,
        rewards: Vec<f32>,
        dones: Vec<bool>,
    ) -> Result<Self, ModelError> {
        if batch_size == 0 || trajectory_length == 0 {
            return Err(ModelError::EmptyBatch);
        }

        let (channels, height, width) = obs_shape;
        let obs_len = batch_size * trajectory_length * channels * height * width;
        let act_len = batch_size * trajectory_length * action_size;
        let scalar_len = batch_size * trajectory_length;

        let checks = [
            ("observation buffer", obs_len, obs.len()),
            ("action buffer", act_len, act.len()),
            ("next-observation buffer", obs_len, next_obs.len()),
            ("reward buffer", scalar_len, rewards.len()),
            ("done buffer", scalar_len, dones.len()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(ModelError::ShapeMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }

        Ok(Self {
            batch_size,
            trajectory_length,
            obs_shape,
            action_size,
            obs,
            act,
            next_obs,
            rewards,
            dones,
        })
    }

    /// Total number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.batch_size * self.trajectory_length
    }

    /// Whether the batch holds any transitions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move the batch onto a compute device as shaped tensors.
    pub fn process<B: Backend>(&self, device: &B::Device) -> ProcessedBatch<B> {
        let (channels, height, width) = self.obs_shape;
        let obs_dims = [
            self.batch_size,
            self.trajectory_length,
            channels,
            height,
            width,
        ];

        let dones: Vec<f32> = self
            .dones
            .iter()
            .map(|d| if *d { 1.0 } else { 0.0 })
            .collect();

        ProcessedBatch {
            obs: Tensor::<B, 1>::from_floats(self.obs.as_slice(), device).reshape(obs_dims),
            act: Tensor::<B, 1>::from_floats(self.act.as_slice(), device).reshape([
                self.batch_size,
                self.trajectory_length,
                self.action_size,
            ]),
            next_obs: Tensor::<B, 1>::from_floats(self.next_obs.as_slice(), device)
                .reshape(obs_dims),
            rewards: Tensor::<B, 1>::from_floats(self.rewards.as_slice(), device)
                .reshape([self.batch_size, self.trajectory_length]),
            dones: Tensor::<B, 1>::from_floats(dones.as_slice(), device)
                .reshape([self.batch_size, self.trajectory_length]),
        }
    }
}

/// Device tensors extracted from a [`TransitionBatch`].
#[derive(Debug, Clone)]
pub struct ProcessedBatch<B: Backend> {
    /// Observations [B, T, C, H, W].
    pub obs: Tensor<B, 5>,
    /// Actions [B, T, A].
    pub act: Tensor<B, 3>,
    /// Next observations [B, T, C, H, W].
    pub next_obs: Tensor<B, 5>,
    /// Rewards [B, T].
    pub rewards: Tensor<B, 2>,
    /// Terminal flags as 0/1 floats [B, T].
    pub dones: Tensor<B, 2>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn tiny_batch() -> TransitionBatch {
        let pixels = 2 * 3 * 1 * 2 * 2;
        TransitionBatch::new(
            2,
            3,
            (1, 2, 2),
            2,
            vec![0.5; pixels],
            vec![0.1; 2 * 3 * 2],
            vec![0.25; pixels],
            vec![1.0; 6],
            vec![false; 6],
        )
        .unwrap()
    }

    #[test]
    fn test_process_shapes() {
        let device = Default::default();
        let processed = tiny_batch().process::<B>(&device);
        assert_eq!(processed.obs.dims(), [2, 3, 1, 2, 2]);
        assert_eq!(processed.act.dims(), [2, 3, 2]);
        assert_eq!(processed.next_obs.dims(), [2, 3, 1, 2, 2]);
        assert_eq!(processed.rewards.dims(), [2, 3]);
        assert_eq!(processed.dones.dims(), [2, 3]);
    }

    #[test]
    fn test_rejects_wrong_action_buffer() {
        let pixels = 1 * 2 * 1 * 2 * 2;
        let result = TransitionBatch::new(
            1,
            2,
            (1, 2, 2),
            2,
            vec![0.0; pixels],
            vec![0.0; 3], // should be 1 * 2 * 2 = 4
            vec![0.0; pixels],
            vec![0.0; 2],
            vec![false; 2],
        );
        match result {
            Err(ModelError::ShapeMismatch {
                what,
                expected,
                actual,
            }) => {
                assert_eq!(what, "action buffer");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_empty_batch() {
        let result = TransitionBatch::new(
            0,
            2,
            (1, 2, 2),
            1,
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(ModelError::EmptyBatch)));
    }

    #[test]
    fn test_done_flags_become_unit_floats() {
        let device = Default::default();
        let mut batch = tiny_batch();
        batch.dones = vec![true, false, true, false, false, true];
        let processed = batch.process::<B>(&device);

        let values: Vec<f32> = processed.dones.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }
}
