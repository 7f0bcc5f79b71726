use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layer sizes of a controller network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
}

/// The decision-making unit an agent owns.
///
/// `Clone` must produce a deep, independent copy: mutating a clone never
/// touches the original.
pub trait Controller: Clone + fmt::Debug + Send + 'static {
    /// Build a controller with random initial weights
    fn random<R: Rng + ?Sized>(shape: Shape, rng: &mut R) -> Self;

    /// Map `shape.inputs` values to `shape.outputs` values in [0, 1]
    fn predict(&self, inputs: &[f64]) -> Vec<f64>;

    /// Apply `perturb` to every weight in place
    fn mutate(&mut self, perturb: &mut dyn FnMut(f64) -> f64);
}

/// Fully connected layer, weights stored row-major (one row per output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Layer {
    inputs: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
}

impl Layer {
    fn random<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        Self {
            inputs,
            weights: (0..inputs * outputs)
                .map(|_| rng.gen_range(-1.0..1.0))
                .collect(),
            biases: (0..outputs).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .chunks(self.inputs)
            .zip(&self.biases)
            .map(|(row, bias)| {
                let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                sigmoid(sum + bias)
            })
            .collect()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Single hidden layer perceptron with sigmoid activations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    shape: Shape,
    hidden: Layer,
    output: Layer,
}

impl NeuralNet {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// All weights and biases, hidden layer first
    pub fn parameters(&self) -> Vec<f64> {
        [&self.hidden, &self.output]
            .into_iter()
            .flat_map(|layer| layer.weights.iter().chain(&layer.biases))
            .copied()
            .collect()
    }
}

impl Controller for NeuralNet {
    fn random<R: Rng + ?Sized>(shape: Shape, rng: &mut R) -> Self {
        Self {
            shape,
            hidden: Layer::random(shape.inputs, shape.hidden, rng),
            output: Layer::random(shape.hidden, shape.outputs, rng),
        }
    }

    fn predict(&self, inputs: &[f64]) -> Vec<f64> {
        let hidden = self.hidden.forward(inputs);
        self.output.forward(&hidden)
    }

    fn mutate(&mut self, perturb: &mut dyn FnMut(f64) -> f64) {
        for layer in [&mut self.hidden, &mut self.output] {
            for value in layer.weights.iter_mut().chain(layer.biases.iter_mut()) {
                *value = perturb(*value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SHAPE: Shape = Shape {
        inputs: 4,
        hidden: 6,
        outputs: 2,
    };

    #[test]
    fn test_predict_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = NeuralNet::random(SHAPE, &mut rng);

        let out = net.predict(&[0.1, 0.5, 0.9, 0.3]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = NeuralNet::random(SHAPE, &mut rng);

        assert_eq!(net.parameters().len(), 4 * 6 + 6 + 6 * 2 + 2);
    }

    #[test]
    fn test_mutating_clone_leaves_original_intact() {
        let mut rng = StdRng::seed_from_u64(11);
        let original = NeuralNet::random(SHAPE, &mut rng);
        let before = original.parameters();

        let mut child = original.clone();
        child.mutate(&mut |w| w + 1.0);

        assert_eq!(original.parameters(), before);
        assert!(child
            .parameters()
            .iter()
            .zip(&before)
            .all(|(c, o)| (c - o - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_identity_mutation_preserves_predictions() {
        let mut rng = StdRng::seed_from_u64(3);
        let net = NeuralNet::random(SHAPE, &mut rng);
        let mut copy = net.clone();
        copy.mutate(&mut |w| w);

        let input = [0.2, 0.4, 0.6, 0.8];
        assert_eq!(net.predict(&input), copy.predict(&input));
    }

    proptest! {
        #[test]
        fn predictions_stay_in_unit_interval(
            seed in any::<u64>(),
            inputs in proptest::collection::vec(-10.0f64..10.0, 4),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let net = NeuralNet::random(SHAPE, &mut rng);

            let out = net.predict(&inputs);
            prop_assert_eq!(out.len(), SHAPE.outputs);
            prop_assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}
