use std::thread;

use argmin::core::observers::ObserverMode;
use argmin::core::{CostFunction, Error, Executor, Gradient, State};
use argmin::solver::linesearch::condition::ArmijoCondition;
use argmin::solver::linesearch::{BacktrackingLineSearch, MoreThuenteLineSearch};
use argmin::solver::quasinewton::LBFGS;
use argmin_observer_slog::SlogLogger;
use hashbrown::HashMap;
use log::debug;

use crate::errors::{HgscoreError, Result};
use crate::math;
use crate::model::MaxEntModel;

/// One labeled training instance with indexed features.
#[derive(Clone, Debug)]
struct Example {
    label: usize,
    features: Vec<(usize, f64)>,
}

/// Labeled instances for training a [`MaxEntModel`].
///
/// Labels and feature names are indexed in order of first appearance.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    labels: Vec<String>,
    label_ids: HashMap<String, usize>,
    feature_ids: HashMap<String, usize>,
    examples: Vec<Example>,
}

impl Dataset {
    /// Creates an empty dataset.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn intern(ids: &mut HashMap<String, usize>, name: &str) -> usize {
        if let Some(&id) = ids.get(name) {
            return id;
        }
        let id = ids.len();
        ids.insert(name.to_string(), id);
        id
    }

    /// Adds an instance.
    pub fn push<'a, I>(&mut self, label: &str, features: I)
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let label_id = Self::intern(&mut self.label_ids, label);
        if label_id == self.labels.len() {
            self.labels.push(label.to_string());
        }
        let features = features
            .into_iter()
            .map(|(name, value)| (Self::intern(&mut self.feature_ids, name), value))
            .collect();
        self.examples.push(Example {
            label: label_id,
            features,
        });
    }

    /// Gets the distinct labels in order of first appearance.
    #[inline(always)]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Gets the number of distinct features.
    #[inline(always)]
    pub fn num_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Gets the number of instances.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Returns `true` if the dataset has no instance.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Negative conditional log-likelihood of a dataset.
struct ExamplesLoss<'a> {
    examples: &'a [Example],
    n_labels: usize,
    stride: usize,
    n_threads: usize,
    l2_lambda: Option<f64>,
}

impl<'a> ExamplesLoss<'a> {
    fn new(dataset: &'a Dataset, n_threads: usize, l2_lambda: Option<f64>) -> Self {
        Self {
            examples: &dataset.examples,
            n_labels: dataset.labels.len(),
            stride: dataset.num_features() + 1,
            n_threads,
            l2_lambda,
        }
    }

    #[inline(always)]
    fn n_weights(&self) -> usize {
        self.n_labels * self.stride
    }

    /// Fills `probs` with the label distribution of `example` and returns its loss.
    fn example_loss(&self, example: &Example, param: &[f64], probs: &mut Vec<f64>) -> f64 {
        probs.clear();
        for k in 0..self.n_labels {
            let row = &param[k * self.stride..(k + 1) * self.stride];
            let mut s = row[self.stride - 1];
            for &(f, v) in &example.features {
                s += row[f] * v;
            }
            probs.push(s);
        }
        let gold = probs[example.label];
        let z = math::softmax(probs);
        z - gold
    }

    /// Runs `f` over all examples on the worker threads and collects the per-thread results.
    fn map_examples<T, F>(&self, f: F) -> Result<Vec<T>, Error>
    where
        T: Send,
        F: Fn(&mut dyn Iterator<Item = &'a Example>) -> T + Sync,
    {
        let (s, r) = crossbeam_channel::unbounded();
        for example in self.examples {
            s.send(example)
                .map_err(|_| Error::msg("example queue closed"))?;
        }
        drop(s);
        thread::scope(|scope| {
            let mut threads = vec![];
            for _ in 0..self.n_threads {
                threads.push(scope.spawn(|| f(&mut r.try_iter())));
            }
            threads
                .into_iter()
                .map(|t| t.join().map_err(|_| Error::msg("worker thread panicked")))
                .collect()
        })
    }
}

impl CostFunction for ExamplesLoss<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let losses = self.map_examples(|examples| {
            let mut probs = Vec::with_capacity(self.n_labels);
            examples
                .map(|example| self.example_loss(example, param, &mut probs))
                .sum::<f64>()
        })?;
        let mut loss_total: f64 = losses.into_iter().sum();

        if let Some(lambda) = self.l2_lambda {
            let norm2: f64 = param.iter().map(|p| p * p).sum();
            loss_total += lambda * norm2 * 0.5;
        }

        Ok(loss_total)
    }
}

impl Gradient for ExamplesLoss<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, Error> {
        let partials = self.map_examples(|examples| {
            let mut probs = Vec::with_capacity(self.n_labels);
            let mut local_gradients = vec![0.0; self.n_weights()];
            for example in examples {
                self.example_loss(example, param, &mut probs);
                for (k, &p) in probs.iter().enumerate() {
                    let d = if k == example.label { p - 1.0 } else { p };
                    let row = &mut local_gradients[k * self.stride..(k + 1) * self.stride];
                    row[self.stride - 1] += d;
                    for &(f, v) in &example.features {
                        row[f] += d * v;
                    }
                }
            }
            local_gradients
        })?;
        let mut gradients = vec![0.0; self.n_weights()];
        for local_gradients in partials {
            for (y, x) in gradients.iter_mut().zip(local_gradients) {
                *y += x;
            }
        }

        if let Some(lambda) = self.l2_lambda {
            for (g, p) in gradients.iter_mut().zip(param) {
                *g += lambda * *p;
            }
        }

        Ok(gradients)
    }
}

/// L1- or L2- regularization settings
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Regularization {
    /// Performs L1-regularization.
    L1,

    /// Performs L2-regularization.
    L2,
}

/// Trainer for maximum-entropy classifiers.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug)]
pub struct Trainer {
    max_iter: u64,
    n_threads: usize,
    regularization: Regularization,
    lambda: f64,
    verbose: bool,
}

impl Trainer {
    /// Creates a new trainer.
    pub const fn new() -> Self {
        Self {
            max_iter: 100,
            n_threads: 1,
            regularization: Regularization::L2,
            lambda: 0.1,
            verbose: false,
        }
    }

    /// Sets the maximum number of iterations.
    ///
    /// # Errors
    ///
    /// `max_iter` must be >= 1.
    pub fn max_iter(mut self, max_iter: u64) -> Result<Self> {
        if max_iter == 0 {
            return Err(HgscoreError::invalid_argument("max_iter must not be 0"));
        }
        self.max_iter = max_iter;
        Ok(self)
    }

    /// Sets regularization settings.
    ///
    /// # Errors
    ///
    /// `lambda` must be >= 0.
    pub fn regularization(mut self, regularization: Regularization, lambda: f64) -> Result<Self> {
        if !(lambda >= 0.0) {
            return Err(HgscoreError::invalid_argument(
                "lambda must be greater than or equal to 0.0",
            ));
        }
        self.regularization = regularization;
        self.lambda = lambda;
        Ok(self)
    }

    /// Sets the number of threads.
    ///
    /// # Errors
    ///
    /// `n_threads` must be >= 1.
    pub fn n_threads(mut self, n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(HgscoreError::invalid_argument("n_threads must not be 0"));
        }
        self.n_threads = n_threads;
        Ok(self)
    }

    /// Reports optimizer progress on the terminal when enabled.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Trains a model on `dataset`.
    ///
    /// # Errors
    ///
    /// [`HgscoreError`] is returned when the dataset is empty or the optimizer fails.
    pub fn train(&self, dataset: &Dataset) -> Result<MaxEntModel> {
        if dataset.is_empty() {
            return Err(HgscoreError::invalid_state("no training examples"));
        }
        let n_weights = (dataset.num_features() + 1)
            .checked_mul(dataset.labels.len())
            .ok_or_else(|| HgscoreError::model_scale("too many weights"))?;
        debug!(
            "training a maxent model: {} examples, {} labels, {} features",
            dataset.len(),
            dataset.labels.len(),
            dataset.num_features(),
        );

        let weights_init = vec![0.0; n_weights];
        // A single label needs no weights to take all the mass.
        let weights = if dataset.labels.len() == 1 {
            weights_init
        } else {
            self.optimize(dataset, weights_init)?
        };

        MaxEntModel::new(
            dataset.labels.clone(),
            dataset
                .feature_ids
                .iter()
                .map(|(k, &v)| (k.clone(), v))
                .collect(),
            weights,
        )
    }

    fn optimize(&self, dataset: &Dataset, weights_init: Vec<f64>) -> Result<Vec<f64>> {
        let optimizer_error = |e: Error| HgscoreError::training(e.to_string());
        let res = match self.regularization {
            Regularization::L1 => {
                let linesearch = BacktrackingLineSearch::new(
                    ArmijoCondition::new(1e-4).map_err(optimizer_error)?,
                )
                .rho(0.5)
                .map_err(optimizer_error)?;
                let solver = LBFGS::new(linesearch, 7)
                    .with_l1_regularization(self.lambda)
                    .map_err(optimizer_error)?;
                let loss_function = ExamplesLoss::new(dataset, self.n_threads, None);
                let mut executor = Executor::new(loss_function, solver)
                    .configure(|state| state.param(weights_init).max_iters(self.max_iter));
                if self.verbose {
                    executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
                }
                executor
                    .run()
                    .map_err(optimizer_error)?
                    .state()
                    .get_best_param()
                    .cloned()
            }
            Regularization::L2 => {
                let linesearch = MoreThuenteLineSearch::new()
                    .with_c(1e-4, 0.9)
                    .map_err(optimizer_error)?;
                let solver = LBFGS::new(linesearch, 7);
                let loss_function =
                    ExamplesLoss::new(dataset, self.n_threads, Some(self.lambda));
                let mut executor = Executor::new(loss_function, solver)
                    .configure(|state| state.param(weights_init).max_iters(self.max_iter));
                if self.verbose {
                    executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
                }
                executor
                    .run()
                    .map_err(optimizer_error)?
                    .state()
                    .get_best_param()
                    .cloned()
            }
        };
        res.ok_or_else(|| HgscoreError::training("optimizer returned no parameters"))
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let mut dataset = Dataset::new();
        for _ in 0..3 {
            dataset.push("plural", [("suffix=s", 1.0), ("det=les", 1.0)]);
            dataset.push("singular", [("suffix=none", 1.0), ("det=le", 1.0)]);
        }
        dataset.push("plural", [("suffix=s", 1.0)]);
        dataset
    }

    #[test]
    fn test_dataset_indexing() {
        let dataset = dataset();
        assert_eq!(&["plural".to_string(), "singular".to_string()], dataset.labels());
        assert_eq!(4, dataset.num_features());
        assert_eq!(7, dataset.len());
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let dataset = dataset();
        let loss = ExamplesLoss::new(&dataset, 2, Some(0.1));
        let param: Vec<f64> = (0..loss.n_weights()).map(|i| 0.1 * i as f64 - 0.3).collect();
        let gradient = loss.gradient(&param).unwrap();
        let eps = 1e-6;
        for i in 0..param.len() {
            let mut plus = param.clone();
            plus[i] += eps;
            let mut minus = param.clone();
            minus[i] -= eps;
            let numeric = (loss.cost(&plus).unwrap() - loss.cost(&minus).unwrap()) / (2.0 * eps);
            assert!((numeric - gradient[i]).abs() < 1e-5, "weight {i}");
        }
    }

    #[test]
    fn test_cost_at_zero() {
        let dataset = dataset();
        let loss = ExamplesLoss::new(&dataset, 3, None);
        let cost = loss.cost(&vec![0.0; loss.n_weights()]).unwrap();
        assert!((cost - 7.0 * 2f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_train_l2() {
        let model = Trainer::new()
            .max_iter(50)
            .unwrap()
            .n_threads(2)
            .unwrap()
            .train(&dataset())
            .unwrap();
        assert_eq!(2, model.num_labels());
        let c = model.classify("plural", [("suffix=s", 1.0)]);
        assert_eq!("plural", c.best_label());
        let c = model.classify("singular", [("det=le", 1.0)]);
        assert_eq!("singular", c.best_label());
    }

    #[test]
    fn test_train_l1() {
        let model = Trainer::new()
            .regularization(Regularization::L1, 0.01)
            .unwrap()
            .max_iter(50)
            .unwrap()
            .train(&dataset())
            .unwrap();
        let c = model.classify("plural", [("suffix=s", 1.0), ("det=les", 1.0)]);
        assert_eq!("plural", c.best_label());
    }

    #[test]
    fn test_single_label() {
        let mut dataset = Dataset::new();
        dataset.push("only", [("x", 1.0)]);
        let model = Trainer::new().train(&dataset).unwrap();
        let c = model.classify("only", [("x", 1.0)]);
        assert!((c.best_value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Trainer::new().max_iter(0).is_err());
        assert!(Trainer::new().n_threads(0).is_err());
        assert!(Trainer::new()
            .regularization(Regularization::L2, -1.0)
            .is_err());
        assert!(Trainer::new().train(&Dataset::new()).is_err());
    }
}
