//! Built-in algorithms.
//!
//! Neither solves anything; they exist to drive the simulation and to
//! exercise the message/computation accounting end to end.

use crate::algorithm::{Algorithm, AlgorithmArgs, AlgorithmContext};

use async_trait::async_trait;
use pydynds_env::{DcopSnapshot, NodeId};
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::sync::Mutex;

/// Sends one fixed 3x3 hypercube from `v1` to `v2` every cycle.
#[derive(Debug, Default)]
pub struct SampleAlgorithm;

impl SampleAlgorithm {
    pub const NAME: &'static str = "sample_algorithm";

    pub fn build(_args: &AlgorithmArgs) -> Box<dyn Algorithm> {
        Box::new(Self)
    }
}

#[async_trait]
impl Algorithm for SampleAlgorithm {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, ctx: &AlgorithmContext) {
        ctx.send_message("v1", "v2", json!([[1, 2, 3], [4, 5, 6], [7, 8, 9]]));
    }
}

/// Picks a random pair of variables from the view each cycle, records a
/// local computation at the sender and a message to the receiver.
pub struct RandomExchange {
    rng: Mutex<ChaCha8Rng>,
}

impl RandomExchange {
    pub const NAME: &'static str = "random_exchange";

    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn build(args: &AlgorithmArgs) -> Box<dyn Algorithm> {
        Box::new(Self::new(args.seed))
    }

    /// Variable names listed under `"variables"` in the snapshot.
    fn variables(snapshot: &DcopSnapshot) -> Vec<NodeId> {
        snapshot
            .as_value()
            .get("variables")
            .and_then(|v| v.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| name.as_str())
                    .map(NodeId::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Algorithm for RandomExchange {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn check_input(&self, ctx: &AlgorithmContext) -> bool {
        ctx.view()
            .map_or(false, |view| Self::variables(&view).len() >= 2)
    }

    async fn run(&self, ctx: &AlgorithmContext) {
        let Some(view) = ctx.view() else { return };
        let variables = Self::variables(&view);

        let (pair, value) = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let pair: Vec<NodeId> = variables.choose_multiple(&mut *rng, 2).cloned().collect();
            let value: u32 = rng.gen_range(0..10);
            (pair, value)
        };
        let Ok([source, destination]) = <[NodeId; 2]>::try_from(pair) else {
            return;
        };

        ctx.record_computation(source.clone(), json!({ "value": value }));
        ctx.send_message(source, destination, json!({ "value": value }));
    }
}
