//! Monte Carlo stress scenarios: random shocks to external assets on a fixed network.

use log::debug;
use nalgebra::DVector;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::ClearingEngine;
use crate::error::{ClearingError, Result};
use crate::network::LiabilityNetwork;

/// Parameters of the external asset shock distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShockConfig {
    /// Number of independent scenarios to clear.
    pub scenarios: usize,
    /// Log-volatility `σ` of the multiplicative shock `exp(σz − σ²/2)`.
    pub volatility: f64,
    /// Seed from which every scenario's stream is derived.
    pub seed: u64,
}

impl Default for ShockConfig {
    fn default() -> Self {
        Self {
            scenarios: 1_000,
            volatility: 0.2,
            seed: 0,
        }
    }
}

impl ShockConfig {
    /// Set the number of scenarios.
    pub fn with_scenarios(mut self, scenarios: usize) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Set the shock volatility.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.scenarios == 0 {
            return Err(ClearingError::InvalidConfig {
                parameter: "scenarios",
                value: 0.0,
            });
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(ClearingError::InvalidConfig {
                parameter: "volatility",
                value: self.volatility,
            });
        }
        Ok(())
    }
}

/// Result of clearing one shocked scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Shocked external assets fed to the engine.
    pub external_assets: DVector<f64>,
    /// Default mask after clearing.
    pub defaulted: Vec<bool>,
    /// Aggregate unpaid liabilities.
    pub shortfall: f64,
    /// Whether the solver met its stopping rule.
    pub converged: bool,
}

/// Aggregate statistics over all scenarios.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StressSummary {
    /// Fraction of scenarios in which each node defaulted.
    pub default_frequency: DVector<f64>,
    /// Mean aggregate shortfall across scenarios.
    pub mean_shortfall: f64,
    /// Largest number of simultaneous defaults seen.
    pub worst_default_count: usize,
    /// Scenarios whose solve did not converge.
    pub unconverged: usize,
    /// Per-scenario outcomes, in scenario order.
    pub outcomes: Vec<ScenarioOutcome>,
}

/// Per-scenario seeds, drawn in order from one stream seeded with `config.seed`.
pub fn scenario_seeds(config: &ShockConfig) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    (0..config.scenarios).map(|_| rng.gen()).collect()
}

/// Draws shocked external assets from a scenario's own seed.
pub fn shocked_assets(base: &DVector<f64>, sigma: f64, scenario_seed: u64) -> DVector<f64> {
    let mut rng = SmallRng::seed_from_u64(scenario_seed);
    base.map(|asset| {
        let z: f64 = StandardNormal.sample(&mut rng);
        asset * (sigma * z - 0.5 * sigma * sigma).exp()
    })
}

/// Clears `config.scenarios` shocked copies of the engine's network in parallel.
pub fn run_stress(engine: &ClearingEngine, config: &ShockConfig) -> Result<StressSummary> {
    config.validate()?;
    let base = engine.network();

    let outcomes = scenario_seeds(config)
        .into_par_iter()
        .map(|scenario_seed| clear_scenario(engine, base, config.volatility, scenario_seed))
        .collect::<Result<Vec<_>>>()?;

    let n = base.node_count();
    let mut default_frequency = DVector::zeros(n);
    let mut total_shortfall = 0.0;
    let mut worst_default_count = 0usize;
    let mut unconverged = 0usize;

    for outcome in &outcomes {
        let mut count = 0usize;
        for (i, defaulted) in outcome.defaulted.iter().enumerate() {
            if *defaulted {
                default_frequency[i] += 1.0;
                count += 1;
            }
        }
        worst_default_count = worst_default_count.max(count);
        total_shortfall += outcome.shortfall;
        if !outcome.converged {
            unconverged += 1;
        }
    }

    let scenarios = outcomes.len() as f64;
    default_frequency /= scenarios;
    let mean_shortfall = total_shortfall / scenarios;
    debug!(
        "stress run: {} scenarios, mean shortfall {mean_shortfall:.4}, worst {worst_default_count} defaults",
        outcomes.len()
    );

    Ok(StressSummary {
        default_frequency,
        mean_shortfall,
        worst_default_count,
        unconverged,
        outcomes,
    })
}

fn clear_scenario(
    engine: &ClearingEngine,
    base: &LiabilityNetwork,
    volatility: f64,
    scenario_seed: u64,
) -> Result<ScenarioOutcome> {
    let external_assets = shocked_assets(base.external_assets(), volatility, scenario_seed);
    let shocked = ClearingEngine::new(external_assets.clone(), base.liabilities().clone())?
        .with_options(engine.options().clone());
    let solution = shocked.solve(shocked.options());

    Ok(ScenarioOutcome {
        defaulted: solution.defaulted_nodes(shocked.network()),
        shortfall: solution.total_shortfall(shocked.network()),
        converged: solution.is_converged(),
        external_assets,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn fragile_chain() -> ClearingEngine {
        ClearingEngine::from_rows(
            &[9.5, 1.0, 0.0],
            &[&[0.0, 10.0, 0.0], &[0.0, 0.0, 10.0], &[0.0, 0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn zero_volatility_reproduces_base_clearing() {
        let engine = fragile_chain();
        let config = ShockConfig::default().with_scenarios(8).with_volatility(0.0);
        let summary = run_stress(&engine, &config).unwrap();

        let expected = engine.solve(engine.options());
        for outcome in &summary.outcomes {
            assert_eq!(&outcome.external_assets, engine.network().external_assets());
            assert_eq!(outcome.defaulted, expected.defaulted_nodes(engine.network()));
        }
        assert_relative_eq!(
            summary.default_frequency,
            DVector::from_vec(vec![1.0, 0.0, 0.0])
        );
        assert_relative_eq!(summary.mean_shortfall, 0.5);
        assert_eq!(summary.worst_default_count, 1);
        assert_eq!(summary.unconverged, 0);
    }

    #[test]
    fn runs_are_reproducible_for_a_seed() {
        let engine = fragile_chain();
        let config = ShockConfig::default().with_scenarios(32).with_seed(99);
        let first = run_stress(&engine, &config).unwrap();
        let second = run_stress(&engine, &config).unwrap();
        assert_eq!(first.default_frequency, second.default_frequency);
        assert_eq!(first.mean_shortfall, second.mean_shortfall);
    }

    #[test]
    fn shocks_keep_assets_non_negative() {
        let base = DVector::from_vec(vec![1.0, 5.0, 0.0]);
        let config = ShockConfig::default().with_scenarios(64);
        for seed in scenario_seeds(&config) {
            let shocked = shocked_assets(&base, 1.5, seed);
            assert!(shocked.iter().all(|asset| *asset >= 0.0));
            assert_eq!(shocked[2], 0.0);
        }
    }

    #[test]
    fn adjacent_seeds_do_not_share_scenarios() {
        let first = scenario_seeds(&ShockConfig::default().with_scenarios(32).with_seed(99));
        let second = scenario_seeds(&ShockConfig::default().with_scenarios(32).with_seed(100));
        assert!(first.iter().all(|seed| !second.contains(seed)));

        let engine = fragile_chain();
        let base = engine.network().external_assets();
        assert_ne!(
            shocked_assets(base, 0.2, first[1]),
            shocked_assets(base, 0.2, second[0])
        );
    }

    #[test]
    fn rejects_invalid_config() {
        let engine = fragile_chain();
        let empty = ShockConfig::default().with_scenarios(0);
        assert!(matches!(
            run_stress(&engine, &empty),
            Err(ClearingError::InvalidConfig {
                parameter: "scenarios",
                ..
            })
        ));
        let negative = ShockConfig::default().with_volatility(-0.1);
        assert!(matches!(
            run_stress(&engine, &negative),
            Err(ClearingError::InvalidConfig {
                parameter: "volatility",
                ..
            })
        ));
    }
}
