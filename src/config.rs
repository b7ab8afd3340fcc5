// Tunables for the analysis pipeline. A single seed drives every randomized
// step (sampling, bagging, centroid initialization, plot re-fit) so that two
// runs over the same input produce identical output.

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_CLUSTERS: usize = 5;
pub const SAMPLE_LIMIT: usize = 50_000;
pub const SILHOUETTE_SAMPLE_LIMIT: usize = 10_000;
pub const TOP_FEATURES: usize = 7;
pub const ENSEMBLE_TREES: usize = 50;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Master seed threaded into every randomized sub-step.
    pub seed: u64,
    /// Records beyond this count are sampled down before analysis.
    pub sample_limit: usize,
    /// Trees in the bagged importance ensemble.
    pub ensemble_trees: usize,
    /// Number of features retained by importance-driven reduction.
    pub top_features: usize,
    /// Point cap for the silhouette computation.
    pub silhouette_sample_limit: usize,
    /// Whether to attempt the decision-boundary render at all.
    pub render_plot: bool,
    /// Grid cells per axis when rasterizing decision regions.
    pub grid_resolution: usize,
    /// Plot canvas size in pixels.
    pub plot_width: u32,
    pub plot_height: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            seed: DEFAULT_SEED,
            sample_limit: SAMPLE_LIMIT,
            ensemble_trees: ENSEMBLE_TREES,
            top_features: TOP_FEATURES,
            silhouette_sample_limit: SILHOUETTE_SAMPLE_LIMIT,
            render_plot: true,
            grid_resolution: 1000,
            plot_width: 1000,
            plot_height: 600,
        }
    }
}

impl AnalysisConfig {
    /// Derive a sub-seed for an independent randomized step, so each step
    /// gets its own stream without sharing mutable RNG state.
    pub fn step_seed(&self, offset: u64) -> u64 {
        self.seed.wrapping_add(offset)
    }
}
