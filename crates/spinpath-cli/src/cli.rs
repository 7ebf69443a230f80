use clap::{Args, Parser, Subcommand, ValueEnum};
use spinpath::engine::solver::optimizer::OptimizerKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "spinpath - atomistic spin dynamics and transition-path relaxation on Heisenberg lattices.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relax a single spin configuration with LLG dynamics.
    Relax(RelaxArgs),
    /// Relax a chain of images toward the minimum-energy path between two
    /// uniform states.
    Path(PathArgs),
}

/// Lattice and Hamiltonian options shared by both commands.
#[derive(Args, Debug)]
pub struct LatticeArgs {
    /// Cells along the three lattice directions.
    #[arg(long, num_args = 3, value_names = ["NA", "NB", "NC"], default_values_t = [10, 10, 1])]
    pub n_cells: Vec<i32>,

    /// Exchange coupling between nearest neighbors.
    #[arg(short = 'J', long, value_name = "FLOAT", default_value_t = 1.0)]
    pub exchange: f64,

    /// Uniaxial anisotropy strength along the z axis.
    #[arg(short = 'K', long, value_name = "FLOAT", default_value_t = 0.0)]
    pub anisotropy: f64,

    /// External field vector.
    #[arg(short = 'B', long, num_args = 3, value_names = ["BX", "BY", "BZ"], default_values_t = [0.0, 0.0, 0.0], allow_negative_numbers = true)]
    pub field: Vec<f64>,

    /// Periodic boundary conditions along the three lattice directions.
    #[arg(long)]
    pub periodic: bool,
}

/// Arguments for the `relax` subcommand.
#[derive(Args, Debug)]
pub struct RelaxArgs {
    #[command(flatten)]
    pub lattice: LatticeArgs,

    /// Step strategy.
    #[arg(short, long, value_enum, default_value_t = StepStrategy::SemiImplicit)]
    pub solver: StepStrategy,

    /// Gilbert damping parameter.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.3)]
    pub damping: f64,

    /// Temperature of the stochastic thermal field.
    #[arg(short = 'T', long, value_name = "FLOAT", default_value_t = 0.0)]
    pub temperature: f64,

    /// Integration time step.
    #[arg(long, value_name = "FLOAT", default_value_t = 1e-2)]
    pub time_step: f64,

    /// Iteration budget.
    #[arg(short = 'n', long, value_name = "INT", default_value_t = 10_000)]
    pub max_iterations: usize,
}

/// Arguments for the `path` subcommand.
#[derive(Args, Debug)]
pub struct PathArgs {
    #[command(flatten)]
    pub lattice: LatticeArgs,

    /// Number of images along the path, endpoints included.
    #[arg(short = 'i', long, value_name = "INT", default_value_t = 7)]
    pub images: usize,

    /// Step strategy for the projected-force updates.
    #[arg(short, long, value_enum, default_value_t = StepStrategy::VelocityProjection)]
    pub solver: StepStrategy,

    /// Spring constant coupling neighboring images.
    #[arg(short = 'k', long, value_name = "FLOAT", default_value_t = 1.0)]
    pub spring_constant: f64,

    /// Promote the highest-energy interior image to a climbing image.
    #[arg(short = 'c', long)]
    pub climbing: bool,

    /// Step size for the projected force.
    #[arg(long, value_name = "FLOAT", default_value_t = 1e-2)]
    pub time_step: f64,

    /// Iteration budget.
    #[arg(short = 'n', long, value_name = "INT", default_value_t = 20_000)]
    pub max_iterations: usize,

    /// Write the interpolated energy profile to this file as tab-separated
    /// `rx energy` rows.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub profile: Option<PathBuf>,
}

/// Step strategies exposed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStrategy {
    /// Semi-implicit midpoint rotation.
    SemiImplicit,
    /// Heun predictor-corrector.
    Heun,
    /// Direct gradient descent.
    Descent,
    /// Velocity-projection quench.
    VelocityProjection,
}

impl From<StepStrategy> for OptimizerKind {
    fn from(strategy: StepStrategy) -> Self {
        match strategy {
            StepStrategy::SemiImplicit => OptimizerKind::SemiImplicit,
            StepStrategy::Heun => OptimizerKind::Heun,
            StepStrategy::Descent => OptimizerKind::Descent,
            StepStrategy::VelocityProjection => OptimizerKind::VelocityProjection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relax_defaults_parse() {
        let cli = Cli::try_parse_from(["spinpath", "relax"]).unwrap();
        match cli.command {
            Commands::Relax(args) => {
                assert_eq!(args.lattice.n_cells, vec![10, 10, 1]);
                assert_eq!(args.solver, StepStrategy::SemiImplicit);
            }
            _ => panic!("expected relax command"),
        }
    }

    #[test]
    fn path_arguments_parse() {
        let cli = Cli::try_parse_from([
            "spinpath", "path", "--images", "9", "--climbing", "-K", "0.5", "--n-cells", "4", "4",
            "1",
        ])
        .unwrap();
        match cli.command {
            Commands::Path(args) => {
                assert_eq!(args.images, 9);
                assert!(args.climbing);
                assert_eq!(args.lattice.anisotropy, 0.5);
                assert_eq!(args.lattice.n_cells, vec![4, 4, 1]);
            }
            _ => panic!("expected path command"),
        }
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["spinpath", "-q", "-v", "relax"]).is_err());
    }
}
