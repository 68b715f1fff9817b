use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{MovieCatalog, RatingStore, UserId};
use factorization::{evaluate, EarlyStopping, EvaluationMetrics, FactorModel, Trainer, TrainerConfig, TrainingReport};
use recommender::{Recommendation, Recommender};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// movie-recs - Movie recommendations with matrix factorization
#[derive(Parser)]
#[command(name = "movie-recs")]
#[command(about = "Train a matrix factorization model on movie ratings and recommend movies", long_about = None)]
struct Cli {
    /// Directory holding the ratings, movies and model files
    #[arg(short, long, default_value = "Data", global = true)]
    data_dir: PathBuf,

    /// Training ratings (default: <data-dir>/recommendation-ratings-train.csv)
    #[arg(long, global = true)]
    train_file: Option<PathBuf>,

    /// Test ratings (default: <data-dir>/recommendation-ratings-test.csv)
    #[arg(long, global = true)]
    test_file: Option<PathBuf>,

    /// Movie catalog (default: <data-dir>/recommendation-movies.csv)
    #[arg(long, global = true)]
    movies_file: Option<PathBuf>,

    /// Saved model (default: <data-dir>/MovieRecommenderModel.json)
    #[arg(long, global = true)]
    model_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model, evaluate it on the test split and save it
    Train {
        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Evaluate a saved model on the test split
    Evaluate,

    /// Recommend movies for a user from a saved model
    Recommend {
        /// User ID to recommend for (asked for interactively if omitted)
        #[arg(long)]
        user_id: Option<UserId>,

        /// Number of recommendations to print
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Train, evaluate, save, then recommend in one go
    Run {
        /// User ID to recommend for (asked for interactively if omitted)
        #[arg(long)]
        user_id: Option<UserId>,

        /// Number of recommendations to print
        #[arg(long, default_value = "5")]
        top: usize,

        #[command(flatten)]
        training: TrainingArgs,
    },
}

/// Hyperparameter overrides. Precedence: flag > --config file > defaults.
#[derive(Args, Debug, Default)]
struct TrainingArgs {
    /// JSON file with trainer settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Latent factor count
    #[arg(long)]
    rank: Option<usize>,

    /// Training epochs
    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f32>,

    /// L2 regularization weight
    #[arg(long)]
    regularization: Option<f32>,

    /// Seed for initialization and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Train without global/user/item bias terms
    #[arg(long)]
    no_biases: bool,

    /// Stop once test RMSE hasn't improved for this many epochs
    #[arg(long)]
    patience: Option<usize>,
}

impl TrainingArgs {
    fn to_config(&self) -> Result<TrainerConfig> {
        let mut config = match &self.config {
            Some(path) => TrainerConfig::from_json_file(path)
                .with_context(|| format!("Failed to read trainer config {}", path.display()))?,
            None => TrainerConfig::default(),
        };

        if let Some(rank) = self.rank {
            config.rank = rank;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(regularization) = self.regularization {
            config.regularization = regularization;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.no_biases {
            config.use_biases = false;
        }
        if let Some(patience) = self.patience {
            config.early_stopping = Some(EarlyStopping::new(patience));
        }

        config.validate()?;
        Ok(config)
    }
}

/// Resolved file locations
struct DataPaths {
    train: PathBuf,
    test: PathBuf,
    movies: PathBuf,
    model: PathBuf,
}

impl DataPaths {
    fn from_cli(cli: &Cli) -> Self {
        let in_dir = |file: &Option<PathBuf>, default: &str| {
            file.clone().unwrap_or_else(|| cli.data_dir.join(default))
        };
        Self {
            train: in_dir(&cli.train_file, "recommendation-ratings-train.csv"),
            test: in_dir(&cli.test_file, "recommendation-ratings-test.csv"),
            movies: in_dir(&cli.movies_file, "recommendation-movies.csv"),
            model: in_dir(&cli.model_file, "MovieRecommenderModel.json"),
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = DataPaths::from_cli(&cli);

    match cli.command {
        Commands::Train { training } => handle_train(&paths, &training)?,
        Commands::Evaluate => handle_evaluate(&paths)?,
        Commands::Recommend { user_id, top } => handle_recommend(&paths, user_id, top)?,
        Commands::Run {
            user_id,
            top,
            training,
        } => handle_run(&paths, user_id, top, &training)?,
    }

    Ok(())
}

/// Handle the 'train' command
fn handle_train(paths: &DataPaths, training: &TrainingArgs) -> Result<()> {
    let config = training.to_config()?;
    let store = load_store(paths)?;
    let model = train_and_evaluate(&store, config)?;
    save(&model, &paths.model)
}

/// Handle the 'evaluate' command
fn handle_evaluate(paths: &DataPaths) -> Result<()> {
    let model = load_model(&paths.model)?;
    let test = RatingStore::load_split(&paths.test)
        .with_context(|| format!("Failed to load test ratings from {}", paths.test.display()))?;

    let metrics = evaluate(&model, &test).context("Evaluation failed")?;
    print_metrics(&metrics);
    Ok(())
}

/// Handle the 'recommend' command
fn handle_recommend(paths: &DataPaths, user_id: Option<UserId>, top: usize) -> Result<()> {
    let user_id = match user_id {
        Some(id) => id,
        None => prompt_user_id()?,
    };
    let model = load_model(&paths.model)?;
    recommend(paths, Arc::new(model), user_id, top)
}

/// Handle the 'run' command
fn handle_run(
    paths: &DataPaths,
    user_id: Option<UserId>,
    top: usize,
    training: &TrainingArgs,
) -> Result<()> {
    let user_id = match user_id {
        Some(id) => id,
        None => prompt_user_id()?,
    };
    let config = training.to_config()?;
    let store = load_store(paths)?;
    let model = train_and_evaluate(&store, config)?;
    save(&model, &paths.model)?;
    recommend(paths, Arc::new(model), user_id, top)
}

fn load_store(paths: &DataPaths) -> Result<RatingStore> {
    let start = Instant::now();
    let store = RatingStore::load(&paths.train, &paths.test).with_context(|| {
        format!(
            "Failed to load ratings from {} and {}",
            paths.train.display(),
            paths.test.display()
        )
    })?;
    println!(
        "{} Loaded {} training and {} test ratings in {:?}",
        "✓".green(),
        store.train.len(),
        store.test.len(),
        start.elapsed()
    );
    Ok(store)
}

fn load_model(path: &Path) -> Result<FactorModel> {
    FactorModel::load(path).with_context(|| format!("Failed to load model from {}", path.display()))
}

fn save(model: &FactorModel, path: &Path) -> Result<()> {
    println!("{}", "=============== Saving the model ===============".bold().blue());
    model
        .save(path)
        .with_context(|| format!("Failed to save model to {}", path.display()))?;
    println!("{} Model saved to {}", "✓".green(), path.display());
    Ok(())
}

fn train_and_evaluate(store: &RatingStore, config: TrainerConfig) -> Result<FactorModel> {
    println!("{}", "=============== Training the model ===============".bold().blue());
    let start = Instant::now();
    let trainer = Trainer::new(config);
    let (model, report) = if trainer.config().early_stopping.is_some() {
        trainer.fit_with_validation(&store.train, &store.test)
    } else {
        trainer.fit(&store.train)
    }
    .context("Training failed")?;
    info!("Training took {:?}", start.elapsed());
    print_training_report(&report);

    println!("{}", "=============== Evaluating the model ===============".bold().blue());
    let metrics = evaluate(&model, &store.test).context("Evaluation failed")?;
    print_metrics(&metrics);
    if let Some(note) = held_out_note(trainer.config()) {
        println!("{}{}", "• ".yellow(), note.yellow());
    }
    Ok(model)
}

/// With early stopping the test split also picks the epoch, so it is no
/// longer held out.
fn held_out_note(config: &TrainerConfig) -> Option<&'static str> {
    config.early_stopping.map(|_| {
        "Note: the test split also chose the early-stopping epoch; these metrics are optimistic"
    })
}

fn recommend(paths: &DataPaths, model: Arc<FactorModel>, user_id: UserId, top: usize) -> Result<()> {
    let catalog = MovieCatalog::load(&paths.movies)
        .with_context(|| format!("Failed to load movies from {}", paths.movies.display()))?;
    let recommender = Recommender::new(model, Arc::new(catalog));

    println!("Calculating the top {} movies for user {}", top, user_id);
    let recommendations = recommender.recommend(user_id, top)?;
    print_recommendations(user_id, &recommendations);
    Ok(())
}

/// Ask for a user id on stdin
fn prompt_user_id() -> Result<UserId> {
    print!("Type a user id and I'll find the movies they are most likely to enjoy: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    parse_user_id(&line)
}

fn parse_user_id(input: &str) -> Result<UserId> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("No user id given"));
    }
    trimmed
        .parse()
        .with_context(|| format!("'{}' is not a valid user id", trimmed))
}

fn print_training_report(report: &TrainingReport) {
    print!("{}Epochs run: {}\n", "• ".cyan(), report.epochs_run);
    if let Some(loss) = report.final_loss() {
        print!("{}Final training MSE: {:.4}\n", "• ".cyan(), loss);
    }
    if let Some(best) = report.best_epoch {
        print!("{}Best validation epoch: {}\n", "• ".cyan(), best);
    }
    if report.stopped_early {
        print!("{}Stopped early\n", "• ".yellow());
    }
}

fn print_metrics(metrics: &EvaluationMetrics) {
    print!("{}Root Mean Squared Error: {:.4}\n", "• ".green(), metrics.rmse);
    print!("{}Mean Absolute Error: {:.4}\n", "• ".green(), metrics.mae);
    match metrics.r_squared {
        Some(r2) => print!("{}RSquared: {:.4}\n", "• ".green(), r2),
        None => print!("{}RSquared: undefined (all test labels are identical)\n", "• ".yellow()),
    }
    print!("{}Scored {} ratings", "• ".green(), metrics.scored);
    if metrics.skipped > 0 {
        print!(", skipped {} with unknown ids", metrics.skipped);
    }
    println!();
}

/// Helper function to format and print recommendations
fn print_recommendations(user_id: UserId, recommendations: &[Recommendation]) {
    println!(
        "{}",
        format!("=============== Top {} recommended movies for user {} ===============", recommendations.len(), user_id)
            .bold()
            .blue()
    );
    for (idx, rec) in recommendations.iter().enumerate() {
        let title = rec.title.as_deref().unwrap_or("<unknown title>");
        println!(
            "{}. Movie Score: {:.3}\tMovie Name: {} ({})",
            (idx + 1).to_string().green(),
            rec.score,
            title,
            rec.movie_id
        );
    }
}
