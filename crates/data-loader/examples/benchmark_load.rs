use anyhow::{Context, Result};
use data_loader::RatingStore;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let data_dir = Path::new("Data");

    println!("Loading rating splits...\n");

    let start = Instant::now();
    let store = RatingStore::load(
        &data_dir.join("recommendation-ratings-train.csv"),
        &data_dir.join("recommendation-ratings-test.csv"),
    )
    .context("Failed to load rating splits")?;
    let elapsed = start.elapsed();

    let (train, test) = store.stats();
    let total = train.ratings + test.ratings;

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Train: {} ratings, {} users, {} movies", train.ratings, train.users, train.movies);
    println!("Test:  {} ratings, {} users, {} movies", test.ratings, test.users, test.movies);
    println!("\nPerformance: {:.0} ratings/second", total as f64 / elapsed.as_secs_f64());
    Ok(())
}
