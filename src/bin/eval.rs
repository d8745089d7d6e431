//! Evaluation CLI: rank items for every ground-truth user and report Recall@K, NDCG@K
//! (plus Revenue@K and Diversity@K when the dataset carries a catalog).

use clap::Parser;
use receval::{
    embeddings::PrecomputedEmbeddings,
    eval::{EvalDataset, Evaluator, MetricReport},
    Config,
};
use std::path::PathBuf;

/// Evaluate top-K recommendations against held-out ground truth.
#[derive(Parser, Debug)]
#[command(name = "eval")]
struct Args {
    /// Top-K cutoff (overrides eval.top_k).
    #[arg(short, long)]
    k: Option<usize>,

    /// Dataset JSON (overrides data.dataset).
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Exclude already seen items from ranking (overrides eval.exclude_seen).
    #[arg(long)]
    exclude_seen: bool,

    /// Write the report as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load()?;
    config.log_builder().init();

    let top_k = config.top_k(args.k);
    let exclude_seen = args.exclude_seen || config.eval.exclude_seen;
    let dataset_path = config.resolve_dataset(args.dataset.as_deref())?;

    let dataset = EvalDataset::load(&dataset_path)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", dataset_path.display(), e))?;

    println!(
        "Running evaluation on {} users (top_k = {})\n",
        dataset.ground_truth.len(),
        top_k
    );

    let embeddings_file = config.data.embeddings.clone();
    let embedding_dim = config.data.embedding_dim.unwrap_or(0);

    // The pass is one blocking computation; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || -> receval::Result<MetricReport> {
        let table = dataset.resolve_embeddings(
            embeddings_file.as_deref().map(|p| (p, embedding_dim)),
        )?;
        let provider = PrecomputedEmbeddings::new(table);
        let ground_truth = dataset.ground_truth();
        let catalog = dataset.catalog();
        let seen = dataset.seen_items().filter(|_| exclude_seen);

        let mut evaluator = Evaluator::new(top_k);
        if let Some(ref catalog) = catalog {
            evaluator = evaluator.with_catalog(catalog);
        }
        if let Some(ref seen) = seen {
            evaluator = evaluator.excluding_seen(seen);
        }
        evaluator.evaluate(&provider, &dataset.metadata(), &ground_truth)
    })
    .await??;

    print_report(&report);

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        println!("\nReport written to {}", path.display());
    }

    let recall_ok = config.eval.min_recall.map_or(true, |t| report.avg_recall >= t);
    let ndcg_ok = config.eval.min_ndcg.map_or(true, |t| report.avg_ndcg >= t);

    if recall_ok && ndcg_ok {
        Ok(())
    } else {
        println!(
            "\nMetrics below threshold (Recall@{} >= {:.2}, NDCG@{} >= {:.2}).",
            report.top_k,
            config.eval.min_recall.unwrap_or(0.0),
            report.top_k,
            config.eval.min_ndcg.unwrap_or(0.0)
        );
        std::process::exit(1);
    }
}

fn print_report(report: &MetricReport) {
    let k = report.top_k;
    println!("=== Evaluation Results ({} users) ===", report.num_users);
    println!("Recall@{}:    {:.4}", k, report.avg_recall);
    println!("NDCG@{}:      {:.4}", k, report.avg_ndcg);
    if let Some(avg) = report.avg_revenue {
        let total = report.total_revenue.unwrap_or(0.0);
        println!("Revenue@{}:   {:.2} avg, {:.2} total", k, avg, total);
    }
    if let Some(div) = report.avg_diversity {
        println!("Diversity@{}: {:.4}", k, div);
    }
}
