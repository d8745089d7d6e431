use anyhow::Result;
use clap::Parser;
use receval::{
    embeddings::PrecomputedEmbeddings,
    eval::{EvalDataset, Explanation, RecommendationRow, Recommender, ScoredItem},
    Config,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recommend")]
#[command(about = "Print top-K item recommendations for the given users")]
struct Args {
    /// User indices to recommend for
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    users: Vec<usize>,

    /// Recommend for every user in the dataset
    #[arg(long)]
    all: bool,

    /// Explain why this item index is recommended to each given user
    #[arg(long, value_name = "ITEM", conflicts_with = "all")]
    explain: Option<usize>,

    /// Similar users/items to list per explanation
    #[arg(long, default_value_t = 5)]
    similar: usize,

    /// Number of recommendations per user (overrides eval.top_k)
    #[arg(short, long)]
    k: Option<usize>,

    /// Dataset JSON (overrides data.dataset)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Keep items the user has already seen
    #[arg(long)]
    include_seen: bool,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Write JSON to this path instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

enum Request {
    Users(Vec<usize>),
    All,
    Explain {
        users: Vec<usize>,
        item: usize,
        n: usize,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum Output {
    Users(BTreeMap<usize, Vec<ScoredItem>>),
    All(Vec<RecommendationRow>),
    Explain(Vec<Explanation>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;
    config.log_builder().init();

    let top_k = config.top_k(args.k);
    let dataset_path = config.resolve_dataset(args.dataset.as_deref())?;
    let dataset = EvalDataset::load(&dataset_path)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", dataset_path.display(), e))?;

    let embeddings_file = config.data.embeddings.clone();
    let embedding_dim = config.data.embedding_dim.unwrap_or(0);
    let include_seen = args.include_seen;
    let request = match (args.all, args.explain) {
        (true, _) => Request::All,
        (false, Some(item)) => Request::Explain {
            users: args.users.clone(),
            item,
            n: args.similar,
        },
        (false, None) => Request::Users(args.users.clone()),
    };

    let output = tokio::task::spawn_blocking(move || -> receval::Result<Output> {
        let table = dataset.resolve_embeddings(
            embeddings_file.as_deref().map(|p| (p, embedding_dim)),
        )?;
        let provider = PrecomputedEmbeddings::new(table);
        let mut recommender = Recommender::from_provider(&provider, &dataset.metadata())?;
        let history = dataset.seen_items().unwrap_or_default();
        if !include_seen && !history.is_empty() {
            recommender = recommender.excluding_seen(history.clone());
        }

        Ok(match request {
            Request::Users(users) => Output::Users(recommender.recommend_batch(&users, top_k)?),
            Request::All => Output::All(recommender.recommend_all(top_k)?),
            Request::Explain { users, item, n } => Output::Explain(
                users
                    .iter()
                    .map(|&user| recommender.explain(user, item, n, &history))
                    .collect::<receval::Result<Vec<_>>>()?,
            ),
        })
    })
    .await??;

    if let Some(path) = &args.output {
        std::fs::write(path, serde_json::to_string_pretty(&output)?)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        println!("Written to {}", path.display());
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_output(&output);
    Ok(())
}

fn print_output(output: &Output) {
    match output {
        Output::Users(per_user) => {
            for (user, recs) in per_user {
                println!("User {}:", user);
                for (rank, rec) in recs.iter().enumerate() {
                    println!(
                        "  {:>3}. item {:<8} score {:.4}",
                        rank + 1,
                        rec.item,
                        rec.score
                    );
                }
            }
        }
        Output::All(rows) => {
            println!("user,item,rank,score");
            for row in rows {
                println!("{},{},{},{:.6}", row.user, row.item, row.rank, row.score);
            }
        }
        Output::Explain(explanations) => {
            for exp in explanations {
                println!(
                    "User {} / item {} (score {:.4})",
                    exp.user, exp.item, exp.score
                );
                println!("  similar users who bought it: {:?}", exp.similar_users);
                println!("  similar items the user bought: {:?}", exp.similar_items);
            }
        }
    }
}
