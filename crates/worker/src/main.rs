use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use opinion_cluster::ClusterSet;
use opinion_embeddings::{cosine_similarity, EmbeddingMode, EmbeddingModel, EmbeddingProvider};
use opinion_store::{connect, CorrelationStore, MessageSource};
use opinion_worker::{PersistenceSynchronizer, StreamConsumer, WorkerConfig};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "opinion-worker")]
#[command(about = "Clusters submitted opinion words and mirrors one label per group", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Store root directory (overrides OPINION_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Store namespace (overrides OPINION_NAMESPACE)
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Word vector file (overrides OPINION_VECTORS)
    #[arg(long, global = true)]
    vectors: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EmbedMode {
    Table,
    Stub,
}

impl From<EmbedMode> for EmbeddingMode {
    fn from(mode: EmbedMode) -> Self {
        match mode {
            EmbedMode::Table => Self::Table,
            EmbedMode::Stub => Self::Stub,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Consume new messages forever, clustering each word
    Run(RunArgs),

    /// Append words to the message log
    Push(PushArgs),

    /// Print all messages and correlations
    Inspect(InspectArgs),

    /// Print pairwise similarities between words
    Similarity(SimilarityArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Similarity threshold in (0, 1) (overrides OPINION_THRESHOLD)
    #[arg(long)]
    threshold: Option<f32>,

    /// Keep existing correlations instead of clearing them at startup
    #[arg(long)]
    keep_correlations: bool,
}

#[derive(Args)]
struct PushArgs {
    /// Words to submit, in order
    #[arg(required = true)]
    words: Vec<String>,
}

#[derive(Args)]
struct InspectArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SimilarityArgs {
    /// Words to compare pairwise
    #[arg(required = true, num_args = 2..)]
    words: Vec<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = WorkerConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config.store.data_dir = dir;
    }
    if let Some(namespace) = cli.namespace {
        config.store.namespace = namespace;
    }
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode.into();
    }
    if let Some(vectors) = cli.vectors {
        config.embedding.vectors = Some(vectors);
    }

    match cli.command {
        Commands::Run(args) => run_worker(args, config).await,
        Commands::Push(args) => run_push(args, config).await,
        Commands::Inspect(args) => run_inspect(args, config).await,
        Commands::Similarity(args) => run_similarity(args, config).await,
    }
}

async fn load_embedder(config: &WorkerConfig) -> Result<EmbeddingModel> {
    let started = Instant::now();
    log::info!("Loading embedding model ({})...", config.embedding.mode.as_str());
    let model = EmbeddingModel::load(
        config.embedding.mode,
        config.embedding.vectors.as_deref(),
        config.embedding.dimension,
    )
    .await
    .context("Failed to initialize embedding provider")?;
    log::info!(
        "Model loaded ({}, dimension {}, {} ms)",
        model.mode().as_str(),
        model.dimension(),
        started.elapsed().as_millis()
    );
    Ok(model)
}

async fn run_worker(args: RunArgs, mut config: WorkerConfig) -> Result<()> {
    if let Some(threshold) = args.threshold {
        config.threshold = Some(threshold);
    }
    if args.keep_correlations {
        config.reset_on_start = false;
    }

    let embedder = load_embedder(&config).await?;
    let cluster_config = config
        .cluster_config(embedder.dimension())
        .context("Invalid clustering configuration")?;
    log::info!(
        "Clustering with threshold {} (representative: {}, oov: {})",
        cluster_config.threshold(),
        cluster_config.representative().as_str(),
        cluster_config.oov().as_str()
    );

    let stores = connect(
        &config.store.data_dir,
        &config.store.namespace,
        config.store.retry,
    )
    .await
    .context("Failed to connect to store")?;

    let sync = PersistenceSynchronizer::new(stores.correlations.clone());
    if config.reset_on_start {
        sync.reset().await.context("Failed to reset correlations")?;
    }

    let mut consumer = StreamConsumer::new(
        stores.messages.clone(),
        Arc::new(embedder),
        ClusterSet::new(cluster_config),
        sync,
        config.idle_interval,
    );
    consumer.run().await.context("Worker loop failed")?;
    Ok(())
}

async fn run_push(args: PushArgs, config: WorkerConfig) -> Result<()> {
    let stores = connect(
        &config.store.data_dir,
        &config.store.namespace,
        config.store.retry,
    )
    .await
    .context("Failed to connect to store")?;

    for word in &args.words {
        let record = stores
            .messages
            .append(word)
            .await
            .with_context(|| format!("Failed to append '{word}'"))?;
        log::info!("Added message {}: {word}", record.id);
    }
    Ok(())
}

async fn run_inspect(args: InspectArgs, config: WorkerConfig) -> Result<()> {
    let stores = connect(
        &config.store.data_dir,
        &config.store.namespace,
        config.store.retry,
    )
    .await
    .context("Failed to connect to store")?;

    let messages = stores.messages.fetch_after(None).await?;
    let correlations = stores.correlations.entries().await?;

    if args.json {
        let payload = json!({
            "messages": messages,
            "correlations": correlations,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("[Messages]");
    for message in &messages {
        println!("{}:{}", message.id, message.word.as_deref().unwrap_or(""));
    }
    println!();
    println!("[Correlations]");
    for correlation in &correlations {
        println!("{},{}", correlation.word, correlation.weight);
    }
    Ok(())
}

async fn run_similarity(args: SimilarityArgs, config: WorkerConfig) -> Result<()> {
    let embedder = load_embedder(&config).await?;

    let mut embeddings = Vec::with_capacity(args.words.len());
    for word in &args.words {
        embeddings.push(embedder.embed(word).await?);
    }

    let mut pairs = Vec::new();
    for i in 0..args.words.len() {
        for j in (i + 1)..args.words.len() {
            let (a, b) = (&embeddings[i], &embeddings[j]);
            let score = (a.valid && b.valid).then(|| cosine_similarity(&a.vector, &b.vector));
            pairs.push((i, j, score));
        }
    }

    if args.json {
        let words: Vec<_> = args
            .words
            .iter()
            .zip(&embeddings)
            .map(|(word, emb)| json!({ "word": word, "has_vector": emb.valid }))
            .collect();
        let pairs: Vec<_> = pairs
            .iter()
            .map(|(i, j, score)| {
                json!({
                    "a": args.words[*i],
                    "b": args.words[*j],
                    "similarity": score,
                    "above_threshold": config.threshold.zip(*score).map(|(t, s)| s > t),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "words": words, "pairs": pairs }))?
        );
        return Ok(());
    }

    for (word, emb) in args.words.iter().zip(&embeddings) {
        let status = if emb.valid { "Has Vector" } else { "No Vector" };
        println!("{word}: {status}");
    }
    println!("{}", "-".repeat(30));
    for (i, j, score) in pairs {
        match score {
            Some(score) => println!("{} - {}: {score:.4}", args.words[i], args.words[j]),
            None => println!(
                "{} - {}: Cannot calculate (missing vector)",
                args.words[i], args.words[j]
            ),
        }
    }
    Ok(())
}
