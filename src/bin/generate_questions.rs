use askboard::config::Config;
use askboard::types::question::{NewQuestion, QuestionFilter};
use askboard::{init_tracing, setup_store};
use clap::Parser;

const FILLER: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

/// Fills the board with generated questions authored by the first superuser
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// How many questions to create
    #[clap(long, default_value = "100")]
    count: usize,
    #[clap(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> Result<(), handle_errors::Error> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let config = Config::with_env(args.config)?;
    init_tracing(&config);

    let store = setup_store(&config).await?;
    let Some(author) = store.first_superuser().await? else {
        tracing::error!("no superuser to author the questions");
        return Ok(());
    };

    let existing = store.count_questions(&QuestionFilter::default()).await?;
    for n in 1..=args.count {
        let question = NewQuestion {
            title: format!("Question #{}", existing + n as i64),
            content: FILLER.to_string(),
            tags: vec!["generated".to_string()],
        };
        store.add_question(question, author).await?;
    }

    tracing::info!(count = args.count, "questions generated");
    println!("Questions created: {}", args.count);
    Ok(())
}
