//! Picks the most promising next step of a multi-persona conversation about a word problem
use anyhow::{bail, Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use env_logger::fmt::Formatter;
use log::{info, Record};
use persona_mcts::mcts::{calculate_best_child, BestChildPolicy, SearchSettings};
use persona_mcts::oracle::{ClientSettings, OpenAiClient, Oracle, Pricing, Provider, RetryPolicy};
use persona_mcts::problem::Problem;
use persona_mcts::reasoning::Node;
use persona_mcts::report::RunSummary;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding `question` and `ground_truth`
    #[arg(default_value = "qa.json")]
    qa_file: PathBuf,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[arg(long, value_enum, default_value_t = Provider::OpenAi)]
    provider: Provider,
    /// Defaults to the provider's flagship chat model
    #[arg(short, long)]
    model: Option<String>,
    /// Defaults to the provider's API key environment variable
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(short, long, default_value_t = 4)]
    iterations: usize,
    #[arg(short('c'), long, default_value_t = 2.0_f64.sqrt())]
    exploration_constant: f64,
    /// Random steps per rollout before it is scored as a loss
    #[arg(long, default_value_t = 8)]
    max_rollout_depth: usize,
    /// Let rollouts run until the oracle gives a final answer
    #[arg(long)]
    unbounded_rollouts: bool,
    #[arg(long, value_enum, default_value_t = BestChildPolicy::MeanReward)]
    policy: BestChildPolicy,
    #[arg(long)]
    seed: Option<u64>,
    /// Attempts per oracle call
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 2.0)]
    retry_delay: f64,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,
    /// Price per million prompt tokens, for the cost estimate
    #[arg(long, requires = "completion_price")]
    prompt_price: Option<f64>,
    /// Price per million completion tokens, for the cost estimate
    #[arg(long, requires = "prompt_price")]
    completion_price: Option<f64>,
}

impl Args {
    fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            iterations: self.iterations,
            exploration_constant: self.exploration_constant,
            max_rollout_depth: (!self.unbounded_rollouts).then_some(self.max_rollout_depth),
            policy: self.policy,
            seed: self.seed,
        }
    }

    fn client_settings(&self) -> Result<ClientSettings> {
        let defaults = ClientSettings::for_provider(self.provider);
        let api_key = self.api_key.clone().or(defaults.api_key);
        if api_key.is_none() {
            bail!(
                "no API key given; pass --api-key or set {}",
                self.provider.api_key_var()
            );
        }
        Ok(ClientSettings {
            provider: self.provider,
            model: self.model.clone().unwrap_or(defaults.model),
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            api_key,
            timeout: Duration::try_from_secs_f64(self.timeout).context("invalid --timeout")?,
        })
    }

    fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy {
            max_retries: self.retries.max(1),
            retry_delay: Duration::try_from_secs_f64(self.retry_delay)
                .context("invalid --retry-delay")?,
        })
    }

    fn pricing(&self) -> Option<Pricing> {
        Some(Pricing {
            prompt_per_million: self.prompt_price?,
            completion_per_million: self.completion_price?,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .format(|buf: &mut Formatter, record: &Record| {
            let thread_id = thread::current().id();
            let timestamp = buf.timestamp_millis();
            writeln!(
                buf,
                "[{}] [Thread: {:?}] [{}] - {}",
                timestamp,
                thread_id,
                record.level(),
                record.args()
            )
        })
        .filter_level(args.verbose.log_level_filter())
        .init();

    if args.iterations == 0 {
        bail!("--iterations must be at least 1");
    }

    let problem = Problem::load(&args.qa_file)
        .with_context(|| format!("loading problem from {}", args.qa_file.display()))?;
    let client_settings = args.client_settings()?;
    info!(
        "Searching with {} ({}) for {} iterations",
        client_settings.model,
        client_settings.base_url,
        args.iterations
    );
    let oracle = Rc::new(Oracle::new(
        OpenAiClient::new(client_settings),
        args.retry_policy()?,
    ));

    let started_at = chrono::Local::now();
    let root = Node::root(problem.question, oracle.clone());
    let report = calculate_best_child(&root, problem.ground_truth, &args.search_settings());

    RunSummary {
        report: &report,
        usage: oracle.token_usage(),
        pricing: args.pricing(),
        started_at,
        finished_at: chrono::Local::now(),
    }
    .log();

    if report.best.is_none() {
        bail!(
            "no next step chosen after {} completed iterations",
            report.completed_iterations
        );
    }
    Ok(())
}
