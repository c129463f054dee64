//! ANVIL CLI
//!
//! Loads crafting rules, builds the initial state and goals, and prints the
//! plan the HTN planner finds.

#![warn(missing_docs)]
#![warn(clippy::all)]

use anvil_core::{RuleSet, State, DEFAULT_AGENT};
use anvil_plan::{
    Compiler, Domain, MethodOrder, Plan, Planner, PlannerConfig, PlanningFailure, Validator,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use console::style;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit status when the search finds no plan
const EXIT_NO_PLAN: u8 = 2;

/// Node budget per case for `anvil scenarios` unless `--node-limit` is given
const SCENARIO_NODE_LIMIT: u64 = 100_000;

#[derive(Parser)]
#[command(name = "anvil")]
#[command(about = "ANVIL - HTN planner for data-driven crafting", long_about = None)]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan for the goal in a rule file
    Plan {
        /// Path to rule file
        #[arg(short, long, default_value = "data/crafting.json")]
        rules: PathBuf,
        /// Time budget
        #[arg(short, long)]
        time: u64,
        /// Replace the initial holdings (repeatable, `name=count`)
        #[arg(short, long, value_parser = parse_count)]
        initial: Vec<(String, u64)>,
        /// Start with nothing, ignoring the rule file's `Initial`
        #[arg(long, conflicts_with = "initial")]
        empty_initial: bool,
        /// Replace the goal (repeatable, `name=count`)
        #[arg(short, long, value_parser = parse_count)]
        goal: Vec<(String, u64)>,
        /// Agent name
        #[arg(long, default_value = DEFAULT_AGENT)]
        agent: String,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Validate a rule file and list warnings
    Check {
        /// Path to rule file
        #[arg(short, long, default_value = "data/crafting.json")]
        rules: PathBuf,
    },
    /// List compiled methods and operators
    Inspect {
        /// Path to rule file
        #[arg(short, long, default_value = "data/crafting.json")]
        rules: PathBuf,
        /// Recipe method ordering policy
        #[arg(long, value_enum, default_value_t = OrderArg::TimeDescending)]
        order: OrderArg,
    },
    /// Run the reference crafting scenarios (100000 nodes per case unless
    /// `--node-limit` is given)
    Scenarios {
        /// Path to rule file
        #[arg(short, long, default_value = "data/crafting.json")]
        rules: PathBuf,
        #[command(flatten)]
        search: SearchArgs,
    },
}

/// Search tuning shared by the planning commands
#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Method expansions allowed on one branch
    #[arg(long, default_value_t = anvil_plan::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Recipe method ordering policy
    #[arg(long, value_enum, default_value_t = OrderArg::TimeDescending)]
    order: OrderArg,
    /// Disable static method fast-fail
    #[arg(long)]
    no_fast_fail: bool,
    /// Give up after visiting this many nodes
    #[arg(long)]
    node_limit: Option<u64>,
    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl SearchArgs {
    fn config(&self) -> PlannerConfig {
        let mut config = PlannerConfig::new()
            .with_max_depth(self.max_depth)
            .with_method_order(self.order.into())
            .with_fast_fail(!self.no_fast_fail);
        if let Some(limit) = self.node_limit {
            config = config.with_node_limit(limit);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        config
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OrderArg {
    /// Most time-expensive recipe first
    TimeDescending,
    /// Rule file order
    Declaration,
}

impl From<OrderArg> for MethodOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::TimeDescending => Self::TimeDescending,
            OrderArg::Declaration => Self::Declaration,
        }
    }
}

/// Parse `name=count`
fn parse_count(input: &str) -> Result<(String, u64), String> {
    let (name, count) = input
        .split_once('=')
        .ok_or_else(|| format!("expected name=count, got '{input}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing resource name in '{input}'"));
    }
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad count in '{input}': {e}"))?;
    Ok((name.to_string(), count))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "anvil_plan=info,anvil_cli=info",
        2 => "anvil_plan=debug,anvil_cli=debug",
        _ => "anvil_plan=trace,anvil_cli=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(path: &Path) -> Result<RuleSet> {
    RuleSet::load(path).wrap_err_with(|| format!("loading rules from {}", path.display()))
}

fn compile(rules: &RuleSet, order: MethodOrder) -> Result<Domain> {
    let output = Compiler::new()
        .with_method_order(order)
        .compile(rules)
        .wrap_err("compiling rules")?;
    for warning in &output.warnings {
        tracing::warn!(%warning, "rule warning");
    }
    Ok(output.domain)
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Plan {
            rules,
            time,
            initial,
            empty_initial,
            goal,
            agent,
            json,
            search,
        } => {
            let mut rules = load(&rules)?;
            if empty_initial || !initial.is_empty() {
                rules = rules.with_initial(initial.into_iter().collect());
            }
            if !goal.is_empty() {
                rules = rules.with_goal(goal.into_iter().collect());
            }

            let config = search.config();
            let domain = compile(&rules, config.method_order)?;
            let state = rules.initial_state(&agent, time);
            let result = Planner::new(&domain)
                .with_config(config)
                .plan(&state, &rules.goal_tasks(&agent));

            if json {
                print_json(&result)?;
            } else {
                print_result(&rules.goal, &state, &result);
            }
            Ok(ExitCode::from(exit_status(&result)))
        }
        Commands::Check { rules } => {
            let rules = load(&rules)?;
            if let Err(errors) = Validator::new().validate(&rules) {
                for error in &errors {
                    println!("{} {}", style("error:").red().bold(), error);
                }
                return Ok(ExitCode::FAILURE);
            }
            let output = Compiler::new().compile(&rules).wrap_err("compiling rules")?;
            for warning in &output.warnings {
                println!("{} {}", style("warning:").yellow().bold(), warning);
            }
            println!(
                "{} {} recipes, {} items, {} tools",
                style("ok:").green().bold(),
                rules.recipes.len(),
                rules.items.len(),
                rules.tools.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Inspect { rules, order } => {
            let rules = load(&rules)?;
            let domain = compile(&rules, order.into())?;
            print!("{}", domain.describe());
            print!("{}", describe_recipes(&rules, &domain));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scenarios { rules, search } => {
            let rules = load(&rules)?;
            let found = run_scenarios(&rules, &search)?;
            println!("{found}/{} scenarios planned", SCENARIOS.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_status(result: &Result<Plan, PlanningFailure>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => EXIT_NO_PLAN,
    }
}

/// Recipe methods per resource, in the order the planner tries them
fn describe_recipes(rules: &RuleSet, domain: &Domain) -> String {
    let mut out = format!("RECIPES ({}):\n", domain.method_order());
    for resource in rules.resources() {
        let recipes = domain.recipes_producing(resource);
        if !recipes.is_empty() {
            out.push_str(&format!("  {}: {}\n", resource, recipes.join(", ")));
        }
    }
    out
}

fn json_report(result: &Result<Plan, PlanningFailure>) -> serde_json::Value {
    match result {
        Ok(plan) => serde_json::json!({ "found": true, "plan": plan }),
        Err(failure) => serde_json::json!({
            "found": false,
            "reason": failure.reason,
            "stats": failure.stats,
        }),
    }
}

fn print_json(result: &Result<Plan, PlanningFailure>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&json_report(result))?);
    Ok(())
}

fn print_result(
    goal: &IndexMap<String, u64>,
    start: &State,
    result: &Result<Plan, PlanningFailure>,
) {
    let goal: Vec<String> = goal.iter().map(|(k, v)| format!("{k}={v}")).collect();
    println!(
        "goal {} for {} within {} time",
        goal.join(", "),
        start.agent(),
        start.time_remaining()
    );

    match result {
        Ok(plan) if plan.is_empty() => {
            println!("{} goal already satisfied", style("plan:").green().bold());
        }
        Ok(plan) => {
            println!(
                "{} {} steps, {} time used, {} remaining",
                style("plan:").green().bold(),
                plan.len(),
                plan.total_time(),
                plan.final_state.time_remaining()
            );
            for (index, step) in plan.steps.iter().enumerate() {
                println!("  {:>3}. {:<45} t={}", index + 1, step.to_string(), step.time_remaining);
            }
            let holdings: Vec<String> = plan
                .final_state
                .holdings()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!("  final: {}", holdings.join(", "));
            let built: Vec<&str> = plan.final_state.built_tools().collect();
            if !built.is_empty() {
                println!("  built: {}", built.join(", "));
            }
        }
        Err(failure) => {
            println!("{} {}", style("no plan:").red().bold(), failure.reason);
        }
    }
    let stats = match result {
        Ok(plan) => &plan.stats,
        Err(failure) => &failure.stats,
    };
    println!(
        "  searched {} nodes, {} expansions, {} backtracks, {} pruned",
        stats.nodes, stats.expansions, stats.backtracks, stats.pruned
    );
}

/// Reference case: initial holdings, goal, time budget
struct Scenario {
    initial: &'static [(&'static str, u64)],
    goal: &'static [(&'static str, u64)],
    time: u64,
}

const SCENARIOS: [Scenario; 6] = [
    Scenario { initial: &[("plank", 1)], goal: &[("plank", 1)], time: 0 },
    Scenario { initial: &[], goal: &[("plank", 1)], time: 300 },
    Scenario { initial: &[("plank", 3), ("stick", 2)], goal: &[("wooden_pickaxe", 1)], time: 10 },
    Scenario { initial: &[], goal: &[("iron_pickaxe", 1)], time: 100 },
    Scenario { initial: &[], goal: &[("cart", 1), ("rail", 10)], time: 175 },
    Scenario { initial: &[], goal: &[("cart", 1), ("rail", 20)], time: 250 },
];

fn to_map(pairs: &[(&str, u64)]) -> IndexMap<String, u64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Run every reference case and return how many found a plan
fn run_scenarios(base: &RuleSet, search: &SearchArgs) -> Result<usize> {
    let mut config = search.config();
    if config.node_limit.is_none() {
        config = config.with_node_limit(SCENARIO_NODE_LIMIT);
    }
    let mut found = 0;
    for (index, scenario) in SCENARIOS.iter().enumerate() {
        let rules = base
            .clone()
            .with_initial(to_map(scenario.initial))
            .with_goal(to_map(scenario.goal));
        let domain = compile(&rules, config.method_order)?;
        let state = rules.initial_state(DEFAULT_AGENT, scenario.time);

        println!("{}", style(format!("case {}", index + 1)).bold());
        let result = Planner::new(&domain)
            .with_config(config.clone())
            .plan(&state, &rules.goal_tasks(DEFAULT_AGENT));
        print_result(&rules.goal, &state, &result);
        if result.is_ok() {
            found += 1;
        }
        println!();
    }
    Ok(found)
}
