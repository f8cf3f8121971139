use clap::{Arg, ArgAction};
use coursesel::ilp::oracle::GoodLpOracle;
use coursesel::ilp::BalanceConfig;
use coursesel::pipeline::{self, Config};
use coursesel::preferences::{RankLists, WeightingPolicy};
use coursesel::Error;
use log::{error, info};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = clap::command!()
        .about("Assigns members to groups according to their ranked preferences")
        .arg(
            Arg::new("INPUT")
                .help("The preferences CSV file (or the combined JSON file with --json)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("CAPACITIES")
                .help("The capacities CSV file")
                .index(2),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Read preferences and capacities from a single JSON file"),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .value_parser(["exponential", "descending-linear"])
                .default_value("exponential")
                .help("Weighting policy: minimize 2^rank costs or maximize descending linear scores"),
        )
        .arg(
            Arg::new("variable-length")
                .long("variable-length")
                .action(ArgAction::SetTrue)
                .help("Allow members to rank a different number of groups"),
        )
        .arg(
            Arg::new("min-occupancy")
                .long("min-occupancy")
                .value_parser(clap::value_parser!(usize))
                .default_value("0")
                .help("Minimum number of members for groups without an explicit minimum"),
        )
        .arg(
            Arg::new("no-quorum")
                .long("no-quorum")
                .action(ArgAction::SetTrue)
                .help("Do not enforce the groups' minimum numbers of members"),
        )
        .arg(
            Arg::new("balance-floor")
                .long("balance-floor")
                .value_parser(clap::value_parser!(usize))
                .help("Enforce at least this number of members of each tracked category per group"),
        )
        .arg(
            Arg::new("balance-category")
                .long("balance-category")
                .action(ArgAction::Append)
                .requires("balance-floor")
                .help("Demographic category to track for --balance-floor (default: Male and Female)"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .short('o')
                .default_value("output")
                .help("Directory to write the result files into"),
        )
        .arg(
            Arg::new("print")
                .long("print")
                .short('p')
                .action(ArgAction::SetTrue)
                .help("Print the assignment in a human readable format to stdout"),
        )
        .get_matches();

    let policy: WeightingPolicy = match args
        .get_one::<String>("policy")
        .map(|p| p.parse())
        .unwrap_or(Ok(WeightingPolicy::default()))
    {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::USAGE);
        }
    };
    let balance = args
        .get_one::<usize>("balance-floor")
        .map(|floor| BalanceConfig {
            categories: match args.get_many::<String>("balance-category") {
                Some(categories) => categories.cloned().collect(),
                None => vec![String::from("Male"), String::from("Female")],
            },
            floor: *floor,
        });
    let config = Config {
        policy,
        rank_lists: if args.get_flag("variable-length") {
            RankLists::Variable
        } else {
            RankLists::Uniform
        },
        default_min_occupancy: args.get_one::<usize>("min-occupancy").copied().unwrap_or(0),
        enforce_quorum: !args.get_flag("no-quorum"),
        balance,
        output_dir: args
            .get_one::<String>("output-dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output")),
    };

    // Read input
    let inpath = args.get_one::<String>("INPUT").map(String::as_str).unwrap_or("");
    let (preference_records, capacity_records) = if args.get_flag("json") {
        read_input(|| {
            let file = std::fs::File::open(inpath)?;
            coursesel::io::simple::read(file)
        })
    } else {
        let capacities_path = match args.get_one::<String>("CAPACITIES") {
            Some(p) => p.clone(),
            None => {
                error!("A capacities file is required, unless --json is given.");
                std::process::exit(exitcode::USAGE);
            }
        };
        read_input(|| {
            let preferences = coursesel::io::csv::read_preferences(std::fs::File::open(inpath)?)?;
            let capacities =
                coursesel::io::csv::read_capacities(std::fs::File::open(&capacities_path)?)?;
            Ok((preferences, capacities))
        })
    };
    info!(
        "Read {} preference records and {} capacity records",
        preference_records.len(),
        capacity_records.len()
    );

    // Solve
    let outcome = match pipeline::run(&config, preference_records, capacity_records, &GoodLpOracle)
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            std::process::exit(exit_code(&e));
        }
    };

    if args.get_flag("print") {
        print!(
            "{}",
            coursesel::io::format_assignment(
                &outcome.assignment,
                &outcome.levels,
                &outcome.groups,
                &outcome.members
            )
        );
    }
    print!(
        "\n{}",
        coursesel::io::format_distribution(&outcome.distribution)
    );

    // Write output
    if let Err(e) = pipeline::export(&config, &outcome) {
        error!("Could not write results: {}", e);
        std::process::exit(exitcode::CANTCREAT);
    }
}

/// Run the given input reading closure and exit the process with the matching exit code on errors
fn read_input<T, F: FnOnce() -> Result<T, Error>>(f: F) -> T {
    match f() {
        Ok(data) => data,
        Err(e) => {
            error!("Could not read input: {}", e);
            std::process::exit(match e {
                Error::Io(_) => exitcode::NOINPUT,
                _ => exitcode::DATAERR,
            });
        }
    }
}

fn exit_code(err: &Error) -> exitcode::ExitCode {
    match err {
        Error::MalformedInput(_) => exitcode::DATAERR,
        Error::InfeasibleProblem(_) => exitcode::UNAVAILABLE,
        Error::IntegrityViolation(_) | Error::Solver(_) => exitcode::SOFTWARE,
        Error::Io(_) => exitcode::IOERR,
    }
}
