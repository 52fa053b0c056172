//! Plans a batch of seeded random instances and prints one CSV row each.
//!
//! Usage: `plan-sweep [COUNT] [SEED] [--global]`

use rendezvous_validation::{sweep, GeneratorConfig, InstanceGenerator, SweepRow};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut positional = Vec::new();
    let mut config = GeneratorConfig::default();
    for arg in std::env::args().skip(1) {
        if arg == "--global" {
            config.global_capacity = true;
        } else {
            positional.push(arg);
        }
    }

    let parse = |idx: usize, default: u64| -> Result<u64, String> {
        positional
            .get(idx)
            .map(|raw| raw.parse().map_err(|_| format!("not a number: {raw}")))
            .unwrap_or(Ok(default))
    };
    let (count, seed) = match (parse(0, 20), parse(1, 42)) {
        (Ok(count), Ok(seed)) => (count, seed),
        (Err(err), _) | (_, Err(err)) => {
            eprintln!("{err}\nusage: plan-sweep [COUNT] [SEED] [--global]");
            return ExitCode::FAILURE;
        }
    };

    println!("{}", SweepRow::HEADER);
    let mut unsound = 0;
    for row in sweep(InstanceGenerator::with_config(seed, config), count as usize) {
        if let Ok((_, violations)) = &row.result {
            for violation in violations {
                eprintln!("instance {}: {violation}", row.instance);
            }
            if !violations.is_empty() {
                unsound += 1;
            }
        }
        println!("{}", row.to_csv());
    }

    if unsound > 0 {
        eprintln!("{unsound} plan(s) failed validation");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
