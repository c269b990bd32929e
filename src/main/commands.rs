use std::process;

use colored::Colorize;
use tracing::debug;

use valtype::{CastMode, ErrorCategory, ErrorKind, Heap};

use crate::cli::EngineArgs;
use crate::shared::{load_engine_input, parse_annotation, print_runtime_error, print_value};

#[derive(Clone, Copy, Debug)]
pub(super) enum Engine {
    Cast,
    Convert,
    Stamp,
}

pub(super) fn cmd_errors(category: Option<&str>) {
    let filter = match category {
        Some(name) => match ErrorCategory::from_name(name) {
            Some(c) => Some(c),
            None => {
                let known: Vec<&str> = ErrorCategory::ALL.iter().map(|c| c.name()).collect();
                eprintln!(
                    "{}",
                    format!("Unknown category '{}'; expected one of: {}", name, known.join(", ")).red()
                );
                process::exit(1);
            }
        },
        None => None,
    };

    for kind in ErrorKind::ALL {
        if filter.map_or(false, |c| kind.category() != c) {
            continue;
        }
        println!(
            "{}  {:<48} {}",
            kind.code().yellow(),
            kind.message_key(),
            kind.category().name().dimmed()
        );
    }
}

pub(super) fn cmd_type(annotation: &str) {
    let ty = match parse_annotation(annotation) {
        Ok(ty) => ty,
        Err(e) => {
            eprintln!("{}", e.red());
            process::exit(1);
        }
    };
    println!("{}", ty.to_string().bold());
    let flag = |b: bool| if b { "yes".green() } else { "no".normal() };
    println!("  kind:       {:?}", ty.kind());
    println!("  immutable:  {}", flag(ty.is_immutable()));
    println!("  nil:        {}", flag(ty.permits_nil()));
    println!("  anydata:    {}", flag(ty.is_anydata()));
    println!("  json:       {}", flag(ty.is_json()));
}

pub(super) fn cmd_engine(engine: Engine, args: &EngineArgs) {
    let mut heap = Heap::new();
    let (target, value) = match load_engine_input(&mut heap, args) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e.red());
            process::exit(1);
        }
    };
    debug!(?engine, target = %target, "running engine");

    let result = match engine {
        Engine::Cast => heap.cast(&value, &target, CastMode::Checked),
        Engine::Convert => heap.convert(&value, &target),
        Engine::Stamp => heap.stamp(&value, &target),
    };
    match result {
        Ok(out) => print_value(&heap, &out),
        Err(err) => {
            print_runtime_error(&err);
            process::exit(1);
        }
    }
}
