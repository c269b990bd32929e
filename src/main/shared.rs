use std::fs;

use colored::Colorize;

use valtype::json::parse_json;
use valtype::{parse_type, Heap, RuntimeError, TypeRef, Value};

use crate::cli::EngineArgs;

pub(super) fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Cannot open file '{}': {}", path, e))
}

pub(super) fn parse_annotation(annotation: &str) -> Result<TypeRef, String> {
    parse_type(annotation).map_err(|e| format!("{} in '{}'", e, annotation))
}

/// Target type and input value of an engine command, loaded into `heap`.
pub(super) fn load_engine_input(heap: &mut Heap, args: &EngineArgs) -> Result<(TypeRef, Value), String> {
    let target = parse_annotation(&args.annotation)?;
    let text = match (&args.json, &args.input) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_file(path)?,
        (None, None) => return Err("no input given; use --json or --input".to_string()),
    };
    let value = parse_json(heap, &text).map_err(|e| e.to_string())?;
    if args.readonly {
        heap.freeze(&value).map_err(|e| e.to_string())?;
    }
    Ok((target, value))
}

pub(super) fn print_runtime_error(err: &RuntimeError) {
    eprintln!(
        "{}",
        format!("error[{}] {}: {}", err.code(), err.message_key(), err.message()).red()
    );
}

pub(super) fn print_value(heap: &Heap, value: &Value) {
    println!("{}", heap.repr(value));
    let readonly = if heap.is_readonly(value) { " (readonly)" } else { "" };
    println!(
        "{}",
        format!("  : {}{}", heap.type_of(value), readonly).dimmed()
    );
}
