//! gooey-render demo binary
//!
//! Reads one render request per stdin line, renders a small demo page and
//! writes one outcome per stdout line. Failed requests produce an error
//! object (`error_code`, `message`, `status`) on the same line instead.

use anyhow::Result;
use gooey_gui::key;
use gooey_gui::logging::{init_logging, LogFormat};
use gooey_gui::render::protocol::{decode_jsonl, encode_jsonl};
use gooey_gui::{
    GuiConfig, Interrupt, PassResult, Props, Redirect, RenderRequest, RenderSession,
    Renderer, RunOptions, ScopeHost,
};
use serde_json::Value;
use std::env;
use std::io::{self, BufRead, Write};
use std::process;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut log_format = env::var("GOOEY_LOG_FORMAT")
        .map(|v| LogFormat::from_str(&v))
        .unwrap_or_default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--json-logs" => log_format = LogFormat::Json,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Error: Unknown argument '{}'", other);
                print_usage();
                process::exit(1);
            }
        }
    }

    init_logging(log_format);
    let renderer = Renderer::with_memory_store(GuiConfig::load());
    tracing::info!(prefix = %renderer.config().channel_prefix, "gooey-render ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = decode_jsonl::<RenderRequest>(&line)
            .and_then(|request| renderer.render(request, demo_page))
            .and_then(|outcome| encode_jsonl(&outcome));
        let encoded = match response {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "request failed");
                encode_jsonl(&e.to_json())?
            }
        };
        stdout.write_all(encoded.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

/// Demo page
///
/// Query parameters:
/// - `increment`: bump the counter, then redirect without the parameter
/// - `note`: store a note in the deferred-value cell
/// - `text`: text whose words are counted in the background
fn demo_page(s: &mut RenderSession) -> PassResult {
    let heading = s.styled(
        r#"
        & {
            font-weight: bold;
            margin-bottom: 1rem;
        }
        "#,
    );
    s.nest(heading, |s| {
        s.mount("h1", text_props("gooey-gui demo"));
    })?;
    s.respond_with("title", "gooey-gui demo")?;

    let mut count = s.state().get_as::<i64>("count")?.unwrap_or(0);
    if s.query_params().contains_key("increment") {
        count += 1;
        s.state_mut().set("count", count);
        let remaining: Vec<(String, Value)> = s
            .query_params()
            .iter()
            .filter(|(k, _)| k.as_str() != "increment")
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let target = Redirect::query_params(remaining.iter().map(|(k, v)| (k.as_str(), v)));
        return Err(Interrupt::Redirect(target));
    }
    s.mount("pre", text_props(&format!("count: {}", count)));

    let (note, set_note) = s.use_state_keyed("note", String::from("(no note yet)"))?;
    if let Some(wanted) = s.query_params().get("note").cloned() {
        if wanted != note {
            set_note.set(&wanted)?;
            return gooey_gui::rerun();
        }
    }
    s.mount("pre", text_props(&format!("note: {}", note)));

    let text = s
        .query_params()
        .get("text")
        .cloned()
        .unwrap_or_else(|| "the quick brown fox".to_string());
    let task_key = key::fingerprint_of("word-count", &text)?;
    let words: Option<usize> = s.run_in_thread(
        move || text.split_whitespace().count(),
        RunOptions::new().key(task_key).placeholder("Counting words..."),
    )?;
    if let Some(words) = words {
        s.mount("pre", text_props(&format!("words: {}", words)));
    }
    Ok(())
}

fn text_props(body: &str) -> Props {
    let mut props = Props::new();
    props.insert("body".to_string(), Value::String(body.to_string()));
    props
}

fn print_usage() {
    println!("gooey-render - render the demo page for JSON requests on stdin");
    println!();
    println!("Usage: gooey-render [--json-logs]");
    println!();
    println!("Each stdin line is a request: {{\"state\": {{...}}, \"query_params\": {{...}}}}");
    println!("Each stdout line is a page, a redirect, or an error object.");
    println!();
    println!("Environment:");
    println!("  GOOEY_LOG_FORMAT   json or pretty (default pretty)");
    println!("  RUST_LOG           log filter (default info)");
}
