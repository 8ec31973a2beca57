use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use genpart_core::EngineConfig;
use genpart_doc::{parse_schema, Answers, DocumentState, GenPartsSpec, QuestionRecord};
use genpart_render::{anchor, AssembleInput, DocumentAssembler, SnippetLibrary};
use genpart_sync::{layout_to_schema, schema_to_layout_with};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn file_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("FILE")
        .value_parser(clap::value_parser!(PathBuf))
        .help(help)
}

fn cli() -> Command {
    Command::new("genpart")
        .version(genpart_core::VERSION)
        .about("GenPart template synchronization and assembly")
        .subcommand_required(true)
        .arg(file_arg("config", "Engine configuration (TOML)").global(true))
        .subcommand(
            Command::new("sync")
                .about("Rebuild a layout from a question schema")
                .arg(file_arg("schema", "Question schema (JSON array)").required(true))
                .arg(file_arg("tree", "Previous editor state (JSON)"))
                .arg(file_arg("spec", "Previous placeholder spec (JSON)")),
        )
        .subcommand(
            Command::new("reverse")
                .about("Rebuild a question schema from an edited layout")
                .arg(file_arg("tree", "Editor state (JSON)").required(true))
                .arg(file_arg("schema", "Base question schema (JSON array)")),
        )
        .subcommand(
            Command::new("assemble")
                .about("Assemble generated text into an editor state")
                .arg(file_arg("text", "Generated text").required(true))
                .arg(file_arg("schema", "Question schema (JSON array)").required(true))
                .arg(file_arg("answers", "Answers (JSON object)"))
                .arg(file_arg("snippets", "Cached table layouts (JSON object of editor states)")),
        )
        .subcommand(
            Command::new("verify")
                .about("Check that generated text carries every required marker")
                .arg(file_arg("text", "Generated text").required(true))
                .arg(file_arg("schema", "Question schema (JSON array)").required(true)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();
    let output = run(&matches).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(matches: &ArgMatches) -> Result<Value> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path).await?,
        None => EngineConfig::default(),
    };

    match matches.subcommand() {
        Some(("sync", sub)) => {
            let schema = read_schema(sub, "schema").await?;
            let tree = match read_json(sub, "tree").await? {
                Some(raw) => Some(DocumentState::from_value(raw)?),
                None => None,
            };
            let spec = read_json(sub, "spec")
                .await?
                .map(|raw| GenPartsSpec::from_value(&raw));
            let outcome =
                schema_to_layout_with(&schema, tree.as_ref(), spec.as_ref(), &config.sync_options());
            info!(
                placeholders = outcome.spec.len(),
                created = outcome.report.created_placeholder_ids.len(),
                "Layout synchronized"
            );
            Ok(json!({
                "tree": outcome.tree.to_value(),
                "spec": outcome.spec.to_value(),
                "report": outcome.report,
            }))
        }
        Some(("reverse", sub)) => {
            let raw = read_json(sub, "tree").await?.context("--tree is required")?;
            let tree = DocumentState::from_value(raw)?;
            let base = read_schema(sub, "schema").await?;
            let outcome = layout_to_schema(&tree, &base);
            info!(questions = outcome.schema.len(), "Schema synchronized");
            Ok(json!({
                "schema": outcome.schema,
                "tree": outcome.tree.to_value(),
                "spec": outcome.spec.to_value(),
                "report": outcome.report,
            }))
        }
        Some(("assemble", sub)) => {
            let text = read_text(sub, "text").await?;
            let questions = read_schema(sub, "schema").await?;
            let answers: Answers = read_json(sub, "answers")
                .await?
                .and_then(|raw| raw.as_object().cloned())
                .unwrap_or_default();
            let mut snippets = SnippetLibrary::new();
            if let Some(raw) = read_json(sub, "snippets").await? {
                let Value::Object(states) = raw else {
                    anyhow::bail!("--snippets must be a JSON object");
                };
                let rejected = snippets.insert_states(states);
                if !rejected.is_empty() {
                    warn!(?rejected, "Some snippets could not be decoded");
                }
            }
            let anchors = anchor::collect(&questions);
            let checked = anchor::post_process(&text, &anchors);
            let assembly = DocumentAssembler::new().assemble(
                &AssembleInput::new(&checked.text, &anchors, &questions, &answers)
                    .with_missing(&checked.status.missing)
                    .with_snippets(&snippets),
            )?;
            Ok(json!({
                "state": assembly.state.to_value(),
                "used": assembly.used,
                "autoInserted": assembly.auto_inserted,
            }))
        }
        Some(("verify", sub)) => {
            let text = read_text(sub, "text").await?;
            let questions = read_schema(sub, "schema").await?;
            let anchors = anchor::collect(&questions);
            let status = anchor::verify(&text, &anchors);
            Ok(json!({ "ok": status.ok, "missing": status.missing }))
        }
        Some((other, _)) => anyhow::bail!("unknown command: {other}"),
        None => anyhow::bail!("no command given"),
    }
}

async fn read_text(matches: &ArgMatches, name: &str) -> Result<String> {
    let path = matches
        .get_one::<PathBuf>(name)
        .with_context(|| format!("--{name} is required"))?;
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_json(matches: &ArgMatches, name: &str) -> Result<Option<Value>> {
    let Some(path) = matches.get_one::<PathBuf>(name) else {
        return Ok(None);
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(Some(value))
}

async fn read_schema(matches: &ArgMatches, name: &str) -> Result<Vec<QuestionRecord>> {
    Ok(read_json(matches, name)
        .await?
        .map(|raw| parse_schema(&raw))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn matches_for(args: &[&str]) -> ArgMatches {
        cli().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(cli().try_get_matches_from(["genpart"]).is_err());
        assert!(cli().try_get_matches_from(["genpart", "sync"]).is_err());
        cli().debug_assert();
    }

    #[tokio::test]
    async fn sync_then_reverse() {
        let schema = write_temp(
            r#"[{"id":"h1","type":"heading","title":"History"},{"id":"q1","type":"notes","title":"Notes"}]"#,
        );
        let schema_path = schema.path().to_str().unwrap();
        let forward = run(&matches_for(&["genpart", "sync", "--schema", schema_path]))
            .await
            .unwrap();
        assert_eq!(forward["report"]["createdPlaceholderIds"], json!(["gen-h1"]));
        assert_eq!(forward["spec"]["specVersion"], json!(2));

        let tree = write_temp(&forward["tree"].to_string());
        let reverse = run(&matches_for(&[
            "genpart",
            "reverse",
            "--tree",
            tree.path().to_str().unwrap(),
            "--schema",
            schema_path,
        ]))
        .await
        .unwrap();
        let ids: Vec<&str> = reverse["schema"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|q| q["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["h1", "q1"]);
    }

    #[tokio::test]
    async fn verify_reports_missing_markers() {
        let schema = write_temp(
            r#"[{"id":"t","type":"table","title":"Scores","table":{"insertAsAnchor":true,"anchorId":"T1"}}]"#,
        );
        let text = write_temp("No marker here.");
        let out = run(&matches_for(&[
            "genpart",
            "verify",
            "--text",
            text.path().to_str().unwrap(),
            "--schema",
            schema.path().to_str().unwrap(),
        ]))
        .await
        .unwrap();
        assert_eq!(out, json!({ "ok": false, "missing": ["T1"] }));
    }

    #[tokio::test]
    async fn assemble_plain_text() {
        let schema = write_temp("[]");
        let text = write_temp("# Title\n\nBody text.");
        let out = run(&matches_for(&[
            "genpart",
            "assemble",
            "--text",
            text.path().to_str().unwrap(),
            "--schema",
            schema.path().to_str().unwrap(),
        ]))
        .await
        .unwrap();
        let children = out["state"]["root"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["type"], json!("heading"));
        assert_eq!(out["autoInserted"], json!([]));
    }

    #[tokio::test]
    async fn config_file_sets_heading_level() {
        let config = write_temp("heading_level = 3\n");
        let schema = write_temp(r#"[{"id":"h1","type":"heading","title":"History"}]"#);
        let out = run(&matches_for(&[
            "genpart",
            "--config",
            config.path().to_str().unwrap(),
            "sync",
            "--schema",
            schema.path().to_str().unwrap(),
        ]))
        .await
        .unwrap();
        assert_eq!(out["tree"]["root"]["children"][0]["tag"], json!("h3"));
    }

    #[tokio::test]
    async fn assemble_hydrates_snippets() {
        let schema = write_temp(
            r#"[{"id":"t","type":"table","title":"Scores","astSnippetId":"layout","table":{"insertAsAnchor":true,"anchorId":"T1"}}]"#,
        );
        let text = write_temp("Intro.\n\n[[CR:TBL|id=T1]]");
        let answers = write_temp(r#"{"t":{"total":42}}"#);
        let snippets = write_temp(
            r#"{"layout":{"root":{"type":"root","children":[{"type":"paragraph","children":[{"type":"text","text":"Total: "},{"type":"slot","slotId":"total"}]}]}}}"#,
        );
        let out = run(&matches_for(&[
            "genpart",
            "assemble",
            "--text",
            text.path().to_str().unwrap(),
            "--schema",
            schema.path().to_str().unwrap(),
            "--answers",
            answers.path().to_str().unwrap(),
            "--snippets",
            snippets.path().to_str().unwrap(),
        ]))
        .await
        .unwrap();
        let state = DocumentState::from_value(out["state"].clone()).unwrap();
        let texts: Vec<String> = state.children().iter().map(|n| n.plain_text()).collect();
        assert_eq!(texts, vec!["Intro.", "Total: 42"]);
        assert_eq!(out["used"], json!(["T1"]));
    }
}
