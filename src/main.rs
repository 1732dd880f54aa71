// ==========================================
// Class Generation Engine - command line entry
// ==========================================
// Reads cohort/availability CSVs, generates a proposal for a term,
// optionally approves and publishes it to a JSON schedule directory.
// ==========================================

use anyhow::{anyhow, bail, Context};
use class_generation::collaborator::csv_source::{CsvAvailabilitySource, CsvCohortSource};
use class_generation::collaborator::json_export::JsonScheduleExporter;
use class_generation::config::ConfigManager;
use class_generation::db::{get_default_db_path, init_schema, open_sqlite_connection};
use class_generation::{ClassGenerationApi, Term, TermStatus};
use std::sync::{Arc, Mutex};

const USAGE: &str = "usage: class-generation --term <id> --cohort <students.csv> --levels <levels.csv> \
--competencies <competencies.csv> --availability <availability.csv> \
[--db <path>] [--out <dir>] [--actor <id>] [--approve] [--publish]";

#[derive(Debug, Default)]
struct CliArgs {
    db: Option<String>,
    term: Option<String>,
    cohort: Option<String>,
    levels: Option<String>,
    competencies: Option<String>,
    availability: Option<String>,
    out: Option<String>,
    actor: Option<String>,
    approve: bool,
    publish: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--approve" => parsed.approve = true,
            "--publish" => parsed.publish = true,
            "--help" | "-h" => bail!(USAGE),
            _ => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("{} needs a value\n{}", flag, USAGE))?;
                let slot = match flag.as_str() {
                    "--db" => &mut parsed.db,
                    "--term" => &mut parsed.term,
                    "--cohort" => &mut parsed.cohort,
                    "--levels" => &mut parsed.levels,
                    "--competencies" => &mut parsed.competencies,
                    "--availability" => &mut parsed.availability,
                    "--out" => &mut parsed.out,
                    "--actor" => &mut parsed.actor,
                    other => bail!("unknown argument {}\n{}", other, USAGE),
                };
                *slot = Some(value);
            }
        }
    }
    Ok(parsed)
}

fn required(value: Option<String>, name: &str) -> anyhow::Result<String> {
    value.ok_or_else(|| anyhow!("missing --{}\n{}", name, USAGE))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    class_generation::logging::init();

    let args = parse_args(std::env::args().skip(1))?;
    let term_id = required(args.term, "term")?;
    let actor = args.actor.unwrap_or_else(|| "cli".to_string());
    let db_path = args.db.unwrap_or_else(get_default_db_path);

    tracing::info!(
        app = class_generation::APP_NAME,
        version = class_generation::VERSION,
        db = %db_path,
        "starting"
    );

    let conn = open_sqlite_connection(&db_path).with_context(|| format!("opening {}", db_path))?;
    init_schema(&conn).context("initializing schema")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = Arc::new(
        ConfigManager::from_connection(conn.clone()).map_err(|e| anyhow!("config: {}", e))?,
    );
    let cohort = Arc::new(CsvCohortSource::new(
        required(args.cohort, "cohort")?,
        required(args.levels, "levels")?,
    ));
    let availability = Arc::new(CsvAvailabilitySource::new(
        required(args.competencies, "competencies")?,
        required(args.availability, "availability")?,
    ));
    let exporter = Arc::new(JsonScheduleExporter::new(
        args.out.unwrap_or_else(|| "./schedules".to_string()),
    ));

    let api = ClassGenerationApi::with_config_manager(conn, config, cohort, availability, exporter);

    if api.get_term(&term_id).is_err() {
        api.upsert_term(&Term::new(&term_id, &term_id, TermStatus::Planning))?;
        tracing::info!(term_id = %term_id, "term registered as PLANNING");
    }

    let readiness = api.get_generation_readiness(&term_id).await?;
    println!("{}", serde_json::to_string_pretty(&readiness)?);
    if !readiness.can_generate {
        bail!("term {} is not ready: {}", term_id, readiness.blocking_issues.join("; "));
    }

    let proposal = api.generate_proposal(&term_id, None, &actor).await?;
    println!(
        "proposal {} (run {}): {} classes, {} unresolved, score {:.2}, {} conflicts",
        proposal.proposal_id,
        proposal.generation_run,
        proposal.assignments.len(),
        proposal.unresolved_count(),
        proposal.optimization_score,
        proposal.conflict_count
    );

    if args.approve || args.publish {
        api.approve_proposal(&proposal.proposal_id, &actor, None).await?;
        println!("approved by {}", actor);
    }
    if args.publish {
        let published = api.publish_proposal(&proposal.proposal_id, &actor).await?;
        println!("published {} classes", published.assignments.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(args(&["--term", "T1", "--publish", "--db", "x.db"])).unwrap();
        assert_eq!(parsed.term.as_deref(), Some("T1"));
        assert_eq!(parsed.db.as_deref(), Some("x.db"));
        assert!(parsed.publish);
        assert!(!parsed.approve);
    }

    #[test]
    fn test_parse_args_rejects_unknown_and_dangling() {
        assert!(parse_args(args(&["--bogus", "1"])).is_err());
        assert!(parse_args(args(&["--term"])).is_err());
    }
}
