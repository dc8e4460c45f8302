use crate::output::{print_heading, print_json, print_table};
use crate::sources::Sources;
use anyhow::Context;
use clap::Subcommand;
use std::path::PathBuf;
use syllabus_core::knowledge::KnowledgeBase;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum KnowledgeSubcommand {
    /// Show levels, verbs, and the assessment catalog
    Show,

    /// Check the knowledge base for malformed or missing entries
    Validate,

    /// Write the knowledge base as YAML, ready for editing
    Export {
        /// Destination file
        #[arg(long, short = 'o', value_name = "FILE")]
        output: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(sources: &Sources, subcmd: KnowledgeSubcommand, json: bool) -> anyhow::Result<()> {
    let kb = sources.load_knowledge()?;
    match subcmd {
        KnowledgeSubcommand::Show => show(&kb, json),
        KnowledgeSubcommand::Validate => validate(&kb, json),
        KnowledgeSubcommand::Export { output } => {
            kb.save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            if json {
                print_json(&serde_json::json!({ "written": output }))?;
            } else {
                println!("Knowledge base written to {}", output.display());
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(kb: &KnowledgeBase, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(kb);
    }

    print_heading("Cognitive Levels");
    let rows = kb
        .levels
        .iter()
        .map(|v| {
            vec![
                v.level.to_string(),
                v.level.question_type().to_string(),
                v.level.difficulty().to_string(),
                v.verbs.join(", "),
            ]
        })
        .collect();
    print_table(&["LEVEL", "QUESTION TYPE", "DIFFICULTY", "VERBS"], rows);

    print_heading("Assessment Catalog");
    let rows = kb
        .assessment_types
        .iter()
        .map(|a| {
            let levels: Vec<String> = a.bloom_levels.iter().map(|l| l.to_string()).collect();
            vec![
                a.name.clone(),
                format!("{}%", a.typical_weight),
                format!("{}-{}%", a.weight_range.min, a.weight_range.max),
                a.timing.to_string(),
                levels.join(", "),
            ]
        })
        .collect();
    print_table(&["TYPE", "TYPICAL", "RANGE", "TIMING", "LEVELS"], rows);

    print_heading("Course Types");
    for p in &kb.course_types {
        println!("{:<12} {}", p.course_type.to_string(), p.base_assessments.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(kb: &KnowledgeBase, json: bool) -> anyhow::Result<()> {
    let result = kb.validate();
    if json {
        let value = serde_json::json!({
            "valid": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        print_json(&value)?;
    } else if result.is_ok() {
        println!("Knowledge base is valid.");
    }
    result.context("knowledge base validation failed")?;
    Ok(())
}
