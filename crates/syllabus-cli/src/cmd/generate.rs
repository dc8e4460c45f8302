use crate::output::{print_heading, print_json, print_table};
use crate::sources::Sources;
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use syllabus_core::alignment::display_question_ids;
use syllabus_core::config::{PipelineConfig, WarnLevel};
use syllabus_core::extract::KeywordExtractor;
use syllabus_core::input::{CourseRequest, DurationInput};
use syllabus_core::model::Syllabus;
use syllabus_core::pipeline::SyllabusPipeline;

#[derive(Args)]
pub struct GenerateArgs {
    /// Course title
    #[arg(long)]
    title: Option<String>,

    /// Free-text course description topics are extracted from
    #[arg(long)]
    description: Option<String>,

    /// Subject area, e.g. "Computer Science"
    #[arg(long)]
    scope: Option<String>,

    /// Total contact hours, e.g. "40" or "40 hours" or "12 weeks"
    #[arg(long)]
    duration: Option<String>,

    /// Read the request from a YAML or JSON file; flags override its fields
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Seed for template and weight selection (same seed, same syllabus)
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the full syllabus to FILE (.yaml/.yml for YAML, JSON otherwise)
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(sources: &Sources, args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    let cfg = sources.load_config()?;
    ensure_valid_config(&cfg)?;
    let kb = sources.load_knowledge()?;

    let request = build_request(&args)?;
    let seed = args.seed.unwrap_or_else(clock_seed);
    tracing::info!(seed, "generating syllabus");

    let pipeline = SyllabusPipeline::new(&kb, &cfg, KeywordExtractor::default());
    let syllabus = pipeline
        .run(&request, seed)
        .context("syllabus generation failed")?;

    if let Some(path) = &args.output {
        write_syllabus(path, &syllabus)?;
    }

    if json {
        print_json(&syllabus)?;
    } else {
        print_report(&syllabus, cfg.alignment.display_question_limit);
        if let Some(path) = &args.output {
            println!();
            println!("Syllabus written to {}", path.display());
        }
    }
    Ok(())
}

fn ensure_valid_config(cfg: &PipelineConfig) -> anyhow::Result<()> {
    let warnings = cfg.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }
    if cfg.has_errors() {
        anyhow::bail!("config has errors; run `syllabus config validate` for details");
    }
    Ok(())
}

fn build_request(args: &GenerateArgs) -> anyhow::Result<CourseRequest> {
    let mut request = match &args.input {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str::<CourseRequest>(&data)
                .with_context(|| format!("failed to parse request in {}", path.display()))?
        }
        None => CourseRequest {
            title: String::new(),
            description: String::new(),
            scope: String::new(),
            duration: None,
        },
    };

    if let Some(title) = &args.title {
        request.title = title.clone();
    }
    if let Some(description) = &args.description {
        request.description = description.clone();
    }
    if let Some(scope) = &args.scope {
        request.scope = scope.clone();
    }
    if let Some(duration) = &args.duration {
        request.duration = Some(match duration.trim().parse::<i64>() {
            Ok(hours) => DurationInput::Hours(hours),
            Err(_) => DurationInput::Text(duration.clone()),
        });
    }
    Ok(request)
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn write_syllabus(path: &Path, syllabus: &Syllabus) -> anyhow::Result<()> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let data = if is_yaml {
        serde_yaml::to_string(syllabus)?
    } else {
        serde_json::to_string_pretty(syllabus)?
    };
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Human-readable report
// ---------------------------------------------------------------------------

fn print_report(s: &Syllabus, question_limit: usize) {
    let meta = &s.metadata;
    println!("{}", meta.course_title);
    println!(
        "{} hours, {} course, generated {}",
        meta.duration, meta.course_type, meta.generated_date
    );

    print_heading("Modules");
    let rows = s
        .modules
        .iter()
        .map(|m| {
            vec![
                m.id.to_string(),
                m.title.clone(),
                m.hours.to_string(),
                m.subtopics.join(", "),
            ]
        })
        .collect();
    print_table(&["#", "TITLE", "HOURS", "SUBTOPICS"], rows);

    print_heading("Course Outcomes");
    for o in &s.course_outcomes {
        println!("{:<7} [{}] {}", o.id, o.bloom_level, o.outcome_text);
    }

    print_heading("Module Outcomes");
    for m in &s.modules {
        for o in &m.learning_outcomes {
            println!("{:<9} [{}] {}", o.id, o.bloom_level, o.outcome_text);
        }
    }

    print_heading("Assessment Blueprint");
    let rows = s
        .blueprint
        .components
        .iter()
        .map(|c| {
            let levels: Vec<String> = c.bloom_levels.iter().map(|l| l.to_string()).collect();
            vec![
                c.component_type.clone(),
                format!("{}%", c.weight_percent),
                c.timing.clone(),
                levels.join(", "),
            ]
        })
        .collect();
    print_table(&["COMPONENT", "WEIGHT", "TIMING", "LEVELS"], rows);
    println!();
    for r in &s.blueprint.recommendations {
        println!("- {r}");
    }

    print_heading("Grading Scale");
    for band in &s.blueprint.grading_scale {
        println!("{}  {}", band.grade, band.range);
    }

    print_heading("Alignment");
    let rows = s
        .alignment
        .rows
        .iter()
        .map(|r| {
            let shown = display_question_ids(r, question_limit);
            let mut questions = shown.join(", ");
            if r.question_ids.len() > shown.len() {
                questions.push_str(&format!(" (+{})", r.question_ids.len() - shown.len()));
            }
            vec![
                r.module.clone(),
                r.outcome_id.clone(),
                r.bloom_level.to_string(),
                r.coverage.to_string(),
                r.assessment_types.join(", "),
                questions,
            ]
        })
        .collect();
    print_table(
        &["MODULE", "OUTCOME", "LEVEL", "COVERAGE", "ASSESSMENTS", "QUESTIONS"],
        rows,
    );

    print_heading("Analysis");
    let a = &s.analysis;
    println!("Quality score: {:.1} ({} - {})", a.quality_score, a.grade, a.grade_label);
    println!(
        "Level coverage {:.0}%, balance compliance {:.0}%, weights sum to {}%",
        a.level_coverage * 100.0,
        a.balance_compliance * 100.0,
        a.weight_sum
    );
    for f in &a.findings {
        println!("- {}", f.message);
    }
    for r in &s.balance_recommendations {
        println!("- {r}");
    }
    println!(
        "{} of {} outcomes measurable, {} sample questions",
        s.measurability.measurable,
        s.measurability.total,
        s.questions.len()
    );

    if !s.warnings.is_empty() {
        print_heading("Warnings");
        for w in &s.warnings {
            println!("[warning] {}", w.message());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
