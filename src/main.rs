use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use facility_flow::flow::{DecisionTrace, Evaluation, FlowGraph, Outcome};
use facility_flow::labels::ConditionLabel;
use facility_flow::models::{BuildingRecord, CampusMode};
use facility_flow::summary::{self, GradeFilter};
use facility_flow::table::{self, TableColumn};
use facility_flow::thresholds::{ThresholdField, ThresholdSet};
use facility_flow::{config, massing, normalize, report, AdditionEvaluation, RenovationEvaluation};

#[derive(Parser)]
#[command(name = "facility-flow")]
#[command(about = "Capital-planning decision flows for school buildings", long_about = None)]
struct Cli {
    /// TOML configuration file (falls back to FACILITY_FLOW_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override one threshold, e.g. --set utilization=110
    #[arg(long = "set", value_name = "NAME=VALUE", global = true)]
    overrides: Vec<String>,
    /// Campus condition horizon for the renovation flow
    #[arg(long, value_enum, global = true)]
    campus_mode: Option<CampusMode>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Building decision data
    #[arg(long, env = "FACILITY_FLOW_CSV")]
    csv: PathBuf,
    /// Only include buildings serving this grade level (repeatable)
    #[arg(long = "grade")]
    grades: Vec<String>,
}

impl DataArgs {
    fn load(&self) -> anyhow::Result<(Vec<BuildingRecord>, GradeFilter)> {
        let records = normalize::load_csv(&self.csv)?;
        Ok((records, GradeFilter::from_selection(&self.grades)))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Stage {
    Addition,
    Renovation,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective thresholds
    Thresholds,
    /// List grade levels available for filtering
    Grades {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Count outcomes across the selected buildings
    Summary {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, value_enum, default_value = "renovation")]
        stage: Stage,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Replay one building through a flowchart
    Trace {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value = "renovation")]
        stage: Stage,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Show the detail panel for one building
    Inspect {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        name: String,
    },
    /// Building summary table
    Table {
        #[command(flatten)]
        data: DataArgs,
        /// Case-insensitive text to match
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, value_enum, default_value = "all")]
        column: TableColumn,
        #[arg(long, value_enum)]
        sort: Option<TableColumn>,
        #[arg(long)]
        desc: bool,
    },
    /// Print every node and link of a flowchart
    Graph {
        #[arg(long, value_enum, default_value = "renovation")]
        stage: Stage,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Capacity, cost and adequacy for proposed footprints
    Massing {
        #[arg(long)]
        footprints: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Serialize)]
struct TraceOutput<'a> {
    building: &'a str,
    outcome: &'static str,
    #[serde(flatten)]
    trace: DecisionTrace,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn one_line(caption: &str) -> String {
    caption.split('\n').map(str::trim).collect::<Vec<_>>().join(" ")
}

fn print_summary<E: Evaluation>(
    records: &[BuildingRecord],
    evaluation: &E,
    filter: &GradeFilter,
    format: Format,
) -> anyhow::Result<()> {
    let summary = summary::summarize(records, evaluation, filter);
    match format {
        Format::Json => print_json(&summary)?,
        Format::Text => {
            for entry in &summary.counts {
                println!("{:<16} {}", entry.label, entry.count);
            }
            println!("{:<16} {}", "Total", summary.total);
        }
    }
    Ok(())
}

fn print_trace<E: Evaluation>(
    records: &[BuildingRecord],
    name: &str,
    evaluation: &E,
    filter: &GradeFilter,
    format: Format,
) -> anyhow::Result<()> {
    let Some(record) = summary::find_building(records, name, filter) else {
        println!("No building named '{name}' in the current selection.");
        return Ok(());
    };
    let output = TraceOutput {
        building: &record.name,
        outcome: evaluation.classify(record).label(),
        trace: evaluation.trace(record),
    };

    match format {
        Format::Json => print_json(&output)?,
        Format::Text => {
            println!("{} -> {}", output.building, output.outcome);
            if output.trace.is_empty() {
                println!("(no path highlighted)");
            } else {
                println!("path: {}", output.trace.nodes.join(" -> "));
                for edge in &output.trace.edges {
                    println!("  {} -> {} ({})", edge.from, edge.to, edge.kind.as_str());
                }
            }
        }
    }
    Ok(())
}

fn print_graph(graph: &FlowGraph, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => print_json(graph)?,
        Format::Text => {
            println!("Nodes:");
            for node in &graph.nodes {
                let marker = if node.outcome { " [outcome]" } else { "" };
                println!("  {:<14} {}{}", node.id, one_line(&node.caption), marker);
            }
            println!("Links:");
            for edge in &graph.edges {
                println!("  {} -> {} ({})", edge.from, edge.to, edge.kind.as_str());
            }
        }
    }
    Ok(())
}

fn campus_display(score: Option<ConditionLabel>) -> &'static str {
    score.map(ConditionLabel::label).unwrap_or("-")
}

fn print_detail(
    record: &BuildingRecord,
    addition: &AdditionEvaluation,
    renovation: &RenovationEvaluation,
) {
    let or_dash = |value: &str| if value.is_empty() { "-".to_string() } else { value.to_string() };

    println!("Name:                  {}", or_dash(&record.name));
    println!("Grades served:         {}", or_dash(&record.grades_served));
    println!("State rated capacity:  {}", or_dash(&record.state_rated_capacity));
    println!("Current enrollment:    {}", or_dash(&record.current_enrollment));
    println!("Projected enrollment:  {}", or_dash(&record.projected_enrollment));
    println!(
        "Utilization:           {}",
        record.utilization.map_or("-".to_string(), |u| format!("{u}%"))
    );
    println!(
        "Funding factor:        {}",
        record.funding_factor.map_or("-".to_string(), |f| f.to_string())
    );
    println!("Campus score (FY34-35): {}", campus_display(record.campus_score));
    println!("Campus score (FY24-25): {}", campus_display(record.campus_score_today));
    println!("Space constraints:     {}", record.ea_value.label());
    println!(
        "Modified age:          {}",
        record
            .modified_age
            .filter(|age| *age != 0)
            .map_or("-".to_string(), |age| age.to_string())
    );
    println!(
        "Historic building:     {}",
        if record.historic_building { "yes" } else { "no" }
    );
    println!();
    println!("Addition evaluation:   {}", addition.classify(record).label());
    println!("Renovation decision:   {}", renovation.classify(record).label());

    if record.below_capacity() {
        println!();
        println!("Not applicable for additions: projected utilization is below 100%.");
    }
}

fn print_massing(summary: &massing::MassingSummary, format: Format) -> anyhow::Result<()> {
    if let Format::Json = format {
        return print_json(summary);
    }

    println!("Proposed buildings:");
    for (i, line) in summary.footprints.iter().enumerate() {
        println!(
            "  {}. {} ({} stories, {:.0} sq ft, {:.1} m tall)",
            i + 1,
            line.building_type,
            line.stories,
            line.total_area_sqft,
            line.height_m
        );
    }
    println!("Total area:        {:.0} sq ft", summary.total_area_sqft);
    println!("Total stories:     {}", summary.total_stories);
    for (building_type, area) in &summary.area_by_type {
        println!("  {building_type}: {area:.0} sq ft");
    }
    println!(
        "Capacity:          {} students / {} seats ({:.0}%)",
        summary.students, summary.capacity, summary.utilization_percent
    );
    println!(
        "Capital cost:      ${:.0} (hard ${:.0}, soft ${:.0})",
        summary.capital_cost, summary.hard_cost, summary.soft_cost
    );
    println!("Adequacy scores:");
    for score in &summary.scores {
        println!("  {:<16} {:>3.0} / {:.0}", score.subject, score.score, score.full_mark);
    }
    Ok(())
}

fn print_thresholds(thresholds: &ThresholdSet, mode: CampusMode) {
    for field in ThresholdField::ALL {
        println!("{:<26} {}", field.name(), field.display_value(thresholds));
    }
    println!("{:<26} {:?} ({})", "campus_mode", mode, mode.horizon_label());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app_config = config::load(cli.config.as_deref())?;

    let mut store = app_config.threshold_store();
    for assignment in &cli.overrides {
        store
            .apply_assignment(assignment)
            .with_context(|| format!("invalid --set {assignment}"))?;
    }
    if let Some(mode) = cli.campus_mode {
        store.set_campus_mode(mode);
    }

    // Every command below works from this one snapshot.
    let thresholds = store.snapshot();
    let mode = store.campus_mode();
    let addition = AdditionEvaluation::new(thresholds);
    let renovation = RenovationEvaluation::new(thresholds, mode);

    match cli.command {
        Commands::Thresholds => print_thresholds(&thresholds, mode),
        Commands::Grades { data } => {
            let (records, _) = data.load()?;
            let grades = summary::grade_levels(&records);
            if grades.is_empty() {
                println!("No grade levels found.");
            }
            for grade in grades {
                println!("{grade:<20} {}", summary::grade_display(&grade));
            }
        }
        Commands::Summary { data, stage, format } => {
            let (records, filter) = data.load()?;
            match stage {
                Stage::Addition => print_summary(&records, &addition, &filter, format)?,
                Stage::Renovation => print_summary(&records, &renovation, &filter, format)?,
            }
        }
        Commands::Trace {
            data,
            name,
            stage,
            format,
        } => {
            let (records, filter) = data.load()?;
            match stage {
                Stage::Addition => print_trace(&records, &name, &addition, &filter, format)?,
                Stage::Renovation => print_trace(&records, &name, &renovation, &filter, format)?,
            }
        }
        Commands::Inspect { data, name } => {
            let (records, filter) = data.load()?;
            match summary::find_building(&records, &name, &filter) {
                Some(record) => print_detail(record, &addition, &renovation),
                None => println!("No building named '{name}' in the current selection."),
            }
        }
        Commands::Table {
            data,
            filter: text,
            column,
            sort,
            desc,
        } => {
            let (records, filter) = data.load()?;
            let rows = table::build_rows(&records, &filter, &addition, &renovation);
            let mut rows = table::filter_rows(rows, text.as_deref().unwrap_or(""), column);
            if let Some(sort_column) = sort {
                table::sort_rows(&mut rows, sort_column, desc);
            }

            if rows.is_empty() {
                println!("No buildings match.");
                return Ok(());
            }
            println!(
                "{:<32} {:<14} {:<11} {:<15} {}",
                "Building", "Grades", "Type", "Addition", "Decision"
            );
            for row in rows {
                println!(
                    "{:<32} {:<14} {:<11} {:<15} {}",
                    row.name, row.grades_served, row.school_type, row.addition, row.decision
                );
            }
        }
        Commands::Graph { stage, format } => match stage {
            Stage::Addition => print_graph(&addition.graph(), format)?,
            Stage::Renovation => print_graph(&renovation.graph(), format)?,
        },
        Commands::Report { data, out } => {
            let (records, filter) = data.load()?;
            let report = report::build_report(
                &records,
                &thresholds,
                mode,
                &filter,
                chrono::Local::now().date_naive(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Massing { footprints, format } => {
            let footprints = massing::load_footprints(&footprints)?;
            let summary = massing::summarize(&footprints, &app_config.massing);
            print_massing(&summary, format)?;
        }
    }

    Ok(())
}
