//! Table rendering for command output.

use ferry_replica::{
    HeightCheck, PointerCheck, ReplicaOutcome, VerificationReport, inspect::Survey,
};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Style, object::Columns},
};

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Entries")]
    entries: u64,
    #[tabled(rename = "Details")]
    details: String,
}

#[derive(Tabled)]
struct HeightRow {
    #[tabled(rename = "Height")]
    number: u64,
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Body")]
    body: &'static str,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&HeightCheck> for HeightRow {
    fn from(check: &HeightCheck) -> Self {
        Self {
            number: check.number,
            hash: check.hash.map_or_else(|| "-".to_string(), |hash| hash.to_string()),
            body: if check.body_present { "yes" } else { "no" },
            result: if check.passed() {
                "ok".to_string()
            } else {
                check.failures.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            },
        }
    }
}

#[derive(Tabled)]
struct PointerRow {
    #[tabled(rename = "Pointer")]
    key: String,
    #[tabled(rename = "Result")]
    outcome: String,
}

impl From<&PointerCheck> for PointerRow {
    fn from(check: &PointerCheck) -> Self {
        Self { key: check.key.to_string(), outcome: check.outcome.to_string() }
    }
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Entries")]
    entries: u64,
}

fn render<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..2), Alignment::right());
    table.to_string()
}

/// Renders the per-stage summary of a replication run.
pub(crate) fn outcome_table(outcome: &ReplicaOutcome) -> String {
    let replay = &outcome.replay;
    let mut rows = vec![StageRow {
        stage: "blocks".to_string(),
        entries: replay.blocks_written,
        details: format!(
            "{}..={}{}, {} visited, {} complete, {} records",
            outcome.range.start(),
            outcome.range.end(),
            if outcome.tip_discovered { " (tip)" } else { "" },
            replay.blocks_processed,
            replay.blocks_complete,
            replay.records.total(),
        ),
    }];
    rows.extend(outcome.bulk.iter().map(|stats| StageRow {
        stage: stats.label.clone(),
        entries: stats.entries,
        details: format!("prefix {}", stats.prefix),
    }));
    rows.push(StageRow {
        stage: "metadata".to_string(),
        entries: outcome.metadata.total(),
        details: format!(
            "{} keys, {} missing, {} prefixed",
            outcome.metadata.singletons,
            outcome.metadata.singletons_missing,
            outcome.metadata.prefix_entries,
        ),
    });
    render(rows)
}

/// Renders height and head pointer checks.
pub(crate) fn verification_tables(report: &VerificationReport) -> String {
    let mut out = render(report.heights.iter().map(HeightRow::from));
    if !report.pointers.is_empty() {
        out.push('\n');
        out.push_str(&render(report.pointers.iter().map(PointerRow::from)));
    }
    out
}

/// Renders entry counts per key class and per layout.
pub(crate) fn survey_tables(survey: &Survey) -> String {
    let classes = survey
        .classes
        .iter()
        .map(|(class, entries)| CountRow { class: class.to_string(), entries: *entries });
    let layouts = survey
        .layout_hits
        .iter()
        .map(|(layout, entries)| CountRow { class: format!("layout {layout}"), entries: *entries });
    render(classes.chain(layouts))
}
