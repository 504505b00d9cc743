use std::collections::HashMap;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::curation::summary::{ClassificationSummary, CurationSummary};
use crate::curation::CurationOutcome;
use crate::license::change::{ChangeSeverity, LicenseChange};
use crate::models::{ClassificationResult, CurationSuggestion, PolicyStatus, RiskLevel};
use crate::policy::PolicyStore;

fn header(store: &PolicyStore) {
    println!(
        "\n {} v{}",
        "license-curatr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        " Policy: {} (version {}, {} licenses)\n",
        store.company_name().unwrap_or("unnamed"),
        store.policy_version().unwrap_or("-"),
        store.license_count()
    );
}

fn status_color(status: PolicyStatus) -> Color {
    match status {
        PolicyStatus::Approved => Color::Green,
        PolicyStatus::Conditional => Color::Yellow,
        PolicyStatus::Forbidden | PolicyStatus::Incompatible => Color::Red,
        PolicyStatus::Unknown => Color::DarkGrey,
    }
}

fn risk_color(risk: RiskLevel) -> Color {
    match risk {
        RiskLevel::Low => Color::Green,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::High => Color::Magenta,
        RiskLevel::Critical => Color::Red,
    }
}

fn bold_header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(names: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(bold_header(names));
    table
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

pub fn render_classifications(
    results: &[ClassificationResult],
    store: &PolicyStore,
    verbose: bool,
    quiet: bool,
) {
    let summary = ClassificationSummary::from_results(results);

    if quiet {
        println!(
            "Total: {}  Approved: {}  Conditional: {}  Forbidden: {}  Incompatible: {}  Unknown: {}",
            summary.total,
            summary.approved.to_string().green(),
            summary.conditional.to_string().yellow(),
            summary.forbidden.to_string().red(),
            summary.incompatible.to_string().red(),
            summary.unknown.to_string().dimmed(),
        );
        return;
    }

    header(store);

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Expressions        : {}", summary.total));
    println!(
        " │  {:<48} │",
        format!("{}  Approved        : {:>4}", "✓".green(), summary.approved)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Conditional     : {:>4}", "⚠".yellow(), summary.conditional)
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  Forbidden       : {:>4}",
            "✗".red(),
            summary.forbidden + summary.incompatible
        )
    );
    println!(
        " │  {:<48} │",
        format!("{}  Unknown         : {:>4}", "?".dimmed(), summary.unknown)
    );
    println!(
        " │  {:<48} │",
        format!("Compliance score   : {}%", summary.compliance_score)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    let mut table = new_table(&["Expression", "Status", "Risk", "Category", "Action", "Reason"]);
    for r in results {
        let expression = if r.normalized_expression != r.expression {
            format!("{}\n→ {}", r.expression, r.normalized_expression)
        } else {
            r.expression.clone()
        };
        table.add_row(vec![
            Cell::new(expression),
            Cell::new(r.status.to_string()).fg(status_color(r.status)),
            Cell::new(r.risk_level.to_string()).fg(risk_color(r.risk_level)),
            Cell::new(r.category.to_string()),
            Cell::new(r.action.to_string()).set_alignment(CellAlignment::Center),
            Cell::new(&r.reason),
        ]);
    }
    println!("{}", table);

    if verbose {
        for r in results {
            render_details(r);
        }
    }
    println!();
}

fn render_details(r: &ClassificationResult) {
    let has_details = !r.approvers.is_empty()
        || !r.conditions.is_empty()
        || !r.compatibility_issues.is_empty()
        || r.chosen_sub_expression.is_some();
    if !has_details {
        return;
    }

    println!("\n {} {}", "▸".cyan(), r.expression.bold());
    if let Some(chosen) = &r.chosen_sub_expression {
        println!("   chosen      : {} (from {})", chosen, r.options.join(", "));
    }
    if !r.approvers.is_empty() {
        println!("   approvers   : {}", r.approvers.join(", "));
    }
    for condition in &r.conditions {
        println!("   condition   : {}", condition);
    }
    for issue in &r.compatibility_issues {
        println!(
            "   {} {} + {}: {}",
            "conflict    :".red(),
            issue.license_a,
            issue.license_b,
            issue.reason
        );
    }
}

// ---------------------------------------------------------------------------
// curate
// ---------------------------------------------------------------------------

pub fn render_curation(outcomes: &[CurationOutcome], store: &PolicyStore, verbose: bool, quiet: bool) {
    let summary = CurationSummary::from_outcomes(outcomes);

    if quiet {
        println!(
            "Packages: {}  Suggested: {}  Review: {}  Alternative needed: {}  No evidence: {}  Failed: {}",
            summary.packages,
            summary.suggested.to_string().green(),
            summary.manual_review.to_string().yellow(),
            summary.needs_alternative.to_string().red(),
            summary.no_evidence.to_string().dimmed(),
            summary.failed.to_string().red(),
        );
        return;
    }

    header(store);

    let suggestions: Vec<&CurationSuggestion> =
        outcomes.iter().filter_map(|o| o.suggestion()).collect();

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Packages           : {}", summary.packages));
    println!(
        " │  {:<48} │",
        format!(
            "{}  Suggested       : {:>4}  {}",
            "✓".green(),
            summary.suggested,
            top_licenses(&suggestions)
        )
    );
    println!(
        " │  {:<48} │",
        format!(
            "   High / Med / Low: {} / {} / {}",
            summary.high_confidence, summary.medium_confidence, summary.low_confidence
        )
    );
    println!(
        " │  {:<48} │",
        format!("{}  Manual review   : {:>4}", "⚠".yellow(), summary.manual_review)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Need alternative: {:>4}", "✗".red(), summary.needs_alternative)
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  No evidence     : {:>4}  Failed: {}",
            "?".dimmed(),
            summary.no_evidence,
            summary.failed
        )
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    let alternatives: Vec<&CurationOutcome> = outcomes
        .iter()
        .filter(|o| matches!(o, CurationOutcome::NeedsAlternative { .. }))
        .collect();
    if !alternatives.is_empty() {
        println!(" {} Packages needing an alternative:\n", "[FORBIDDEN]".red().bold());
        let mut table = new_table(&["Package", "License", "Reason"]);
        for outcome in alternatives {
            if let CurationOutcome::NeedsAlternative {
                package_id,
                license,
                classification,
            } = outcome
            {
                table.add_row(vec![
                    Cell::new(package_id.to_string()),
                    Cell::new(license).fg(Color::Red),
                    Cell::new(&classification.reason),
                ]);
            }
        }
        println!("{}\n", table);
    }

    let review: Vec<&CurationSuggestion> = suggestions
        .iter()
        .copied()
        .filter(|s| s.requires_manual_review)
        .collect();
    if !review.is_empty() {
        println!(" {} Suggestions requiring manual review:\n", "[REVIEW]".yellow().bold());
        render_suggestions(&review, verbose);
        println!();
    }

    if verbose {
        let accepted: Vec<&CurationSuggestion> = suggestions
            .iter()
            .copied()
            .filter(|s| !s.requires_manual_review)
            .collect();
        if !accepted.is_empty() {
            println!(" {} Confident suggestions:\n", "[OK]".green().bold());
            render_suggestions(&accepted, verbose);
            println!();
        }

        for outcome in outcomes {
            if let CurationOutcome::Failed { reason, .. } = outcome {
                println!(" {} {}: {}", "[FAILED]".red().bold(), outcome.package_id(), reason);
            }
        }
    }
}

fn render_suggestions(suggestions: &[&CurationSuggestion], verbose: bool) {
    let mut names = vec!["Package", "License", "Status", "Confidence", "Sources"];
    if verbose {
        names.push("Comment");
    }
    let mut table = new_table(&names);

    for s in suggestions {
        let sources: Vec<String> = s.contributing_sources.iter().map(|t| t.to_string()).collect();
        let confidence_color = if s.requires_manual_review {
            Color::Yellow
        } else {
            Color::Green
        };
        let mut row = vec![
            Cell::new(s.package_id.to_string()),
            Cell::new(&s.recommended_license),
            Cell::new(s.policy_status.to_string()).fg(status_color(s.policy_status)),
            Cell::new(format!("{:.0}%", s.final_confidence * 100.0))
                .fg(confidence_color)
                .set_alignment(CellAlignment::Right),
            Cell::new(sources.join(", ")),
        ];
        if verbose {
            row.push(Cell::new(&s.comment));
        }
        table.add_row(row);
    }

    println!("{}", table);
}

fn top_licenses(suggestions: &[&CurationSuggestion]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in suggestions {
        *counts.entry(s.recommended_license.as_str()).or_insert(0) += 1;
    }

    let mut pairs: Vec<(&str, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(lic, cnt)| format!("{} ({})", lic, cnt))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

pub fn render_change(change: &LicenseChange, quiet: bool) {
    let severity = match change.severity {
        None => "none".dimmed(),
        Some(ChangeSeverity::Low) => "low".green(),
        Some(ChangeSeverity::Medium) => "medium".yellow(),
        Some(ChangeSeverity::High) => "high".magenta(),
        Some(ChangeSeverity::Critical) => "critical".red().bold(),
    };

    if quiet {
        println!("{} -> {}: {}", change.previous, change.current, severity);
        return;
    }

    println!();
    let mut table = new_table(&["", "Expression", "Family"]);
    table.add_row(vec![
        Cell::new("previous"),
        Cell::new(&change.previous),
        Cell::new(change.previous_family.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("current"),
        Cell::new(&change.current),
        Cell::new(change.current_family.to_string()),
    ]);
    println!("{}", table);

    println!("\n Severity : {}", severity);
    println!(" {}", change.assessment);
    if change.requires_action {
        println!(" {} action required before upgrading\n", "[ACTION]".red().bold());
    } else {
        println!();
    }
}
