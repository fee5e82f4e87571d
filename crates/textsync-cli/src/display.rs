//! Plain-text rendering of records, outcomes, and project listings.

use textsync_core::{ItemAction, ItemOutcome, Project, TextRecord};

const MAX_VALUE_CHARS: usize = 40;

/// Print records as an aligned table, one row per key.
pub fn print_records(records: &[TextRecord]) {
    if records.is_empty() {
        println!("no records");
        return;
    }
    println!(
        "{:<34} {:<11} {:<16} {}",
        "KEY", "STATUS", "CATEGORY", "VALUE"
    );
    for record in records {
        println!(
            "{:<34} {:<11} {:<16} {}",
            record.key,
            record.status,
            record.category,
            shorten(&record.value),
        );
        if let Some(translation) = &record.translation {
            println!("{:<34} {:<11} {:<16} {}", "", "", "", shorten(translation));
        }
    }
    println!("\n{} record(s)", records.len());
}

/// Print per-item reconciliation outcomes plus a summary line.
pub fn print_outcomes(outcomes: &[ItemOutcome]) {
    for outcome in outcomes {
        match outcome.action {
            ItemAction::Error => println!(
                "{:<34} {:<16} {}",
                outcome.key,
                outcome.action.as_str(),
                outcome.error.as_deref().unwrap_or("unknown error"),
            ),
            ItemAction::Skipped => println!(
                "{:<34} {:<16} {}",
                outcome.key,
                outcome.action.as_str(),
                outcome.reason.as_deref().unwrap_or(""),
            ),
            _ => println!("{:<34} {}", outcome.key, outcome.action.as_str()),
        }
    }

    let count = |action: ItemAction| outcomes.iter().filter(|o| o.action == action).count();
    println!(
        "\n{} item(s): {} created, {} updated, {} moved to review, {} skipped, {} error(s)",
        outcomes.len(),
        count(ItemAction::Created),
        count(ItemAction::Updated),
        count(ItemAction::MovedToReview),
        count(ItemAction::Skipped),
        count(ItemAction::Error),
    );
}

/// Print configured projects, marking the active one.
pub fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("no projects configured");
        return;
    }
    println!("{:<2} {:<20} {:<24} {:<10} {}", "", "ID", "REPOSITORY", "BRANCH", "LANGS");
    for project in projects {
        let repo = if project.github.owner.is_empty() {
            "-".to_string()
        } else {
            format!("{}/{}", project.github.owner, project.github.repo)
        };
        println!(
            "{:<2} {:<20} {:<24} {:<10} {}->{}",
            if project.is_active { "*" } else { "" },
            project.id,
            repo,
            project.github.branch,
            project.source_lang,
            project.target_lang,
        );
    }
}

fn shorten(s: &str) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= MAX_VALUE_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(MAX_VALUE_CHARS - 3).collect();
    format!("{cut}...")
}
