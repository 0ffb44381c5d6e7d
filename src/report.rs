use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{Athlete, Suggestion, TargetSchool, TaskStatus};
use crate::status::StatusScoreResult;
use crate::tasks::TaskChecklist;

pub fn build_report(
    athlete: &Athlete,
    status: &StatusScoreResult,
    suggestions: &[Suggestion],
    checklist: &TaskChecklist,
    schools: &[TargetSchool],
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Recruiting Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        athlete.full_name, athlete.email, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status");
    let _ = writeln!(
        output,
        "Score {} / 100: {} ({})",
        status.score, status.label, status.color
    );
    let breakdown = &status.breakdown;
    for (name, part) in [
        ("Task completion", breakdown.task_completion),
        ("Interaction frequency", breakdown.interaction_frequency),
        ("Coach interest", breakdown.coach_interest),
        ("Academic standing", breakdown.academic_standing),
    ] {
        let _ = writeln!(
            output,
            "- {}: {:.0} x {:.2} = {:.1}",
            name, part.raw, part.weight, part.weighted
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", status.label.advice());

    if let Some(phase) = athlete.phase() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Next Actions ({})", phase);
        for action in status.label.next_actions(phase) {
            let _ = writeln!(output, "- {}", action);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Suggestions");
    if suggestions.is_empty() {
        let _ = writeln!(output, "No open suggestions.");
    } else {
        for suggestion in suggestions {
            let _ = writeln!(
                output,
                "- [{}] {} ({})",
                suggestion.urgency, suggestion.message, suggestion.action_type
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Checklist");
    let tasks = checklist.definitions();
    if tasks.is_empty() {
        let _ = writeln!(output, "No checklist tasks defined.");
    } else {
        for task in tasks {
            let status = checklist.status_of(task.id);
            if status == TaskStatus::Completed || !checklist.is_locked(task.id) {
                let _ = writeln!(output, "- {}: {}", task.title, status);
            } else {
                let _ = writeln!(
                    output,
                    "- {}: locked until {}",
                    task.title,
                    checklist.unmet_prerequisites(task.id).join(", ")
                );
            }
        }
    }

    let mut scored: Vec<&TargetSchool> = schools.iter().collect();
    scored.sort_by(|a, b| {
        let a_score = a.fit.as_ref().map(|fit| fit.score);
        let b_score = b.fit.as_ref().map(|fit| fit.score);
        b_score.cmp(&a_score).then_with(|| a.name.cmp(&b.name))
    });
    let _ = writeln!(output);
    let _ = writeln!(output, "## School Fit");
    if scored.is_empty() {
        let _ = writeln!(output, "No target schools yet.");
    } else {
        for school in scored {
            match &school.fit {
                Some(fit) => {
                    let _ = writeln!(
                        output,
                        "- {}: {} ({})",
                        school.name,
                        fit.score,
                        fit.tier.as_str()
                    );
                }
                None => {
                    let _ = writeln!(output, "- {}: not scored", school.name);
                }
            }
        }
    }

    output
}
