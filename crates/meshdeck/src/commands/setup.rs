//! Interactive network setup: renders the core step machine with dialoguer
//! prompts, then runs the resulting plan with a spinner per command.

use std::time::Duration;

use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use meshdeck_core::setup::{Answer, AnswerKind, SetupState, StepDescriptor, StepId};
use meshdeck_core::{Command as CoreCommand, Controller, CoreError};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Session, util};

/// Numbered plan lines, e.g. `  1. create network office`.
fn plan_lines(plan: &[CoreCommand]) -> Vec<String> {
    plan.iter()
        .enumerate()
        .map(|(i, cmd)| format!("  {}. {}", i + 1, cmd.describe()))
        .collect()
}

fn ask(step: &StepDescriptor, controller: &Controller, color: bool) -> Result<Answer, CliError> {
    let help = if color {
        step.help.dimmed().to_string()
    } else {
        step.help.to_owned()
    };
    eprintln!("{help}");

    match step.kind {
        AnswerKind::Text { default, optional } => {
            let mut input = Input::<String>::new()
                .with_prompt(step.prompt)
                .allow_empty(optional);
            if let Some(d) = default {
                input = input.default(d.to_owned());
            }
            input.interact_text().map(Answer::Text).map_err(util::prompt_err)
        }
        AnswerKind::Confirm { default } => Confirm::new()
            .with_prompt(step.prompt)
            .default(default)
            .interact()
            .map(Answer::Bool)
            .map_err(util::prompt_err),
        AnswerKind::HostChoice => {
            let hosts = controller.hosts_snapshot();
            if hosts.is_empty() {
                return Err(CliError::Validation {
                    field: step.id.to_string(),
                    reason: "no hosts are registered yet; join a host first".into(),
                });
            }
            let labels: Vec<String> = hosts
                .iter()
                .map(|h| format!("{} ({} {})", h.name, h.os, h.version))
                .collect();
            let idx = Select::new()
                .with_prompt(step.prompt)
                .items(&labels)
                .default(0)
                .interact()
                .map_err(util::prompt_err)?;
            hosts
                .get(idx)
                .map(|h| Answer::Choice(h.id.to_string()))
                .ok_or_else(|| CliError::Internal(format!("host choice {idx} out of range")))
        }
    }
}

/// Run the plan in order, stopping at the first failure.
async fn apply(session: &Session, plan: Vec<CoreCommand>, quiet: bool) -> Result<(), CliError> {
    let total = plan.len();
    for (i, cmd) in plan.into_iter().enumerate() {
        let label = cmd.describe();
        let spinner = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        spinner.set_style(
            ProgressStyle::with_template("{spinner} [{prefix}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_prefix(format!("{}/{total}", i + 1));
        spinner.set_message(label.clone());
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = session.execute(cmd).await;
        spinner.finish_and_clear();
        match result {
            Ok(_) => output::done(&label, quiet),
            Err(e) => {
                tracing::warn!(step = i + 1, total, "setup stopped at {label}");
                if !quiet {
                    eprintln!("✗ {label}");
                    if i > 0 {
                        eprintln!("  {i} earlier step(s) were applied and are left in place");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let controller = session.controller().await?;
    let mut state = SetupState::new();

    while let Some(step) = state.step() {
        if step.id == StepId::Review {
            let plan = state.plan().map_err(CoreError::from)?;
            eprintln!("\nPlan:\n{}\n", plan_lines(&plan).join("\n"));
            if global.yes {
                state.answer(Answer::Bool(true)).map_err(field_err)?;
                continue;
            }
        }

        let answer = ask(step, controller, color)?;
        if let Err(e) = state.answer(answer) {
            eprintln!("  {e}");
        }
    }

    if state.current() == StepId::Cancelled {
        output::done("Setup cancelled; nothing was changed", global.quiet);
        return Ok(());
    }

    let plan = state.plan().map_err(CoreError::from)?;
    apply(session, plan, global.quiet).await?;
    output::done("Setup complete", global.quiet);
    Ok(())
}

fn field_err(e: meshdeck_core::FieldError) -> CliError {
    CliError::Validation {
        field: e.field,
        reason: e.reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plan_lines_are_numbered() {
        let mut state = SetupState::new();
        state.answer(Answer::Text("office".into())).unwrap();
        state.answer(Answer::Text("10.101.0.0/16".into())).unwrap();
        state.answer(Answer::Bool(false)).unwrap();
        state.answer(Answer::Bool(true)).unwrap();
        assert_eq!(state.current(), StepId::Review);

        let lines = plan_lines(&state.plan().unwrap());
        assert_eq!(
            lines,
            vec![
                "  1. create network office",
                "  2. create enrollment key for office",
            ]
        );
    }

    #[test]
    fn field_errors_become_validation() {
        let err = field_err(meshdeck_core::FieldError {
            field: "network_name".into(),
            reason: "too long".into(),
        });
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "network_name"));
    }
}
