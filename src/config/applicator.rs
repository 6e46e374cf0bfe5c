//! Plan applicator - stages a plan's rules into a session
//!
//! File-scope rules run in one whole-file pass, line-scope rules in one line
//! pass, each in declaration order. Nothing is written here; the caller
//! decides between `preview()` and `commit()`.

use crate::config::schema::{ReplacePlan, RuleScope};
use crate::error::ReplaceError;
use crate::files::FileAccess;
use crate::session::Session;
use crate::staging::ReplaceMode;

/// A session with a plan's rules staged, plus how many edits each rule staged.
#[derive(Debug)]
pub struct StagedPlan<A: FileAccess> {
    pub session: Session<A>,
    pub rule_counts: Vec<(String, usize)>,
}

pub fn stage_plan<A: FileAccess>(
    plan: &ReplacePlan,
    access: A,
) -> Result<StagedPlan<A>, ReplaceError> {
    let mut session = Session::open(access, &plan.files)?;
    let mut counts = vec![0usize; plan.rules.len()];

    let file_rules: Vec<_> = plan
        .rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.scope == RuleScope::File)
        .collect();
    let line_rules: Vec<_> = plan
        .rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.scope == RuleScope::Line)
        .collect();

    if !file_rules.is_empty() {
        session.for_each_file(|file| {
            for (idx, rule) in &file_rules {
                match ReplaceMode::from(rule.mode) {
                    ReplaceMode::AllOccurrences => file.replace_all(rule.search_text(), &rule.replace)?,
                    _ => file.replace(rule.search_text(), &rule.replace)?,
                }
                counts[*idx] += 1;
            }
            Ok(())
        })?;
    }

    if !line_rules.is_empty() {
        session.for_each_line(|line| {
            for (idx, rule) in &line_rules {
                if !rule.selects_line(line.number(), line.line()) {
                    continue;
                }
                let staged = match ReplaceMode::from(rule.mode) {
                    ReplaceMode::FirstOccurrence => line.replace(rule.search_text(), &rule.replace)?,
                    ReplaceMode::AllOccurrences => {
                        line.replace_all(rule.search_text(), &rule.replace)?
                    }
                    ReplaceMode::WholeLine => {
                        line.replace_whole_line(&rule.replace)?;
                        true
                    }
                };
                if staged {
                    counts[*idx] += 1;
                }
            }
            Ok(())
        })?;
    }

    let rule_counts = plan
        .rules
        .iter()
        .zip(counts)
        .map(|(rule, count)| (rule.id.clone(), count))
        .collect();

    Ok(StagedPlan {
        session,
        rule_counts,
    })
}
