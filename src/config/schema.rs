use crate::staging::ReplaceMode;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A replacement plan: which files to open and which rules to stage.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ReplacePlan {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl ReplacePlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.files.iter().all(|pattern| pattern.trim().is_empty()) {
            issues.push(ValidationIssue::EmptyFileList);
        }
        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }

            let rule_id = Some(rule.id.clone());
            match rule.mode {
                RuleMode::WholeLine => {
                    if rule.scope == RuleScope::File {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule_id: rule_id.clone(),
                            message: "whole-line mode requires line scope".to_string(),
                        });
                    }
                }
                RuleMode::First | RuleMode::All => {
                    if rule.search.as_deref().unwrap_or("").is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id.clone(),
                            field: "search",
                        });
                    }
                }
            }

            if rule.scope == RuleScope::File {
                if rule.lines.is_some() {
                    issues.push(ValidationIssue::InvalidCombo {
                        rule_id: rule_id.clone(),
                        message: "lines filter requires line scope".to_string(),
                    });
                }
                if rule.contains.is_some() {
                    issues.push(ValidationIssue::InvalidCombo {
                        rule_id: rule_id.clone(),
                        message: "contains filter requires line scope".to_string(),
                    });
                }
            }

            if rule.lines.as_deref().unwrap_or_default().contains(&0) {
                issues.push(ValidationIssue::InvalidCombo {
                    rule_id,
                    message: "line numbers start at 1".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    pub scope: RuleScope,
    #[serde(default)]
    pub mode: RuleMode,
    #[serde(default)]
    pub search: Option<String>,
    pub replace: String,
    /// Only stage on these 1-based lines
    #[serde(default)]
    pub lines: Option<Vec<usize>>,
    /// Only stage on lines containing this text
    #[serde(default)]
    pub contains: Option<String>,
}

impl RuleDefinition {
    /// Whether a line-scope rule should run on the given line.
    pub fn selects_line(&self, number: usize, text: &str) -> bool {
        let by_number = self
            .lines
            .as_ref()
            .map_or(true, |lines| lines.contains(&number));
        let by_text = self
            .contains
            .as_deref()
            .map_or(true, |needle| text.contains(needle));
        by_number && by_text
    }

    pub fn search_text(&self) -> &str {
        self.search.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    File,
    Line,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RuleMode {
    #[default]
    First,
    All,
    WholeLine,
}

impl From<RuleMode> for ReplaceMode {
    fn from(mode: RuleMode) -> Self {
        match mode {
            RuleMode::First => ReplaceMode::FirstOccurrence,
            RuleMode::All => ReplaceMode::AllOccurrences,
            RuleMode::WholeLine => ReplaceMode::WholeLine,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyFileList,
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyFileList => write!(f, "plan lists no file patterns"),
            ValidationIssue::EmptyRuleList => write!(f, "plan contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, scope: RuleScope, mode: RuleMode, search: Option<&str>) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            scope,
            mode,
            search: search.map(str::to_string),
            replace: "x".to_string(),
            lines: None,
            contains: None,
        }
    }

    fn plan(rules: Vec<RuleDefinition>) -> ReplacePlan {
        ReplacePlan {
            meta: Metadata::default(),
            files: vec!["*.txt".to_string()],
            rules,
        }
    }

    #[test]
    fn test_valid_plan() {
        let plan = plan(vec![
            rule("a", RuleScope::File, RuleMode::All, Some("foo")),
            rule("b", RuleScope::Line, RuleMode::WholeLine, None),
        ]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_empty_plan_reports_both_lists() {
        let err = ReplacePlan::default().validate().unwrap_err();
        assert!(matches!(err.issues[0], ValidationIssue::EmptyFileList));
        assert!(matches!(err.issues[1], ValidationIssue::EmptyRuleList));
    }

    #[test]
    fn test_whole_line_with_file_scope_rejected() {
        let err = plan(vec![rule("a", RuleScope::File, RuleMode::WholeLine, None)])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("whole-line mode requires line scope"));
    }

    #[test]
    fn test_duplicate_and_missing_search() {
        let err = plan(vec![
            rule("a", RuleScope::Line, RuleMode::First, Some("x")),
            rule("a", RuleScope::Line, RuleMode::All, None),
        ])
        .validate()
        .unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(matches!(err.issues[0], ValidationIssue::DuplicateId { .. }));
        assert!(matches!(
            err.issues[1],
            ValidationIssue::MissingField { field: "search", .. }
        ));
    }

    #[test]
    fn test_line_filters() {
        let mut r = rule("a", RuleScope::Line, RuleMode::First, Some("x"));
        assert!(r.selects_line(7, "anything"));

        r.lines = Some(vec![2, 3]);
        r.contains = Some("needle".to_string());
        assert!(r.selects_line(2, "a needle"));
        assert!(!r.selects_line(1, "a needle"));
        assert!(!r.selects_line(3, "hay"));

        let mut p = plan(vec![r]);
        p.rules[0].lines = Some(vec![0]);
        assert!(p.validate().is_err());
    }
}
