//! Pivot query synthesis
//!
//! Turns a structure snapshot into one SQL statement producing a row per
//! (user, survey) with one `Answer_<question>` column per question. Each
//! survey gets its own SELECT block and the blocks are combined with
//! `UNION`, so every block must expose the same columns in the same order.
//!
//! Building is split in two steps that never touch the database:
//! 1. [`PivotPlan::build`] maps the universal question list and the
//!    per-survey asked sets to column descriptors
//! 2. [`PivotPlan::render`] prints those descriptors as SQL text

use std::collections::{BTreeMap, BTreeSet};

use crate::core::structure::StructureSnapshot;

/// Key columns leading every pivot row
pub const KEY_COLUMNS: [&str; 2] = ["UserId", "SurveyId"];

/// Column name of a question in the pivot view
pub fn answer_column(question_id: i64) -> String {
    format!("Answer_{}", question_id)
}

/// One generated question column of a survey block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnExpr {
    /// Question asked in the survey: look the answer up, null if missing
    Lookup { survey_id: i64, question_id: i64 },
    /// Question not asked in the survey: always null
    Null { question_id: i64 },
}

impl ColumnExpr {
    pub fn question_id(&self) -> i64 {
        match self {
            ColumnExpr::Lookup { question_id, .. } | ColumnExpr::Null { question_id } => {
                *question_id
            }
        }
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, ColumnExpr::Lookup { .. })
    }

    pub fn name(&self) -> String {
        answer_column(self.question_id())
    }

    pub fn to_sql(&self) -> String {
        match self {
            ColumnExpr::Lookup {
                survey_id,
                question_id,
            } => format!(
                "COALESCE((\n        \
                 SELECT a.Answer_Value\n        \
                 FROM Answer a\n        \
                 WHERE a.UserId = u.UserId\n        \
                 AND a.SurveyId = {} AND a.QuestionId = {}\n    \
                 ), NULL) AS {}",
                survey_id,
                question_id,
                self.name()
            ),
            ColumnExpr::Null { .. } => format!("NULL AS {}", self.name()),
        }
    }
}

/// The SELECT block of one survey
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectBlock {
    pub survey_id: i64,
    pub columns: Vec<ColumnExpr>,
}

impl SelectBlock {
    pub fn column_names(&self) -> Vec<String> {
        KEY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.columns.iter().map(ColumnExpr::name))
            .collect()
    }

    /// Render the block. Only users with at least one answer in the survey
    /// are selected.
    pub fn to_sql(&self) -> String {
        let mut select = format!("SELECT u.UserId AS UserId, {} AS SurveyId", self.survey_id);
        for column in &self.columns {
            select.push_str(",\n    ");
            select.push_str(&column.to_sql());
        }
        format!(
            "{}\nFROM [User] AS u\nWHERE EXISTS (SELECT * FROM Answer AS a \
             WHERE u.UserId = a.UserId AND a.SurveyId = {})",
            select, self.survey_id
        )
    }
}

/// Column layout of the whole pivot query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotPlan {
    question_ids: Vec<i64>,
    blocks: Vec<SelectBlock>,
}

impl PivotPlan {
    pub fn from_snapshot(snapshot: &StructureSnapshot) -> Self {
        Self::build(&snapshot.question_ids(), &snapshot.asked_by_survey())
    }

    /// Lay out one block per survey (ascending) and one column per question
    /// of `question_ids` (deduplicated, ascending) in every block.
    ///
    /// Asked ids outside `question_ids` are ignored: the universal list
    /// decides the columns.
    pub fn build(question_ids: &[i64], asked_by_survey: &BTreeMap<i64, BTreeSet<i64>>) -> Self {
        let question_ids: Vec<i64> = question_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let blocks = asked_by_survey
            .iter()
            .map(|(&survey_id, asked)| SelectBlock {
                survey_id,
                columns: question_ids
                    .iter()
                    .map(|&question_id| {
                        if asked.contains(&question_id) {
                            ColumnExpr::Lookup {
                                survey_id,
                                question_id,
                            }
                        } else {
                            ColumnExpr::Null { question_id }
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            question_ids,
            blocks,
        }
    }

    pub fn question_ids(&self) -> &[i64] {
        &self.question_ids
    }

    pub fn blocks(&self) -> &[SelectBlock] {
        &self.blocks
    }

    pub fn block(&self, survey_id: i64) -> Option<&SelectBlock> {
        self.blocks.iter().find(|b| b.survey_id == survey_id)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Result columns: the key columns then one per question
    pub fn column_names(&self) -> Vec<String> {
        KEY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.question_ids.iter().map(|&q| answer_column(q)))
            .collect()
    }

    /// Render the full statement. Empty when the plan has no survey.
    pub fn render(&self) -> String {
        if self.blocks.is_empty() {
            return String::new();
        }
        let body = self
            .blocks
            .iter()
            .map(SelectBlock::to_sql)
            .collect::<Vec<_>>()
            .join("\nUNION\n");
        format!("{}\nORDER BY SurveyId, UserId", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::StructureRecord;

    /// Survey 1 asks {1,2}, survey 2 asks {1,3}
    fn scenario() -> StructureSnapshot {
        StructureSnapshot::new(vec![
            StructureRecord::new(1, 1, true),
            StructureRecord::new(1, 2, true),
            StructureRecord::new(1, 3, false),
            StructureRecord::new(2, 1, true),
            StructureRecord::new(2, 2, false),
            StructureRecord::new(2, 3, true),
        ])
    }

    /// Split a rendered query back into its blocks
    fn blocks_of(sql: &str) -> Vec<&str> {
        sql.trim_end_matches("\nORDER BY SurveyId, UserId")
            .split("\nUNION\n")
            .collect()
    }

    /// Aliases of the generated answer columns of one rendered block
    fn aliases_of(block: &str) -> Vec<String> {
        block
            .split(" AS ")
            .skip(1)
            .filter_map(|part| {
                let name: String = part
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                name.starts_with("Answer_").then_some(name)
            })
            .collect()
    }

    #[test]
    fn test_scenario_has_two_union_blocks() {
        let sql = PivotPlan::from_snapshot(&scenario()).render();
        let blocks = blocks_of(&sql);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("1 AS SurveyId"));
        assert!(blocks[1].contains("2 AS SurveyId"));
        assert_eq!(sql.matches("\nUNION\n").count(), 1);
        assert!(!sql.contains("UNION ALL"));
        assert!(!sql.starts_with("UNION"));
    }

    #[test]
    fn test_every_block_has_identical_columns() {
        let sql = PivotPlan::from_snapshot(&scenario()).render();
        let aliases: Vec<Vec<String>> = blocks_of(&sql).into_iter().map(aliases_of).collect();
        assert_eq!(aliases[0], vec!["Answer_1", "Answer_2", "Answer_3"]);
        assert!(aliases.iter().all(|a| *a == aliases[0]));
    }

    #[test]
    fn test_unasked_question_is_null_literal() {
        let plan = PivotPlan::from_snapshot(&scenario());
        let survey_1 = plan.block(1).unwrap();
        let survey_2 = plan.block(2).unwrap();

        assert_eq!(survey_1.columns[2], ColumnExpr::Null { question_id: 3 });
        assert_eq!(survey_2.columns[1], ColumnExpr::Null { question_id: 2 });
        assert_eq!(survey_1.columns[2].to_sql(), "NULL AS Answer_3");

        let sql = survey_2.to_sql();
        assert!(sql.contains("NULL AS Answer_2"));
        assert!(!sql.contains("a.QuestionId = 2"));
    }

    #[test]
    fn test_asked_question_is_scoped_lookup() {
        let plan = PivotPlan::from_snapshot(&scenario());
        let column = plan.block(2).unwrap().columns[2];
        assert_eq!(
            column,
            ColumnExpr::Lookup {
                survey_id: 2,
                question_id: 3
            }
        );

        let sql = column.to_sql();
        assert!(sql.starts_with("COALESCE(("));
        assert!(sql.contains("a.SurveyId = 2 AND a.QuestionId = 3"));
        assert!(sql.ends_with("), NULL) AS Answer_3"));
    }

    #[test]
    fn test_blocks_restrict_to_users_with_answers() {
        let plan = PivotPlan::from_snapshot(&scenario());
        let sql = plan.block(1).unwrap().to_sql();
        assert!(sql.contains(
            "WHERE EXISTS (SELECT * FROM Answer AS a WHERE u.UserId = a.UserId AND a.SurveyId = 1)"
        ));
    }

    #[test]
    fn test_build_sorts_and_dedups_question_ids() {
        let mut asked = BTreeMap::new();
        asked.insert(7, BTreeSet::from([5, 99]));
        asked.insert(3, BTreeSet::new());
        let plan = PivotPlan::build(&[5, 2, 5], &asked);

        assert_eq!(plan.question_ids(), &[2, 5]);
        assert_eq!(plan.blocks()[0].survey_id, 3);
        assert!(plan.blocks()[0].columns.iter().all(|c| !c.is_lookup()));
        assert_eq!(
            plan.blocks()[1].columns,
            vec![
                ColumnExpr::Null { question_id: 2 },
                ColumnExpr::Lookup {
                    survey_id: 7,
                    question_id: 5
                },
            ]
        );
    }

    #[test]
    fn test_column_names() {
        let plan = PivotPlan::from_snapshot(&scenario());
        insta::assert_snapshot!(
            plan.column_names().join(","),
            @"UserId,SurveyId,Answer_1,Answer_2,Answer_3"
        );
        for block in plan.blocks() {
            assert_eq!(block.column_names(), plan.column_names());
        }
    }

    #[test]
    fn test_empty_snapshot_renders_nothing() {
        let plan = PivotPlan::from_snapshot(&StructureSnapshot::default());
        assert!(plan.is_empty());
        assert_eq!(plan.render(), "");
        assert_eq!(plan.column_names(), vec!["UserId", "SurveyId"]);
    }
}
