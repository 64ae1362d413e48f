//! Survey database access
//!
//! Read-only access to the survey schema:
//! - `Survey(SurveyId, SurveyDescription, Survey_UserAdminId)`
//! - `Question(QuestionId, Question_Text)`
//! - `SurveyStructure(SurveyId, QuestionId)`, the join table
//! - `Answer(QuestionId, SurveyId, UserId, Answer_Value)`
//! - `[User](UserId, User_Name, User_Email)`
//!
//! Every statement is prepared per call and finalized when it goes out of
//! scope, on success and on error alike.

use std::fmt;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;

use crate::core::pivot::PivotPlan;
use crate::core::structure::{StructureRecord, StructureSource};
use crate::core::table::PivotTable;

/// Asked = 1 when any join-table row of the survey matches the question.
/// A survey missing from the join table yields no rows at all.
const SURVEY_STRUCTURE_SQL: &str = r#"
    SELECT s.SurveyId, q.QuestionId,
           MAX(CASE WHEN s.QuestionId = q.QuestionId THEN 1 ELSE 0 END) AS IsAsked
    FROM Question q, SurveyStructure s
    WHERE s.SurveyId = ?1
    GROUP BY s.SurveyId, q.QuestionId
    ORDER BY q.QuestionId
"#;

/// Every answer with its user, question and survey attributes
pub const ALL_ANSWERS_SQL: &str = r#"
    SELECT a.*, u.User_Name, u.User_Email,
           q.Question_Text, s.SurveyDescription, s.Survey_UserAdminId
    FROM Answer AS a
    INNER JOIN [User] AS u ON a.UserId = u.UserId
    INNER JOIN Question AS q ON a.QuestionId = q.QuestionId
    INNER JOIN Survey AS s ON a.SurveyId = s.SurveyId
    ORDER BY a.SurveyId, a.UserId, a.QuestionId
"#;

/// Server and database names identifying the survey database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub server: String,
    pub database: String,
}

impl ConnectionTarget {
    pub fn new(server: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
        }
    }

    /// Database file: `<server>/<database>`, `.db` appended when the
    /// database name has no extension
    pub fn path(&self) -> PathBuf {
        let database = Path::new(&self.database);
        let file = if database.extension().is_some() {
            database.to_path_buf()
        } else {
            database.with_extension("db")
        };
        Path::new(&self.server).join(file)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.server, self.database)
    }
}

/// Errors raised by the survey database
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    #[error("Connection failed to {target}: {source}")]
    #[diagnostic(
        code(survey_pivot::db::connection),
        help("check the server and database entries of the configuration file")
    )]
    Connection {
        target: ConnectionTarget,
        source: rusqlite::Error,
    },

    #[error("Query failed ({context}): {source}")]
    #[diagnostic(code(survey_pivot::db::query))]
    Query {
        context: String,
        source: rusqlite::Error,
    },
}

impl DbError {
    fn query(context: &str) -> impl FnOnce(rusqlite::Error) -> DbError + '_ {
        move |source| DbError::Query {
            context: context.to_string(),
            source,
        }
    }
}

/// An open, read-only connection to the survey database
pub struct SurveyDatabase {
    conn: Connection,
    target: ConnectionTarget,
}

impl SurveyDatabase {
    /// Open the database named by `target`. The file must already exist.
    pub fn connect(target: &ConnectionTarget) -> Result<Self, DbError> {
        let path = target.path();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .and_then(|conn| {
            // Opening is lazy; touch the schema so a bad file fails here
            conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(conn)
        })
        .map_err(|source| DbError::Connection {
            target: target.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "opened survey database");
        Ok(Self {
            conn,
            target: target.clone(),
        })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection, target: ConnectionTarget) -> Self {
        Self { conn, target }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Execute a statement and collect every row as nullable text
    pub fn query_table(&self, sql: &str, context: &str) -> Result<PivotTable, DbError> {
        let mut stmt = self.conn.prepare(sql).map_err(DbError::query(context))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(cell_text(row.get::<_, Value>(i)?));
                }
                Ok(values)
            })
            .map_err(DbError::query(context))?;

        let mut table = PivotTable::new(columns);
        for row in rows {
            table.push_row(row.map_err(DbError::query(context))?);
        }
        Ok(table)
    }

    /// Run the synthesized pivot statement.
    ///
    /// An empty plan has no statement to run and yields an empty table with
    /// only the key columns.
    pub fn execute_pivot(&self, plan: &PivotPlan) -> Result<PivotTable, DbError> {
        if plan.is_empty() {
            return Ok(PivotTable::new(plan.column_names()));
        }
        let sql = plan.render();
        tracing::debug!(%sql, "executing pivot query");
        let table = self.query_table(&sql, "pivot view")?;
        tracing::debug!(rows = table.len(), "pivot query done");
        Ok(table)
    }

    /// Every answer joined to its user, question and survey
    pub fn all_answers(&self) -> Result<PivotTable, DbError> {
        self.query_table(ALL_ANSWERS_SQL, "all answers")
    }
}

impl StructureSource for SurveyDatabase {
    fn survey_ids(&self) -> Result<Vec<i64>, DbError> {
        let context = "survey list";
        let mut stmt = self
            .conn
            .prepare("SELECT SurveyId FROM Survey ORDER BY SurveyId")
            .map_err(DbError::query(context))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(DbError::query(context))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::query(context))?;
        Ok(ids)
    }

    fn survey_structure(&self, survey_id: i64) -> Result<Vec<StructureRecord>, DbError> {
        let context = "survey structure";
        let mut stmt = self
            .conn
            .prepare(SURVEY_STRUCTURE_SQL)
            .map_err(DbError::query(context))?;
        let records = stmt
            .query_map(params![survey_id], |row| {
                Ok(StructureRecord::new(
                    row.get(0)?,
                    row.get(1)?,
                    row.get::<_, i64>(2)? > 0,
                ))
            })
            .map_err(DbError::query(context))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::query(context))?;
        Ok(records)
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(_) => Some("<blob>".to_string()),
    }
}
