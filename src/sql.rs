use chrono::DateTime;
use sqlparser::ast::{self, Expr, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::ast::ObjectNamePart;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::model::Ms;

pub const RESERVATIONS_TABLE: &str = "reservations";
pub const AVAILABLE_ROOMS_TABLE: &str = "available_rooms";

/// Column order used when an INSERT omits its column list.
const INSERT_COLUMNS: [&str; 3] = ["room_id", "start", "end"];

/// Parsed command from SQL input. `None` fields were given as NULL or omitted.
#[derive(Debug, PartialEq)]
pub enum Command {
    BookRoom {
        room_id: Option<String>,
        start: Option<Ms>,
        end: Option<Ms>,
    },
    /// `room_id == None` lists every room.
    SelectReservations {
        room_id: Option<String>,
    },
    SelectAvailableRoom {
        start: Option<Ms>,
        end: Option<Ms>,
    },
    Reset,
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.to_uppercase().starts_with("TRUNCATE") {
        return parse_truncate(trimmed);
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

/// `TRUNCATE [TABLE] reservations`
fn parse_truncate(sql: &str) -> Result<Command, SqlError> {
    let mut words = sql.split_whitespace().skip(1);
    let mut table = words.next().ok_or(SqlError::Parse("TRUNCATE without table".into()))?;
    if table.eq_ignore_ascii_case("TABLE") {
        table = words.next().ok_or(SqlError::Parse("TRUNCATE without table".into()))?;
    }
    if let Some(extra) = words.next() {
        return Err(SqlError::Unsupported(format!("TRUNCATE option {extra}")));
    }
    let table = table.trim_matches('"').to_lowercase();
    if table != RESERVATIONS_TABLE {
        return Err(SqlError::UnknownTable(table));
    }
    Ok(Command::Reset)
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    if table != RESERVATIONS_TABLE {
        return Err(SqlError::UnknownTable(table));
    }

    let values = extract_insert_values(insert)?;
    let columns: Vec<String> = if insert.columns.is_empty() {
        INSERT_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        insert.columns.iter().map(|c| c.value.to_lowercase()).collect()
    };
    if columns.len() != values.len() {
        return Err(SqlError::WrongArity(RESERVATIONS_TABLE, columns.len(), values.len()));
    }

    let (mut room_id, mut start, mut end) = (None, None, None);
    for (column, value) in columns.iter().zip(&values) {
        match column.as_str() {
            "room_id" => room_id = parse_string_or_null(value)?,
            "start" => start = parse_timestamp_or_null(value)?,
            "end" => end = parse_timestamp_or_null(value)?,
            other => return Err(SqlError::UnknownColumn(other.to_string())),
        }
    }
    Ok(Command::BookRoom { room_id, start, end })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = Filters::default();
    if let Some(selection) = &select.selection {
        extract_filters(selection, &mut filters)?;
    }

    match table.as_str() {
        RESERVATIONS_TABLE => {
            if filters.has_start || filters.has_end {
                return Err(SqlError::Unsupported(format!(
                    "{RESERVATIONS_TABLE} can only be filtered by room_id"
                )));
            }
            Ok(Command::SelectReservations {
                room_id: filters.room_id,
            })
        }
        AVAILABLE_ROOMS_TABLE => {
            if filters.room_id.is_some() {
                return Err(SqlError::Unsupported(format!(
                    "{AVAILABLE_ROOMS_TABLE} cannot be filtered by room_id"
                )));
            }
            if !filters.has_start {
                return Err(SqlError::MissingFilter("start"));
            }
            if !filters.has_end {
                return Err(SqlError::MissingFilter("end"));
            }
            Ok(Command::SelectAvailableRoom {
                start: filters.start,
                end: filters.end,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

#[derive(Default)]
struct Filters {
    room_id: Option<String>,
    start: Option<Ms>,
    end: Option<Ms>,
    // NULL is a legal bound here; the engine reports it as a missing bound.
    has_start: bool,
    has_end: bool,
}

fn extract_filters(expr: &Expr, filters: &mut Filters) -> Result<(), SqlError> {
    match expr {
        Expr::Nested(inner) => extract_filters(inner, filters)?,
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::And => {
                extract_filters(left, filters)?;
                extract_filters(right, filters)?;
            }
            ast::BinaryOperator::Eq | ast::BinaryOperator::GtEq | ast::BinaryOperator::LtEq => {
                match (expr_column_name(left).as_deref(), op) {
                    (Some("room_id"), ast::BinaryOperator::Eq) => {
                        filters.room_id = Some(parse_string(right)?);
                    }
                    (Some("start"), ast::BinaryOperator::Eq | ast::BinaryOperator::GtEq) => {
                        filters.start = parse_timestamp_or_null(right)?;
                        filters.has_start = true;
                    }
                    (Some("end"), ast::BinaryOperator::Eq | ast::BinaryOperator::LtEq) => {
                        filters.end = parse_timestamp_or_null(right)?;
                        filters.has_end = true;
                    }
                    (Some(col), _) => {
                        return Err(SqlError::Unsupported(format!("filter {col} {op}")));
                    }
                    (None, _) => return Err(SqlError::Parse(format!("expected column, got {left}"))),
                }
            }
            _ => return Err(SqlError::Unsupported(format!("operator {op}"))),
        },
        _ => return Err(SqlError::Unsupported(format!("filter {expr}"))),
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT; book one room per statement".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    parse_string_or_null(expr)?.ok_or_else(|| SqlError::Parse("expected string, got NULL".into()))
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        Some(Value::SingleQuotedString(s) | Value::Number(s, _)) => Ok(Some(s.clone())),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

/// Unix milliseconds, either as a number or as a quoted number / RFC 3339 string.
fn parse_timestamp_or_null(expr: &Expr) -> Result<Option<Ms>, SqlError> {
    if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        return match parse_timestamp_or_null(expr)? {
            Some(ms) => Ok(Some(-ms)),
            None => Err(SqlError::Parse("cannot negate NULL".into())),
        };
    }
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        Some(Value::Number(s, _)) => s
            .parse()
            .map(Some)
            .map_err(|e| SqlError::Parse(format!("bad timestamp {s}: {e}"))),
        Some(Value::SingleQuotedString(s)) => parse_timestamp_str(s).map(Some),
        Some(value) => Err(SqlError::Parse(format!("expected timestamp, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_timestamp_str(s: &str) -> Result<Ms, SqlError> {
    if let Ok(ms) = s.parse::<Ms>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| SqlError::Parse(format!("bad timestamp '{s}': {e}")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
