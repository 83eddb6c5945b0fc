//! Tagged statement representation and its PostgreSQL compilation
//!
//! The CRUD engine never builds SQL strings. It produces a [`Statement`]
//! holding validated [`Identifier`]s and bound [`SqlValue`]s; the connection
//! turns it into text with [`Statement::compile`] right before execution.
//! Every data value, including LIMIT/OFFSET and key values, ends up in
//! [`CompiledQuery::parameters`], never in the SQL text.

use crate::database::traits::DatabaseError;
use crate::identifier::Identifier;
use crate::schema::ColumnDescriptor;
use serde_json::Value;

/// A scalar passed to the database as a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(flag) => SqlValue::Boolean(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => SqlValue::Integer(integer),
                None => SqlValue::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => SqlValue::Text(text.clone()),
            // JSON documents go to json/jsonb columns as text
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        }
    }
}

impl From<&SqlValue> for Value {
    fn from(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Boolean(flag) => Value::Bool(*flag),
            SqlValue::Integer(integer) => Value::from(*integer),
            SqlValue::Float(float) => serde_json::Number::from_f64(*float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(text) => Value::String(text.clone()),
        }
    }
}

/// A column paired with the value bound for it
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub column: Identifier,

    /// Catalog type text the placeholder is cast to (`$2::integer`)
    pub cast: Option<String>,

    pub value: SqlValue,
}

impl Binding {
    /// Parameter sent for this binding
    ///
    /// Values with a cast travel as text so the target type's input function
    /// parses them: `'3.7'::integer` is rejected where a float8 cast rounds.
    fn parameter(&self) -> SqlValue {
        if self.cast.is_none() {
            return self.value.clone();
        }
        match &self.value {
            SqlValue::Null => SqlValue::Null,
            SqlValue::Boolean(flag) => SqlValue::Text(flag.to_string()),
            SqlValue::Integer(integer) => SqlValue::Text(integer.to_string()),
            SqlValue::Float(float) => SqlValue::Text(float.to_string()),
            SqlValue::Text(text) => SqlValue::Text(text.clone()),
        }
    }
}

/// `information_schema` types the connection decodes from their binary form
const BINARY_DECODED_TYPES: [&str; 19] = [
    "smallint",
    "integer",
    "bigint",
    "real",
    "double precision",
    "numeric",
    "boolean",
    "text",
    "character varying",
    "character",
    "name",
    "json",
    "jsonb",
    "uuid",
    "date",
    "time without time zone",
    "timestamp without time zone",
    "timestamp with time zone",
    "bytea",
];

/// An output column of a row-returning statement
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub column: Identifier,

    /// Read through the type's text output (enums, arrays, intervals, ...)
    pub as_text: bool,
}

impl Projection {
    pub fn for_column(column: &ColumnDescriptor) -> Self {
        Self {
            column: Identifier::from_catalog(&column.column_name),
            as_text: !BINARY_DECODED_TYPES.contains(&column.data_type.as_str()),
        }
    }
}

/// Select list for `projection`; empty means every column as stored
fn select_list(projection: &[Projection]) -> String {
    if projection.is_empty() {
        return "*".to_string();
    }
    projection
        .iter()
        .map(|output| {
            let column = output.column.quoted();
            if output.as_text {
                format!("{}::text AS {}", column, column)
            } else {
                column
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A column of a table to create, with its type and constraint text checked
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    name: Identifier,
    sql_type: String,
    constraints: Option<String>,
}

impl ColumnSpec {
    /// Check a user-supplied column definition
    ///
    /// Type text is limited to characters that occur in type names
    /// (`numeric(10, 2)`, `double precision`, `text[]`). Constraint text is
    /// passed through as a raw SQL fragment, but must not contain statement
    /// separators or comments.
    pub fn new(name: &str, sql_type: &str, constraints: Option<&str>) -> Result<Self, DatabaseError> {
        let name = Identifier::new(name)?;

        let sql_type = sql_type.trim();
        let type_is_valid = sql_type
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic())
            && sql_type.chars().all(|character| {
                character.is_ascii_alphanumeric() || " _(),[]".contains(character)
            });
        if !type_is_valid {
            return Err(DatabaseError::Validation(format!(
                "Invalid type for column {}: {}",
                name, sql_type
            )));
        }

        let constraints = constraints
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| {
                if [";", "--", "/*"].iter().any(|token| text.contains(token)) {
                    Err(DatabaseError::Validation(format!(
                        "Invalid constraints for column {}",
                        name
                    )))
                } else {
                    Ok(text.to_string())
                }
            })
            .transpose()?;

        Ok(Self {
            name,
            sql_type: sql_type.to_string(),
            constraints,
        })
    }

    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn constraints(&self) -> Option<&str> {
        self.constraints.as_deref()
    }
}

/// One operation of the CRUD engine
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `SELECT COUNT(*)` over a whole table
    Count { table: Identifier },

    /// One window of rows ordered by `order_by`
    SelectPage {
        table: Identifier,
        projection: Vec<Projection>,
        order_by: Identifier,
        limit: i64,
        offset: i64,
    },

    /// Insert one row; no values means `DEFAULT VALUES`
    Insert {
        table: Identifier,
        values: Vec<Binding>,
        projection: Vec<Projection>,
    },

    /// Update the row matching `key`
    Update {
        table: Identifier,
        key: Binding,
        assignments: Vec<Binding>,
        projection: Vec<Projection>,
    },

    /// Delete the row matching `key`
    Delete {
        table: Identifier,
        key: Binding,
        projection: Vec<Projection>,
    },

    /// Create a table with a serial identity column first
    CreateTable {
        table: Identifier,
        identity: Identifier,
        columns: Vec<ColumnSpec>,
    },

    /// Drop a table without CASCADE
    DropTable { table: Identifier },
}

/// SQL text plus its positional parameters (`$1`, `$2`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<SqlValue>,
}

impl Statement {
    /// Table the statement operates on
    pub fn table(&self) -> &Identifier {
        match self {
            Statement::Count { table }
            | Statement::SelectPage { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. }
            | Statement::CreateTable { table, .. }
            | Statement::DropTable { table } => table,
        }
    }

    /// Compile to PostgreSQL text
    pub fn compile(&self) -> CompiledQuery {
        let mut parameters = Vec::new();

        let sql = match self {
            Statement::Count { table } => {
                format!("SELECT COUNT(*) AS count FROM {}", table.quoted())
            }
            Statement::SelectPage {
                table,
                projection,
                order_by,
                limit,
                offset,
            } => {
                parameters.push(SqlValue::Integer(*limit));
                parameters.push(SqlValue::Integer(*offset));
                format!(
                    "SELECT {} FROM {} ORDER BY {} LIMIT $1 OFFSET $2",
                    select_list(projection),
                    table.quoted(),
                    order_by.quoted()
                )
            }
            Statement::Insert {
                table,
                values,
                projection,
            } if values.is_empty() => format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                table.quoted(),
                select_list(projection)
            ),
            Statement::Insert {
                table,
                values,
                projection,
            } => {
                let columns: Vec<String> = values.iter().map(|binding| binding.column.quoted()).collect();
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|binding| {
                        parameters.push(binding.parameter());
                        placeholder(parameters.len(), binding.cast.as_deref())
                    })
                    .collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                    table.quoted(),
                    columns.join(", "),
                    placeholders.join(", "),
                    select_list(projection)
                )
            }
            Statement::Update {
                table,
                key,
                assignments,
                projection,
            } => {
                parameters.push(key.parameter());
                let condition = format!(
                    "{} = {}",
                    key.column.quoted(),
                    placeholder(1, key.cast.as_deref())
                );
                let assignments: Vec<String> = assignments
                    .iter()
                    .map(|binding| {
                        parameters.push(binding.parameter());
                        format!(
                            "{} = {}",
                            binding.column.quoted(),
                            placeholder(parameters.len(), binding.cast.as_deref())
                        )
                    })
                    .collect();
                format!(
                    "UPDATE {} SET {} WHERE {} RETURNING {}",
                    table.quoted(),
                    assignments.join(", "),
                    condition,
                    select_list(projection)
                )
            }
            Statement::Delete {
                table,
                key,
                projection,
            } => {
                parameters.push(key.parameter());
                format!(
                    "DELETE FROM {} WHERE {} = {} RETURNING {}",
                    table.quoted(),
                    key.column.quoted(),
                    placeholder(1, key.cast.as_deref()),
                    select_list(projection)
                )
            }
            Statement::CreateTable {
                table,
                identity,
                columns,
            } => {
                let mut definitions = format!("{} SERIAL PRIMARY KEY", identity.quoted());
                for column in columns {
                    definitions.push_str(&format!(", {} {}", column.name.quoted(), column.sql_type));
                    if let Some(constraints) = &column.constraints {
                        definitions.push(' ');
                        definitions.push_str(constraints);
                    }
                }
                format!("CREATE TABLE {} ({})", table.quoted(), definitions)
            }
            Statement::DropTable { table } => format!("DROP TABLE {}", table.quoted()),
        };

        CompiledQuery { sql, parameters }
    }
}

fn placeholder(position: usize, cast: Option<&str>) -> String {
    match cast {
        Some(cast) => format!("${}::{}", position, cast),
        None => format!("${}", position),
    }
}
