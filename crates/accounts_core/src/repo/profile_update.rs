//! Partial profile updates compiled to parameterized SQL.
//!
//! # Responsibility
//! - Map updatable field names onto columns at compile time.
//! - Turn a sparse field/value set into one `UPDATE` statement.
//!
//! # Invariants
//! - Only fields present in the update appear in `SET`.
//! - Null/absent values are skipped, never written as `NULL`.
//! - The `"DEFAULT"` sentinel emits the column default expression unquoted.
//! - Every other value is a bound parameter; no value text enters the SQL.
//! - `last_login` cannot be named by callers; only login stamps it.

use crate::model::ValidationError;
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// Literal text that selects a column's store default.
pub const DEFAULT_SENTINEL: &str = "DEFAULT";

/// Updatable `user_profiles` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileField {
    FirstName,
    LastName,
    Email,
    Phone,
    LastLogin,
}

impl ProfileField {
    /// Fields a caller may name in a profile update.
    pub const EDITABLE: [Self; 4] = [Self::FirstName, Self::LastName, Self::Email, Self::Phone];

    pub fn column(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::LastLogin => "last_login",
        }
    }

    /// Default expression declared for the column in `0001_user_accounts.sql`.
    pub fn default_sql(self) -> &'static str {
        match self {
            Self::FirstName | Self::LastName => "''",
            Self::Email | Self::Phone => "NULL",
            Self::LastLogin => "(strftime('%s', 'now') * 1000)",
        }
    }

    pub fn is_editable(self) -> bool {
        self != Self::LastLogin
    }

    /// Resolves a transport field name (the column name).
    ///
    /// `last_login` is not resolvable; it is reported as unknown.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        Self::EDITABLE
            .into_iter()
            .find(|field| field.column() == name)
            .ok_or_else(|| ValidationError::UnknownField(name.to_string()))
    }
}

/// New value for one profile field.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    /// Use the column's store-defined default.
    Default,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl UpdateValue {
    /// Interprets raw text, recognizing the [`DEFAULT_SENTINEL`].
    pub fn from_text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value == DEFAULT_SENTINEL {
            Self::Default
        } else {
            Self::Text(value)
        }
    }
}

/// Sparse set of profile field updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    fields: BTreeMap<ProfileField, UpdateValue>,
}

/// SQL plus bound parameters for one update statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUpdate {
    pub sql: String,
    pub params: Vec<Value>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to a literal text value.
    pub fn set(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.fields.insert(field, UpdateValue::Text(value.into()));
        self
    }

    /// Resets `field` to its column default.
    pub fn set_default(mut self, field: ProfileField) -> Self {
        self.fields.insert(field, UpdateValue::Default);
        self
    }

    /// Builds an update from name/value pairs. `None` values are skipped.
    pub fn from_pairs(pairs: &[(&str, Option<&str>)]) -> Result<Self, ValidationError> {
        let mut update = Self::new();
        for (name, value) in pairs {
            let field = ProfileField::parse(name)?;
            if let Some(value) = value {
                update.fields.insert(field, UpdateValue::from_text(*value));
            }
        }
        Ok(update)
    }

    /// Builds an update from a decoded JSON object.
    ///
    /// JSON `null` is skipped. Numbers and booleans are bound as numeric
    /// parameters (`true`/`false` as `1`/`0`); arrays and objects are
    /// rejected.
    pub fn from_json(
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        let mut update = Self::new();
        for (name, value) in object {
            let field = ProfileField::parse(name)?;
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(text) => {
                    update.fields.insert(field, UpdateValue::from_text(text.as_str()));
                }
                serde_json::Value::Bool(flag) => {
                    update.fields.insert(field, UpdateValue::Integer(i64::from(*flag)));
                }
                serde_json::Value::Number(number) => {
                    let value = match (number.as_i64(), number.as_f64()) {
                        (Some(integer), _) => UpdateValue::Integer(integer),
                        (None, Some(real)) => UpdateValue::Real(real),
                        (None, None) => {
                            return Err(ValidationError::UnsupportedValue {
                                field: name.clone(),
                            })
                        }
                    };
                    update.fields.insert(field, value);
                }
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(ValidationError::UnsupportedValue {
                        field: name.clone(),
                    })
                }
            }
        }
        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: ProfileField) -> Option<&UpdateValue> {
        self.fields.get(&field)
    }

    /// Fields present in this update, in column order.
    pub fn fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.fields.keys().copied()
    }

    /// Compiles into `UPDATE user_profiles ... WHERE account_id = ?N`.
    ///
    /// Returns `None` when no field is present.
    pub fn compile(&self, account_key: &str) -> Option<CompiledUpdate> {
        if self.fields.is_empty() {
            return None;
        }

        let mut assignments = Vec::with_capacity(self.fields.len());
        let mut params = Vec::with_capacity(self.fields.len() + 1);
        for (field, value) in &self.fields {
            match value {
                UpdateValue::Default => {
                    assignments.push(format!("{} = {}", field.column(), field.default_sql()));
                }
                UpdateValue::Text(text) => {
                    params.push(Value::Text(text.clone()));
                    assignments.push(format!("{} = ?{}", field.column(), params.len()));
                }
                UpdateValue::Integer(integer) => {
                    params.push(Value::Integer(*integer));
                    assignments.push(format!("{} = ?{}", field.column(), params.len()));
                }
                UpdateValue::Real(real) => {
                    params.push(Value::Real(*real));
                    assignments.push(format!("{} = ?{}", field.column(), params.len()));
                }
            }
        }
        params.push(Value::Text(account_key.to_string()));

        Some(CompiledUpdate {
            sql: format!(
                "UPDATE user_profiles SET {} WHERE account_id = ?{};",
                assignments.join(", "),
                params.len()
            ),
            params,
        })
    }
}
