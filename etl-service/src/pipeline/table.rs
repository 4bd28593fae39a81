use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Real)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Text)
    }
}

/// A single value of a table row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn opt_real(value: Option<f64>) -> Self {
        value.map(Self::real).unwrap_or(Self::Null)
    }

    /// NaN and infinities are stored as null.
    pub fn real(value: f64) -> Self {
        if value.is_finite() {
            Self::Real(value)
        } else {
            Self::Null
        }
    }

    pub fn flag(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map(|v| Self::Text(v.to_string())).unwrap_or(Self::Null)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A record that can be written as one row of a flat table.
///
/// `cells` lines up with the column list the table is written with, which
/// is fixed by configuration rather than by any row.
pub trait TableRow {
    fn cells(&self) -> Vec<Cell>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_reals_become_null() {
        assert_eq!(Cell::real(f64::NAN), Cell::Null);
        assert_eq!(Cell::real(f64::INFINITY), Cell::Null);
        assert_eq!(Cell::real(1.5), Cell::Real(1.5));
        assert_eq!(Cell::opt_real(None), Cell::Null);
    }

    #[test]
    fn cells_render_for_delimited_text() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::flag(true).to_string(), "1");
        assert_eq!(Cell::Real(276.0).to_string(), "276");
        assert_eq!(Cell::Real(0.25).to_string(), "0.25");
        assert_eq!(Cell::from("dev-1").to_string(), "dev-1");
    }
}
