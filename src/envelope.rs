//! Response envelope returned for every query.
//!
//! The JSON form carries an internal `type` tag:
//!
//! ```json
//! {"type": "bar_chart", "data": {"labels": ["A"], "values": [1], "title": "T"}}
//! {"type": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

/// Uniform, visualization-ready result of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Plain sentence
    Text {
        /// The sentence
        data: String,
    },
    /// Bar chart
    BarChart {
        /// Chart payload
        data: ChartData,
    },
    /// Pie chart
    PieChart {
        /// Chart payload
        data: ChartData,
    },
    /// Values over an ordered sequence of dates
    TimeSeries {
        /// Series payload
        data: TimeSeriesData,
    },
    /// Rows of text cells
    Table {
        /// Table payload
        data: TableData,
    },
    /// Human-readable failure
    Error {
        /// What went wrong
        message: String,
    },
}

/// Labels and values for bar and pie charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// Category labels
    pub labels: Vec<String>,
    /// One value per label
    pub values: Vec<Number>,
    /// Chart title
    pub title: String,
}

/// Labels and values for a time series, optionally highlighting one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesData {
    /// Period labels in order
    pub labels: Vec<String>,
    /// One value per label
    pub values: Vec<Number>,
    /// Series title
    pub title: String,
    /// Label to emphasise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

/// Chart value. Counts stay integers on the wire, averages stay floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Whole count
    Integer(u64),
    /// Measured or averaged value
    Float(f64),
}

impl Number {
    /// Value as a float, for comparisons across variants
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(n) => n as f64,
            Self::Float(x) => x,
        }
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        Self::Integer(n)
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Self::Integer(n as u64)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

/// Headers and rows for a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Column headers
    pub headers: Vec<String>,
    /// Rows, each as long as `headers`
    pub rows: Vec<Vec<String>>,
}

impl Envelope {
    /// Text envelope
    pub fn text(data: impl Into<String>) -> Self {
        Self::Text { data: data.into() }
    }

    /// Bar chart from `(label, value)` pairs
    pub fn bar_chart<I, L, V>(title: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<Number>,
    {
        Self::BarChart {
            data: ChartData::from_points(title, points),
        }
    }

    /// Pie chart from `(label, value)` pairs
    pub fn pie_chart<I, L, V>(title: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<Number>,
    {
        Self::PieChart {
            data: ChartData::from_points(title, points),
        }
    }

    /// Error envelope
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name of the variant
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::BarChart { .. } => "bar_chart",
            Self::PieChart { .. } => "pie_chart",
            Self::TimeSeries { .. } => "time_series",
            Self::Table { .. } => "table",
            Self::Error { .. } => "error",
        }
    }

    /// True for the error variant
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Check the shape invariants: charts and series have one value per
    /// label, table rows match the header width.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::BarChart { data } | Self::PieChart { data } => {
                data.labels.len() == data.values.len()
            },
            Self::TimeSeries { data } => data.labels.len() == data.values.len(),
            Self::Table { data } => data.rows.iter().all(|row| row.len() == data.headers.len()),
            Self::Text { .. } | Self::Error { .. } => true,
        }
    }
}

impl ChartData {
    /// Split `(label, value)` pairs into parallel vectors
    pub fn from_points<I, L, V>(title: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<Number>,
    {
        let (labels, values) = points
            .into_iter()
            .map(|(label, value)| (label.into(), value.into()))
            .unzip();
        Self {
            labels,
            values,
            title: title.into(),
        }
    }
}
