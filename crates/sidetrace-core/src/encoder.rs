//! Schema-driven feature encoding
//!
//! Expands execution-trace rows into fixed-width numeric feature vectors
//! for models that cannot consume categorical or packed integer columns:
//! the three pipeline-stage categories become one-hot groups over an
//! enumerated instruction domain, and every 32-bit operand/bus field
//! becomes 32 single-bit columns named `<field>_<bit>`.
//!
//! The encoding is independent of any table library: column names are
//! stable, ordered, and queryable, so models address features by name.

use crate::exec_trace::{ExecutionRecord, ExecutionTrace};
use crate::types::{ScaError, ScaResult};

/// Default instruction-category domain for Cortex-M0 pipeline stages.
pub const DEFAULT_STAGE_DOMAIN: [&str; 8] = [
    "alu", "shift", "load", "store", "mul", "branch", "nop", "other",
];

/// The eight 32-bit operand/bus fields, in feature order.
const VALUE_FIELDS: [&str; 8] = [
    "op1_value_current",
    "op2_value_current",
    "op1_value_previous",
    "op2_value_previous",
    "readbus_value_current",
    "readbus_value_previous",
    "writebus_value_current",
    "writebus_value_previous",
];

/// One-hot encoder over an enumerated category domain.
///
/// Values outside the domain encode to the all-zero vector, so an unseen
/// category never shifts other columns.
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    domain: Vec<String>,
}

impl CategoricalEncoder {
    /// Create an encoder over the given domain.
    pub fn new<S: Into<String>>(domain: impl IntoIterator<Item = S>) -> Self {
        Self {
            domain: domain.into_iter().map(Into::into).collect(),
        }
    }

    /// Width of the encoded vector.
    pub fn width(&self) -> usize {
        self.domain.len()
    }

    /// The domain values, in column order.
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    /// Encode one value as a one-hot vector.
    pub fn encode(&self, value: &str) -> Vec<f64> {
        self.domain
            .iter()
            .map(|v| if v == value { 1.0 } else { 0.0 })
            .collect()
    }
}

/// A dense feature table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names, in storage order
    pub columns: Vec<String>,
    /// One feature vector per execution-trace row
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Index of a column by name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the matrix holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum a group of columns row-wise, by exact name.
    ///
    /// Fails if any named column is absent.
    pub fn sum_columns(&self, names: &[String]) -> ScaResult<Vec<f64>> {
        let indexes: Vec<usize> = names
            .iter()
            .map(|name| {
                self.column(name).ok_or(ScaError::DimensionMismatch {
                    context: "feature column lookup",
                    expected: names.len(),
                    actual: 0,
                })
            })
            .collect::<ScaResult<_>>()?;

        Ok(self
            .rows
            .iter()
            .map(|row| indexes.iter().map(|&i| row[i]).sum())
            .collect())
    }
}

/// Fixed feature layout for execution traces.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    stage_encoder: CategoricalEncoder,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            stage_encoder: CategoricalEncoder::new(DEFAULT_STAGE_DOMAIN),
        }
    }
}

impl FeatureSchema {
    /// Schema with the default Cortex-M0 stage domain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with a custom stage-category domain.
    pub fn with_stage_domain<S: Into<String>>(
        domain: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            stage_encoder: CategoricalEncoder::new(domain),
        }
    }

    /// Column names produced by [`encode`](Self::encode), in order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for stage in ["instr_stage1", "instr_stage2", "instr_stage3"] {
            for value in self.stage_encoder.domain() {
                names.push(format!("{stage}_{value}"));
            }
        }
        for field in VALUE_FIELDS {
            for bit in 0..32 {
                names.push(format!("{field}_{bit}"));
            }
        }
        names
    }

    /// Bit-column names for one 32-bit field, low bit first.
    pub fn bit_columns(field: &str) -> Vec<String> {
        (0..32).map(|bit| format!("{field}_{bit}")).collect()
    }

    /// Encode a whole execution trace into a feature matrix.
    pub fn encode(&self, trace: &ExecutionTrace) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.column_names(),
            rows: trace
                .records()
                .iter()
                .map(|r| self.encode_record(r))
                .collect(),
        }
    }

    fn encode_record(&self, record: &ExecutionRecord) -> Vec<f64> {
        let mut row = Vec::with_capacity(3 * self.stage_encoder.width() + 8 * 32);
        row.extend(self.stage_encoder.encode(&record.instr_stage1));
        row.extend(self.stage_encoder.encode(&record.instr_stage2));
        row.extend(self.stage_encoder.encode(&record.instr_stage3));

        let values = [
            record.op1_value_current,
            record.op2_value_current,
            record.op1_value_previous,
            record.op2_value_previous,
            record.readbus_value_current,
            record.readbus_value_previous,
            record.writebus_value_current,
            record.writebus_value_previous,
        ];
        for value in values {
            for bit in 0..32 {
                row.push(((value >> bit) & 1) as f64);
            }
        }
        row
    }
}
