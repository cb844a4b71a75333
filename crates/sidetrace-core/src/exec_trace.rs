//! Execution-trace tables
//!
//! An execution trace is the tabular record an emulator produces while
//! running firmware: one row per retired instruction, holding the pipeline
//! stage categories, the operand and bus values for the current and previous
//! instruction, and the opcode. After modeling and alignment a row also
//! carries a predicted/observed `power` value and a `nb_cycles` count.
//!
//! Rows are indexed by execution order. Instructions and cycles are distinct
//! axes: one row per instruction here, reconciled against cycle-rate
//! acquisitions only by the aligner.
//!
//! The persisted form is header-first CSV with a fixed column order,
//! consumed and produced by downstream dataset tooling; names and order
//! are significant.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::types::{CropSide, ScaError, ScaResult, Trace};

/// Cortex-M0 `NOP` (`MOV r8, r8`) opcode used as firmware padding.
pub const NOP_OPCODE: u16 = 0x46C0;

/// CSV column order for persisted execution traces.
pub const CSV_COLUMNS: [&str; 14] = [
    "instr_stage1",
    "instr_stage2",
    "instr_stage3",
    "op1_value_current",
    "op2_value_current",
    "op1_value_previous",
    "op2_value_previous",
    "readbus_value_current",
    "readbus_value_previous",
    "writebus_value_current",
    "writebus_value_previous",
    "power",
    "opcode",
    "nb_cycles",
];

/// One retired instruction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionRecord {
    /// Instruction category at pipeline stage 1 (previous instruction)
    pub instr_stage1: String,
    /// Instruction category at pipeline stage 2 (current instruction)
    pub instr_stage2: String,
    /// Instruction category at pipeline stage 3 (next instruction)
    pub instr_stage3: String,
    pub op1_value_current: u32,
    pub op2_value_current: u32,
    pub op1_value_previous: u32,
    pub op2_value_previous: u32,
    pub readbus_value_current: u32,
    pub readbus_value_previous: u32,
    pub writebus_value_current: u32,
    pub writebus_value_previous: u32,
    /// Predicted or observed power, absent until a model or the aligner
    /// fills it
    pub power: Option<f64>,
    /// Instruction opcode
    pub opcode: u16,
    /// Cycles this instruction took, 1 until the aligner says otherwise
    pub nb_cycles: u32,
}

/// An ordered execution trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionTrace {
    records: Vec<ExecutionRecord>,
}

impl ExecutionTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trace from records.
    pub fn from_records(records: Vec<ExecutionRecord>) -> Self {
        Self { records }
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the trace holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record.
    pub fn push(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    /// The underlying records, in execution order.
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    /// Mutable access to the records.
    pub fn records_mut(&mut self) -> &mut [ExecutionRecord] {
        &mut self.records
    }

    /// Extract the power column as a trace.
    ///
    /// Fails if any row is still missing its power value.
    pub fn power_trace(&self) -> ScaResult<Trace> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                r.power.ok_or_else(|| ScaError::ExecutionTraceParse {
                    line: i + 2,
                    reason: "missing power value".into(),
                })
            })
            .collect()
    }

    /// Truncate to the instructions between the NOP padding runs.
    ///
    /// Searches for the `NOP` opcode on each side of the trace midpoint and
    /// keeps the open interval between the last leading and the first
    /// trailing occurrence. Fails when a side has no NOP at all: the
    /// padding assumption was violated.
    pub fn crop_nop(&self) -> ScaResult<ExecutionTrace> {
        let middle = self.records.len() / 2;

        let crop_start = self
            .records
            .iter()
            .take(middle)
            .rposition(|r| r.opcode == NOP_OPCODE)
            .ok_or(ScaError::NopPaddingNotFound {
                side: CropSide::Before,
            })?;
        let crop_end = self
            .records
            .iter()
            .skip(middle)
            .position(|r| r.opcode == NOP_OPCODE)
            .map(|i| i + middle)
            .ok_or(ScaError::NopPaddingNotFound {
                side: CropSide::After,
            })?;

        Ok(ExecutionTrace {
            records: self.records[crop_start + 1..crop_end].to_vec(),
        })
    }

    /// Read a trace from header-first CSV.
    pub fn read_csv<R: BufRead>(reader: R) -> ScaResult<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or(ScaError::EmptyInput("execution trace CSV"))??;
        let expected = CSV_COLUMNS.join(",");
        if header.trim_end() != expected {
            return Err(ScaError::ExecutionTraceParse {
                line: 1,
                reason: format!("unexpected header: {header}"),
            });
        }

        let mut records = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            records.push(parse_record(&line, i + 2)?);
        }
        Ok(Self { records })
    }

    /// Read a trace from a CSV file.
    pub fn read_csv_file(path: &Path) -> ScaResult<Self> {
        let file = File::open(path)?;
        Self::read_csv(BufReader::new(file))
    }

    /// Write the trace as header-first CSV.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> ScaResult<()> {
        writeln!(writer, "{}", CSV_COLUMNS.join(","))?;
        for r in &self.records {
            let power = match r.power {
                Some(p) => format!("{p}"),
                None => String::new(),
            };
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                r.instr_stage1,
                r.instr_stage2,
                r.instr_stage3,
                r.op1_value_current,
                r.op2_value_current,
                r.op1_value_previous,
                r.op2_value_previous,
                r.readbus_value_current,
                r.readbus_value_previous,
                r.writebus_value_current,
                r.writebus_value_previous,
                power,
                r.opcode,
                r.nb_cycles,
            )?;
        }
        Ok(())
    }

    /// Write the trace to a CSV file.
    pub fn write_csv_file(&self, path: &Path) -> ScaResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn parse_record(line: &str, line_no: usize) -> ScaResult<ExecutionRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != CSV_COLUMNS.len() {
        return Err(ScaError::ExecutionTraceParse {
            line: line_no,
            reason: format!(
                "expected {} fields, got {}",
                CSV_COLUMNS.len(),
                fields.len()
            ),
        });
    }

    let parse_u32 = |s: &str, name: &str| -> ScaResult<u32> {
        s.parse().map_err(|_| ScaError::ExecutionTraceParse {
            line: line_no,
            reason: format!("bad {name}: {s}"),
        })
    };

    let power = if fields[11].is_empty() {
        None
    } else {
        Some(
            fields[11]
                .parse()
                .map_err(|_| ScaError::ExecutionTraceParse {
                    line: line_no,
                    reason: format!("bad power: {}", fields[11]),
                })?,
        )
    };

    Ok(ExecutionRecord {
        instr_stage1: fields[0].to_string(),
        instr_stage2: fields[1].to_string(),
        instr_stage3: fields[2].to_string(),
        op1_value_current: parse_u32(fields[3], "op1_value_current")?,
        op2_value_current: parse_u32(fields[4], "op2_value_current")?,
        op1_value_previous: parse_u32(fields[5], "op1_value_previous")?,
        op2_value_previous: parse_u32(fields[6], "op2_value_previous")?,
        readbus_value_current: parse_u32(fields[7], "readbus_value_current")?,
        readbus_value_previous: parse_u32(fields[8], "readbus_value_previous")?,
        writebus_value_current: parse_u32(fields[9], "writebus_value_current")?,
        writebus_value_previous: parse_u32(fields[10], "writebus_value_previous")?,
        power,
        opcode: fields[12]
            .parse()
            .map_err(|_| ScaError::ExecutionTraceParse {
                line: line_no,
                reason: format!("bad opcode: {}", fields[12]),
            })?,
        nb_cycles: parse_u32(fields[13], "nb_cycles")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stage: &str, opcode: u16, power: Option<f64>) -> ExecutionRecord {
        ExecutionRecord {
            instr_stage1: stage.to_string(),
            instr_stage2: stage.to_string(),
            instr_stage3: stage.to_string(),
            op1_value_current: 0xDEAD_BEEF,
            op2_value_current: 42,
            opcode,
            power,
            nb_cycles: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_round_trip() {
        let trace = ExecutionTrace::from_records(vec![
            record("alu", 0x1840, Some(3.25)),
            record("load", 0x6800, None),
        ]);

        let mut buffer = Vec::new();
        trace.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("instr_stage1,instr_stage2,instr_stage3,"));

        let parsed = ExecutionTrace::read_csv(&buffer[..]).unwrap();
        assert_eq!(parsed, trace);
    }

    #[test]
    fn test_csv_rejects_bad_header() {
        let err = ExecutionTrace::read_csv("power,opcode\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ScaError::ExecutionTraceParse { line: 1, .. }));
    }

    #[test]
    fn test_csv_rejects_short_row() {
        let mut text = CSV_COLUMNS.join(",");
        text.push_str("\nalu,alu\n");
        let err = ExecutionTrace::read_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(err, ScaError::ExecutionTraceParse { line: 2, .. }));
    }

    #[test]
    fn test_crop_nop() {
        let mut records = vec![record("nop", NOP_OPCODE, None); 3];
        records.push(record("alu", 0x1840, None));
        records.push(record("alu", 0x4041, None));
        records.extend(vec![record("nop", NOP_OPCODE, None); 3]);

        let trace = ExecutionTrace::from_records(records);
        let cropped = trace.crop_nop().unwrap();

        assert_eq!(cropped.len(), 2);
        assert!(cropped.records().iter().all(|r| r.opcode != NOP_OPCODE));
    }

    #[test]
    fn test_crop_nop_missing_side() {
        let mut records = vec![record("nop", NOP_OPCODE, None); 3];
        records.extend(vec![record("alu", 0x1840, None); 5]);

        let err = ExecutionTrace::from_records(records).crop_nop().unwrap_err();
        assert!(matches!(
            err,
            ScaError::NopPaddingNotFound {
                side: CropSide::After
            }
        ));
    }

    #[test]
    fn test_power_trace() {
        let trace = ExecutionTrace::from_records(vec![
            record("alu", 1, Some(0.5)),
            record("alu", 2, Some(1.5)),
        ]);
        assert_eq!(trace.power_trace().unwrap(), vec![0.5, 1.5]);

        let broken =
            ExecutionTrace::from_records(vec![record("alu", 1, None)]);
        assert!(broken.power_trace().is_err());
    }
}
