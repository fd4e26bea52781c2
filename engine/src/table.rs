use std::fmt;

use log::trace;
use rayon::prelude::*;

use crate::{evaluator::run_plan, resolver::EvalPlan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthRow {
    pub inputs: Vec<bool>,
    pub outputs: Vec<bool>,
}

/// Rows in binary counting order, first input column most significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthTable {
    cols: Vec<String>,
    n_inputs: usize,
    rows: Vec<TruthRow>,
    complete: bool,
}

impl TruthTable {
    pub fn columns(&self) -> &[String] {
        &self.cols
    }

    pub fn input_columns(&self) -> &[String] {
        &self.cols[..self.n_inputs]
    }

    pub fn output_columns(&self) -> &[String] {
        &self.cols[self.n_inputs..]
    }

    pub fn rows(&self) -> &[TruthRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// False when enumeration was cancelled; the rows are then a prefix of
    /// the full table.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Output bits for a given input assignment.
    pub fn lookup(&self, inputs: &[bool]) -> Option<&[bool]> {
        self.rows
            .iter()
            .find(|r| r.inputs == inputs)
            .map(|r| r.outputs.as_slice())
    }
}

/// Where the truth table's columns live in a plan's value buffer.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub columns: Vec<String>,
    pub input_slots: Vec<usize>,
    pub output_slots: Vec<usize>,
}

/// Every assignment of `bits` booleans, counting up from all-false.
pub fn bitwise_counter(bits: usize) -> impl Iterator<Item = Vec<bool>> {
    (0..1usize << bits).map(move |n| assignment(n, bits))
}

fn assignment(n: usize, bits: usize) -> Vec<bool> {
    (0..bits).rev().map(|i| (n >> i) & 1 == 1).collect()
}

fn row_for(plan: &EvalPlan, layout: &Layout, values: &mut [bool], bits: &[bool]) -> TruthRow {
    for (slot, bit) in layout.input_slots.iter().zip(bits) {
        values[*slot] = *bit;
    }
    run_plan(plan, values);
    TruthRow {
        inputs: bits.to_vec(),
        outputs: layout.output_slots.iter().map(|s| values[*s]).collect(),
    }
}

/// Runs the plan once per assignment on `values`. `stop` is asked with the
/// index of each row before it is evaluated; once it says yes the table ends
/// there, incomplete. On return `values` holds the state of the last row kept.
pub(crate) fn enumerate(
    plan: &EvalPlan,
    layout: Layout,
    values: &mut [bool],
    mut stop: impl FnMut(usize) -> bool,
) -> TruthTable {
    let n_inputs = layout.input_slots.len();
    let mut rows = Vec::new();
    let mut complete = true;
    if n_inputs > 0 {
        for (i, bits) in bitwise_counter(n_inputs).enumerate() {
            if stop(i) {
                complete = false;
                break;
            }
            let row = row_for(plan, &layout, values, &bits);
            trace!("row {:?} -> {:?}", row.inputs, row.outputs);
            rows.push(row);
        }
    }
    TruthTable {
        cols: layout.columns,
        n_inputs,
        rows,
        complete,
    }
}

/// Same rows as `enumerate`, each evaluated on a private copy of `base`.
pub(crate) fn enumerate_parallel(plan: &EvalPlan, layout: Layout, base: &[bool]) -> TruthTable {
    let n_inputs = layout.input_slots.len();
    let rows = if n_inputs == 0 {
        Vec::new()
    } else {
        (0..1usize << n_inputs)
            .into_par_iter()
            .map_init(
                || base.to_vec(),
                |values, n| row_for(plan, &layout, values, &assignment(n, n_inputs)),
            )
            .collect()
    };
    TruthTable {
        cols: layout.columns,
        n_inputs,
        rows,
        complete: true,
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = self
            .cols
            .iter()
            .map(|c| {
                let width = c.len() + 2 + 1; // 2 spaces left and right of the label text
                (" ".repeat(width / 2), " ".repeat(width - width / 2))
            })
            .collect::<Vec<(String, String)>>();
        let total_width = pad.iter().fold(0, |a, b| a + b.0.len() + b.1.len() + 2);
        if total_width == 0 {
            return Ok(());
        }

        writeln!(f, "|{}|", "¯".repeat(total_width - 1))?;
        write!(f, "|")?;
        for col in &self.cols {
            write!(f, "  \x1b[33m{}\x1b[0m  |", col)?;
        }
        writeln!(f)?;
        writeln!(f, "|{}|", "-".repeat(total_width - 1))?;
        for row in &self.rows {
            write!(f, "|")?;
            for (p, v) in pad.iter().zip(row.inputs.iter().chain(&row.outputs)) {
                write!(f, "{}{}{}|", p.0, *v as u8, p.1)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "|{}|", "_".repeat(total_width - 1))?;
        Ok(())
    }
}
