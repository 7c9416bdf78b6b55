// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::result::{Segment, SegmentationResult};
use std::fmt;

const HEADER: [&str; 4] = ["", "best_split", "max_gain", "p_value"];

fn cell<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `max_gain` truncated toward zero to three decimals.
fn truncated_gain(gain: f64) -> f64 {
    (gain * 1000.0).trunc() / 1000.0
}

fn rows_for(result: &SegmentationResult, segment: &Segment) -> Vec<[String; 4]> {
    let mut rows = vec![[
        segment.interval().to_string(),
        cell(segment.best_split),
        cell(segment.max_gain.map(truncated_gain)),
        cell(segment.p_value),
    ]];

    if let (Some(left), Some(right)) = (result.left(segment), result.right(segment)) {
        let mut left_rows = rows_for(result, left);
        let mut right_rows = rows_for(result, right);
        for (i, row) in left_rows.iter_mut().enumerate() {
            let prefix = if i == 0 { " |--" } else { " |  " };
            row[0].insert_str(0, prefix);
        }
        for (i, row) in right_rows.iter_mut().enumerate() {
            let prefix = if i == 0 { " `--" } else { "    " };
            row[0].insert_str(0, prefix);
        }
        rows.append(&mut left_rows);
        rows.append(&mut right_rows);
    }
    rows
}

/// Tree table: the interval column left-aligned, statistics right-aligned.
impl fmt::Display for SegmentationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows = vec![HEADER.map(str::to_owned)];
        rows.extend(rows_for(self, self.root()));

        let mut widths = [0usize; 4];
        for row in &rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.chars().count());
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let mut line = format!("{:<width$}", row[0], width = widths[0]);
            for (value, width) in row.iter().zip(widths).skip(1) {
                line.push_str(&format!(" {value:>width$}"));
            }
            f.write_str(line.trim_end())?;
        }
        Ok(())
    }
}
