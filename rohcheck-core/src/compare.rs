//! Exact packet comparison with a bounded, side-by-side diff

use crate::constants::{COMPARE_MAX_BYTES, COMPARE_ROW_BYTES};
use serde::Serialize;
use std::fmt;

/// Result of comparing two packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Same length, same bytes
    Equal,
    /// Lengths or bytes differ
    Different(DiffReport),
}

/// One byte position of the diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffCell {
    /// Byte of the first packet
    pub left: u8,
    /// Byte of the second packet
    pub right: u8,
}

impl DiffCell {
    /// Whether the two bytes differ
    pub fn differs(&self) -> bool {
        self.left != self.right
    }

    fn delimiters(&self) -> (char, char) {
        if self.differs() {
            ('#', '#')
        } else {
            ('[', ']')
        }
    }
}

/// Side-by-side rendering of two differing packets
///
/// Holds at most [`COMPARE_MAX_BYTES`] positions, grouped in rows of
/// [`COMPARE_ROW_BYTES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    /// Length of the first packet
    pub left_len: usize,
    /// Length of the second packet
    pub right_len: usize,
    /// Number of leading bytes rendered
    pub compared: usize,
    /// Rendered positions, row by row
    pub rows: Vec<Vec<DiffCell>>,
}

impl DiffReport {
    /// Number of rendered positions holding different bytes
    pub fn differing_bytes(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.differs()).count()
    }
}

/// Compare two packets byte for byte
pub fn compare(left: &[u8], right: &[u8]) -> Comparison {
    if left == right {
        return Comparison::Equal;
    }

    let compared = COMPARE_MAX_BYTES.min(left.len().min(right.len()));
    let rows = left[..compared]
        .chunks(COMPARE_ROW_BYTES)
        .zip(right[..compared].chunks(COMPARE_ROW_BYTES))
        .map(|(l, r)| {
            l.iter()
                .zip(r)
                .map(|(&left, &right)| DiffCell { left, right })
                .collect()
        })
        .collect();

    Comparison::Different(DiffReport {
        left_len: left.len(),
        right_len: right.len(),
        compared,
        rows,
    })
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "------------------------------ Compare ------------------------------"
        )?;

        if self.left_len != self.right_len {
            writeln!(
                f,
                "packets have different sizes ({} != {}), compare only the {} first bytes",
                self.left_len, self.right_len, self.compared
            )?;
        }

        for row in &self.rows {
            for slot in 0..COMPARE_ROW_BYTES {
                match row.get(slot) {
                    Some(cell) => {
                        let (open, close) = cell.delimiters();
                        write!(f, "{}0x{:02x}{}  ", open, cell.left, close)?;
                    }
                    None => write!(f, "        ")?,
                }
            }

            write!(f, "      ")?;

            for cell in row {
                let (open, close) = cell.delimiters();
                write!(f, "{}0x{:02x}{}  ", open, cell.right, close)?;
            }

            writeln!(f)?;
        }

        writeln!(
            f,
            "----------------------- packets are different -----------------------"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_packets() {
        assert_eq!(compare(&[1, 2, 3], &[1, 2, 3]), Comparison::Equal);
        assert_eq!(compare(&[], &[]), Comparison::Equal);
    }

    #[test]
    fn one_byte_difference_is_marked() {
        let Comparison::Different(report) = compare(&[1, 2, 3, 4, 5], &[1, 2, 9, 4, 5]) else {
            panic!("expected a difference");
        };
        assert_eq!(report.compared, 5);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].len(), 1);
        assert_eq!(report.differing_bytes(), 1);

        let text = report.to_string();
        assert!(text.contains("#0x03#"));
        assert!(text.contains("#0x09#"));
        assert!(text.contains("[0x01]"));
        assert!(!text.contains("different sizes"));
    }

    #[test]
    fn length_difference_compares_shorter_prefix() {
        let Comparison::Different(report) = compare(&[1, 2, 3], &[1, 2]) else {
            panic!("expected a difference");
        };
        assert_eq!(report.compared, 2);
        assert_eq!(report.differing_bytes(), 0);
        assert!(report
            .to_string()
            .contains("packets have different sizes (3 != 2), compare only the 2 first bytes"));
    }

    #[test]
    fn report_is_bounded() {
        let a = vec![0u8; 500];
        let b = vec![1u8; 500];
        let Comparison::Different(report) = compare(&a, &b) else {
            panic!("expected a difference");
        };
        assert_eq!(report.compared, COMPARE_MAX_BYTES);
        assert_eq!(report.rows.len(), COMPARE_MAX_BYTES / COMPARE_ROW_BYTES);
    }

    #[test]
    fn short_last_row_is_padded_on_the_left_side() {
        let Comparison::Different(report) = compare(&[1], &[2]) else {
            panic!("expected a difference");
        };
        let text = report.to_string();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, format!("#0x01#  {}      #0x02#  ", " ".repeat(24)));
    }
}
