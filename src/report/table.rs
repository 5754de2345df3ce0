//! Plain result tables handed to presentation/export layers.
//!
//! A `Table` is row labels plus one numeric column per entity, in entity input
//! order. It carries no presentation details.

use serde::Serialize;

use crate::domain::{GridSpec, LogisticParams, MilestoneKind, MilestoneSet};
use crate::error::AnalysisError;

/// Row labels of the t-values table.
pub const T_VALUE_ROWS: [&str; 10] = [
    "t1_day", "t1_value", "t2_day", "t2_value", "t3_day", "t3_value", "t4_day", "t4_value",
    "t5_day", "t5_value",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub row_labels: Vec<String>,
    pub columns: Vec<TableColumn>,
}

impl Table {
    pub fn new(row_labels: Vec<String>) -> Self {
        Self {
            row_labels,
            columns: Vec::new(),
        }
    }

    /// Empty inferred-values table: one row per grid point, labelled by its x.
    pub fn for_grid(grid: &GridSpec) -> Self {
        Self::new(grid.points().iter().map(|x| format!("{x}")).collect())
    }

    /// Empty t-values table.
    pub fn for_t_values() -> Self {
        Self::new(T_VALUE_ROWS.iter().map(|s| s.to_string()).collect())
    }

    /// Empty parameters table.
    pub fn for_parameters() -> Self {
        Self::new(LogisticParams::NAMES.iter().map(|s| s.to_string()).collect())
    }

    /// Append one entity column; `values` must have one entry per row.
    pub fn push_column(&mut self, key: impl Into<String>, values: Vec<f64>) -> Result<(), AnalysisError> {
        let key = key.into();
        if values.len() != self.row_labels.len() {
            return Err(AnalysisError::InvalidDataset(format!(
                "column '{key}' has {} values for {} rows",
                values.len(),
                self.row_labels.len()
            )));
        }
        self.columns.push(TableColumn { key, values });
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    pub fn column(&self, key: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.values.as_slice())
    }

    pub fn cell(&self, row_label: &str, key: &str) -> Option<f64> {
        let row = self.row_labels.iter().position(|r| r == row_label)?;
        self.column(key).and_then(|values| values.get(row).copied())
    }
}

/// The ten t-values cells for one entity, in `T_VALUE_ROWS` order.
pub fn t_value_cells(milestones: &MilestoneSet) -> Vec<f64> {
    let mut out = Vec::with_capacity(T_VALUE_ROWS.len());
    for kind in MilestoneKind::ALL {
        let m = milestones.get(kind);
        out.push(m.day);
        out.push(m.value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Milestone;

    #[test]
    fn grid_rows_are_labelled_by_x() {
        let t = Table::for_grid(&GridSpec::default());
        assert_eq!(t.n_rows(), 130);
        assert_eq!(t.row_labels[0], "0");
        assert_eq!(t.row_labels[129], "129");

        let half = Table::for_grid(&GridSpec::new(0.0, 3, 0.5).unwrap());
        assert_eq!(half.row_labels, vec!["0", "0.5", "1"]);
    }

    #[test]
    fn cells_follow_row_order() {
        let m = |index: usize, value: f64| Milestone {
            index,
            day: index as f64,
            value,
        };
        let set = MilestoneSet {
            t1: m(1, 0.1),
            t2: m(3, 0.2),
            t3: m(5, 0.3),
            t4: m(6, 0.4),
            t5: m(11, 0.5),
        };
        let mut t = Table::for_t_values();
        t.push_column("plantA", t_value_cells(&set)).unwrap();
        assert_eq!(t.cell("t3_day", "plantA"), Some(5.0));
        assert_eq!(t.cell("t5_value", "plantA"), Some(0.5));
        assert_eq!(t.cell("t5_value", "plantB"), None);
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["plantA"]);
    }

    #[test]
    fn push_column_rejects_wrong_length() {
        let mut t = Table::for_parameters();
        let err = t.push_column("short", vec![1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidDataset("column 'short' has 2 values for 5 rows".into())
        );
        assert!(t.columns.is_empty());
        assert!(t.push_column("long", vec![0.0; 6]).is_err());
        assert!(t.push_column("plantA", vec![0.0; 5]).is_ok());
        assert_eq!(t.columns.len(), 1);
    }
}
