use std::collections::HashSet;
use std::path::Path;

use log::info;
use ndarray::Array2;

use crate::error::{CatalogError, CatalogResult};

/// One named catalog column. A column is numeric only when every value in
/// the source file parsed as `f64`; otherwise the whole column is text.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named-column catalog table, the in-memory form of the CSV interchange
/// files (one header row, one record per object).
#[derive(Clone, Debug, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Reads a header-first CSV catalog. Duplicated header names are an
    /// error; a record with the wrong field count is an error.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;
        let names: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(CatalogError::DuplicateColumn { name: name.clone() });
            }
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in rdr.records() {
            let record = record?;
            for (cell, column) in record.iter().zip(raw.iter_mut()) {
                column.push(cell.to_owned());
            }
        }

        let columns = raw
            .into_iter()
            .map(|cells| {
                let parsed: Result<Vec<f64>, _> =
                    cells.iter().map(|c| c.trim().parse::<f64>()).collect();
                match parsed {
                    Ok(values) => Column::Numeric(values),
                    Err(_) => Column::Text(cells),
                }
            })
            .collect();

        let table = Table { names, columns };
        info!(
            "read {} rows x {} columns from {}",
            table.rows(),
            table.ncols(),
            path.as_ref().display()
        );
        Ok(table)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> CatalogResult<()> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;
        wtr.write_record(&self.names)?;
        for row in 0..self.rows() {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|col| match col {
                    Column::Numeric(v) => v[row].to_string(),
                    Column::Text(v) => v[row].clone(),
                })
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        info!(
            "wrote {} rows x {} columns to {}",
            self.rows(),
            self.ncols(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn column(&self, name: &str) -> CatalogResult<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| CatalogError::NoSuchColumn {
                name: name.to_owned(),
            })
    }

    pub fn numeric(&self, name: &str) -> CatalogResult<&[f64]> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(v),
            Column::Text(_) => Err(CatalogError::ColumnKind {
                name: name.to_owned(),
                expected: "numeric",
            }),
        }
    }

    pub fn text(&self, name: &str) -> CatalogResult<&[String]> {
        match self.column(name)? {
            Column::Text(v) => Ok(v),
            Column::Numeric(_) => Err(CatalogError::ColumnKind {
                name: name.to_owned(),
                expected: "text",
            }),
        }
    }

    /// Appends a numeric column. The name must be new and the length must
    /// match the table (any length is fine on an empty table).
    pub fn push_numeric_column(&mut self, name: &str, values: Vec<f64>) -> CatalogResult<()> {
        if self.names.iter().any(|n| n == name) {
            return Err(CatalogError::DuplicateColumn {
                name: name.to_owned(),
            });
        }
        if !self.columns.is_empty() && values.len() != self.rows() {
            return Err(CatalogError::ColumnLength {
                name: name.to_owned(),
                len: values.len(),
                rows: self.rows(),
            });
        }
        self.names.push(name.to_owned());
        self.columns.push(Column::Numeric(values));
        Ok(())
    }

    /// Renames columns positionally, `from[i]` becoming `to[i]`. Every old
    /// name must exist and the final header must stay duplicate free.
    pub fn rename_columns(&mut self, from: &[String], to: &[String]) -> CatalogResult<()> {
        if from.len() != to.len() {
            return Err(CatalogError::invalid(format!(
                "{} old names but {} new names",
                from.len(),
                to.len()
            )));
        }
        for name in from {
            if !self.names.iter().any(|n| n == name) {
                return Err(CatalogError::NoSuchColumn { name: name.clone() });
            }
        }
        let renamed: Vec<String> = self
            .names
            .iter()
            .map(|n| match from.iter().position(|f| f == n) {
                Some(i) => to[i].clone(),
                None => n.clone(),
            })
            .collect();
        let mut seen = HashSet::new();
        for name in &renamed {
            if !seen.insert(name.as_str()) {
                return Err(CatalogError::DuplicateColumn { name: name.clone() });
            }
        }
        self.names = renamed;
        Ok(())
    }

    /// Maps values above 180 to value - 360 in the named columns, moving
    /// coordinates from [0, 360) to (-180, 180].
    pub fn recenter(&mut self, columns: &[String]) -> CatalogResult<()> {
        if columns.is_empty() {
            return Err(CatalogError::invalid("no columns given to recenter"));
        }
        for name in columns {
            let idx = self
                .names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| CatalogError::NoSuchColumn { name: name.clone() })?;
            match &mut self.columns[idx] {
                Column::Numeric(values) => {
                    for v in values.iter_mut() {
                        if *v > 180.0 {
                            *v -= 360.0;
                        }
                    }
                }
                Column::Text(_) => {
                    return Err(CatalogError::ColumnKind {
                        name: name.clone(),
                        expected: "numeric",
                    })
                }
            }
        }
        Ok(())
    }

    /// Keeps exactly the rows where `keep` is true.
    pub fn retain_rows(&mut self, keep: &[bool]) -> CatalogResult<()> {
        if keep.len() != self.rows() {
            return Err(CatalogError::invalid(format!(
                "keep mask has {} entries for {} rows",
                keep.len(),
                self.rows()
            )));
        }
        for col in &mut self.columns {
            match col {
                Column::Numeric(v) => {
                    *v = v
                        .iter()
                        .zip(keep.iter())
                        .filter(|&(_, &k)| k)
                        .map(|(x, _)| *x)
                        .collect();
                }
                Column::Text(v) => {
                    *v = v
                        .iter()
                        .zip(keep.iter())
                        .filter(|&(_, &k)| k)
                        .map(|(s, _)| s.clone())
                        .collect();
                }
            }
        }
        Ok(())
    }

    /// Assembles the named numeric columns into a row-per-object feature
    /// matrix.
    pub fn points(&self, columns: &[String]) -> CatalogResult<Array2<f64>> {
        if columns.is_empty() {
            return Err(CatalogError::invalid("no feature columns given"));
        }
        let cols: Vec<&[f64]> = columns
            .iter()
            .map(|n| self.numeric(n))
            .collect::<CatalogResult<_>>()?;
        Ok(Array2::from_shape_fn((self.rows(), cols.len()), |(i, j)| {
            cols[j][i]
        }))
    }
}
