use std::io::Write;

use serde_json::Value;
use tabular::{Row, Table as TextTable};

use super::ResourcePrinter;
use crate::error::{Error, Result};
use crate::jsonpath::{relaxed_expression, value_to_text, JsonPath};
use crate::object::Object;

struct Column {
    header: String,
    path: JsonPath,
}

/// `-o custom-columns=NAME:.metadata.name,CLOUD:.metadata.labels.cloud`
pub struct CustomColumnsPrinter {
    columns: Vec<Column>,
    no_headers: bool,
    rows: Vec<Vec<String>>,
}

impl CustomColumnsPrinter {
    pub fn parse(spec: &str, no_headers: bool) -> Result<Self> {
        if spec.is_empty() {
            return Err(Error::Invalid("custom-columns format specified but no custom columns given".into()));
        }

        let columns = spec
            .split(',')
            .map(|part| {
                let (header, path) = part
                    .split_once(':')
                    .filter(|(h, p)| !h.is_empty() && !p.is_empty())
                    .ok_or_else(|| Error::CustomColumnsSpec(part.to_string()))?;
                let template = relaxed_expression(path)?;
                Ok(Column {
                    header: header.to_string(),
                    path: JsonPath::parse(&template)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns,
            no_headers,
            rows: Vec::new(),
        })
    }

    fn row(&self, value: &Value) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                let found = column.path.find(value);
                if found.is_empty() {
                    "<none>".to_string()
                } else {
                    found.into_iter().map(value_to_text).collect::<Vec<_>>().join(",")
                }
            })
            .collect()
    }
}

impl ResourcePrinter for CustomColumnsPrinter {
    fn print_obj(&mut self, obj: &Object, _out: &mut dyn Write) -> Result<()> {
        let rows: Vec<Vec<String>> = match obj {
            Object::List(list) => list.items.iter().map(|item| self.row(&item.to_value())).collect(),
            Object::Table(table) => table
                .rows
                .iter()
                .filter_map(|row| row.object.as_ref())
                .map(|object| self.row(object))
                .collect(),
            Object::Unstructured(u) => vec![self.row(&u.to_value())],
        };
        self.rows.extend(rows);
        Ok(())
    }

    fn flush(&mut self, out: &mut dyn Write) -> Result<()> {
        let rows = std::mem::take(&mut self.rows);
        let spec = vec!["{:<}"; self.columns.len()].join("   ");
        let mut table = TextTable::new(&spec);

        if !self.no_headers {
            table.add_row(
                self.columns
                    .iter()
                    .fold(Row::new(), |row, c| row.with_cell(&c.header)),
            );
        }
        for cells in &rows {
            table.add_row(cells.iter().fold(Row::new(), |row, cell| row.with_cell(cell)));
        }

        for line in table.to_string().lines() {
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
