use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tabular::{Row, Table as TextTable};

use super::{GroupKind, ResourcePrinter};
use crate::error::Result;
use crate::object::{labels_of, parse_timestamp, Object, Table, Unstructured};

const NONE: &str = "<none>";

#[derive(Debug, Clone, Default)]
pub struct HumanOptions {
    pub wide: bool,
    pub no_headers: bool,
    pub show_labels: bool,
    pub show_kind: bool,
    /// Kind of the resource mapping, used to qualify names when `show_kind` is set.
    pub kind: Option<GroupKind>,
    pub label_columns: Vec<String>,
}

pub struct HumanPrinter {
    options: HumanOptions,
    now: DateTime<Utc>,
    headers: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    printed: bool,
}

impl HumanPrinter {
    pub fn new(options: HumanOptions) -> Self {
        Self::at(options, Utc::now())
    }

    /// A printer computing ages relative to `now`.
    pub fn at(options: HumanOptions, now: DateTime<Utc>) -> Self {
        Self {
            options,
            now,
            headers: None,
            rows: Vec::new(),
            printed: false,
        }
    }

    fn emit(&mut self, headers: Vec<String>, rows: Vec<Vec<String>>, out: &mut dyn Write) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        if self.headers.as_ref() != Some(&headers) {
            self.flush(out)?;
            if self.printed {
                writeln!(out)?;
            }
            self.headers = Some(headers);
        }
        self.rows.extend(rows);
        Ok(())
    }

    fn extra_headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = self
            .options
            .label_columns
            .iter()
            .map(|key| label_header(key))
            .collect();
        if self.options.show_labels {
            headers.push("LABELS".into());
        }
        headers
    }

    fn extra_cells(&self, object: Option<&Map<String, Value>>) -> Vec<String> {
        let labels = object.map(labels_of).unwrap_or_default();
        let mut cells: Vec<String> = self
            .options
            .label_columns
            .iter()
            .map(|key| labels.get(key).cloned().unwrap_or_default())
            .collect();
        if self.options.show_labels {
            cells.push(format_labels(object.map(|_| &labels)));
        }
        cells
    }

    fn print_table(&mut self, table: &Table, out: &mut dyn Write) -> Result<()> {
        let visible: Vec<usize> = table
            .column_definitions
            .iter()
            .enumerate()
            .filter(|(_, c)| self.options.wide || c.priority == 0)
            .map(|(i, _)| i)
            .collect();

        let mut headers: Vec<String> = visible
            .iter()
            .map(|&i| table.column_definitions[i].name.to_uppercase())
            .collect();
        headers.extend(self.extra_headers());

        let kind = self.options.kind.clone().filter(|_| self.options.show_kind);
        let rows = table
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = visible
                    .iter()
                    .map(|&i| {
                        let column = &table.column_definitions[i];
                        let cell = render_cell(row.cells.get(i), &column.type_, self.now);
                        match &kind {
                            Some(kind) if column.format == "name" => kind.qualify(&cell),
                            _ => cell,
                        }
                    })
                    .collect();
                cells.extend(self.extra_cells(row.object.as_ref().and_then(Value::as_object)));
                cells
            })
            .collect();

        self.emit(headers, rows, out)
    }

    fn object_row(&self, object: &Unstructured) -> Vec<String> {
        let name = if self.options.show_kind {
            let kind = self
                .options
                .kind
                .clone()
                .unwrap_or_else(|| GroupKind::new(object.group(), object.kind()));
            kind.qualify(object.name())
        } else {
            object.name().to_string()
        };
        let age = object
            .creation_timestamp()
            .map(|created| human_duration(self.now - created))
            .unwrap_or_else(|| "<unknown>".into());

        let mut cells = vec![name, age];
        cells.extend(self.extra_cells(Some(&object.object)));
        cells
    }

    fn print_objects<'a>(
        &mut self,
        objects: impl Iterator<Item = &'a Unstructured>,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut headers = vec!["NAME".to_string(), "AGE".to_string()];
        headers.extend(self.extra_headers());
        let rows = objects.map(|o| self.object_row(o)).collect();
        self.emit(headers, rows, out)
    }
}

impl ResourcePrinter for HumanPrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()> {
        match obj {
            Object::Table(table) => self.print_table(table, out),
            Object::List(list) => self.print_objects(list.items.iter(), out),
            Object::Unstructured(object) => self.print_objects(std::iter::once(object), out),
        }
    }

    fn flush(&mut self, out: &mut dyn Write) -> Result<()> {
        let rows = std::mem::take(&mut self.rows);
        let Some(headers) = self.headers.as_ref() else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }

        let spec = vec!["{:<}"; headers.len()].join("   ");
        let mut table = TextTable::new(&spec);
        if !self.options.no_headers {
            table.add_row(to_row(headers));
        }
        for row in &rows {
            table.add_row(to_row(row));
        }

        for line in table.to_string().lines() {
            writeln!(out, "{}", line.trim_end())?;
        }
        self.printed = true;
        Ok(())
    }
}

fn to_row(cells: &[String]) -> Row {
    cells
        .iter()
        .fold(Row::new(), |row, cell| row.with_cell(cell))
}

fn render_cell(cell: Option<&Value>, column_type: &str, now: DateTime<Utc>) -> String {
    match cell {
        None | Some(Value::Null) => NONE.to_string(),
        Some(Value::String(s)) if column_type == "date" => match parse_timestamp(s) {
            Some(t) => human_duration(now - t),
            None => s.clone(),
        },
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn label_header(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_uppercase()
}

fn format_labels(labels: Option<&std::collections::BTreeMap<String, String>>) -> String {
    match labels {
        Some(labels) if !labels.is_empty() => labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(","),
        _ => NONE.to_string(),
    }
}

/// Render an age the way kubectl does: precise when short, coarse when long.
pub fn human_duration(d: Duration) -> String {
    let seconds = d.num_seconds();
    if seconds < -1 {
        return "<invalid>".into();
    } else if seconds < 0 {
        return "0s".into();
    } else if seconds < 60 * 2 {
        return format!("{seconds}s");
    }

    let minutes = d.num_minutes();
    if minutes < 10 {
        let s = seconds % 60;
        if s == 0 {
            return format!("{minutes}m");
        }
        return format!("{minutes}m{s}s");
    } else if minutes < 60 * 3 {
        return format!("{minutes}m");
    }

    let hours = d.num_hours();
    if hours < 8 {
        let m = minutes % 60;
        if m == 0 {
            return format!("{hours}h");
        }
        format!("{hours}h{m}m")
    } else if hours < 48 {
        format!("{hours}h")
    } else if hours < 24 * 8 {
        let h = hours % 24;
        if h == 0 {
            return format!("{}d", hours / 24);
        }
        format!("{}d{h}h", hours / 24)
    } else if hours < 24 * 365 * 2 {
        format!("{}d", hours / 24)
    } else if hours < 24 * 365 * 8 {
        let dy = (hours / 24) % 365;
        if dy == 0 {
            return format!("{}y", hours / 24 / 365);
        }
        format!("{}y{dy}d", hours / 24 / 365)
    } else {
        format!("{}y", hours / 24 / 365)
    }
}
