//! Output formats for `get`, selected by `-o`.
use std::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::get::sorter::RuntimeSorter;
use crate::object::Object;

mod custom_columns;
mod human;
mod structured;

pub use custom_columns::CustomColumnsPrinter;
pub use human::{human_duration, HumanOptions, HumanPrinter};
pub use structured::{JsonPathPrinter, JsonPrinter, NamePrinter, YamlPrinter};

pub const ALLOWED_FORMATS: &[&str] = &["custom-columns", "json", "jsonpath", "name", "wide", "yaml"];

pub trait ResourcePrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()>;

    /// Emit anything held back for alignment.
    fn flush(&mut self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Human,
    Wide,
    Json,
    Yaml,
    Name,
    JsonPath(String),
    CustomColumns(String),
}

impl OutputFormat {
    pub fn parse(output: &str, template: Option<&str>) -> Result<Self> {
        let template = template.filter(|t| !t.is_empty());
        let format = match output.split_once('=') {
            Some(("jsonpath", tpl)) => OutputFormat::JsonPath(tpl.to_string()),
            Some(("custom-columns", spec)) => OutputFormat::CustomColumns(spec.to_string()),
            Some(_) => return Err(Error::UnknownOutputFormat(output.to_string())),
            None => match (output, template) {
                ("", Some(tpl)) | ("jsonpath", Some(tpl)) => OutputFormat::JsonPath(tpl.to_string()),
                ("jsonpath", None) => {
                    return Err(Error::Invalid(
                        "template format specified but no template given".into(),
                    ))
                }
                ("", None) => OutputFormat::Human,
                ("wide", _) => OutputFormat::Wide,
                ("json", _) => OutputFormat::Json,
                ("yaml", _) => OutputFormat::Yaml,
                ("name", _) => OutputFormat::Name,
                _ => return Err(Error::UnknownOutputFormat(output.to_string())),
            },
        };
        Ok(format)
    }
}

/// `Kind.group` of the resource being printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            kind: kind.to_string(),
        }
    }

    /// `kind.group/name`, the way `-o name` and `--show-kind` qualify names.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}/{name}", self.to_string().to_lowercase())
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Everything about the output the user chose on the command line.
#[derive(Debug, Clone, Default)]
pub struct PrintFlags {
    pub output: String,
    pub template: Option<String>,
    pub sort_by: Option<String>,
    pub no_headers: bool,
    pub show_labels: bool,
    pub show_kind: bool,
    pub label_columns: Vec<String>,
}

impl PrintFlags {
    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::parse(&self.output, self.template.as_deref())
    }

    pub fn to_printer(&self, kind: Option<&GroupKind>) -> Result<Box<dyn ResourcePrinter>> {
        let mut printer: Box<dyn ResourcePrinter> = match self.output_format()? {
            OutputFormat::Human | OutputFormat::Wide => Box::new(HumanPrinter::new(HumanOptions {
                wide: self.output == "wide",
                no_headers: self.no_headers,
                show_labels: self.show_labels,
                show_kind: self.show_kind,
                kind: kind.cloned(),
                label_columns: self.label_columns.clone(),
            })),
            OutputFormat::Json => Box::new(JsonPrinter),
            OutputFormat::Yaml => Box::new(YamlPrinter::default()),
            OutputFormat::Name => Box::new(NamePrinter),
            OutputFormat::JsonPath(template) => Box::new(JsonPathPrinter::new(&template)?),
            OutputFormat::CustomColumns(spec) => {
                Box::new(CustomColumnsPrinter::parse(&spec, self.no_headers)?)
            }
        };

        if let Some(sort_by) = self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            printer = Box::new(SortingPrinter {
                delegate: printer,
                sorter: RuntimeSorter::new(sort_by)?,
            });
        }

        Ok(printer)
    }
}

/// Sorts the items of a `List` before handing it on.
pub struct SortingPrinter {
    delegate: Box<dyn ResourcePrinter>,
    sorter: RuntimeSorter,
}

impl ResourcePrinter for SortingPrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()> {
        match obj {
            Object::List(list) => {
                let mut sorted = list.clone();
                self.sorter.sort_list(&mut sorted)?;
                self.delegate.print_obj(&Object::List(sorted), out)
            }
            other => self.delegate.print_obj(other, out),
        }
    }

    fn flush(&mut self, out: &mut dyn Write) -> Result<()> {
        self.delegate.flush(out)
    }
}
