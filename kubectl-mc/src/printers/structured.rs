use std::io::Write;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use super::{GroupKind, ResourcePrinter};
use crate::error::{Error, Result};
use crate::jsonpath::JsonPath;
use crate::object::{group_of, metadata_str, Object};

pub struct JsonPrinter;

impl ResourcePrinter for JsonPrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()> {
        let mut ser = serde_json::Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(b"    "));
        obj.to_value().serialize(&mut ser)?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct YamlPrinter {
    printed: usize,
}

impl ResourcePrinter for YamlPrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()> {
        let doc = serde_yaml::to_string(&obj.to_value())?;
        let body = doc.strip_prefix("---\n").unwrap_or(&doc);

        if self.printed > 0 {
            out.write_all(b"---\n")?;
        }
        out.write_all(body.as_bytes())?;
        if !body.ends_with('\n') {
            writeln!(out)?;
        }
        self.printed += 1;
        Ok(())
    }
}

/// `-o name`: one `kind.group/name` line per object.
pub struct NamePrinter;

impl NamePrinter {
    fn line(object: &serde_json::Map<String, Value>) -> Result<String> {
        let kind = object.get("kind").and_then(Value::as_str).unwrap_or_default();
        if kind.is_empty() {
            return Err(Error::Invalid("missing apiVersion or kind, cannot print its name".into()));
        }
        let api_version = object
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(GroupKind::new(group_of(api_version), kind).qualify(metadata_str(object, "name")))
    }
}

impl ResourcePrinter for NamePrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()> {
        match obj {
            Object::Unstructured(u) => writeln!(out, "{}", Self::line(&u.object)?)?,
            Object::List(list) => {
                for item in &list.items {
                    writeln!(out, "{}", Self::line(&item.object)?)?;
                }
            }
            Object::Table(table) => {
                for row in &table.rows {
                    let object = row.object.as_ref().and_then(Value::as_object).ok_or_else(|| {
                        Error::Invalid("table rows carry no objects, cannot print their names".into())
                    })?;
                    writeln!(out, "{}", Self::line(object)?)?;
                }
            }
        }
        Ok(())
    }
}

pub struct JsonPathPrinter {
    path: JsonPath,
}

impl JsonPathPrinter {
    pub fn new(template: &str) -> Result<Self> {
        Ok(Self {
            path: JsonPath::parse(template)?,
        })
    }
}

impl ResourcePrinter for JsonPathPrinter {
    fn print_obj(&mut self, obj: &Object, out: &mut dyn Write) -> Result<()> {
        out.write_all(self.path.execute(&obj.to_value()).as_bytes())?;
        Ok(())
    }
}
