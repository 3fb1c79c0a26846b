use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

pub const TABLE_KIND: &str = "Table";
pub const TABLE_GROUP: &str = "meta.k8s.io";

/// Any object with `apiVersion` and `kind`, kept as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Unstructured {
    pub object: Map<String, Value>,
}

/// A `*List` object. `object` holds everything but the items.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredList {
    pub object: Map<String, Value>,
    pub items: Vec<Unstructured>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(default)]
    pub column_definitions: Vec<TableColumnDefinition>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumnDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Unstructured(Unstructured),
    List(UnstructuredList),
    Table(Table),
}

/// Decode a response body: a JSON array is a sequence of objects, `null` is none, anything else
/// one object.
pub fn decode_objects(raw: &[u8]) -> Result<Vec<Object>, DecodeError> {
    let values = match serde_json::from_slice::<Option<Vec<Value>>>(raw) {
        Ok(values) => values.unwrap_or_default(),
        Err(_) => vec![serde_json::from_slice::<Value>(raw)?],
    };

    values.into_iter().map(Object::from_value).collect()
}

impl Object {
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(DecodeError::NotAnObject(format!("expected an object, got {other}"))),
        };

        let kind = str_field(&map, "kind").to_string();
        if kind.is_empty() {
            return Err(DecodeError::MissingKind(Value::Object(map).to_string()));
        }

        if kind == TABLE_KIND && group_of(str_field(&map, "apiVersion")) == TABLE_GROUP {
            let table = serde_json::from_value(Value::Object(map)).map_err(DecodeError::Table)?;
            return Ok(Object::Table(table));
        }

        if kind.ends_with("List") && matches!(map.get("items"), Some(Value::Array(_))) {
            return UnstructuredList::from_map(map).map(Object::List);
        }

        Ok(Object::Unstructured(Unstructured { object: map }))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Object::Table(_))
    }

    pub fn kind(&self) -> &str {
        match self {
            Object::Unstructured(u) => u.kind(),
            Object::List(l) => str_field(&l.object, "kind"),
            Object::Table(t) => &t.kind,
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            Object::Unstructured(u) => u.api_version(),
            Object::List(l) => str_field(&l.object, "apiVersion"),
            Object::Table(t) => &t.api_version,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Object::Unstructured(u) => Value::Object(u.object.clone()),
            Object::List(l) => l.to_value(),
            // a Table only holds JSON values, serializing it cannot fail
            Object::Table(t) => serde_json::to_value(t).unwrap_or(Value::Null),
        }
    }
}

impl Unstructured {
    pub fn kind(&self) -> &str {
        str_field(&self.object, "kind")
    }

    pub fn api_version(&self) -> &str {
        str_field(&self.object, "apiVersion")
    }

    pub fn group(&self) -> &str {
        group_of(self.api_version())
    }

    pub fn name(&self) -> &str {
        metadata_str(&self.object, "name")
    }

    pub fn namespace(&self) -> &str {
        metadata_str(&self.object, "namespace")
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        labels_of(&self.object)
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(metadata_str(&self.object, "creationTimestamp"))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.object.clone())
    }
}

impl UnstructuredList {
    fn from_map(mut map: Map<String, Value>) -> Result<Self, DecodeError> {
        // take rather than remove so `items` keeps its place when written back
        let items = match map.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        // items without type information take it from the list
        let item_kind = str_field(&map, "kind").trim_end_matches("List").to_string();
        let api_version = str_field(&map, "apiVersion").to_string();

        let items = items
            .into_iter()
            .map(|item| match item {
                Value::Object(mut object) => {
                    if str_field(&object, "kind").is_empty() && str_field(&object, "apiVersion").is_empty() {
                        object.insert("kind".into(), Value::String(item_kind.clone()));
                        object.insert("apiVersion".into(), Value::String(api_version.clone()));
                    }
                    if str_field(&object, "kind").is_empty() {
                        return Err(DecodeError::MissingKind(Value::Object(object).to_string()));
                    }
                    Ok(Unstructured { object })
                }
                other => Err(DecodeError::NotAnObject(format!("list item {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { object: map, items })
    }

    pub fn resource_version(&self) -> &str {
        metadata_str(&self.object, "resourceVersion")
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.object.clone();
        map.insert(
            "items".into(),
            Value::Array(self.items.iter().map(Unstructured::to_value).collect()),
        );
        Value::Object(map)
    }
}

/// Fold objects into what the structured printers expect: a lone object stays as is, anything
/// else becomes a `v1` `List`.
pub fn into_generic_list(mut objects: Vec<Object>) -> Object {
    let (resource_version, items) = match objects.len() {
        1 => match objects.remove(0) {
            Object::List(list) => (list.resource_version().to_string(), list.items),
            other => return other,
        },
        _ => (String::new(), objects.into_iter().map(into_unstructured).collect()),
    };

    let mut object = Map::new();
    object.insert("apiVersion".into(), Value::String("v1".into()));
    object.insert("kind".into(), Value::String("List".into()));
    let mut metadata = Map::new();
    metadata.insert("resourceVersion".into(), Value::String(resource_version));
    object.insert("metadata".into(), Value::Object(metadata));

    Object::List(UnstructuredList { object, items })
}

fn into_unstructured(obj: Object) -> Unstructured {
    match obj {
        Object::Unstructured(u) => u,
        other => match other.to_value() {
            Value::Object(object) => Unstructured { object },
            _ => Unstructured { object: Map::new() },
        },
    }
}

pub fn group_of(api_version: &str) -> &str {
    match api_version.split_once('/') {
        Some((group, _)) => group,
        None => "",
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn metadata_str<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get("metadata")
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

pub fn labels_of(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .map(|(k, v)| {
                    let v = v.as_str().map(String::from).unwrap_or_else(|| v.to_string());
                    (k.clone(), v)
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
