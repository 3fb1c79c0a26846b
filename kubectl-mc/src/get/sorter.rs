//! `--sort-by` support.
use std::cmp::Ordering;

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::jsonpath::{relaxed_expression, value_to_text, JsonPath};
use crate::object::{parse_timestamp, Object, Table, UnstructuredList};

/// Maps a print position back to the index of the object that belongs there.
#[derive(Debug, Clone, PartialEq)]
pub enum Positioner {
    /// Objects print in the order they came in. Tables sort their rows in place.
    Nop,
    Sorted(Vec<usize>),
}

impl Positioner {
    pub fn original_position(&self, ix: usize) -> usize {
        match self {
            Positioner::Nop => ix,
            Positioner::Sorted(order) => order.get(ix).copied().unwrap_or(ix),
        }
    }
}

pub struct RuntimeSorter {
    field: String,
    path: JsonPath,
}

impl RuntimeSorter {
    pub fn new(sort_by: &str) -> Result<Self> {
        let field = relaxed_expression(sort_by).unwrap_or_else(|_| sort_by.to_string());
        let path = JsonPath::parse(&field)?;
        Ok(Self { field, path })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Sort what the server returned. A list is already sorted when it holds nothing, or a single
    /// object that is not a Table.
    pub fn sort(&self, objects: &mut [Object]) -> Result<Positioner> {
        if objects.is_empty() || (objects.len() == 1 && !objects[0].is_table()) {
            return Ok(Positioner::Nop);
        }

        let mut includes_table = false;
        let mut includes_runtime_objs = false;
        for obj in objects.iter_mut() {
            match obj {
                Object::Table(table) => {
                    includes_table = true;
                    self.sort_table(table)?;
                }
                _ => includes_runtime_objs = true,
            }
        }

        if includes_table && includes_runtime_objs {
            return Err(Error::MixedSort);
        }
        if includes_table {
            return Ok(Positioner::Nop);
        }

        let values: Vec<Value> = objects.iter().map(Object::to_value).collect();
        let order = self.order(&values)?;
        trace!(field = %self.field, ?order, "sorted objects");
        Ok(Positioner::Sorted(order))
    }

    /// Reorder the rows of a server-side Table by the objects embedded in them.
    pub fn sort_table(&self, table: &mut Table) -> Result<()> {
        if table.rows.is_empty() {
            return Ok(());
        }

        let mut objects = Vec::with_capacity(table.rows.len());
        for (row, r) in table.rows.iter().enumerate() {
            let object = r.object.clone().ok_or(Error::RowWithoutObject { row })?;
            objects.push(object);
        }

        let order = self.order(&objects)?;
        let mut rows: Vec<_> = table.rows.drain(..).map(Some).collect();
        table.rows = order.into_iter().filter_map(|ix| rows[ix].take()).collect();
        Ok(())
    }

    /// Reorder the items of a `List` in place.
    pub fn sort_list(&self, list: &mut UnstructuredList) -> Result<()> {
        if list.items.is_empty() {
            return Ok(());
        }

        let values: Vec<Value> = list.items.iter().map(|i| i.to_value()).collect();
        let order = self.order(&values)?;
        let mut items: Vec<_> = list.items.drain(..).map(Some).collect();
        list.items = order.into_iter().filter_map(|ix| items[ix].take()).collect();
        Ok(())
    }

    fn order(&self, values: &[Value]) -> Result<Vec<usize>> {
        let keys: Vec<Option<&Value>> = values
            .iter()
            .map(|v| self.path.find(v).into_iter().next())
            .collect();

        if keys.iter().all(Option::is_none) {
            return Err(Error::SortFieldNotFound {
                path: self.field.clone(),
            });
        }

        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| compare_keys(keys[a], keys[b]));
        Ok(order)
    }
}

fn compare_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => natural_cmp(a, b),
        },
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (a, b) => natural_cmp(&value_to_text(a), &value_to_text(b)),
    }
}

/// Order strings so that embedded numbers compare by value: `node2` before `node10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x = take_digits(&mut a);
                let y = take_digits(&mut b);
                let ord = x
                    .trim_start_matches('0')
                    .len()
                    .cmp(&y.trim_start_matches('0').len())
                    .then_with(|| x.trim_start_matches('0').cmp(y.trim_start_matches('0')))
                    .then_with(|| x.len().cmp(&y.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::object::decode_objects;

    fn clusters(specs: &[(&str, i64)]) -> Vec<Object> {
        let items: Vec<Value> = specs
            .iter()
            .map(|(name, cpu)| {
                json!({
                    "apiVersion": "cluster.open-cluster-management.io/v1",
                    "kind": "ManagedCluster",
                    "metadata": {"name": name},
                    "status": {"capacity": {"cpu": cpu}}
                })
            })
            .collect();
        decode_objects(&serde_json::to_vec(&items).unwrap()).unwrap()
    }

    fn names_in_order(objects: &[Object], positioner: &Positioner) -> Vec<String> {
        (0..objects.len())
            .map(|ix| {
                let obj = &objects[positioner.original_position(ix)];
                obj.to_value()["metadata"]["name"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn nothing_to_sort_for_zero_or_one_object() {
        let sorter = RuntimeSorter::new("metadata.name").unwrap();

        assert_eq!(sorter.sort(&mut []).unwrap(), Positioner::Nop);
        assert_eq!(sorter.sort(&mut clusters(&[("a", 1)])).unwrap(), Positioner::Nop);
    }

    #[test]
    fn objects_sort_through_the_positioner() {
        let mut objects = clusters(&[("node10", 1), ("node2", 3), ("node1", 2)]);
        let sorter = RuntimeSorter::new("{.metadata.name}").unwrap();
        let positioner = sorter.sort(&mut objects).unwrap();

        assert_eq!(names_in_order(&objects, &positioner), ["node1", "node2", "node10"]);
    }

    #[test]
    fn numbers_sort_numerically() {
        let mut objects = clusters(&[("a", 16), ("b", 4), ("c", 128)]);
        let positioner = RuntimeSorter::new(".status.capacity.cpu")
            .unwrap()
            .sort(&mut objects)
            .unwrap();

        assert_eq!(names_in_order(&objects, &positioner), ["b", "a", "c"]);
    }

    #[test]
    fn missing_field_everywhere_is_an_error() {
        let mut objects = clusters(&[("a", 1), ("b", 2)]);
        let err = RuntimeSorter::new("spec.nothing")
            .unwrap()
            .sort(&mut objects)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            r#"couldn't find any field with path "{.spec.nothing}" in the list of objects"#
        );
    }

    #[test]
    fn objects_missing_the_field_sort_first() {
        let mut objects = clusters(&[("a", 1), ("b", 2)]);
        objects.push(
            Object::from_value(json!({"apiVersion": "v1", "kind": "Thing", "metadata": {"name": "bare"}}))
                .unwrap(),
        );
        let positioner = RuntimeSorter::new("status.capacity.cpu")
            .unwrap()
            .sort(&mut objects)
            .unwrap();

        assert_eq!(names_in_order(&objects, &positioner), ["bare", "a", "b"]);
    }

    fn table(names: &[&str], with_objects: bool) -> Object {
        let rows: Vec<Value> = names
            .iter()
            .map(|n| {
                if with_objects {
                    json!({"cells": [n], "object": {"metadata": {"name": n}}})
                } else {
                    json!({"cells": [n]})
                }
            })
            .collect();
        Object::from_value(json!({
            "apiVersion": "meta.k8s.io/v1",
            "kind": "Table",
            "columnDefinitions": [{"name": "Name", "type": "string"}],
            "rows": rows
        }))
        .unwrap()
    }

    #[test]
    fn table_rows_sort_in_place() {
        let mut objects = vec![table(&["c", "a", "b"], true)];
        let positioner = RuntimeSorter::new("metadata.name").unwrap().sort(&mut objects).unwrap();

        assert_eq!(positioner, Positioner::Nop);
        match &objects[0] {
            Object::Table(t) => {
                let cells: Vec<_> = t.rows.iter().map(|r| r.cells[0].clone()).collect();
                assert_eq!(cells, [json!("a"), json!("b"), json!("c")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn table_rows_need_objects() {
        let mut objects = vec![table(&["c", "a"], false)];
        let err = RuntimeSorter::new("metadata.name").unwrap().sort(&mut objects).unwrap_err();

        assert!(matches!(err, Error::RowWithoutObject { row: 0 }));
    }

    #[test]
    fn mixing_tables_and_objects_is_refused() {
        let mut objects = clusters(&[("a", 1)]);
        objects.push(table(&["b"], true));
        let err = RuntimeSorter::new("metadata.name").unwrap().sort(&mut objects).unwrap_err();

        assert!(matches!(err, Error::MixedSort));
    }

    #[test]
    fn timestamps_sort_chronologically() {
        assert_eq!(
            compare_values(&json!("2022-03-01T10:00:00Z"), &json!("2022-03-01T09:00:00-02:00")),
            Ordering::Less
        );
    }

    #[test]
    fn natural_order() {
        assert_eq!(natural_cmp("a2", "a10"), Ordering::Less);
        assert_eq!(natural_cmp("a10", "a10"), Ordering::Equal);
        assert_eq!(natural_cmp("b", "a10"), Ordering::Greater);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
    }
}
