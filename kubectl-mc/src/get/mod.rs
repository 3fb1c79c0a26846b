//! `kubectl mc get`: list managed clusters through the hub-of-hubs API.
use std::collections::HashSet;
use std::io::Write;

use hohkube::{ClientConfig, HubEndpoint};
use tracing::debug;

use crate::client::{ApiRequest, HubApi, JSON_ACCEPT, TABLE_ACCEPT};
use crate::error::{Error, Result};
use crate::object::{decode_objects, group_of, into_generic_list, Object};
use crate::printers::{GroupKind, PrintFlags, ResourcePrinter};

pub mod sorter;
pub mod writer;

use sorter::{Positioner, RuntimeSorter};
use writer::{SeparatorWriter, TrackingWriter};

/// Where a resource lives on the hub-of-hubs API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceMapping {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub resource: &'static str,
    pub namespaced: bool,
}

impl ResourceMapping {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.group, self.kind)
    }
}

pub const MANAGED_CLUSTERS: ResourceMapping = ResourceMapping {
    group: "cluster.open-cluster-management.io",
    version: "v1",
    kind: "ManagedCluster",
    resource: "managedclusters",
    namespaced: false,
};

#[derive(Debug, Clone)]
pub struct GetOptions {
    pub print_flags: PrintFlags,
    pub names: Vec<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    pub server_print: bool,
    pub ignore_not_found: bool,
    pub watch: bool,
    pub output_watch_events: bool,

    sort: bool,
    is_human_readable: bool,
    endpoint: Option<HubEndpoint>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            print_flags: PrintFlags::default(),
            names: Vec::new(),
            label_selector: None,
            field_selector: None,
            server_print: true,
            ignore_not_found: false,
            watch: false,
            output_watch_events: false,
            sort: false,
            is_human_readable: false,
            endpoint: None,
        }
    }
}

impl GetOptions {
    /// Fill in what the flags imply, and where to send the request.
    pub fn complete(&mut self, client: &ClientConfig, err_out: &mut dyn Write) -> Result<()> {
        let sort_by = self.print_flags.sort_by.as_deref().unwrap_or_default();
        self.sort = !sort_by.is_empty();

        let output = self.print_flags.output.as_str();
        if output.contains("custom-columns") || output.contains("json") || output == "yaml" {
            self.server_print = false;
        }

        let template_empty = self
            .print_flags
            .template
            .as_deref()
            .map_or(true, str::is_empty);
        self.is_human_readable = (output.is_empty() && template_empty) || output == "wide";

        if self.watch && self.sort {
            writeln!(err_out, "warning: --watch requested, --sort-by will be ignored")?;
            self.sort = false;
            self.print_flags.sort_by = None;
        }

        self.endpoint = Some(HubEndpoint::from_client_config(client)?);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let output = self.print_flags.output.as_str();
        if self.print_flags.show_labels && !output.is_empty() && output != "wide" {
            return Err(Error::Invalid(format!(
                "--show-labels option cannot be used with {output} printer"
            )));
        }
        if self.output_watch_events && !self.watch {
            return Err(Error::Usage(
                "--output-watch-events option can only be used with --watch".into(),
            ));
        }
        if !self.names.is_empty() {
            return Err(Error::Usage(
                "currently, only getting all the clusters is supported".into(),
            ));
        }
        // catch bad -o values before talking to the hub
        self.print_flags.to_printer(None)?;
        Ok(())
    }

    /// The request `run` sends.
    pub fn request(&self) -> Result<ApiRequest> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| Error::Request("no hub-of-hubs endpoint, options were not completed".into()))?;

        let server_table = self.server_print && self.is_human_readable;
        let mut query = Vec::new();
        if let Some(selector) = self.label_selector.as_deref().filter(|s| !s.is_empty()) {
            query.push(("labelSelector".to_string(), selector.to_string()));
        }
        if let Some(selector) = self.field_selector.as_deref().filter(|s| !s.is_empty()) {
            query.push(("fieldSelector".to_string(), selector.to_string()));
        }
        let needs_objects = self.sort
            || self.print_flags.show_labels
            || !self.print_flags.label_columns.is_empty();
        if server_table && needs_objects {
            query.push(("includeObject".to_string(), "Object".to_string()));
        }

        Ok(ApiRequest {
            url: endpoint.resource_url(MANAGED_CLUSTERS.resource),
            token: endpoint.token.clone(),
            accept: if server_table { TABLE_ACCEPT } else { JSON_ACCEPT },
            query,
        })
    }

    pub fn run(&self, api: &dyn HubApi, out: &mut dyn Write, err_out: &mut dyn Write) -> Result<()> {
        if self.watch {
            writeln!(
                err_out,
                "warning: watching is not supported by the hub-of-hubs API, listing once"
            )?;
        }

        let resp = api.get(&self.request()?)?;
        if resp.status == 404 && self.ignore_not_found {
            debug!("not found, ignored");
            return Ok(());
        }
        if resp.status != 200 {
            return Err(Error::StatusNotOk(resp.status));
        }

        let objects = decode_objects(&resp.body)?;
        debug!(count = objects.len(), "decoded objects");

        if !self.is_human_readable {
            return self.print_generic(objects, out);
        }
        self.print_human(flatten(objects), out, err_out)
    }

    fn print_generic(&self, objects: Vec<Object>, out: &mut dyn Write) -> Result<()> {
        if objects.is_empty() && self.ignore_not_found {
            return Ok(());
        }

        let mut printer = self.print_flags.to_printer(None)?;
        printer.print_obj(&into_generic_list(objects), out)?;
        printer.flush(out)
    }

    fn print_human(&self, mut objects: Vec<Object>, out: &mut dyn Write, err_out: &mut dyn Write) -> Result<()> {
        let positioner = match self.print_flags.sort_by.as_deref() {
            Some(sort_by) if self.sort => RuntimeSorter::new(sort_by)?.sort(&mut objects)?,
            _ => Positioner::Nop,
        };

        // ordering comes from the positioner, not from a sorting printer
        let flags = PrintFlags {
            sort_by: None,
            ..self.print_flags.clone()
        };

        let mut w = SeparatorWriter::new(TrackingWriter::new(out));
        let mut errors = Errors::default();
        let mut current: Option<(GroupKind, Box<dyn ResourcePrinter>)> = None;

        for ix in 0..objects.len() {
            let obj = &objects[positioner.original_position(ix)];
            let kind = group_kind_of(obj);

            if current.as_ref().map(|(k, _)| k) != Some(&kind) {
                if let Some((_, mut printer)) = current.take() {
                    errors.push(printer.flush(&mut w));
                    if !flags.no_headers && w.get_ref().written() > 0 {
                        w.set_ready(true);
                    }
                }
                match flags.to_printer(Some(&kind)) {
                    Ok(printer) => current = Some((kind, printer)),
                    Err(err) => {
                        errors.push(Err(err));
                        continue;
                    }
                }
            }

            if let Some((_, printer)) = current.as_mut() {
                errors.push(printer.print_obj(obj, &mut w));
            }
        }
        if let Some((_, mut printer)) = current.take() {
            errors.push(printer.flush(&mut w));
        }

        if w.get_ref().written() == 0 && !self.ignore_not_found && errors.is_empty() {
            writeln!(err_out, "No resources found")?;
        }
        errors.into_result()
    }
}

/// Tables print as the resource they describe; anything else as itself.
fn group_kind_of(obj: &Object) -> GroupKind {
    match obj {
        Object::Table(_) => MANAGED_CLUSTERS.group_kind(),
        other => GroupKind::new(group_of(other.api_version()), other.kind()),
    }
}

/// Lists print item by item, so their items can be sorted among the rest.
fn flatten(objects: Vec<Object>) -> Vec<Object> {
    objects
        .into_iter()
        .flat_map(|obj| match obj {
            Object::List(list) => list.items.into_iter().map(Object::Unstructured).collect(),
            other => vec![other],
        })
        .collect()
}

/// Printer failures, each message kept once.
#[derive(Default)]
struct Errors {
    seen: HashSet<String>,
    errors: Vec<Error>,
}

impl Errors {
    fn push(&mut self, result: Result<()>) {
        if let Err(err) = result {
            if self.seen.insert(err.to_string()) {
                self.errors.push(err);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_result(mut self) -> Result<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(Error::Aggregate(self.errors)),
        }
    }
}
