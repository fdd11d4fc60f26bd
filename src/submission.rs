use crate::modal::{ModalLifecycle, OpenRequest};
use crate::model::{
    Cluster, InstallRequest, InstallResponse, Namespace, SubmissionState, SubmissionStatus,
    Template, TemplateFormData,
};
use crate::namespace::{FetchOutcome, NamespaceChange, NamespaceResolver};
use crate::store::ApplicationSink;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long a successful dialog stays up before it closes itself.
pub const AUTO_CLOSE_DELAY: Duration = Duration::from_millis(2_000);
/// Fixed text shown in the dialog after a successful install.
pub const SUCCESS_MESSAGE: &str = "Application deployment started";
const FALLBACK_ERROR_MESSAGE: &str = "Deployment failed";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct NamespaceTicket {
    pub instance: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubmitTicket {
    pub instance: u64,
    pub attempt: u64,
}

/// Side effects the dialog asks its owner to run.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEffect {
    FetchNamespaces {
        ticket: NamespaceTicket,
        context: String,
    },
    Install {
        ticket: SubmitTicket,
        request: InstallRequest,
    },
    ScheduleAutoClose {
        ticket: SubmitTicket,
        delay: Duration,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MissingField {
    Cluster,
    Template,
    Input { name: String, label: String },
}

impl Display for MissingField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cluster => f.write_str("cluster"),
            Self::Template => f.write_str("template"),
            Self::Input { label, .. } => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("required fields are empty: {}", join_fields(.missing))]
pub struct ValidationError {
    pub missing: Vec<MissingField>,
}

impl ValidationError {
    pub fn is_missing_input(&self, name: &str) -> bool {
        self.missing
            .iter()
            .any(|field| matches!(field, MissingField::Input { name: missing, .. } if missing == name))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SubmitRejected {
    #[error("a deployment is already in progress")]
    InFlight,
    #[error("the deployment already succeeded")]
    AlreadySucceeded,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    /// The result belongs to an attempt this dialog no longer tracks.
    Ignored,
    Failed {
        message: String,
    },
    Succeeded {
        application: Option<String>,
        auto_close: DeployEffect,
    },
}

/// Form state and submission lifecycle of one deploy dialog instance.
pub struct SubmissionController {
    instance: u64,
    template: Template,
    clusters: Vec<Cluster>,
    /// Cluster list that arrived while the form was locked.
    pending_clusters: Option<Vec<Cluster>>,
    cluster: Option<String>,
    namespace: Option<String>,
    resolver: NamespaceResolver,
    form: TemplateFormData,
    state: SubmissionState,
    validation: Option<ValidationError>,
    modal: ModalLifecycle,
    attempt: u64,
    in_flight: Option<u64>,
    auto_close: Option<u64>,
    sinks: Vec<Box<dyn ApplicationSink>>,
}

impl SubmissionController {
    pub fn new(instance: u64, template: Template) -> Self {
        let form = template.initial_form_data();
        Self {
            instance,
            template,
            clusters: Vec::new(),
            pending_clusters: None,
            cluster: None,
            namespace: None,
            resolver: NamespaceResolver::new(),
            form,
            state: SubmissionState::default(),
            validation: None,
            modal: ModalLifecycle::default(),
            attempt: 0,
            in_flight: None,
            auto_close: None,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl ApplicationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    pub fn cluster_label(&self) -> Option<&str> {
        let name = self.cluster.as_deref()?;
        self.clusters
            .iter()
            .find(|cluster| cluster.name == name)
            .map(|cluster| cluster.label.as_str())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    pub fn form_value(&self, key: &str) -> &str {
        self.form.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn status(&self) -> SubmissionStatus {
        self.state.status
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_open()
    }

    pub fn editable(&self) -> bool {
        matches!(
            self.state.status,
            SubmissionStatus::Idle | SubmissionStatus::Failed
        )
    }

    /// Opens the dialog when the page raised a request. Returns true on open.
    pub fn sync_open_request(&mut self, request: &mut OpenRequest) -> bool {
        let opened = self.modal.observe(request);
        if opened && self.state.status != SubmissionStatus::Submitting {
            self.state = SubmissionState::default();
            self.validation = None;
            self.auto_close = None;
        }
        opened
    }

    pub fn initialize(&mut self, clusters: Vec<Cluster>) -> Option<DeployEffect> {
        self.react_to_cluster_list_change(clusters)
    }

    /// Re-derives the cluster selection. While a submission is running or has
    /// succeeded the list is held back until the form unlocks.
    pub fn react_to_cluster_list_change(&mut self, clusters: Vec<Cluster>) -> Option<DeployEffect> {
        if !self.editable() {
            debug!(instance = self.instance, "deferring cluster list change");
            self.pending_clusters = Some(clusters);
            return None;
        }
        self.pending_clusters = None;
        if clusters == self.clusters && (self.cluster.is_some() || clusters.is_empty()) {
            return None;
        }
        let next = derive_cluster_selection(self.cluster.as_deref(), &clusters);
        self.clusters = clusters;
        self.apply_cluster(next)
    }

    /// Applies a cluster list held back during a submission, once the form is
    /// editable again.
    pub fn apply_pending_clusters(&mut self) -> Option<DeployEffect> {
        if !self.editable() {
            return None;
        }
        let clusters = self.pending_clusters.take()?;
        self.react_to_cluster_list_change(clusters)
    }

    pub fn select_cluster(&mut self, name: &str) -> Option<DeployEffect> {
        if !self.editable() || !self.clusters.iter().any(|cluster| cluster.name == name) {
            return None;
        }
        self.note_edit();
        self.apply_cluster(Some(name.to_string()))
    }

    pub fn cycle_cluster(&mut self, delta: isize) -> Option<DeployEffect> {
        if self.clusters.is_empty() {
            return None;
        }
        let len = self.clusters.len() as isize;
        let current = self
            .cluster
            .as_deref()
            .and_then(|name| self.clusters.iter().position(|cluster| cluster.name == name))
            .map(|index| index as isize)
            .unwrap_or(-1);
        let next = (current + delta).rem_euclid(len) as usize;
        let name = self.clusters[next].name.clone();
        self.select_cluster(&name)
    }

    pub fn namespaces_loaded(
        &mut self,
        ticket: NamespaceTicket,
        result: Result<Vec<Namespace>, String>,
    ) -> bool {
        if ticket.instance != self.instance {
            return false;
        }
        match self.resolver.apply_fetch(ticket.generation, result) {
            FetchOutcome::Applied { change } => {
                self.apply_namespace_change(change);
                true
            }
            FetchOutcome::Stale => false,
        }
    }

    /// Runs a user edit against the namespace picker.
    pub fn edit_namespace<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut NamespaceResolver) -> Option<NamespaceChange>,
    {
        if !self.editable() {
            return;
        }
        if let Some(change) = edit(&mut self.resolver) {
            self.note_edit();
            self.apply_namespace_change(Some(change));
        }
    }

    pub fn set_form_value(&mut self, key: &str, value: impl Into<String>) {
        if !self.editable() {
            return;
        }
        self.note_edit();
        self.form.insert(key.to_string(), value.into());
    }

    pub fn push_form_char(&mut self, key: &str, c: char) {
        let mut value = self.form_value(key).to_string();
        value.push(c);
        self.set_form_value(key, value);
    }

    pub fn pop_form_char(&mut self, key: &str) {
        let mut value = self.form_value(key).to_string();
        if value.pop().is_some() {
            self.set_form_value(key, value);
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self
            .cluster
            .as_deref()
            .is_none_or(|cluster| cluster.trim().is_empty())
        {
            missing.push(MissingField::Cluster);
        }
        if self.template.id.trim().is_empty() {
            missing.push(MissingField::Template);
        }
        for input in self.template.inputs.iter().filter(|input| input.required) {
            if self.form_value(&input.name).trim().is_empty() {
                missing.push(MissingField::Input {
                    name: input.name.clone(),
                    label: input.display_label().to_string(),
                });
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    /// Validates the form and, only when it is complete, starts the install.
    pub fn submit(&mut self) -> Result<DeployEffect, SubmitRejected> {
        match self.state.status {
            SubmissionStatus::Submitting => return Err(SubmitRejected::InFlight),
            SubmissionStatus::Succeeded => return Err(SubmitRejected::AlreadySucceeded),
            SubmissionStatus::Idle | SubmissionStatus::Failed => {}
        }
        if self.state.status == SubmissionStatus::Failed {
            self.state.status = SubmissionStatus::Idle;
        }

        if let Err(error) = self.validate() {
            debug!(instance = self.instance, "submit blocked: {error}");
            self.validation = Some(error.clone());
            return Err(error.into());
        }

        self.validation = None;
        self.state.clear_messages();
        self.state.status = SubmissionStatus::Submitting;
        self.attempt += 1;
        self.in_flight = Some(self.attempt);
        self.auto_close = None;

        let request = InstallRequest {
            template_id: self.template.id.clone(),
            inputs: self.form.clone(),
            context_name: self.cluster.clone().unwrap_or_default(),
            namespace: self.namespace.clone().unwrap_or_default(),
            dry_run: false,
        };
        info!(
            instance = self.instance,
            attempt = self.attempt,
            template = %request.template_id,
            context = %request.context_name,
            namespace = %request.namespace,
            "install dispatched"
        );
        Ok(DeployEffect::Install {
            ticket: self.ticket(),
            request,
        })
    }

    pub fn install_finished(
        &mut self,
        ticket: SubmitTicket,
        response: InstallResponse,
    ) -> InstallOutcome {
        if ticket.instance != self.instance || self.in_flight != Some(ticket.attempt) {
            warn!(
                instance = ticket.instance,
                attempt = ticket.attempt,
                "install result arrived for a closed dialog"
            );
            return InstallOutcome::Ignored;
        }
        self.in_flight = None;

        if response.is_error() {
            let message = response
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
            warn!(instance = self.instance, "install failed: {message}");
            self.state.status = SubmissionStatus::Failed;
            self.state.error_message = Some(message.clone());
            return InstallOutcome::Failed { message };
        }

        self.state.status = SubmissionStatus::Succeeded;
        self.state.success_message = Some(SUCCESS_MESSAGE.to_string());
        let application = response.application.map(|application| {
            let name = application.name.clone();
            for sink in &self.sinks {
                sink.append(application.clone());
            }
            name
        });
        info!(
            instance = self.instance,
            application = application.as_deref().unwrap_or("-"),
            "install succeeded"
        );

        self.auto_close = Some(ticket.attempt);
        InstallOutcome::Succeeded {
            application,
            auto_close: DeployEffect::ScheduleAutoClose {
                ticket,
                delay: AUTO_CLOSE_DELAY,
            },
        }
    }

    /// Closes the dialog if the timer belongs to the pending success.
    pub fn auto_close_elapsed(&mut self, ticket: SubmitTicket) -> bool {
        if ticket.instance != self.instance || self.auto_close != Some(ticket.attempt) {
            debug!(
                instance = ticket.instance,
                attempt = ticket.attempt,
                "ignoring stale auto-close"
            );
            return false;
        }
        self.close();
        true
    }

    /// Returns true when the dialog was open.
    pub fn close(&mut self) -> bool {
        if self.in_flight.take().is_some() {
            debug!(instance = self.instance, "closing with install in flight");
        }
        self.auto_close = None;
        self.validation = None;
        self.state = SubmissionState::default();
        self.modal.close()
    }

    fn ticket(&self) -> SubmitTicket {
        SubmitTicket {
            instance: self.instance,
            attempt: self.attempt,
        }
    }

    fn note_edit(&mut self) {
        self.validation = None;
        if self.state.status == SubmissionStatus::Failed {
            self.state.status = SubmissionStatus::Idle;
        }
    }

    fn apply_cluster(&mut self, next: Option<String>) -> Option<DeployEffect> {
        self.cluster = next;
        let switch = self.resolver.set_cluster(self.cluster.as_deref());
        self.apply_namespace_change(switch.change);
        let generation = switch.fetch?;
        Some(DeployEffect::FetchNamespaces {
            ticket: NamespaceTicket {
                instance: self.instance,
                generation,
            },
            context: self.cluster.clone()?,
        })
    }

    fn apply_namespace_change(&mut self, change: Option<NamespaceChange>) {
        if let Some(change) = change {
            self.namespace = change.namespace;
        }
    }
}

/// Keeps a selection that is still listed, otherwise falls back to the first
/// cluster.
pub fn derive_cluster_selection(previous: Option<&str>, clusters: &[Cluster]) -> Option<String> {
    previous
        .filter(|name| clusters.iter().any(|cluster| cluster.name == *name))
        .map(str::to_string)
        .or_else(|| clusters.first().map(|cluster| cluster.name.clone()))
}

fn join_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
