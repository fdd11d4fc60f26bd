use crate::input::Action;
use crate::modal::OpenRequest;
use crate::model::{Application, Cluster, InstallResponse, Namespace, Template};
use crate::store::ApplicationStore;
use crate::submission::{
    DeployEffect, InstallOutcome, MissingField, NamespaceTicket, SubmissionController,
    SubmitRejected, SubmitTicket,
};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Dialog,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FormFocus {
    Cluster,
    Namespace,
    Input(usize),
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    None,
    RefreshCatalog,
    ReloadClusters,
    Deploy(DeployEffect),
}

impl From<Option<DeployEffect>> for AppCommand {
    fn from(effect: Option<DeployEffect>) -> Self {
        effect.map(Self::Deploy).unwrap_or(Self::None)
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub templates: Vec<Template>,
    pub applications: Vec<Application>,
}

/// Results posted back to the event loop by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    CatalogLoaded(Result<Catalog, String>),
    ClustersLoaded(Vec<Cluster>),
    NamespacesLoaded {
        ticket: NamespaceTicket,
        result: Result<Vec<Namespace>, String>,
    },
    InstallFinished {
        ticket: SubmitTicket,
        response: InstallResponse,
    },
    AutoCloseElapsed {
        ticket: SubmitTicket,
    },
}

/// Deploy dialog: the submission controller plus which field has focus.
pub struct DeployDialog {
    controller: SubmissionController,
    focus: FormFocus,
}

impl DeployDialog {
    fn new(controller: SubmissionController) -> Self {
        Self {
            controller,
            focus: FormFocus::Cluster,
        }
    }

    pub fn controller(&self) -> &SubmissionController {
        &self.controller
    }

    pub fn focus(&self) -> FormFocus {
        self.focus
    }

    fn fields(&self) -> Vec<FormFocus> {
        let mut fields = vec![FormFocus::Cluster, FormFocus::Namespace];
        fields.extend((0..self.controller.template().inputs.len()).map(FormFocus::Input));
        fields.push(FormFocus::Submit);
        fields
    }

    fn move_focus(&mut self, delta: isize) {
        let fields = self.fields();
        let current = fields
            .iter()
            .position(|field| *field == self.focus)
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(fields.len() as isize) as usize;
        self.focus = fields[next];
    }

    fn focused_input(&self) -> Option<String> {
        match self.focus {
            FormFocus::Input(index) => self
                .controller
                .template()
                .inputs
                .get(index)
                .map(|input| input.name.clone()),
            _ => None,
        }
    }

    fn apply(&mut self, action: Action) -> Option<DeployEffect> {
        match action {
            Action::CancelDialog => {
                self.controller.close();
                None
            }
            Action::NextField => {
                self.move_focus(1);
                None
            }
            Action::PrevField => {
                self.move_focus(-1);
                None
            }
            Action::Submit => self.submit(),
            Action::Confirm => match self.focus {
                FormFocus::Namespace => {
                    self.controller.edit_namespace(|resolver| resolver.confirm());
                    None
                }
                FormFocus::Submit => self.submit(),
                FormFocus::Cluster | FormFocus::Input(_) => {
                    self.move_focus(1);
                    None
                }
            },
            Action::Left | Action::Right if self.focus == FormFocus::Cluster => {
                let delta = if action == Action::Left { -1 } else { 1 };
                self.controller.cycle_cluster(delta)
            }
            Action::Up | Action::Down if self.focus == FormFocus::Namespace => {
                let delta = if action == Action::Up { -1 } else { 1 };
                self.controller.edit_namespace(|resolver| {
                    resolver.move_highlight(delta);
                    None
                });
                None
            }
            Action::Up => {
                self.move_focus(-1);
                None
            }
            Action::Down => {
                self.move_focus(1);
                None
            }
            Action::Backspace => {
                if self.focus == FormFocus::Namespace {
                    self.controller.edit_namespace(|resolver| {
                        if resolver.query().is_empty() {
                            return resolver.clear_selection();
                        }
                        resolver.pop_query();
                        None
                    });
                } else if let Some(name) = self.focused_input() {
                    self.controller.pop_form_char(&name);
                }
                None
            }
            Action::InputChar(c) => {
                if self.focus == FormFocus::Namespace {
                    self.controller.edit_namespace(|resolver| {
                        resolver.push_query(c);
                        None
                    });
                } else if let Some(name) = self.focused_input() {
                    self.controller.push_form_char(&name, c);
                }
                None
            }
            _ => None,
        }
    }

    fn submit(&mut self) -> Option<DeployEffect> {
        match self.controller.submit() {
            Ok(effect) => Some(effect),
            Err(SubmitRejected::InFlight | SubmitRejected::AlreadySucceeded) => None,
            Err(SubmitRejected::Invalid(error)) => {
                if let Some(first) = error.missing.first() {
                    self.focus = self.focus_for(first);
                }
                None
            }
        }
    }

    fn focus_for(&self, field: &MissingField) -> FormFocus {
        match field {
            MissingField::Cluster => FormFocus::Cluster,
            MissingField::Template => FormFocus::Submit,
            MissingField::Input { name, .. } => self
                .controller
                .template()
                .inputs
                .iter()
                .position(|input| &input.name == name)
                .map(FormFocus::Input)
                .unwrap_or(FormFocus::Submit),
        }
    }
}

pub struct App {
    running: bool,
    mode: InputMode,
    status: String,
    show_help: bool,
    hub_url: String,
    templates: Vec<Template>,
    selected: usize,
    clusters: Vec<Cluster>,
    all_applications: ApplicationStore,
    template_applications: HashMap<String, ApplicationStore>,
    deploy_request: OpenRequest,
    dialog: Option<DeployDialog>,
    next_instance: u64,
    catalog_loading: bool,
    catalog_refreshed_at: Option<DateTime<Local>>,
}

impl App {
    pub fn new(hub_url: String, clusters: Vec<Cluster>) -> Self {
        Self {
            running: true,
            mode: InputMode::Normal,
            status: "Ready".to_string(),
            show_help: false,
            hub_url,
            templates: Vec::new(),
            selected: 0,
            clusters,
            all_applications: ApplicationStore::new(),
            template_applications: HashMap::new(),
            deploy_request: OpenRequest::default(),
            dialog: None,
            next_instance: 0,
            catalog_loading: false,
            catalog_refreshed_at: None,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn hub_url(&self) -> &str {
        &self.hub_url
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_template(&self) -> Option<&Template> {
        self.templates.get(self.selected)
    }

    pub fn page_applications(&self) -> Vec<Application> {
        self.selected_template()
            .and_then(|template| self.template_applications.get(&template.id))
            .map(ApplicationStore::snapshot)
            .unwrap_or_default()
    }

    pub fn all_applications(&self) -> &ApplicationStore {
        &self.all_applications
    }

    pub fn catalog_loading(&self) -> bool {
        self.catalog_loading
    }

    pub fn catalog_refreshed_at(&self) -> Option<DateTime<Local>> {
        self.catalog_refreshed_at
    }

    /// The deploy dialog, when it is currently shown.
    pub fn dialog(&self) -> Option<&DeployDialog> {
        self.dialog
            .as_ref()
            .filter(|dialog| dialog.controller.is_open())
    }

    /// Marks the catalog as loading and returns the command that fetches it.
    pub fn request_catalog(&mut self) -> AppCommand {
        self.catalog_loading = true;
        self.status = format!("Loading templates from {}...", self.hub_url);
        AppCommand::RefreshCatalog
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        if matches!(action, Action::Quit) {
            self.running = false;
            self.status = "Exit requested".to_string();
            return AppCommand::None;
        }

        if self.mode == InputMode::Dialog {
            return self.apply_dialog_action(action);
        }

        match action {
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::Top => {
                self.selected = 0;
                AppCommand::None
            }
            Action::Bottom => {
                self.selected = self.templates.len().saturating_sub(1);
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::OpenDeploy => self.open_deploy(),
            Action::RefreshCatalog => self.request_catalog(),
            Action::ReloadClusters => {
                self.status = "Reloading kubeconfig contexts...".to_string();
                AppCommand::ReloadClusters
            }
            _ => AppCommand::None,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> AppCommand {
        let command = match event {
            AppEvent::CatalogLoaded(Ok(catalog)) => {
                self.apply_catalog(catalog);
                AppCommand::None
            }
            AppEvent::CatalogLoaded(Err(error)) => {
                self.catalog_loading = false;
                self.status = format!("Failed loading catalog: {error}");
                AppCommand::None
            }
            AppEvent::ClustersLoaded(clusters) => {
                self.status = format!("Loaded {} kube contexts", clusters.len());
                self.clusters = clusters;
                match self.dialog.as_mut() {
                    Some(dialog) => dialog
                        .controller
                        .react_to_cluster_list_change(self.clusters.clone())
                        .into(),
                    None => AppCommand::None,
                }
            }
            AppEvent::NamespacesLoaded { ticket, result } => {
                match self.dialog_for(ticket.instance) {
                    Some(dialog) => {
                        dialog.controller.namespaces_loaded(ticket, result);
                    }
                    None => debug!(instance = ticket.instance, "namespace result for discarded dialog"),
                }
                AppCommand::None
            }
            AppEvent::InstallFinished { ticket, response } => {
                let outcome = match self.dialog_for(ticket.instance) {
                    Some(dialog) => dialog.controller.install_finished(ticket, response),
                    None => InstallOutcome::Ignored,
                };
                self.apply_install_outcome(outcome)
            }
            AppEvent::AutoCloseElapsed { ticket } => {
                if let Some(dialog) = self.dialog_for(ticket.instance) {
                    dialog.controller.auto_close_elapsed(ticket);
                }
                AppCommand::None
            }
        };
        let command = self.apply_pending_clusters(command);
        self.sync_mode();
        command
    }

    fn apply_dialog_action(&mut self, action: Action) -> AppCommand {
        let Some(dialog) = self.dialog.as_mut() else {
            self.mode = InputMode::Normal;
            return AppCommand::None;
        };
        let effect = dialog.apply(action);
        self.sync_mode();
        if self.mode == InputMode::Normal {
            self.status = "Deploy dialog closed".to_string();
        }
        self.apply_pending_clusters(effect.into())
    }

    /// Hands a cluster list held back during a submission to the dialog once
    /// nothing else is queued.
    fn apply_pending_clusters(&mut self, command: AppCommand) -> AppCommand {
        if !matches!(command, AppCommand::None) {
            return command;
        }
        match self.dialog.as_mut() {
            Some(dialog) => dialog.controller.apply_pending_clusters().into(),
            None => AppCommand::None,
        }
    }

    fn open_deploy(&mut self) -> AppCommand {
        let Some(template) = self.selected_template().cloned() else {
            self.status = "No template selected".to_string();
            return AppCommand::None;
        };

        let mut command = AppCommand::None;
        let reuse = self
            .dialog
            .as_ref()
            .is_some_and(|dialog| dialog.controller.template().id == template.id);
        if !reuse {
            self.next_instance += 1;
            let page = self.page_store(&template.id);
            let mut controller = SubmissionController::new(self.next_instance, template)
                .with_sink(page)
                .with_sink(self.all_applications.clone());
            command = controller.initialize(self.clusters.clone()).into();
            if let Some(previous) = self.dialog.replace(DeployDialog::new(controller)) {
                debug!(
                    instance = previous.controller.instance(),
                    "discarding deploy dialog"
                );
            }
        }

        self.deploy_request.raise();
        if let Some(dialog) = self.dialog.as_mut()
            && dialog.controller.sync_open_request(&mut self.deploy_request)
        {
            dialog.focus = FormFocus::Cluster;
        }
        self.sync_mode();
        if let Some(template) = self.selected_template() {
            self.status = format!("Deploying {}", template.name);
        }
        command
    }

    fn apply_install_outcome(&mut self, outcome: InstallOutcome) -> AppCommand {
        match outcome {
            InstallOutcome::Ignored => {
                self.status =
                    "A deployment finished after its dialog was closed; press r to refresh"
                        .to_string();
                AppCommand::None
            }
            InstallOutcome::Failed { message } => {
                self.status = format!("Deployment failed: {message}");
                AppCommand::None
            }
            InstallOutcome::Succeeded {
                application,
                auto_close,
            } => {
                self.status = match application {
                    Some(name) => format!("Deployed {name}"),
                    None => "Deployment started".to_string(),
                };
                AppCommand::Deploy(auto_close)
            }
        }
    }

    fn apply_catalog(&mut self, catalog: Catalog) {
        let Catalog {
            templates,
            applications,
        } = catalog;

        let mut grouped: HashMap<String, Vec<Application>> = HashMap::new();
        for application in &applications {
            if let Some(template_id) = &application.template_id {
                grouped
                    .entry(template_id.clone())
                    .or_default()
                    .push(application.clone());
            }
        }
        for template in &templates {
            let items = grouped.remove(&template.id).unwrap_or_default();
            self.page_store(&template.id).replace(items);
        }

        self.status = format!(
            "Loaded {} templates, {} applications",
            templates.len(),
            applications.len()
        );
        self.all_applications.replace(applications);
        self.templates = templates;
        self.selected = self.selected.min(self.templates.len().saturating_sub(1));
        self.catalog_loading = false;
        self.catalog_refreshed_at = Some(Local::now());
    }

    fn page_store(&mut self, template_id: &str) -> ApplicationStore {
        self.template_applications
            .entry(template_id.to_string())
            .or_default()
            .clone()
    }

    fn dialog_for(&mut self, instance: u64) -> Option<&mut DeployDialog> {
        self.dialog
            .as_mut()
            .filter(|dialog| dialog.controller.instance() == instance)
    }

    fn move_selection(&mut self, delta: isize) {
        if self.templates.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.templates.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    fn sync_mode(&mut self) {
        let open = self
            .dialog
            .as_ref()
            .is_some_and(|dialog| dialog.controller.is_open());
        self.mode = if open {
            InputMode::Dialog
        } else {
            InputMode::Normal
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, AppEvent, Catalog, FormFocus, InputMode};
    use crate::input::Action;
    use crate::model::{
        Application, Cluster, InstallResponse, Namespace, SubmissionStatus, Template,
        TemplateInput,
    };
    use crate::submission::{AUTO_CLOSE_DELAY, DeployEffect, NamespaceTicket, SubmitTicket};
    use std::collections::BTreeMap;

    fn template(id: &str, name: &str) -> Template {
        Template {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            inputs: vec![TemplateInput {
                name: "hostname".to_string(),
                label: None,
                description: String::new(),
                default: None,
                required: true,
            }],
        }
    }

    fn application(name: &str, template_id: &str) -> Application {
        Application {
            name: name.to_string(),
            context_name: "kind-dev".to_string(),
            namespace: "default".to_string(),
            status: "running".to_string(),
            template_id: Some(template_id.to_string()),
            extra: BTreeMap::new(),
        }
    }

    fn app() -> App {
        let mut app = App::new(
            "https://hub.example.com/api/v1".to_string(),
            vec![
                Cluster::new("kind-dev", "kind-dev"),
                Cluster::new("prod", "prod (eks)"),
            ],
        );
        app.handle_event(AppEvent::CatalogLoaded(Ok(Catalog {
            templates: vec![template("1", "wordpress"), template("2", "redis")],
            applications: vec![application("blog", "1"), application("cache", "2")],
        })));
        app
    }

    fn open_dialog(app: &mut App) -> NamespaceTicket {
        match app.apply_action(Action::OpenDeploy) {
            AppCommand::Deploy(DeployEffect::FetchNamespaces { ticket, .. }) => ticket,
            other => panic!("expected namespace lookup, got {other:?}"),
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.apply_action(Action::InputChar(c));
        }
    }

    fn focus(app: &App) -> FormFocus {
        app.dialog().expect("dialog open").focus()
    }

    /// Opens the dialog, resolves namespaces, fills the hostname and submits.
    fn submit_deploy(app: &mut App) -> SubmitTicket {
        let ticket = open_dialog(app);
        app.handle_event(AppEvent::NamespacesLoaded {
            ticket,
            result: Ok(vec![Namespace::named("default")]),
        });
        app.apply_action(Action::NextField);
        app.apply_action(Action::NextField);
        assert_eq!(focus(app), FormFocus::Input(0));
        type_text(app, "blog.example.com");
        match app.apply_action(Action::Submit) {
            AppCommand::Deploy(DeployEffect::Install { ticket, request }) => {
                assert_eq!(request.namespace, "default");
                assert_eq!(request.context_name, "kind-dev");
                ticket
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn catalog_groups_applications_by_template() {
        let mut app = app();

        assert_eq!(app.templates().len(), 2);
        assert_eq!(app.page_applications()[0].name, "blog");
        app.apply_action(Action::Down);
        assert_eq!(app.page_applications()[0].name, "cache");
        assert_eq!(app.all_applications().len(), 2);
        assert!(app.catalog_refreshed_at().is_some());
    }

    #[test]
    fn open_deploy_shows_dialog_and_requests_namespaces() {
        let mut app = app();

        let ticket = open_dialog(&mut app);

        assert_eq!(app.mode(), InputMode::Dialog);
        assert_eq!(focus(&app), FormFocus::Cluster);
        assert_eq!(ticket.generation, 1);
    }

    #[test]
    fn typing_q_in_dialog_does_not_quit() {
        let mut app = app();
        open_dialog(&mut app);
        app.apply_action(Action::NextField);
        app.apply_action(Action::NextField);

        type_text(&mut app, "q");

        assert!(app.running());
        let dialog = app.dialog().unwrap();
        assert_eq!(dialog.controller().form_value("hostname"), "q");
    }

    #[test]
    fn submit_with_missing_input_focuses_it() {
        let mut app = app();
        open_dialog(&mut app);

        let command = app.apply_action(Action::Submit);

        assert_eq!(command, AppCommand::None);
        assert_eq!(focus(&app), FormFocus::Input(0));
        assert_eq!(
            app.dialog().unwrap().controller().status(),
            SubmissionStatus::Idle
        );
    }

    #[test]
    fn successful_deploy_updates_lists_and_auto_closes() {
        let mut app = app();
        let ticket = submit_deploy(&mut app);

        let command = app.handle_event(AppEvent::InstallFinished {
            ticket,
            response: InstallResponse {
                status: "ok".to_string(),
                message: None,
                application: Some(application("blog-2", "1")),
            },
        });

        assert_eq!(
            command,
            AppCommand::Deploy(DeployEffect::ScheduleAutoClose {
                ticket,
                delay: AUTO_CLOSE_DELAY
            })
        );
        let names = app
            .page_applications()
            .into_iter()
            .map(|application| application.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["blog", "blog-2"]);
        assert_eq!(app.all_applications().len(), 3);
        assert_eq!(app.mode(), InputMode::Dialog);
        assert_eq!(app.status(), "Deployed blog-2");

        app.handle_event(AppEvent::AutoCloseElapsed { ticket });
        assert_eq!(app.mode(), InputMode::Normal);
        assert!(app.dialog().is_none());
    }

    #[test]
    fn failed_deploy_keeps_dialog_open() {
        let mut app = app();
        let ticket = submit_deploy(&mut app);

        app.handle_event(AppEvent::InstallFinished {
            ticket,
            response: InstallResponse::error("release already exists"),
        });

        assert_eq!(app.mode(), InputMode::Dialog);
        let controller = app.dialog().unwrap().controller();
        assert_eq!(
            controller.state().error_message.as_deref(),
            Some("release already exists")
        );
        assert_eq!(app.page_applications().len(), 1);
    }

    #[test]
    fn cancel_during_submission_drops_late_result() {
        let mut app = app();
        let ticket = submit_deploy(&mut app);

        app.apply_action(Action::CancelDialog);
        assert_eq!(app.mode(), InputMode::Normal);

        let command = app.handle_event(AppEvent::InstallFinished {
            ticket,
            response: InstallResponse {
                status: "ok".to_string(),
                message: None,
                application: Some(application("blog-2", "1")),
            },
        });

        assert_eq!(command, AppCommand::None);
        assert_eq!(app.page_applications().len(), 1);
        assert_eq!(app.all_applications().len(), 2);
        assert!(app.status().contains("press r to refresh"));
    }

    #[test]
    fn reopening_same_template_keeps_instance() {
        let mut app = app();
        open_dialog(&mut app);
        app.apply_action(Action::CancelDialog);

        let command = app.apply_action(Action::OpenDeploy);

        assert_eq!(command, AppCommand::None);
        assert_eq!(app.mode(), InputMode::Dialog);
        assert_eq!(app.dialog().unwrap().controller().instance(), 1);
    }

    #[test]
    fn switching_template_discards_previous_dialog() {
        let mut app = app();
        let old = open_dialog(&mut app);
        app.apply_action(Action::CancelDialog);
        app.apply_action(Action::Down);

        let fresh = open_dialog(&mut app);
        assert_eq!(fresh.instance, old.instance + 1);

        app.handle_event(AppEvent::NamespacesLoaded {
            ticket: old,
            result: Ok(vec![Namespace::named("default")]),
        });
        let controller = app.dialog().unwrap().controller();
        assert_eq!(controller.template().name, "redis");
        assert_eq!(controller.namespace(), None);
        assert!(controller.resolver().is_loading());
    }

    #[test]
    fn reloaded_clusters_flow_into_open_dialog() {
        let mut app = app();
        open_dialog(&mut app);

        let command = app.handle_event(AppEvent::ClustersLoaded(vec![Cluster::new(
            "stage", "stage",
        )]));

        match command {
            AppCommand::Deploy(DeployEffect::FetchNamespaces { context, ticket }) => {
                assert_eq!(context, "stage");
                assert_eq!(ticket.generation, 2);
            }
            other => panic!("expected namespace lookup, got {other:?}"),
        }
        assert_eq!(app.dialog().unwrap().controller().cluster(), Some("stage"));
    }

    #[test]
    fn submit_after_success_waits_for_auto_close() {
        let mut app = app();
        let ticket = submit_deploy(&mut app);
        app.handle_event(AppEvent::InstallFinished {
            ticket,
            response: InstallResponse {
                status: "ok".to_string(),
                message: None,
                application: Some(application("blog-2", "1")),
            },
        });

        assert_eq!(app.apply_action(Action::Submit), AppCommand::None);
        assert_eq!(
            app.dialog().unwrap().controller().status(),
            SubmissionStatus::Succeeded
        );

        app.handle_event(AppEvent::AutoCloseElapsed { ticket });
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(app.page_applications().len(), 2);
    }

    #[test]
    fn reloaded_clusters_wait_while_submitting() {
        let mut app = app();
        let ticket = submit_deploy(&mut app);

        let command = app.handle_event(AppEvent::ClustersLoaded(vec![Cluster::new(
            "stage", "stage",
        )]));

        assert_eq!(command, AppCommand::None);
        let controller = app.dialog().unwrap().controller();
        assert_eq!(controller.cluster(), Some("kind-dev"));
        assert_eq!(controller.status(), SubmissionStatus::Submitting);

        let command = app.handle_event(AppEvent::InstallFinished {
            ticket,
            response: InstallResponse::error("release already exists"),
        });

        assert!(matches!(
            command,
            AppCommand::Deploy(DeployEffect::FetchNamespaces { ref context, .. }) if context == "stage"
        ));
        assert_eq!(app.dialog().unwrap().controller().cluster(), Some("stage"));
    }

    #[test]
    fn cluster_field_cycles_with_arrows() {
        let mut app = app();
        open_dialog(&mut app);

        let command = app.apply_action(Action::Right);

        assert!(matches!(
            command,
            AppCommand::Deploy(DeployEffect::FetchNamespaces { ref context, .. }) if context == "prod"
        ));
    }

    #[test]
    fn namespace_field_accepts_free_text() {
        let mut app = app();
        open_dialog(&mut app);
        app.apply_action(Action::NextField);
        assert_eq!(focus(&app), FormFocus::Namespace);

        type_text(&mut app, "preview");
        app.apply_action(Action::Confirm);

        let controller = app.dialog().unwrap().controller();
        assert_eq!(controller.namespace(), Some("preview"));
    }

    #[test]
    fn backspace_on_empty_search_clears_namespace() {
        let mut app = app();
        let ticket = open_dialog(&mut app);
        app.handle_event(AppEvent::NamespacesLoaded {
            ticket,
            result: Ok(vec![Namespace::named("default")]),
        });
        app.apply_action(Action::NextField);

        app.apply_action(Action::Backspace);

        assert_eq!(app.dialog().unwrap().controller().namespace(), None);
    }

    #[test]
    fn quit_stops_the_app() {
        let mut app = app();
        app.apply_action(Action::Quit);
        assert!(!app.running());
    }
}
