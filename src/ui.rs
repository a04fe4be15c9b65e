use std::collections::BTreeMap;
use std::fmt::Display;
use std::mem;
use std::panic::{self, AssertUnwindSafe, Location};
use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::*;

type FrameCallback = Box<dyn FnMut(&mut Ui) -> anyhow::Result<()>>;

/// Engine settings for a [`Ui`]. Style settings live in the [`Config`] cascade instead.
#[derive(Clone, Debug)]
pub struct UiOptions {
    /// ID of the root widget.
    pub root_id: String,
    /// Class of the root widget. Has to accept children.
    pub root_class: &'static str,
    /// Frame callbacks that take longer than this get a warning in the log.
    pub callback_budget: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        return UiOptions {
            root_id: "R".to_string(),
            root_class: ROOT.name,
            callback_budget: Duration::from_millis(100),
        };
    }
}

/// Returned by [`Ui::connect`], to [`Ui::disconnect`] the callback later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

/// The central struct of the library, holding the frame trees, the state cells, the config cascade and the connected frame callbacks.
///
/// To create a new [`Ui`], use [`Ui::new`] with the host object the visuals should live under, then call [`Ui::init`].
///
/// To declare the GUI, [`Ui::connect`] a callback that inserts widgets, and call [`Ui::run_cycle`] once per frame.
///
/// To react to clicks and other events, query the [`WidgetRef`]s returned by the widget constructors.
pub struct Ui {
    pub(crate) registry: Registry,
    pub(crate) vdom: AHashMap<WidgetId, WidgetRef>,
    pub(crate) last_vdom: AHashMap<WidgetId, WidgetRef>,
    pub(crate) root: Option<WidgetRef>,
    pub(crate) stacks: Stacks,
    pub(crate) ids: IdResolver,
    pub(crate) states: StateTable,
    pub(crate) config: Config,
    pub(crate) clock: Clock,
    pub(crate) host_parent: Instance,
    pub(crate) sys: System,
}

pub(crate) struct System {
    pub options: UiOptions,

    pub started: bool,
    pub shutdown: bool,
    pub disabled: bool,
    pub global_refresh_requested: bool,
    pub in_cycle: bool,

    pub callbacks: BTreeMap<u64, FrameCallback>,
    pub next_connection: u64,
    // disconnect() calls made while the callbacks were taken out to run
    pub pending_disconnects: Vec<u64>,
    pub before_frame: Vec<Box<dyn FnMut()>>,

    pub last_widget: Option<WidgetRef>,
    // inserts in the current cycle, continues included. Only for debug messages.
    pub insert_count: usize,
}

impl Ui {
    /// Create a [`Ui`] whose visuals will be parented under `host_parent`, with the built-in widget classes registered.
    pub fn new(host_parent: Instance) -> Ui {
        return Ui::with_options(host_parent, UiOptions::default());
    }

    pub fn with_options(host_parent: Instance, options: UiOptions) -> Ui {
        let mut registry = Registry::new();
        register_builtin_widgets(&mut registry);

        let root_id = WidgetId::new(options.root_id.clone());
        return Ui {
            registry,
            vdom: AHashMap::with_capacity(100),
            last_vdom: AHashMap::with_capacity(100),
            root: None,
            stacks: Stacks::initialize(root_id),
            ids: IdResolver::new(),
            states: StateTable::new(),
            config: Config::defaults(),
            clock: Clock::new(),
            host_parent,
            sys: System {
                options,
                started: false,
                shutdown: false,
                disabled: false,
                global_refresh_requested: false,
                in_cycle: false,
                callbacks: BTreeMap::new(),
                next_connection: 0,
                pending_disconnects: Vec::new(),
                before_frame: Vec::new(),
                last_widget: None,
                insert_count: 0,
            },
        };
    }

    /// Add a widget class. Only possible before [`Ui::init`].
    pub fn register(&mut self, class: WidgetClass) -> Result<(), UiError> {
        return self.registry.register(class);
    }

    pub fn registry(&self) -> &Registry {
        return &self.registry;
    }

    /// Start the [`Ui`]: fixes the set of widget classes and generates the root widget.
    pub fn init(&mut self) -> Result<(), UiError> {
        if self.sys.in_cycle {
            return Err(UiError::CycleInProgress);
        }
        if self.sys.shutdown {
            return Err(UiError::ShutDown);
        }
        if self.sys.started {
            return Err(UiError::AlreadyStarted);
        }
        if self.host_parent.is_destroyed() {
            return Err(UiError::HostUnavailable);
        }

        self.registry.close();
        self.generate_root()?;
        self.vdom = self.fresh_vdom();
        self.sys.started = true;
        log::debug!("Ui started with {} widget classes", self.registry.len());
        return Ok(());
    }

    /// Discard every widget and stop. A [`Ui`] can't be restarted after this.
    ///
    /// Can't be called from a frame callback.
    pub fn shutdown(&mut self) -> Result<(), UiError> {
        if self.sys.in_cycle {
            return Err(UiError::CycleInProgress);
        }
        if self.sys.shutdown {
            return Err(UiError::ShutDown);
        }

        let mut widgets: Vec<WidgetRef> = self.last_vdom.drain().map(|(_, w)| w).collect();
        widgets.extend(self.vdom.drain().map(|(_, w)| w));
        for widget in &widgets {
            if self.is_root(widget) || widget.borrow().is_discarded() {
                continue;
            }
            self.discard_widget(widget);
        }
        if let Some(root) = self.root.take() {
            self.discard_widget(&root);
        }

        self.sys.callbacks.clear();
        self.sys.before_frame.clear();
        self.sys.last_widget = None;
        self.sys.started = false;
        self.sys.shutdown = true;
        log::debug!("Ui shut down");
        return Ok(());
    }

    pub fn started(&self) -> bool {
        return self.sys.started;
    }

    pub fn is_shutdown(&self) -> bool {
        return self.sys.shutdown;
    }

    /// While disabled, [`Ui::run_cycle`] does nothing and the visuals stay as they are.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.sys.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        return self.sys.disabled;
    }

    /// Add a frame callback. Callbacks run in the order they were connected, once per [`Ui::run_cycle`].
    pub fn connect(&mut self, callback: impl FnMut(&mut Ui) -> anyhow::Result<()> + 'static) -> ConnectionId {
        let id = self.sys.next_connection;
        self.sys.next_connection += 1;
        self.sys.callbacks.insert(id, Box::new(callback));
        return ConnectionId(id);
    }

    pub fn disconnect(&mut self, connection: ConnectionId) {
        if self.sys.callbacks.remove(&connection.0).is_none() && self.sys.in_cycle {
            self.sys.pending_disconnects.push(connection.0);
        }
    }

    /// Add a callback that runs at the start of every cycle, before any widget is declared.
    pub fn on_before_frame(&mut self, callback: impl FnMut() + 'static) {
        self.sys.before_frame.push(Box::new(callback));
    }

    /// Run one cycle: run every connected frame callback, then discard the widgets that weren't declared.
    ///
    /// Calling it from inside a frame callback returns [`UiError::CycleInProgress`].
    ///
    /// A failing callback (an `Err` or a panic) doesn't stop the others. Its failure is returned after the cycle completes, and the widgets it didn't get to declare are kept as they were instead of being discarded.
    pub fn run_cycle(&mut self) -> Result<(), UiError> {
        return self.run_cycle_inner(None);
    }

    /// Like [`Ui::run_cycle`], with `declare` running as one more frame callback after the connected ones.
    ///
    /// ```rust
    /// # use kasane::*;
    /// let mut ui = Ui::new(Instance::new("Folder"));
    /// ui.init()?;
    /// ui.run_cycle_with(|ui| {
    ///     ui.window("Hello")?;
    ///     ui.text("World")?;
    ///     ui.end()?;
    ///     Ok(())
    /// })?;
    /// # Ok::<(), UiError>(())
    /// ```
    pub fn run_cycle_with(&mut self, mut declare: impl FnMut(&mut Ui) -> anyhow::Result<()>) -> Result<(), UiError> {
        let declare: &mut dyn FnMut(&mut Ui) -> anyhow::Result<()> = &mut declare;
        return self.run_cycle_inner(Some(declare));
    }

    fn run_cycle_inner(&mut self, extra: Option<&mut dyn FnMut(&mut Ui) -> anyhow::Result<()>>) -> Result<(), UiError> {
        if self.sys.shutdown {
            return Err(UiError::ShutDown);
        }
        if !self.sys.started {
            return Err(UiError::NotStarted);
        }
        // the trees belong to the running cycle until it's done
        if self.sys.in_cycle {
            return Err(UiError::CycleInProgress);
        }
        if self.sys.disabled {
            return Ok(());
        }
        if self.host_parent.is_destroyed() {
            return Err(UiError::HostUnavailable);
        }

        self.begin_cycle()?;

        self.sys.in_cycle = true;
        let mut failures = self.run_frame_callbacks();
        if let Some(extra) = extra {
            if let Some(failure) = self.run_isolated(|ui| extra(ui)) {
                failures.push(failure);
            }
        }
        self.sys.in_cycle = false;

        if failures.is_empty() {
            self.sweep();
        } else {
            self.keep_stale_widgets();
        }

        log::trace!(
            "Cycle {} done: {} inserts, {} widgets alive",
            self.clock.get(),
            self.sys.insert_count,
            self.vdom.len()
        );

        if failures.is_empty() {
            return Ok(());
        }
        return Err(UiError::Callbacks(failures));
    }

    fn begin_cycle(&mut self) -> Result<(), UiError> {
        // something outside of the Ui destroyed the root visuals
        let root_lost = match &self.root {
            Some(root) => root.instance().is_none_or(|i| i.is_destroyed()),
            None => true,
        };
        if root_lost {
            log::debug!("Root instance lost, refreshing everything");
            self.sys.global_refresh_requested = true;
        }

        self.last_vdom = mem::replace(&mut self.vdom, AHashMap::new());

        let mut before_frame = mem::take(&mut self.sys.before_frame);
        for callback in before_frame.iter_mut() {
            callback();
        }
        before_frame.append(&mut self.sys.before_frame);
        self.sys.before_frame = before_frame;

        if self.sys.global_refresh_requested {
            self.global_refresh()?;
        }

        self.vdom = self.fresh_vdom();

        let generation = self.clock.advance();
        self.ids.clear_usage();
        self.sys.insert_count = 0;
        self.sys.last_widget = None;
        if let Some(root) = &self.root {
            let mut root = root.borrow_mut();
            root.last_cycle = generation;
            root.z_offset = 0;
            root.z_update = false;
        }
        return Ok(());
    }

    fn run_frame_callbacks(&mut self) -> Vec<CallbackFailure> {
        let mut failures = Vec::new();

        let mut callbacks = mem::take(&mut self.sys.callbacks);
        for (id, callback) in callbacks.iter_mut() {
            if self.sys.pending_disconnects.contains(id) {
                continue;
            }
            if let Some(failure) = self.run_isolated(|ui| callback(ui)) {
                failures.push(failure);
            }
        }

        // callbacks connected while the others were running
        callbacks.append(&mut self.sys.callbacks);
        for id in self.sys.pending_disconnects.drain(..) {
            callbacks.remove(&id);
        }
        self.sys.callbacks = callbacks;

        return failures;
    }

    /// Runs one frame callback, catching errors and panics. The scopes it left open are closed either way.
    fn run_isolated(&mut self, callback: impl FnOnce(&mut Ui) -> anyhow::Result<()>) -> Option<CallbackFailure> {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| callback(self)));

        let elapsed = start.elapsed();
        if elapsed > self.sys.options.callback_budget {
            log::warn!(
                "Frame callback took {:?}, more than the budget of {:?}",
                elapsed,
                self.sys.options.callback_budget
            );
        }

        let failure = match result {
            Ok(Ok(())) => self.check_balanced().err().map(CallbackFailure::Structure),
            Ok(Err(error)) => Some(CallbackFailure::Error(error)),
            Err(payload) => Some(CallbackFailure::Panic(panic_message(payload))),
        };

        if let Some(failure) = &failure {
            log::error!("{failure}");
            self.stacks.reset_to_root();
            self.ids.reset_scopes();
            self.config.reset_layers();
        }
        return failure;
    }

    fn check_balanced(&self) -> Result<(), UiError> {
        let open = self.stacks.open_scopes();
        if open > 0 {
            return Err(UiError::TooFewEnds { open });
        }
        let open = self.config.depth();
        if open > 0 {
            return Err(UiError::UnbalancedConfig { open });
        }
        return Ok(());
    }

    /// Discard the previous tree and regenerate the root.
    fn global_refresh(&mut self) -> Result<(), UiError> {
        log::debug!("Global refresh");
        self.sys.global_refresh_requested = false;

        let previous: Vec<WidgetRef> = self.last_vdom.drain().map(|(_, w)| w).collect();
        for widget in &previous {
            if self.is_root(widget) || widget.borrow().is_discarded() {
                continue;
            }
            self.discard_widget(widget);
        }

        if let Some(root) = self.root.take() {
            root.borrow_mut().destroy_instance();
        }
        return self.generate_root();
    }

    fn generate_root(&mut self) -> Result<(), UiError> {
        let class = self.registry.get(self.sys.options.root_class)?;
        if !class.has_children() {
            return Err(UiError::MissingClassField {
                class: class.name,
                field: "child_added",
            });
        }

        let id = WidgetId::new(self.sys.options.root_id.clone());
        let root = new_widget_ref(id, class.clone(), None, 0, self.clock.clone());
        {
            let mut widget = root.borrow_mut();
            let instance = (class.generate)(&mut widget, &self.config);
            instance.set_parent(Some(&self.host_parent));
            widget.instance = Some(instance);
            widget.last_cycle = self.clock.get();
        }
        self.root = Some(root);
        return Ok(());
    }

    fn fresh_vdom(&self) -> AHashMap<WidgetId, WidgetRef> {
        let mut vdom = AHashMap::with_capacity(self.last_vdom.len().max(16));
        if let Some(root) = &self.root {
            vdom.insert(root.id(), root.clone());
        }
        return vdom;
    }

    pub(crate) fn is_root(&self, widget: &WidgetRef) -> bool {
        return self.root.as_ref().is_some_and(|r| r.ptr_eq(widget));
    }

    /// Schedule a global refresh: at the start of the next cycle, every widget is discarded and generated again.
    pub fn force_refresh(&mut self) {
        self.sys.global_refresh_requested = true;
    }

    /// Merge `values` into the root of the config cascade. Since every widget might depend on it, this forces a global refresh.
    pub fn update_global_config(&mut self, values: impl Into<Value>) {
        self.config.update_root(table_from_value(values.into()));
        self.force_refresh();
    }

    /// Push a config layer. Widgets inserted until the matching [`Ui::pop_config`] see its values.
    ///
    /// If this call site pushed different values in the last cycle, the widgets under it are rebuilt instead of updated.
    #[track_caller]
    pub fn push_config(&mut self, values: impl Into<Value>) {
        let site = self.ids.derive(Location::caller());
        let refresh = self.config.push(site.clone(), table_from_value(values.into()));
        if refresh {
            log::debug!("Config pushed at {site} changed, rebuilding the widgets under it");
        }
    }

    pub fn pop_config(&mut self) -> Result<(), UiError> {
        return self.config.pop();
    }

    pub fn config(&self) -> &Config {
        return &self.config;
    }

    /// Close the scope of the last inserted widget that accepts children.
    pub fn end(&mut self) -> Result<(), UiError> {
        let closed = self.stacks.pop_parent()?;
        log::trace!("Closed scope {closed}");
        return Ok(());
    }

    /// The widget that new widgets are currently inserted under.
    pub fn current_parent(&self) -> Option<WidgetRef> {
        return self.vdom.get(self.stacks.current_parent()).cloned();
    }

    /// Use `id` instead of the insertion count to tell apart widgets declared from the same place, until the matching [`Ui::pop_id`].
    ///
    /// Useful for lists whose items can be reordered or removed.
    pub fn push_id(&mut self, id: impl Display) {
        self.ids.push_id(id.to_string());
    }

    pub fn pop_id(&mut self) {
        self.ids.pop_id();
    }

    /// Use `id` as the identity of the next inserted widget or state cell.
    pub fn set_next_widget_id(&mut self, id: impl Into<WidgetId>) {
        self.ids.set_next(id.into());
    }

    /// A state cell owned by the [`Ui`], created with `initial` the first time this call site runs.
    #[track_caller]
    pub fn state(&mut self, initial: impl Into<Value>) -> State {
        let id = self.ids.resolve(Location::caller());
        return self.states.standalone(id, initial.into());
    }

    /// Like [`Ui::state`], but the cell starts over from `initial` whenever no widget is bound to it anymore.
    #[track_caller]
    pub fn weak_state(&mut self, initial: impl Into<Value>) -> State {
        let id = self.ids.resolve(Location::caller());
        return self.states.weak(id, initial.into());
    }

    /// A state cell that holds `compute` applied to `source`, and follows its changes.
    #[track_caller]
    pub fn computed_state(&mut self, source: &State, compute: impl Fn(&Value) -> Value + 'static) -> State {
        let id = self.ids.resolve(Location::caller());
        return self.states.computed(id, source, compute);
    }

    pub fn states(&self) -> &StateTable {
        return &self.states;
    }

    /// The current generation. It increases by one at the start of every cycle.
    pub fn generation(&self) -> u64 {
        return self.clock.get();
    }

    pub fn root(&self) -> Option<WidgetRef> {
        return self.root.clone();
    }

    pub fn host_parent(&self) -> &Instance {
        return &self.host_parent;
    }

    /// The widget inserted last in the current cycle.
    pub fn last_widget(&self) -> Option<WidgetRef> {
        return self.sys.last_widget.clone();
    }

    /// Look up a widget in the current tree.
    pub fn get_widget(&self, id: &WidgetId) -> Option<WidgetRef> {
        return self.vdom.get(id).cloned();
    }

    pub fn is_in_tree(&self, id: &WidgetId) -> bool {
        return self.vdom.contains_key(id);
    }

    /// Number of widgets in the current tree, root included.
    pub fn widget_count(&self) -> usize {
        return self.vdom.len();
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    return "non-string panic payload".to_string();
}
