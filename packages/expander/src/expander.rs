use crate::error::{CompileError, ExpandResult, LineIndex, SourceLocation};
use crate::eval::{evaluate, Binding, Evaluated, Scope};
use crate::identity::{child_path, IdAllocator, SiblingCounter};
use crate::properties::{self, is_event_property, IDENTITY_PROPERTIES};
use crate::value::Value;
use kir_model::{
    BindingKind, Component, ComponentBinding, ComponentId, ComponentType, EventHandler, EventType,
    HandlerRegistry, LimitKind, Limits, ReactiveConditional, ReactiveForLoop, ReactiveManifest,
    ResourceLimitExceeded, ValidationWarning, VariableId,
};
use kir_parser::ast::*;
use kir_parser::{ParseError, Parser};
use serde_json::{Map, Value as Json};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::{panic, thread};
use tracing::{debug, error, info, instrument, warn};

/// Element name that may stand for the application root without being defined
pub const APP_ROOT: &str = "App";

#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// Used in source locations
    pub file_name: String,
    pub limits: Limits,
    /// Externally supplied constants. They shadow `const` declarations of the same name.
    pub constants: BTreeMap<String, Value>,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            file_name: "<input>".to_string(),
            limits: Limits::default(),
            constants: BTreeMap::new(),
        }
    }
}

/// Output of one expansion
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub tree: Component,
    pub manifest: ReactiveManifest,
    pub warnings: Vec<ValidationWarning>,
}

/// A component definition with its inheritance chain flattened
#[derive(Debug)]
struct ResolvedDef {
    name: String,
    params: Vec<Param>,
    states: Vec<StateDecl>,
    /// Root element with inherited and overriding properties merged in
    root: Element,
    /// Content contributed by extending components to the base's default slot
    fills: Vec<Item>,
    named_slots: BTreeSet<String>,
    has_default_slot: bool,
}

/// Content passed into a slot, together with the context it was written in
#[derive(Debug, Clone)]
struct SlotFill {
    items: Vec<Item>,
    scope: Scope,
    slots: Rc<SlotContext>,
    component_stack: Vec<String>,
    qualifier: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SlotContext {
    default: Vec<SlotFill>,
    named: BTreeMap<String, Vec<SlotFill>>,
}

/// A property evaluated at an instance site and applied to the instance root
#[derive(Debug, Clone)]
struct PendingProp {
    name: String,
    expr: Expression,
    value: Evaluated,
    location: SourceLocation,
}

/// Where an element lands in the tree
#[derive(Debug, Default)]
struct Site {
    /// Identity path decided by the instantiating component
    path: Option<String>,
    overrides: Vec<PendingProp>,
    is_root: bool,
}

struct NodeBuilder {
    component: Component,
    custom: Map<String, Json>,
    path: String,
    siblings: SiblingCounter,
}

impl NodeBuilder {
    fn new(component: Component, path: String) -> Self {
        Self {
            component,
            custom: Map::new(),
            path,
            siblings: SiblingCounter::new(),
        }
    }

    fn id(&self) -> ComponentId {
        self.component.id
    }

    fn finish(mut self) -> Component {
        if !self.custom.is_empty() {
            self.component.custom_data = Some(Json::Object(self.custom).to_string());
        }
        self.component
    }
}

/// Expands a parsed document into a component tree and its reactive manifest.
pub struct Expander<'a> {
    doc: &'a Document,
    lines: LineIndex,
    options: ExpandOptions,
    registry: Option<&'a HandlerRegistry>,

    ids: IdAllocator,
    manifest: ReactiveManifest,
    warnings: Vec<ValidationWarning>,

    globals: Scope,
    scope: Scope,
    resolved: BTreeMap<String, Rc<ResolvedDef>>,
    /// Component call stack for cycle detection
    component_stack: Vec<String>,
    /// Name prefix for `state` declared inside a component instance
    qualifier: Option<String>,
    instance_counts: BTreeMap<String, usize>,
    loop_keys: Vec<String>,
    depth: usize,
    node_count: usize,
}

impl<'a> Expander<'a> {
    pub fn new(doc: &'a Document, source: &str) -> Self {
        let options = ExpandOptions::default();
        Self {
            doc,
            lines: LineIndex::new(options.file_name.clone(), source),
            options,
            registry: None,
            ids: IdAllocator::new(),
            manifest: ReactiveManifest::new(),
            warnings: Vec::new(),
            globals: Scope::new(),
            scope: Scope::new(),
            resolved: BTreeMap::new(),
            component_stack: Vec::new(),
            qualifier: None,
            instance_counts: BTreeMap::new(),
            loop_keys: Vec::new(),
            depth: 0,
            node_count: 0,
        }
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.lines = self.lines.renamed(options.file_name.clone());
        self.options = options;
        self
    }

    /// Resolve extension element names through `registry`
    pub fn with_registry(mut self, registry: &'a HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[instrument(skip_all, fields(file = %self.options.file_name))]
    pub fn expand(mut self) -> ExpandResult<Expansion> {
        info!(
            components = self.doc.components.len(),
            roots = self.doc.roots.len(),
            "Expanding document"
        );

        self.bind_constants()?;
        if self.doc.roots.is_empty() {
            return Err(CompileError::MissingRoot);
        }

        let doc = self.doc;
        let mut holder = NodeBuilder::new(
            Component::new(ComponentId::INVALID, ComponentType::Container),
            String::new(),
        );
        let top = Rc::new(SlotContext::default());
        for root in &doc.roots {
            self.scope = self.globals.clone();
            self.expand_element(
                root,
                &mut holder,
                &top,
                Site {
                    is_root: true,
                    ..Site::default()
                },
            )?;
        }

        let mut roots = holder.component.into_children();
        let tree = if roots.len() == 1 {
            roots.remove(0)
        } else {
            debug!(count = roots.len(), "Wrapping multiple roots in a container");
            let mut wrapper = self.new_node("root", ComponentType::Container)?;
            for root in roots {
                wrapper.push_child(root);
            }
            wrapper
        };

        if let Some(registry) = self.registry {
            self.warnings.extend(registry.unhandled_extensions(&tree));
        }

        info!(
            nodes = self.node_count,
            variables = self.manifest.variables.len(),
            bindings = self.manifest.bindings.len(),
            "Expansion complete"
        );

        Ok(Expansion {
            tree,
            manifest: self.manifest,
            warnings: self.warnings,
        })
    }

    fn bind_constants(&mut self) -> ExpandResult<()> {
        for (name, value) in &self.options.constants {
            self.globals.define(name.clone(), Binding::Const(value.clone()));
        }
        for decl in &self.doc.consts {
            if self.options.constants.contains_key(&decl.name) {
                debug!(name = %decl.name, "Constant overridden externally");
                continue;
            }
            let evaluated = evaluate(&decl.value, &self.globals, &self.lines)?;
            self.globals.define(decl.name.clone(), Binding::Const(evaluated.value));
        }
        Ok(())
    }

    fn locate(&self, span: Span) -> SourceLocation {
        self.lines.locate(span.start)
    }

    fn eval(&self, expr: &Expression) -> ExpandResult<Evaluated> {
        evaluate(expr, &self.scope, &self.lines)
    }

    fn new_node(&mut self, path: &str, kind: ComponentType) -> ExpandResult<Component> {
        self.node_count += 1;
        self.options.limits.check_components(self.node_count)?;
        self.options.limits.check_depth(self.depth + 1)?;
        let id = self.ids.allocate(path);
        Ok(Component::new(id, kind))
    }

    fn segment_name(&self, name: &str) -> String {
        if self.loop_keys.is_empty() {
            name.to_string()
        } else {
            format!("{}@{}", name, self.loop_keys.join("@"))
        }
    }

    fn variable_name(&self, id: VariableId) -> String {
        self.manifest
            .variable(id)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    // ----- elements -----

    fn expand_element(
        &mut self,
        el: &Element,
        parent: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
        site: Site,
    ) -> ExpandResult<()> {
        let doc = self.doc;
        if doc.component(&el.name).is_some() {
            return self.expand_instance(el, parent, slots, site);
        }

        let kind = match ComponentType::from_name(&el.name)
            .or_else(|| self.registry.and_then(|r| r.lookup_name(&el.name)))
        {
            Some(kind) => kind,
            None if site.is_root && el.name == APP_ROOT => ComponentType::Container,
            None => {
                return Err(CompileError::UnresolvedReference {
                    name: el.name.clone(),
                    location: self.locate(el.span),
                    hint: Some("not a built-in, extension or defined component".to_string()),
                })
            }
        };

        self.scope.push();
        let path = match site.path {
            Some(path) => path,
            None => self.site_path(el, parent, &el.name)?,
        };
        let component = self.new_node(&path, kind)?;
        let mut node = NodeBuilder::new(component, path);
        debug!(element = %el.name, id = %node.id(), path = %node.path, "Expanding element");

        self.depth += 1;
        for arg in &el.args {
            self.apply_source_property(&mut node, arg)?;
        }
        self.expand_items(&el.body.items, &mut node, slots)?;
        for pending in site.overrides {
            self.apply_property(
                &mut node,
                &pending.name,
                &pending.expr,
                pending.value,
                &pending.location,
            )?;
        }
        self.depth -= 1;
        self.scope.pop();

        parent.component.push_child(node.finish());
        Ok(())
    }

    /// Identity path of an element about to be placed under `parent`
    fn site_path(
        &mut self,
        el: &Element,
        parent: &mut NodeBuilder,
        name: &str,
    ) -> ExpandResult<String> {
        let identity = el
            .args
            .iter()
            .chain(el.body.properties())
            .filter(|p| IDENTITY_PROPERTIES.contains(&p.name.as_str()));

        let mut explicit_id = None;
        let mut key = None;
        for prop in identity {
            let evaluated = self.eval(&prop.value)?;
            if !evaluated.is_static() {
                return Err(CompileError::invalid_property(
                    prop.name.as_str(),
                    "must be a constant",
                    self.locate(prop.span),
                ));
            }
            let text = evaluated.value.display_string();
            if prop.name == "id" {
                explicit_id = Some(text);
            } else {
                key = Some(text);
            }
        }

        if let Some(id) = explicit_id {
            return Ok(format!("#{}", id));
        }
        let segment = match key {
            Some(key) => parent.siblings.segment(&format!("{}@{}", name, key)),
            None => parent.siblings.segment(&self.segment_name(name)),
        };
        Ok(child_path(&parent.path, &segment))
    }

    // ----- component instances -----

    fn expand_instance(
        &mut self,
        el: &Element,
        parent: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
        site: Site,
    ) -> ExpandResult<()> {
        let def = self.resolve_definition(&el.name, el.span)?;
        let location = self.locate(el.span);

        if self.component_stack.iter().any(|name| *name == def.name) {
            let mut call_stack = self.component_stack.clone();
            call_stack.push(def.name.clone());
            error!(component = %def.name, stack = ?call_stack, "Recursive component detected");
            return Err(CompileError::RecursiveComponent {
                component: def.name.clone(),
                call_stack,
                location,
            });
        }

        debug!(
            component = %def.name,
            stack = ?self.component_stack,
            "Instantiating component"
        );

        // Arguments are evaluated in the caller's scope
        let mut bound = BTreeMap::new();
        let mut overrides = Vec::new();
        for arg in &el.args {
            if IDENTITY_PROPERTIES.contains(&arg.name.as_str()) {
                continue;
            }
            let value = self.eval(&arg.value)?;
            if def.params.iter().any(|p| p.name == arg.name) {
                if let Some(name) = value.lost_reference() {
                    return Err(CompileError::UnresolvedReference {
                        name: name.to_string(),
                        location: self.locate(arg.value.span()),
                        hint: None,
                    });
                }
                bound.insert(arg.name.clone(), value.into_binding());
            } else {
                overrides.push(self.pending(arg, value));
            }
        }

        // Instance body: properties override the root, inserts fill named slots,
        // everything else fills the default slot
        let mut provided = SlotContext::default();
        let mut default_items = Vec::new();
        for item in &el.body.items {
            match item {
                Item::Property(prop) if IDENTITY_PROPERTIES.contains(&prop.name.as_str()) => {}
                Item::Property(prop) => {
                    let value = self.eval(&prop.value)?;
                    overrides.push(self.pending(prop, value));
                }
                Item::Insert(insert) => {
                    if !def.named_slots.contains(&insert.slot) {
                        return Err(CompileError::UnknownSlot {
                            component: def.name.clone(),
                            slot: insert.slot.clone(),
                            location: self.locate(insert.span),
                        });
                    }
                    let fill = self.capture_fill(insert.body.items.clone(), slots);
                    provided.named.entry(insert.slot.clone()).or_default().push(fill);
                }
                other => default_items.push(other.clone()),
            }
        }
        if !default_items.is_empty() && !def.has_default_slot {
            return Err(CompileError::UnknownSlot {
                component: def.name.clone(),
                slot: "default".to_string(),
                location,
            });
        }
        let caller_fill =
            (!default_items.is_empty()).then(|| self.capture_fill(default_items, slots));

        let path = match site.path {
            Some(path) => path,
            None => self.site_path(el, parent, &def.name)?,
        };
        overrides.extend(site.overrides);

        // Enter the definition's own scope
        let saved_scope = std::mem::replace(&mut self.scope, self.globals.clone());
        let saved_qualifier = self.qualifier.take();
        self.component_stack.push(def.name.clone());
        self.scope.push();

        let ordinal = {
            let count = self.instance_counts.entry(def.name.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.qualifier = Some(if ordinal == 1 {
            def.name.clone()
        } else {
            format!("{}#{}", def.name, ordinal)
        });

        for param in &def.params {
            let binding = match bound.remove(&param.name) {
                Some(binding) => binding,
                None => match &param.default {
                    Some(default) => self.eval(default)?.into_binding(),
                    None => Binding::Const(Value::Null),
                },
            };
            self.scope.define(param.name.clone(), binding);
        }
        for state in &def.states {
            self.declare_state(state)?;
        }

        let mut instance_slots = provided;
        if !def.fills.is_empty() {
            let own = Rc::new(SlotContext::default());
            let fill = self.capture_fill(def.fills.clone(), &own);
            instance_slots.default.push(fill);
        }
        instance_slots.default.extend(caller_fill);
        let instance_slots = Rc::new(instance_slots);

        let result = self.expand_element(
            &def.root,
            parent,
            &instance_slots,
            Site {
                path: Some(path),
                overrides,
                is_root: false,
            },
        );

        self.scope = saved_scope;
        self.qualifier = saved_qualifier;
        self.component_stack.pop();
        result
    }

    fn pending(&self, prop: &Property, value: Evaluated) -> PendingProp {
        PendingProp {
            name: prop.name.clone(),
            expr: prop.value.clone(),
            value,
            location: self.locate(prop.span),
        }
    }

    fn capture_fill(&self, items: Vec<Item>, slots: &Rc<SlotContext>) -> SlotFill {
        SlotFill {
            items,
            scope: self.scope.clone(),
            slots: Rc::clone(slots),
            component_stack: self.component_stack.clone(),
            qualifier: self.qualifier.clone(),
        }
    }

    // ----- definitions -----

    fn resolve_definition(&mut self, name: &str, span: Span) -> ExpandResult<Rc<ResolvedDef>> {
        if let Some(def) = self.resolved.get(name) {
            return Ok(Rc::clone(def));
        }
        let mut chain = Vec::new();
        self.resolve_chain(name, span, &mut chain)
    }

    fn resolve_chain(
        &mut self,
        name: &str,
        span: Span,
        chain: &mut Vec<String>,
    ) -> ExpandResult<Rc<ResolvedDef>> {
        if chain.iter().any(|n| n == name) {
            chain.push(name.to_string());
            error!(chain = ?chain, "Circular inheritance detected");
            return Err(CompileError::CircularInheritance {
                chain: chain.clone(),
                location: self.locate(span),
            });
        }
        if let Some(def) = self.resolved.get(name) {
            return Ok(Rc::clone(def));
        }

        let doc = self.doc;
        let Some(def) = doc.component(name) else {
            return Err(CompileError::UnresolvedReference {
                name: name.to_string(),
                location: self.locate(span),
                hint: Some("no component with this name".to_string()),
            });
        };
        chain.push(name.to_string());

        let location = self.locate(def.span);
        let mut overrides = Vec::new();
        let mut states = Vec::new();
        let mut content = Vec::new();
        for item in &def.body.items {
            match item {
                Item::Property(_) | Item::Pseudo(_) | Item::Breakpoint(_) => {
                    overrides.push(item.clone())
                }
                Item::State(state) => states.push(state.clone()),
                Item::Element(_) | Item::If(_) | Item::For(_) => content.push(item.clone()),
                Item::Slot(_) | Item::Insert(_) => {
                    return Err(CompileError::InvalidComponent {
                        name: name.to_string(),
                        message: "slots belong inside the root element".to_string(),
                        location,
                    })
                }
            }
        }

        let resolved = match &def.extends {
            None => {
                let mut root = match content.as_slice() {
                    [Item::Element(root)] => root.clone(),
                    _ => {
                        return Err(CompileError::InvalidComponent {
                            name: name.to_string(),
                            message: "body must contain exactly one root element".to_string(),
                            location,
                        })
                    }
                };
                root.body.items.extend(overrides);
                let mut named_slots = BTreeSet::new();
                let mut has_default_slot = false;
                collect_slots(&root.body.items, &mut named_slots, &mut has_default_slot);
                ResolvedDef {
                    name: name.to_string(),
                    params: def.params.clone(),
                    states,
                    root,
                    fills: Vec::new(),
                    named_slots,
                    has_default_slot,
                }
            }
            Some(base_name) => {
                let base = self.resolve_chain(base_name, def.span, chain)?;
                debug!(component = name, base = %base_name, "Resolved inheritance");
                if !content.is_empty() && !base.has_default_slot {
                    return Err(CompileError::UnknownSlot {
                        component: base.name.clone(),
                        slot: "default".to_string(),
                        location,
                    });
                }

                let mut params = base.params.clone();
                for param in &def.params {
                    match params.iter_mut().find(|p| p.name == param.name) {
                        Some(existing) => *existing = param.clone(),
                        None => params.push(param.clone()),
                    }
                }
                let mut root = base.root.clone();
                root.body.items.extend(overrides);
                let mut all_states = base.states.clone();
                all_states.extend(states);
                let mut fills = base.fills.clone();
                fills.extend(content);

                ResolvedDef {
                    name: name.to_string(),
                    params,
                    states: all_states,
                    root,
                    fills,
                    named_slots: base.named_slots.clone(),
                    has_default_slot: base.has_default_slot,
                }
            }
        };

        chain.pop();
        let resolved = Rc::new(resolved);
        self.resolved.insert(name.to_string(), Rc::clone(&resolved));
        Ok(resolved)
    }

    // ----- block items -----

    fn expand_items(
        &mut self,
        items: &[Item],
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        self.options.limits.check_depth(self.depth)?;
        for item in items {
            if let Item::State(state) = item {
                self.declare_state(state)?;
            }
        }

        for item in items {
            match item {
                Item::State(_) => {}
                Item::Property(prop) => self.apply_source_property(node, prop)?,
                Item::Element(el) => self.expand_element(el, node, slots, Site::default())?,
                Item::If(block) if block.is_static => self.expand_static_if(block, node, slots)?,
                Item::If(block) => self.expand_runtime_if(block, node, slots)?,
                Item::For(block) if block.is_static => self.expand_static_for(block, node, slots)?,
                Item::For(block) => self.expand_runtime_for(block, node, slots)?,
                Item::Slot(decl) => self.expand_slot(decl, node, slots)?,
                Item::Insert(insert) => {
                    return Err(CompileError::InvalidComponent {
                        name: insert.slot.clone(),
                        message: "insert is only valid inside a component instance".to_string(),
                        location: self.locate(insert.span),
                    })
                }
                Item::Pseudo(block) => {
                    let location = self.locate(block.span);
                    let props = self.evaluate_static_props(&block.properties)?;
                    let pseudo = properties::pseudo_style(&block.state, &props, &location)?;
                    properties::push_pseudo(node.component.style_mut(), pseudo, &location)?;
                }
                Item::Breakpoint(block) => {
                    let location = self.locate(block.span);
                    let min = self.eval(&block.min)?.value;
                    let max = self.eval(&block.max)?.value;
                    let props = self.evaluate_static_props(&block.properties)?;
                    let breakpoint = properties::breakpoint(&min, &max, &props, &location)?;
                    properties::push_breakpoint(node.component.style_mut(), breakpoint, &location)?;
                }
            }
        }
        Ok(())
    }

    fn declare_state(&mut self, state: &StateDecl) -> ExpandResult<()> {
        let location = self.locate(state.span);
        let evaluated = self.eval(&state.value)?;
        if let Some(dep) = evaluated.deps.first() {
            return Err(CompileError::invalid_property(
                state.name.as_str(),
                format!("initial value depends on state '{}'", self.variable_name(*dep)),
                location,
            ));
        }
        if let Some(name) = evaluated.unresolved.first() {
            return Err(CompileError::UnresolvedReference {
                name: name.clone(),
                location,
                hint: None,
            });
        }

        let initial = evaluated
            .value
            .to_var_value(state.type_name.as_deref())
            .map_err(|message| {
                CompileError::invalid_property(state.name.as_str(), message, location.clone())
            })?;
        let full_name = match &self.qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, state.name),
            None => state.name.clone(),
        };
        let id = self
            .manifest
            .add_variable(full_name, initial.clone(), Some(location.to_string()))
            .map_err(|source| CompileError::State {
                name: state.name.clone(),
                source,
                location,
            })?;

        self.scope.define(
            state.name.clone(),
            Binding::Reactive {
                value: Value::from_var_value(&initial),
                deps: vec![id],
            },
        );
        Ok(())
    }

    fn evaluate_static_props(
        &self,
        props: &[Property],
    ) -> ExpandResult<Vec<(String, Value, SourceLocation)>> {
        props
            .iter()
            .map(|prop| {
                let location = self.locate(prop.span);
                let evaluated = self.eval(&prop.value)?;
                if let Some(dep) = evaluated.deps.first() {
                    return Err(CompileError::NonStaticCondition {
                        name: self.variable_name(*dep),
                        location,
                    });
                }
                Ok((prop.name.clone(), evaluated.value, location))
            })
            .collect()
    }

    fn apply_source_property(&mut self, node: &mut NodeBuilder, prop: &Property) -> ExpandResult<()> {
        if IDENTITY_PROPERTIES.contains(&prop.name.as_str()) {
            return Ok(());
        }
        let location = self.locate(prop.span);
        if is_event_property(&prop.name) {
            return self.apply_event(node, &prop.name, &prop.value, &location);
        }
        let value = self.eval(&prop.value)?;
        self.apply_property(node, &prop.name, &prop.value, value, &location)
    }

    fn apply_property(
        &mut self,
        node: &mut NodeBuilder,
        name: &str,
        expr: &Expression,
        value: Evaluated,
        location: &SourceLocation,
    ) -> ExpandResult<()> {
        if is_event_property(name) {
            return self.apply_event(node, name, expr, location);
        }
        if let Some(unresolved) = value.lost_reference() {
            return Err(CompileError::UnresolvedReference {
                name: unresolved.to_string(),
                location: location.clone(),
                hint: None,
            });
        }

        properties::apply_property(
            &mut node.component,
            name,
            &value.value,
            location,
            &mut node.custom,
        )?;

        let kind = if name == "text" {
            BindingKind::Text
        } else {
            BindingKind::Attribute
        };
        for dep in value.deps {
            let mut binding =
                ComponentBinding::new(node.id(), dep, kind).with_expression(expr.to_string());
            if kind == BindingKind::Attribute {
                binding.update_code = Some(name.to_string());
            }
            self.add_binding(binding, location)?;
        }
        Ok(())
    }

    fn apply_event(
        &mut self,
        node: &mut NodeBuilder,
        name: &str,
        expr: &Expression,
        location: &SourceLocation,
    ) -> ExpandResult<()> {
        let kind = EventType::from_property(name).ok_or_else(|| {
            CompileError::invalid_property(name, "unknown event", location.clone())
        })?;
        let handler = match expr {
            Expression::Variable { name, .. } => EventHandler::new(kind, name.as_str()),
            Expression::Literal { value, .. } => EventHandler::new(kind, value.as_str()),
            Expression::Member { .. } => EventHandler::new(kind, expr.to_string()),
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                let handler = EventHandler::new(kind, function.as_str());
                if arguments.is_empty() {
                    handler
                } else {
                    let data: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                    handler.with_data(data.join(", "))
                }
            }
            _ => {
                return Err(CompileError::invalid_property(
                    name,
                    "expected a handler name or call",
                    location.clone(),
                ))
            }
        };
        node.component.add_event(handler);
        Ok(())
    }

    fn add_binding(&mut self, binding: ComponentBinding, location: &SourceLocation) -> ExpandResult<()> {
        let name = self.variable_name(binding.variable_id);
        self.manifest
            .add_binding(binding)
            .map_err(|source| CompileError::State {
                name,
                source,
                location: location.clone(),
            })
    }

    // ----- slots -----

    fn expand_slot(
        &mut self,
        decl: &SlotDecl,
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        let fills = match &decl.name {
            None => slots.default.as_slice(),
            Some(name) => slots.named.get(name).map(Vec::as_slice).unwrap_or_default(),
        };

        if fills.is_empty() {
            if let Some(fallback) = &decl.fallback {
                self.scope.push();
                self.expand_items(&fallback.items, node, slots)?;
                self.scope.pop();
            }
            return Ok(());
        }

        for fill in fills {
            let saved_scope = std::mem::replace(&mut self.scope, fill.scope.clone());
            let saved_stack =
                std::mem::replace(&mut self.component_stack, fill.component_stack.clone());
            let saved_qualifier = std::mem::replace(&mut self.qualifier, fill.qualifier.clone());
            self.scope.push();

            let result = self.expand_items(&fill.items, node, &fill.slots);

            self.scope = saved_scope;
            self.component_stack = saved_stack;
            self.qualifier = saved_qualifier;
            result?;
        }
        Ok(())
    }

    // ----- directives -----

    fn require_static(&self, evaluated: &Evaluated, span: Span) -> ExpandResult<()> {
        let name = match (evaluated.deps.first(), evaluated.unresolved.first()) {
            (Some(dep), _) => self.variable_name(*dep),
            (None, Some(name)) => name.clone(),
            (None, None) => return Ok(()),
        };
        Err(CompileError::NonStaticCondition {
            name,
            location: self.locate(span),
        })
    }

    fn expand_static_if(
        &mut self,
        block: &IfBlock,
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        let condition = self.eval(&block.condition)?;
        self.require_static(&condition, block.condition.span())?;

        let branch = if condition.value.is_truthy() {
            Some(&block.then_block)
        } else {
            block.else_block.as_ref()
        };
        debug!(condition = %block.condition, taken = branch.is_some(), "Static if");
        if let Some(branch) = branch {
            self.scope.push();
            self.expand_items(&branch.items, node, slots)?;
            self.scope.pop();
        }
        Ok(())
    }

    fn expand_static_for(
        &mut self,
        block: &ForBlock,
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        let collection = self.eval(&block.collection)?;
        if let Some(dep) = collection.deps.first() {
            return Err(CompileError::NonStaticCondition {
                name: self.variable_name(*dep),
                location: self.locate(block.collection.span()),
            });
        }
        if !collection.unresolved.is_empty() {
            debug!(collection = %block.collection, "Static for over undefined collection");
            return Ok(());
        }

        let items = self.loop_items(collection.value, block)?;
        self.expand_iterations(block, items, node, slots)
    }

    fn loop_items(&self, value: Value, block: &ForBlock) -> ExpandResult<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
                // Rejected before allocating; `as` saturates huge counts
                self.options.limits.check_components(n as usize)?;
                Ok((0..n as u64).map(|i| Value::Number(i as f64)).collect())
            }
            other => Err(CompileError::invalid_expression(
                format!("cannot iterate over {}", other.type_name()),
                self.locate(block.collection.span()),
            )),
        }
    }

    fn expand_iterations(
        &mut self,
        block: &ForBlock,
        items: Vec<Value>,
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        for (index, item) in items.into_iter().enumerate() {
            self.loop_keys.push(loop_key(&item, index));
            self.scope.push();
            self.scope.define(block.item.clone(), Binding::Const(item));
            let result = self.expand_items(&block.body.items, node, slots);
            self.scope.pop();
            self.loop_keys.pop();
            result?;
        }
        Ok(())
    }

    fn expand_runtime_if(
        &mut self,
        block: &IfBlock,
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        let condition = self.eval(&block.condition)?;
        if let Some(name) = condition.unresolved.first() {
            return Err(CompileError::UnresolvedReference {
                name: name.clone(),
                location: self.locate(block.condition.span()),
                hint: None,
            });
        }

        let path = child_path(
            &node.path,
            &node.siblings.segment(&self.segment_name("Conditional")),
        );
        let component = self.new_node(&path, ComponentType::Conditional)?;
        let mut wrapper = NodeBuilder::new(component, path);
        wrapper
            .custom
            .insert("then".to_string(), Json::String(block.then_template.clone()));
        if let Some(template) = &block.else_template {
            wrapper
                .custom
                .insert("else".to_string(), Json::String(template.clone()));
        }

        let taken = condition.value.is_truthy();
        let branch = if taken {
            Some(&block.then_block)
        } else {
            block.else_block.as_ref()
        };
        if let Some(branch) = branch {
            self.depth += 1;
            self.scope.push();
            self.expand_items(&branch.items, &mut wrapper, slots)?;
            self.scope.pop();
            self.depth -= 1;
        }

        let expression = block.condition.to_string();
        let location = self.locate(block.span);
        debug!(condition = %expression, taken, deps = ?condition.deps, "Runtime if");
        for dep in &condition.deps {
            let binding = ComponentBinding::new(wrapper.id(), *dep, BindingKind::Conditional)
                .with_expression(expression.clone());
            self.add_binding(binding, &location)?;
        }
        self.manifest.add_conditional(ReactiveConditional {
            component_id: wrapper.id(),
            condition: expression,
            last_result: taken,
            suspended: false,
            dependencies: condition.deps,
        });

        node.component.push_child(wrapper.finish());
        Ok(())
    }

    fn expand_runtime_for(
        &mut self,
        block: &ForBlock,
        node: &mut NodeBuilder,
        slots: &Rc<SlotContext>,
    ) -> ExpandResult<()> {
        let collection = self.eval(&block.collection)?;
        if let Some(name) = collection.unresolved.first() {
            return Err(CompileError::UnresolvedReference {
                name: name.clone(),
                location: self.locate(block.collection.span()),
                hint: None,
            });
        }

        let path = child_path(
            &node.path,
            &node.siblings.segment(&self.segment_name("ForEach")),
        );
        let component = self.new_node(&path, ComponentType::ForEach)?;
        let mut wrapper = NodeBuilder::new(component, path);
        wrapper
            .custom
            .insert("item".to_string(), Json::String(block.item.clone()));

        let items = self.loop_items(collection.value, block)?;
        self.depth += 1;
        self.expand_iterations(block, items, &mut wrapper, slots)?;
        self.depth -= 1;

        let expression = block.collection.to_string();
        let location = self.locate(block.span);
        for dep in &collection.deps {
            let binding = ComponentBinding::new(wrapper.id(), *dep, BindingKind::Loop)
                .with_expression(expression.clone());
            self.add_binding(binding, &location)?;
        }
        let children = wrapper.component.children().iter().map(|c| c.id).collect();
        self.manifest.add_loop(ReactiveForLoop {
            parent_id: wrapper.id(),
            collection_expr: Some(expression),
            collection_var: collection.deps.first().copied(),
            item_template: Some(block.template.clone()),
            children,
        });

        node.component.push_child(wrapper.finish());
        Ok(())
    }
}

/// Identity key of a loop item: its own text when scalar, an `id`/`key` field when
/// it has one, its index otherwise
fn loop_key(item: &Value, index: usize) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Number(_) | Value::Bool(_) => item.to_string(),
        Value::Object(fields) => fields
            .get("id")
            .or_else(|| fields.get("key"))
            .map(Value::display_string)
            .unwrap_or_else(|| index.to_string()),
        _ => index.to_string(),
    }
}

fn collect_slots(items: &[Item], named: &mut BTreeSet<String>, has_default: &mut bool) {
    for item in items {
        match item {
            Item::Slot(decl) => {
                match &decl.name {
                    Some(name) => {
                        named.insert(name.clone());
                    }
                    None => *has_default = true,
                }
                if let Some(fallback) = &decl.fallback {
                    collect_slots(&fallback.items, named, has_default);
                }
            }
            Item::Element(el) => collect_slots(&el.body.items, named, has_default),
            Item::Insert(insert) => collect_slots(&insert.body.items, named, has_default),
            Item::If(block) => {
                collect_slots(&block.then_block.items, named, has_default);
                if let Some(else_block) = &block.else_block {
                    collect_slots(&else_block.items, named, has_default);
                }
            }
            Item::For(block) => collect_slots(&block.body.items, named, has_default),
            Item::Property(_) | Item::State(_) | Item::Pseudo(_) | Item::Breakpoint(_) => {}
        }
    }
}

/// Parse a constant given on the command line or in configuration. Bare words are
/// taken as strings, so `theme=dark` works without quotes.
pub fn parse_constant(text: &str) -> ExpandResult<Value> {
    let expr = kir_parser::parse_expression(text)?;
    let lines = LineIndex::new("<define>", text);
    let evaluated = evaluate(&expr, &Scope::new(), &lines)?;
    Ok(match evaluated.value {
        Value::Symbol(word) => Value::String(word),
        other => other,
    })
}

/// Parse and expansion both recurse once per nesting level, so they run on a
/// thread whose stack fits the deepest tree `Limits::max_depth` admits.
const COMPILE_STACK_SIZE: usize = 128 * 1024 * 1024;

/// Parse and expand a complete source file
pub fn compile(source: &str, options: ExpandOptions) -> ExpandResult<Expansion> {
    on_compile_stack(|| {
        let doc = parse_source(source, &options.limits)?;
        Expander::new(&doc, source).with_options(options.clone()).expand()
    })
}

/// Like [`compile`], resolving extension elements through `registry`
pub fn compile_with_registry(
    source: &str,
    options: ExpandOptions,
    registry: &HandlerRegistry,
) -> ExpandResult<Expansion> {
    on_compile_stack(|| {
        let doc = parse_source(source, &options.limits)?;
        Expander::new(&doc, source)
            .with_options(options.clone())
            .with_registry(registry)
            .expand()
    })
}

/// Nesting past `max_depth` is a resource limit, not a syntax error.
fn parse_source(source: &str, limits: &Limits) -> ExpandResult<Document> {
    Parser::new(source)?
        .with_max_depth(limits.max_depth)
        .parse_document()
        .map_err(|err| match err {
            ParseError::NestingTooDeep { depth, max, .. } => {
                CompileError::ResourceLimit(ResourceLimitExceeded {
                    kind: LimitKind::Depth,
                    actual: depth,
                    max,
                })
            }
            other => CompileError::Parse(other),
        })
}

fn on_compile_stack<F>(job: F) -> ExpandResult<Expansion>
where
    F: Fn() -> ExpandResult<Expansion> + Sync,
{
    thread::scope(|scope| {
        let spawned = thread::Builder::new()
            .name("kir-compile".to_string())
            .stack_size(COMPILE_STACK_SIZE)
            .spawn_scoped(scope, &job);
        match spawned {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload)),
            Err(err) => {
                warn!(error = %err, "Cannot spawn compile thread, compiling inline");
                job()
            }
        }
    })
}
