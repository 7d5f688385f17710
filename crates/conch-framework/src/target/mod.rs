//! Command targets.
//!
//! A [`CommandTarget`] is one callable signature bound to a command name. Its
//! table entry is built once at registration:
//!
//! - the declared parameter types, in order, excluding the context;
//! - `min_arity` (required parameters) and `max_arity` (all parameters);
//! - whether the invocation context is injected as the first argument;
//! - the owner: static, or an instance type whose live instances it runs on;
//! - the callable itself, a [`TargetKind`].
//!
//! Several targets with the same name form one attribute command, and the
//! overload resolver picks between them.
//!
//! # Example
//!
//! ```rust,ignore
//! let add = CommandTarget::function("add", |a: i32, b: Option<i32>| a + b.unwrap_or(1))
//!     .alias("plus")
//!     .description("Adds two numbers");
//!
//! let heal = CommandTarget::method("heal", |player: &Player, amount: u32| player.heal(amount));
//!
//! let gravity = CommandTarget::static_member(
//!     "gravity",
//!     || *GRAVITY.read(),
//!     |value: f32| *GRAVITY.write() = value,
//! );
//! ```

mod handler;

pub use handler::{
    ContextFunction, ContextMethod, Function, IntoContextFunction, IntoContextMethod,
    IntoFunction, IntoMethod, Method, Signature,
};

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use conch_core::{ArgType, CommandError, CommandOutput, CommandResult, IntoOutput, Value, ValueType};

use crate::context::CommandContext;
use crate::instance::Instance;
use crate::report::catch_panic;

/// Arguments for one call, in declared order. `None` marks a trailing
/// optional parameter that was not supplied.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    slots: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(slots: Vec<Option<Value>>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn into_slots(self) -> Vec<Option<Value>> {
        self.slots
    }
}

/// Everything a raw callback receives.
pub struct TargetCall<'c, 'a> {
    /// Present when the target injects the context.
    pub context: Option<&'c mut CommandContext<'a>>,
    /// Present for instance-owned targets.
    pub instance: Option<&'c (dyn Any + Send + Sync)>,
    pub args: Arguments,
}

pub type FunctionFn = Arc<dyn Fn(TargetCall<'_, '_>) -> CommandResult + Send + Sync>;
pub type GetterFn = Arc<dyn Fn(Option<&(dyn Any + Send + Sync)>) -> CommandResult + Send + Sync>;
pub type SetterFn =
    Arc<dyn Fn(Option<&(dyn Any + Send + Sync)>, Value) -> Result<(), CommandError> + Send + Sync>;

/// How a target is called.
#[derive(Clone)]
pub enum TargetKind {
    Function(FunctionFn),
    /// A gettable/settable member: no argument reads, one argument writes.
    Member { get: GetterFn, set: SetterFn },
}

/// Which objects a target runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Static,
    Instance { type_id: TypeId, type_name: &'static str },
}

impl Owner {
    pub fn of<T: Any>() -> Self {
        let full = std::any::type_name::<T>();
        Self::Instance {
            type_id: TypeId::of::<T>(),
            type_name: full.rsplit("::").next().unwrap_or(full),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static)
    }
}

/// One callable signature bound to a command name.
#[derive(Clone)]
pub struct CommandTarget {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    detailed_description: Option<String>,
    parameter_types: Vec<ValueType>,
    min_arity: usize,
    max_arity: usize,
    injects_context: bool,
    owner: Owner,
    kind: TargetKind,
}

impl CommandTarget {
    /// Builds a target from an explicit table entry.
    ///
    /// `min_arity` is clamped to the number of parameter types.
    pub fn raw(
        name: impl Into<String>,
        parameter_types: Vec<ValueType>,
        min_arity: usize,
        injects_context: bool,
        owner: Owner,
        kind: TargetKind,
    ) -> Self {
        let max_arity = parameter_types.len();
        Self {
            name: name.into().to_lowercase(),
            aliases: Vec::new(),
            description: None,
            detailed_description: None,
            min_arity: min_arity.min(max_arity),
            max_arity,
            parameter_types,
            injects_context,
            owner,
            kind,
        }
    }

    fn from_signature(
        name: impl Into<String>,
        signature: Signature,
        injects_context: bool,
        owner: Owner,
        callback: FunctionFn,
    ) -> Self {
        Self::raw(
            name,
            signature.parameter_types,
            signature.min_arity,
            injects_context,
            owner,
            TargetKind::Function(callback),
        )
    }

    /// A free function taking only typed arguments.
    pub fn function<F, Args>(name: impl Into<String>, f: F) -> Self
    where
        F: IntoFunction<Args>,
    {
        Self::from_signature(name, F::signature(), false, Owner::Static, f.into_callback())
    }

    /// A free function whose first parameter is `&mut CommandContext`.
    pub fn function_with_context<F, Args>(name: impl Into<String>, f: F) -> Self
    where
        F: IntoContextFunction<Args>,
    {
        Self::from_signature(name, F::signature(), true, Owner::Static, f.into_callback())
    }

    /// A method run on every live instance of `O`.
    pub fn method<O, F, Args>(name: impl Into<String>, f: F) -> Self
    where
        O: Any + Send + Sync,
        F: IntoMethod<O, Args>,
    {
        Self::from_signature(name, F::signature(), false, Owner::of::<O>(), f.into_callback())
    }

    /// A method taking `&O` and `&mut CommandContext` before its arguments.
    pub fn method_with_context<O, F, Args>(name: impl Into<String>, f: F) -> Self
    where
        O: Any + Send + Sync,
        F: IntoContextMethod<O, Args>,
    {
        Self::from_signature(name, F::signature(), true, Owner::of::<O>(), f.into_callback())
    }

    /// A static gettable/settable member.
    pub fn static_member<T, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        T: ArgType + Into<Value> + 'static,
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        let getter: GetterFn = Arc::new(move |_| Ok(CommandOutput::Value(get().into())));
        let setter: SetterFn = Arc::new(move |_, value| {
            let value = T::from_value(value).ok_or_else(|| slot_mismatch(0, T::value_type()))?;
            set(value);
            Ok(())
        });
        Self::raw(
            name,
            vec![T::value_type()],
            0,
            false,
            Owner::Static,
            TargetKind::Member {
                get: getter,
                set: setter,
            },
        )
    }

    /// A gettable/settable member of every live instance of `O`.
    pub fn instance_member<O, T, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        O: Any + Send + Sync,
        T: ArgType + Into<Value> + 'static,
        G: Fn(&O) -> T + Send + Sync + 'static,
        S: Fn(&O, T) + Send + Sync + 'static,
    {
        let getter: GetterFn = Arc::new(move |instance| {
            let owner = downcast_instance::<O>(instance)?;
            Ok(CommandOutput::Value(get(owner).into()))
        });
        let setter: SetterFn = Arc::new(move |instance, value| {
            let owner = downcast_instance::<O>(instance)?;
            let value = T::from_value(value).ok_or_else(|| slot_mismatch(0, T::value_type()))?;
            set(owner, value);
            Ok(())
        });
        Self::raw(
            name,
            vec![T::value_type()],
            0,
            false,
            Owner::of::<O>(),
            TargetKind::Member {
                get: getter,
                set: setter,
            },
        )
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into().to_lowercase();
        if !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn detailed_description(mut self, description: impl Into<String>) -> Self {
        self.detailed_description = Some(description.into());
        self
    }

    // ─── Table entry ─────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get_detailed_description(&self) -> Option<&str> {
        self.detailed_description.as_deref()
    }

    pub fn parameter_types(&self) -> &[ValueType] {
        &self.parameter_types
    }

    pub fn min_arity(&self) -> usize {
        self.min_arity
    }

    pub fn max_arity(&self) -> usize {
        self.max_arity
    }

    pub fn injects_context(&self) -> bool {
        self.injects_context
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    pub fn accepts(&self, count: usize) -> bool {
        (self.min_arity..=self.max_arity).contains(&count)
    }

    // ─── Invocation ──────────────────────────────────────────────────────────

    /// Runs the target with resolved values.
    ///
    /// Missing trailing parameters are padded with `None`. Instance targets
    /// run once per live instance of the owner type; with exactly one
    /// instance its result is returned, otherwise each result is reported on
    /// its own and the aggregate is [`CommandOutput::None`].
    pub fn invoke(&self, ctx: &mut CommandContext<'_>, values: Vec<Value>) -> CommandResult {
        let mut slots: Vec<Option<Value>> = values.into_iter().map(Some).collect();
        slots.resize_with(self.max_arity.max(slots.len()), || None);

        let Owner::Instance { type_id, type_name } = self.owner else {
            return self.call(ctx, None, slots);
        };

        let console = ctx.console();
        let logger = console.logger();
        let instances = console.instances().of_type(type_id);
        match instances.as_slice() {
            [] => {
                logger.warning(format!(
                    "No registered targets of type '{type_name}' for command '{}'",
                    ctx.command_name()
                ));
                Ok(CommandOutput::None)
            }
            [single] => {
                logger.info(format!("Executing command for target '{}'", single.label()));
                self.call(ctx, Some(single), slots)
            }
            many => {
                let command = ctx.command_name();
                for instance in many {
                    logger.info(format!("Executing command for target '{}'", instance.label()));
                    let result = catch_panic(|| self.call(ctx, Some(instance), slots.clone()));
                    console.reporter().report(command, result);
                }
                Ok(CommandOutput::None)
            }
        }
    }

    fn call(
        &self,
        ctx: &mut CommandContext<'_>,
        instance: Option<&Instance>,
        slots: Vec<Option<Value>>,
    ) -> CommandResult {
        let instance = instance.map(Instance::as_any);
        match &self.kind {
            TargetKind::Function(callback) => {
                let context = if self.injects_context {
                    Some(ctx)
                } else {
                    None
                };
                callback(TargetCall {
                    context,
                    instance,
                    args: Arguments::new(slots),
                })
            }
            TargetKind::Member { get, set } => match slots.into_iter().next().flatten() {
                None => get(instance),
                Some(value) => set(instance, value).into_output(),
            },
        }
    }
}

impl fmt::Debug for CommandTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTarget")
            .field("name", &self.name)
            .field("parameter_types", &self.parameter_types)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .field("injects_context", &self.injects_context)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

pub(crate) fn slot_mismatch(index: usize, expected: ValueType) -> CommandError {
    CommandError::Unexpected(anyhow::anyhow!(
        "resolved argument {index} does not hold a {expected}"
    ))
}

pub(crate) fn downcast_instance<O: Any>(
    instance: Option<&(dyn Any + Send + Sync)>,
) -> Result<&O, CommandError> {
    instance
        .and_then(|i| i.downcast_ref::<O>())
        .ok_or_else(|| {
            CommandError::Unexpected(anyhow::anyhow!(
                "target instance is not a {}",
                std::any::type_name::<O>()
            ))
        })
}
