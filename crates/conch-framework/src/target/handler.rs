//! Typed target functions.
//!
//! Plain Rust functions and closures become command targets through four
//! traits, each implemented for every arity from 0 to 8:
//!
//! | trait | shape |
//! |---|---|
//! | [`IntoFunction`] | `Fn(A1, .., An) -> R` |
//! | [`IntoContextFunction`] | `Fn(&mut CommandContext, A1, .., An) -> R` |
//! | [`IntoMethod`] | `Fn(&O, A1, .., An) -> R` |
//! | [`IntoContextMethod`] | `Fn(&O, &mut CommandContext, A1, .., An) -> R` |
//!
//! Every `Ai` implements [`Param`] (a value type or an `Option` of one) and `R`
//! implements [`IntoOutput`]. The signature is read from the parameter types
//! once, at registration.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use conch_core::{CommandError, IntoOutput, Param, ValueType};

use super::{FunctionFn, TargetCall, downcast_instance, slot_mismatch};
use crate::context::CommandContext;

/// Parameter table of a typed function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub parameter_types: Vec<ValueType>,
    pub min_arity: usize,
}

impl Signature {
    fn of(params: &[(ValueType, bool)]) -> Self {
        Self {
            parameter_types: params.iter().map(|(ty, _)| *ty).collect(),
            min_arity: params.iter().filter(|(_, required)| *required).count(),
        }
    }
}

/// Marker for [`IntoFunction`] argument tuples.
pub struct Function<Args>(PhantomData<Args>);
/// Marker for [`IntoContextFunction`] argument tuples.
pub struct ContextFunction<Args>(PhantomData<Args>);
/// Marker for [`IntoMethod`] argument tuples.
pub struct Method<O, Args>(PhantomData<(O, Args)>);
/// Marker for [`IntoContextMethod`] argument tuples.
pub struct ContextMethod<O, Args>(PhantomData<(O, Args)>);

pub trait IntoFunction<Args>: Send + Sync + 'static {
    fn signature() -> Signature;
    fn into_callback(self) -> FunctionFn;
}

pub trait IntoContextFunction<Args>: Send + Sync + 'static {
    fn signature() -> Signature;
    fn into_callback(self) -> FunctionFn;
}

pub trait IntoMethod<O, Args>: Send + Sync + 'static {
    fn signature() -> Signature;
    fn into_callback(self) -> FunctionFn;
}

pub trait IntoContextMethod<O, Args>: Send + Sync + 'static {
    fn signature() -> Signature;
    fn into_callback(self) -> FunctionFn;
}

fn missing_context() -> CommandError {
    CommandError::Unexpected(anyhow::anyhow!("target expects a context but none was injected"))
}

// ============================================================================
// Blanket implementations
// ============================================================================

macro_rules! impl_into_target {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Res, $($ty,)*> IntoFunction<Function<($($ty,)*)>> for F
        where
            F: Fn($($ty,)*) -> Res + Send + Sync + 'static,
            Res: IntoOutput,
            $($ty: Param + 'static,)*
        {
            fn signature() -> Signature {
                Signature::of(&[$(($ty::value_type(), $ty::required()),)*])
            }

            fn into_callback(self) -> FunctionFn {
                Arc::new(move |call: TargetCall<'_, '_>| {
                    let mut slots = call.args.into_slots().into_iter().enumerate();
                    $(
                        let (index, slot) = slots.next().unwrap_or_default();
                        let $ty = $ty::from_slot(slot)
                            .ok_or_else(|| slot_mismatch(index, $ty::value_type()))?;
                    )*
                    (self)($($ty,)*).into_output()
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Res, $($ty,)*> IntoContextFunction<ContextFunction<($($ty,)*)>> for F
        where
            F: Fn(&mut CommandContext<'_>, $($ty,)*) -> Res + Send + Sync + 'static,
            Res: IntoOutput,
            $($ty: Param + 'static,)*
        {
            fn signature() -> Signature {
                Signature::of(&[$(($ty::value_type(), $ty::required()),)*])
            }

            fn into_callback(self) -> FunctionFn {
                Arc::new(move |call: TargetCall<'_, '_>| {
                    let ctx = call.context.ok_or_else(missing_context)?;
                    let mut slots = call.args.into_slots().into_iter().enumerate();
                    $(
                        let (index, slot) = slots.next().unwrap_or_default();
                        let $ty = $ty::from_slot(slot)
                            .ok_or_else(|| slot_mismatch(index, $ty::value_type()))?;
                    )*
                    (self)(ctx, $($ty,)*).into_output()
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, O, Res, $($ty,)*> IntoMethod<O, Method<O, ($($ty,)*)>> for F
        where
            F: Fn(&O, $($ty,)*) -> Res + Send + Sync + 'static,
            O: Any + Send + Sync,
            Res: IntoOutput,
            $($ty: Param + 'static,)*
        {
            fn signature() -> Signature {
                Signature::of(&[$(($ty::value_type(), $ty::required()),)*])
            }

            fn into_callback(self) -> FunctionFn {
                Arc::new(move |call: TargetCall<'_, '_>| {
                    let owner = downcast_instance::<O>(call.instance)?;
                    let mut slots = call.args.into_slots().into_iter().enumerate();
                    $(
                        let (index, slot) = slots.next().unwrap_or_default();
                        let $ty = $ty::from_slot(slot)
                            .ok_or_else(|| slot_mismatch(index, $ty::value_type()))?;
                    )*
                    (self)(owner, $($ty,)*).into_output()
                })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, O, Res, $($ty,)*> IntoContextMethod<O, ContextMethod<O, ($($ty,)*)>> for F
        where
            F: Fn(&O, &mut CommandContext<'_>, $($ty,)*) -> Res + Send + Sync + 'static,
            O: Any + Send + Sync,
            Res: IntoOutput,
            $($ty: Param + 'static,)*
        {
            fn signature() -> Signature {
                Signature::of(&[$(($ty::value_type(), $ty::required()),)*])
            }

            fn into_callback(self) -> FunctionFn {
                Arc::new(move |call: TargetCall<'_, '_>| {
                    let owner = downcast_instance::<O>(call.instance)?;
                    let ctx = call.context.ok_or_else(missing_context)?;
                    let mut slots = call.args.into_slots().into_iter().enumerate();
                    $(
                        let (index, slot) = slots.next().unwrap_or_default();
                        let $ty = $ty::from_slot(slot)
                            .ok_or_else(|| slot_mismatch(index, $ty::value_type()))?;
                    )*
                    (self)(owner, ctx, $($ty,)*).into_output()
                })
            }
        }
    };
}

impl_into_target!();
impl_into_target!(T1);
impl_into_target!(T1, T2);
impl_into_target!(T1, T2, T3);
impl_into_target!(T1, T2, T3, T4);
impl_into_target!(T1, T2, T3, T4, T5);
impl_into_target!(T1, T2, T3, T4, T5, T6);
impl_into_target!(T1, T2, T3, T4, T5, T6, T7);
impl_into_target!(T1, T2, T3, T4, T5, T6, T7, T8);
