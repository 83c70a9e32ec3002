//! Animator registry.
//!
//! Each document owns one registry mapping a [`ValueKind`] to the animator used to
//! blend keyframes of that kind. The built-in table covers every kind; callers may
//! override individual kinds without affecting other documents.

pub mod functions;

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use montage_api_core::{
    Color, CornerRadius, Matrix4, PropertyValue, Size, Thickness, Value, ValueKind,
};

use functions::{Animator, ColorAnimator, HoldAnimator, LinearAnimator};

/// Lifts a typed animator to untyped [`Value`]s. Mismatched inputs return the old
/// value unchanged.
pub struct TypedAnimator<T, A> {
    animator: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T, A> TypedAnimator<T, A> {
    pub fn new(animator: A) -> Self {
        Self {
            animator,
            _marker: PhantomData,
        }
    }
}

impl<T: PropertyValue, A: Animator<T>> Animator<Value> for TypedAnimator<T, A> {
    fn interpolate(&self, progress: f32, old: &Value, new: &Value) -> Value {
        match (T::from_value(old), T::from_value(new)) {
            (Some(a), Some(b)) => self.animator.interpolate(progress, &a, &b).into_value(),
            _ => old.clone(),
        }
    }
}

type DynAnimator = Box<dyn Animator<Value> + Send + Sync>;

pub struct AnimatorRegistry {
    animators: HashMap<ValueKind, DynAnimator>,
}

impl AnimatorRegistry {
    /// Registry without any animators; every kind falls back to hold semantics.
    pub fn empty() -> Self {
        Self {
            animators: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in animator for every kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_typed::<bool, _>(HoldAnimator);
        registry.register_typed::<String, _>(HoldAnimator);
        registry.register_typed::<u8, _>(LinearAnimator);
        registry.register_typed::<i32, _>(LinearAnimator);
        registry.register_typed::<f32, _>(LinearAnimator);
        registry.register_typed::<[f32; 2], _>(LinearAnimator);
        registry.register_typed::<[f32; 3], _>(LinearAnimator);
        registry.register_typed::<[f32; 4], _>(LinearAnimator);
        registry.register_typed::<Matrix4, _>(LinearAnimator);
        registry.register_typed::<Size, _>(LinearAnimator);
        registry.register_typed::<Thickness, _>(LinearAnimator);
        registry.register_typed::<CornerRadius, _>(LinearAnimator);
        registry.register_typed::<Color, _>(ColorAnimator);
        registry
    }

    /// Register (or replace) the animator for `kind`.
    pub fn register(&mut self, kind: ValueKind, animator: DynAnimator) {
        tracing::trace!(%kind, "registering animator");
        self.animators.insert(kind, animator);
    }

    /// Register a typed animator for `T::KIND`.
    pub fn register_typed<T, A>(&mut self, animator: A)
    where
        T: PropertyValue,
        A: Animator<T> + Send + Sync + 'static,
    {
        self.register(T::KIND, Box::new(TypedAnimator::<T, A>::new(animator)));
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.animators.contains_key(&kind)
    }

    /// Interpolate two values of the same kind. Kind mismatches keep `old`.
    pub fn interpolate(&self, progress: f32, old: &Value, new: &Value) -> Value {
        if old.kind() != new.kind() {
            return old.clone();
        }
        match self.animators.get(&old.kind()) {
            Some(animator) => animator.interpolate(progress, old, new),
            None => HoldAnimator.interpolate(progress, old, new),
        }
    }
}

impl Animator<Value> for AnimatorRegistry {
    fn interpolate(&self, progress: f32, old: &Value, new: &Value) -> Value {
        AnimatorRegistry::interpolate(self, progress, old, new)
    }
}

impl Default for AnimatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for AnimatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&'static str> = self.animators.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("AnimatorRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Snap;

    impl Animator<f32> for Snap {
        fn interpolate(&self, progress: f32, old: &f32, new: &f32) -> f32 {
            if progress < 0.5 {
                *old
            } else {
                *new
            }
        }
    }

    #[test]
    fn builtins_cover_float_and_color() {
        let reg = AnimatorRegistry::with_builtins();
        assert_eq!(
            reg.interpolate(0.5, &Value::Float(0.0), &Value::Float(10.0)),
            Value::Float(5.0)
        );
        assert!(reg.contains(ValueKind::Color));
        assert!(reg.contains(ValueKind::Text));
    }

    #[test]
    fn override_is_local_to_registry() {
        let mut custom = AnimatorRegistry::with_builtins();
        custom.register_typed::<f32, _>(Snap);
        let stock = AnimatorRegistry::with_builtins();

        let a = Value::Float(0.0);
        let b = Value::Float(10.0);
        assert_eq!(custom.interpolate(0.5, &a, &b), Value::Float(10.0));
        assert_eq!(stock.interpolate(0.5, &a, &b), Value::Float(5.0));
    }

    #[test]
    fn empty_registry_holds() {
        let reg = AnimatorRegistry::empty();
        let a = Value::Float(1.0);
        let b = Value::Float(2.0);
        assert_eq!(reg.interpolate(0.5, &a, &b), a);
        assert_eq!(reg.interpolate(1.0, &a, &b), b);
    }
}
