use serde::Serialize;

use crate::expr::EvalContext;
use crate::spec::{Effect, EffectKind, FormSchemaElement, FormSchemaPage};

/// Anything that can carry effects.
pub trait HasEffects {
    fn effects(&self) -> &[Effect];
}

impl HasEffects for FormSchemaPage {
    fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

impl HasEffects for FormSchemaElement {
    fn effects(&self) -> &[Effect] {
        FormSchemaElement::effects(self)
    }
}

impl HasEffects for [Effect] {
    fn effects(&self) -> &[Effect] {
        self
    }
}

/// Combined outcome of the effects attached to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RuleOutcome {
    pub hide: bool,
}

/// An effect applies while its condition is falsy; the entity is hidden when
/// at least one applying effect is `hide`. Other effect kinds are ignored.
pub fn evaluate_rules<T: HasEffects + ?Sized>(entity: &T, ctx: &EvalContext<'_>) -> RuleOutcome {
    let hide = entity
        .effects()
        .iter()
        .filter(|effect| !effect.condition.is_truthy(ctx))
        .any(|effect| effect.effect == EffectKind::Hide);
    RuleOutcome { hide }
}

pub fn is_hidden<T: HasEffects + ?Sized>(entity: &T, ctx: &EvalContext<'_>) -> bool {
    evaluate_rules(entity, ctx).hide
}
