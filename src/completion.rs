//! Completion records
//!
//! Every statement evaluation produces a completion. Abrupt completions
//! (return, throw, break, continue) propagate outward until a construct
//! that handles them; the frame machine discards every frame that does not.

use crate::value::{CheapClone, JsString, JsValue};

/// The result of evaluating a statement or expression.
///
/// `Normal(None)` is the empty completion. Break and continue carry an
/// optional label target and an optional value.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal(Option<JsValue>),
    Return(JsValue),
    Throw(JsValue),
    Break {
        target: Option<JsString>,
        value: Option<JsValue>,
    },
    Continue {
        target: Option<JsString>,
        value: Option<JsValue>,
    },
}

impl Default for Completion {
    fn default() -> Self {
        Completion::empty()
    }
}

impl Completion {
    /// The empty normal completion.
    pub fn empty() -> Self {
        Completion::Normal(None)
    }

    pub fn normal(value: JsValue) -> Self {
        Completion::Normal(Some(value))
    }

    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Completion::Throw(_))
    }

    /// The carried value, if any.
    pub fn value(&self) -> Option<&JsValue> {
        match self {
            Completion::Normal(v) | Completion::Break { value: v, .. } => v.as_ref(),
            Completion::Continue { value: v, .. } => v.as_ref(),
            Completion::Return(v) | Completion::Throw(v) => Some(v),
        }
    }

    /// UpdateEmpty: fill in the value of a completion that carries none.
    /// Return and throw always carry a value and are left untouched.
    pub fn update_empty(self, fill: Option<JsValue>) -> Self {
        match self {
            Completion::Normal(None) => Completion::Normal(fill),
            Completion::Break {
                target,
                value: None,
            } => Completion::Break {
                target,
                value: fill,
            },
            Completion::Continue {
                target,
                value: None,
            } => Completion::Continue {
                target,
                value: fill,
            },
            other => other,
        }
    }

    /// LoopContinues: whether an iteration statement with `labels` keeps
    /// looping after its body produced this completion.
    pub fn loop_continues(&self, labels: &[JsString]) -> bool {
        match self {
            Completion::Normal(_) => true,
            Completion::Continue { target: None, .. } => true,
            Completion::Continue {
                target: Some(label),
                ..
            } => labels.contains(label),
            _ => false,
        }
    }

    /// The value a host sees for a finished script: empty becomes undefined.
    pub fn value_or_undefined(&self) -> JsValue {
        self.value().map(CheapClone::cheap_clone).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_empty_fills_only_missing_values() {
        let filled = Completion::empty().update_empty(Some(JsValue::Number(1.0)));
        assert!(matches!(filled, Completion::Normal(Some(JsValue::Number(n))) if n == 1.0));

        let kept = Completion::normal(JsValue::Number(2.0)).update_empty(Some(JsValue::Null));
        assert!(matches!(kept, Completion::Normal(Some(JsValue::Number(n))) if n == 2.0));

        let thrown = Completion::Throw(JsValue::Null).update_empty(Some(JsValue::Undefined));
        assert!(matches!(thrown, Completion::Throw(JsValue::Null)));

        let brk = Completion::Break {
            target: None,
            value: None,
        }
        .update_empty(Some(JsValue::Boolean(true)));
        assert!(matches!(
            brk,
            Completion::Break {
                value: Some(JsValue::Boolean(true)),
                ..
            }
        ));
    }

    #[test]
    fn test_loop_continues_matches_label_set() {
        let outer = JsString::from("outer");
        let labels = vec![outer.cheap_clone()];
        assert!(Completion::empty().loop_continues(&[]));
        assert!(
            Completion::Continue {
                target: None,
                value: None
            }
            .loop_continues(&[])
        );
        assert!(
            Completion::Continue {
                target: Some(outer.cheap_clone()),
                value: None
            }
            .loop_continues(&labels)
        );
        assert!(
            !Completion::Continue {
                target: Some(outer),
                value: None
            }
            .loop_continues(&[])
        );
        assert!(
            !Completion::Break {
                target: None,
                value: None
            }
            .loop_continues(&labels)
        );
        assert!(!Completion::Return(JsValue::Undefined).loop_continues(&labels));
    }

    #[test]
    fn test_abruptness() {
        assert!(!Completion::empty().is_abrupt());
        assert!(Completion::Return(JsValue::Undefined).is_abrupt());
        assert!(Completion::Throw(JsValue::Undefined).is_throw());
    }
}
