//! Destructuring
//!
//! BindingInitialization and DestructuringAssignmentEvaluation share one
//! implementation: the `BindingMode` decides whether a leaf identifier is
//! initialized in a given environment or assigned through PutValue. The
//! value being destructured arrives in the accumulator.

use std::rc::Rc;

use crate::ast::{Expression, Pattern, PropertyName};
use crate::completion::Completion;
use crate::error::{JsError, JsResult};
use crate::value::{CheapClone, JsValue};

use super::machine::{
    Activation, ArrayPatternState, BindingMode, Frame, FrameResult, ObjectPatternState, RefCont,
};
use super::{Interpreter, IteratorHint};

impl Interpreter {
    /// Bind the value in the accumulator to `pattern`.
    pub(crate) fn step_bind_pattern(&mut self, act: &mut Activation, pattern: Pattern, mode: BindingMode) -> JsResult<FrameResult> {
        let value = act.take_value();
        match pattern {
            Pattern::Identifier(id) => {
                match mode {
                    BindingMode::Initialize(env) => self.initialize_binding(env, &id.name, value)?,
                    BindingMode::Put => {
                        let reference = self.resolve_binding(&id.name, None, act.strict)?;
                        self.put_value(&reference, value)?;
                    }
                }
                act.set_empty();
                Ok(FrameResult::Continue)
            }
            Pattern::Object(pattern) => {
                if value.is_null_or_undefined() {
                    let shown = if value.is_undefined() { "undefined" } else { "null" };
                    return Err(JsError::type_error(format!(
                        "Cannot destructure '{shown}' as it is {shown}."
                    )));
                }
                act.set_empty();
                self.step_object_pattern(
                    act,
                    Box::new(ObjectPatternState {
                        pattern,
                        source: value,
                        excluded: Vec::new(),
                        next: 0,
                        awaiting_key: false,
                        mode,
                    }),
                )
            }
            Pattern::Array(pattern) => {
                let iterator = self.get_iterator(&value, IteratorHint::Sync)?;
                act.set_empty();
                self.step_array_pattern(
                    act,
                    Box::new(ArrayPatternState {
                        pattern,
                        iterator,
                        next: 0,
                        mode,
                    }),
                )
            }
            Pattern::Expression(target) => self.eval_reference(act, target, RefCont::Put(value)),
        }
    }

    /// A single element or property target with an optional initializer,
    /// used when the value is undefined.
    pub(crate) fn step_bind_element(
        &mut self,
        act: &mut Activation,
        target: Pattern,
        default: Option<Expression>,
        mode: BindingMode,
    ) -> JsResult<FrameResult> {
        let value = act.take_value();
        act.push(Frame::BindPattern { pattern: target, mode });
        match default {
            Some(default) if value.is_undefined() => act.push(Frame::Expr(default)),
            _ => act.set_value(value),
        }
        Ok(FrameResult::Continue)
    }

    pub(crate) fn step_object_pattern(&mut self, act: &mut Activation, mut state: Box<ObjectPatternState>) -> JsResult<FrameResult> {
        let mut computed = None;
        if state.awaiting_key {
            let key_value = act.take_value();
            computed = Some(self.to_property_key(&key_value)?);
            state.awaiting_key = false;
        }
        let pattern = Rc::clone(&state.pattern);
        if let Some(property) = pattern.properties.get(state.next) {
            let key = match (computed, &property.key) {
                (Some(key), _) => key,
                (None, PropertyName::Computed(expr)) => {
                    state.awaiting_key = true;
                    act.push(Frame::ObjectPattern(state));
                    act.push(Frame::Expr(expr.cheap_clone()));
                    return Ok(FrameResult::Continue);
                }
                (None, name) => self.static_property_key(name),
            };
            let value = self.get_v(&state.source, &key)?;
            state.excluded.push(key);
            state.next += 1;
            let mode = state.mode;
            act.push(Frame::ObjectPattern(state));
            act.push(Frame::BindElement {
                target: property.value.cheap_clone(),
                default: property.default.clone(),
                mode,
            });
            act.set_value(value);
            return Ok(FrameResult::Continue);
        }
        match &pattern.rest {
            Some(rest) => {
                let rest_object = self.create_object();
                self.copy_data_properties(rest_object, &state.source, &state.excluded)?;
                act.push(Frame::BindPattern {
                    pattern: rest.cheap_clone(),
                    mode: state.mode,
                });
                act.set_value(JsValue::Object(rest_object));
            }
            None => act.set_empty(),
        }
        Ok(FrameResult::Continue)
    }

    /// Array destructuring. An abrupt completion of an element binding
    /// closes the iterator unless it is already exhausted.
    pub(crate) fn step_array_pattern(&mut self, act: &mut Activation, mut state: Box<ArrayPatternState>) -> JsResult<FrameResult> {
        if act.acc.is_abrupt() {
            let completion = std::mem::take(&mut act.acc);
            act.acc = if state.iterator.done {
                completion
            } else {
                self.iterator_close(&state.iterator, completion)?
            };
            return Ok(FrameResult::Continue);
        }
        let pattern = Rc::clone(&state.pattern);
        while let Some(element) = pattern.elements.get(state.next) {
            state.next += 1;
            let value = if state.iterator.done {
                JsValue::Undefined
            } else {
                self.iterator_step_value(&mut state.iterator)?.unwrap_or_default()
            };
            let Some(element) = element else {
                continue;
            };
            let mode = state.mode;
            act.push(Frame::ArrayPattern(state));
            act.push(Frame::BindElement {
                target: element.target.cheap_clone(),
                default: element.default.clone(),
                mode,
            });
            act.set_value(value);
            return Ok(FrameResult::Continue);
        }
        if let Some(rest) = &pattern.rest {
            let mut items = Vec::new();
            while !state.iterator.done {
                if let Some(item) = self.iterator_step_value(&mut state.iterator)? {
                    items.push(item);
                }
            }
            let array = self.create_array(items);
            act.push(Frame::BindPattern {
                pattern: rest.cheap_clone(),
                mode: state.mode,
            });
            act.set_value(JsValue::Object(array));
            return Ok(FrameResult::Continue);
        }
        act.acc = if state.iterator.done {
            Completion::empty()
        } else {
            self.iterator_close(&state.iterator, Completion::empty())?
        };
        Ok(FrameResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    fn run(source: &str) -> JsValue {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        interp.run_script(source).unwrap()
    }

    #[test]
    fn test_object_rest_excludes_named_keys() {
        let source = "var {a, ...rest} = {a: 1, b: 2, c: 3}; a + Object.keys(rest).join('')";
        assert_eq!(run(source), JsValue::from("1bc"));
    }

    #[test]
    fn test_array_pattern_defaults_and_holes() {
        let source = "let [x, , y = 10, ...z] = [1, 2, undefined, 4, 5]; x + y + z.length";
        assert_eq!(run(source), JsValue::Number(13.0));
    }

    #[test]
    fn test_destructuring_assignment_to_members() {
        let source = "var o = {}; [o.a, o.b] = [3, 4]; o.a * o.b";
        assert_eq!(run(source), JsValue::Number(12.0));
    }

    #[test]
    fn test_array_pattern_closes_unfinished_iterator() {
        let source = "
            var closed = 0;
            var it = { [Symbol.iterator]() { return this; },
                       next() { return { value: 1, done: false }; },
                       return() { closed++; return {}; } };
            var [first] = it;
            closed";
        assert_eq!(run(source), JsValue::Number(1.0));
    }

    #[test]
    fn test_destructuring_null_throws_type_error() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let result = interp.run_script("try { var {a} = null; } catch (e) { e instanceof TypeError }");
        assert_eq!(result.unwrap(), JsValue::Boolean(true));
    }
}
