//! Classes: constructors, methods, accessors, inheritance and super

use super::{eval, throws_error};
use jsrun::JsValue;

#[test]
fn test_class_basics() {
    let source = r#"
        class Counter {
            constructor(start) { this.count = start; }
            inc() { return ++this.count; }
            get doubled() { return this.count * 2; }
            static zero() { return new Counter(0); }
        }
        var c = Counter.zero();
        c.inc(); c.inc();
        c.doubled
    "#;
    assert_eq!(eval(source), JsValue::Number(4.0));
}

#[test]
fn test_class_requires_new() {
    assert!(throws_error("class A {} A()", "TypeError"));
}

#[test]
fn test_class_methods_are_not_enumerable() {
    assert_eq!(eval("class A { m() {} } Object.keys(A.prototype).length"), JsValue::Number(0.0));
}

#[test]
fn test_inheritance_and_super() {
    let source = r#"
        class Animal {
            constructor(name) { this.name = name; }
            speak() { return this.name + ' makes a sound'; }
        }
        class Dog extends Animal {
            constructor(name) { super(name); this.kind = 'dog'; }
            speak() { return super.speak() + ' (woof)'; }
        }
        var d = new Dog('Rex');
        [d.speak(), d instanceof Animal, Object.getPrototypeOf(Dog) === Animal].join('|')
    "#;
    assert_eq!(eval(source), JsValue::from("Rex makes a sound (woof)|true|true"));
}

#[test]
fn test_default_derived_constructor_forwards_arguments() {
    let source = r#"
        class Base { constructor(a, b) { this.sum = a + b; } }
        class Derived extends Base {}
        new Derived(2, 3).sum
    "#;
    assert_eq!(eval(source), JsValue::Number(5.0));
}

#[test]
fn test_this_before_super_is_reference_error() {
    let source = r#"
        class Base {}
        class Derived extends Base { constructor() { this.x = 1; super(); } }
        new Derived()
    "#;
    assert!(throws_error(source, "ReferenceError"));
}

#[test]
fn test_static_inheritance() {
    let source = r#"
        class A { static make() { return 'made by ' + this.name; } }
        class B extends A {}
        B.make()
    "#;
    assert_eq!(eval(source), JsValue::from("made by B"));
}

#[test]
fn test_extending_builtin_error() {
    let source = r#"
        class ValidationError extends Error {
            constructor(message) { super(message); this.name = 'ValidationError'; }
        }
        try { throw new ValidationError('bad input'); }
        catch (e) { [e instanceof Error, e.message, String(e)].join('|') }
    "#;
    assert_eq!(eval(source), JsValue::from("true|bad input|ValidationError: bad input"));
}

#[test]
fn test_class_binding_is_immutable_inside_body() {
    assert!(throws_error("class C { static m() { C = 1; } } C.m()", "TypeError"));
}

#[test]
fn test_extends_requires_object_prototype() {
    assert!(throws_error("function F() {} F.prototype = 3; class C extends F {}", "TypeError"));
}
