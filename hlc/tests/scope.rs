use hlc::token::Label;
use hlc::{Namespace, Pos, ScopeTable, Symbol};

fn label(name: &str, row: usize) -> Symbol {
    Symbol::Label(Label::new(name, Pos::new("scope.hl", row, 0)))
}

fn row_of(symbol: Option<&Symbol>) -> Option<usize> {
    match symbol {
        Some(Symbol::Label(label)) => Some(label.pos.row),
        _ => None,
    }
}

/// `v` is defined in `a`, `a.b` and `a.b.c`; each lookup must see the
/// innermost definition visible from where it starts.
#[test]
fn innermost_definition_wins() {
    let mut scopes = ScopeTable::new();
    let a = scopes.push(Some("a")).clone();
    scopes.define(label("v", 1), None);
    let b = scopes.push(Some("b")).clone();
    scopes.define(label("v", 2), None);
    let c = scopes.push(Some("c")).clone();
    scopes.define(label("v", 3), None);

    assert_eq!(row_of(scopes.lookup("v", Some(&c))), Some(3));
    assert_eq!(row_of(scopes.lookup("v", Some(&b))), Some(2));
    assert_eq!(row_of(scopes.lookup("v", Some(&a))), Some(1));
    assert_eq!(row_of(scopes.lookup("v", Some(&Namespace::global()))), None);

    let (found, _) = scopes.lookup_entry("v", Some(&c.child("d"))).unwrap();
    assert_eq!(found, c);
}

#[test]
fn current_scope_is_the_default() {
    let mut scopes = ScopeTable::new();
    scopes.define(label("top", 0), None);
    scopes.push(Some("main"));
    scopes.define(label("inner", 1), None);
    assert!(scopes.lookup("top", None).is_some());
    assert!(scopes.lookup("inner", None).is_some());

    scopes.pop().unwrap();
    assert!(scopes.lookup("inner", None).is_none());
    assert!(scopes.lookup("inner", Some(&"main".parse().unwrap())).is_some());
}

#[test]
fn redefinition_replaces() {
    let mut scopes = ScopeTable::new();
    scopes.define(label("v", 1), None);
    scopes.define(label("v", 7), None);
    assert_eq!(row_of(scopes.lookup("v", None)), Some(7));
}

#[test]
fn anonymous_scopes_are_numbered() {
    let mut scopes = ScopeTable::new();
    scopes.push(Some("main"));
    assert_eq!(scopes.push(None).to_string(), "main.__anonymous0__");
    scopes.pop().unwrap();
    assert_eq!(scopes.push(None).to_string(), "main.__anonymous1__");
    assert_eq!(scopes.current().qualify("x"), "main.__anonymous1__.x");
    assert_eq!(Namespace::global().qualify("x"), "x");
}

#[test]
fn reset_clears_everything() {
    let mut scopes = ScopeTable::new();
    scopes.push(Some("main"));
    scopes.define(label("v", 1), None);
    scopes.reset();
    assert!(scopes.current().is_global());
    assert!(scopes.lookup("v", Some(&"main".parse().unwrap())).is_none());
}

#[test]
fn lookup_follows_pops() {
    let mut scopes = ScopeTable::new();
    scopes.push(Some("a"));
    scopes.define(label("v", 1), None);
    scopes.push(Some("b"));
    scopes.define(label("v", 2), None);
    scopes.push(Some("c"));
    scopes.define(label("v", 3), None);

    assert_eq!(row_of(scopes.lookup("v", None)), Some(3));
    scopes.pop().unwrap();
    assert_eq!(row_of(scopes.lookup("v", None)), Some(2));
    scopes.pop().unwrap();
    assert_eq!(row_of(scopes.lookup("v", None)), Some(1));
}
