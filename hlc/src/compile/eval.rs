use crate::error::{Error, Pos};
use crate::scope::{Namespace, ScopeTable, Symbol};
use crate::token::{BinaryOp, Expr, Variable};

/// Name resolution from one token's point of view.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    pub scopes: &'a ScopeTable,
    pub ns: &'a Namespace,
    pub pos: &'a Pos,
    /// Qualified names whose definitions are being followed right now.
    trail: &'a [String],
}

impl<'a> Lookup<'a> {
    pub fn new(scopes: &'a ScopeTable, ns: &'a Namespace, pos: &'a Pos) -> Self {
        Self {
            scopes,
            ns,
            pos,
            trail: &[],
        }
    }

    /// The same lookup started from another namespace.
    pub fn at<'b>(&self, ns: &'b Namespace) -> Lookup<'b>
    where
        'a: 'b,
    {
        Lookup {
            scopes: self.scopes,
            ns,
            pos: self.pos,
            trail: self.trail,
        }
    }

    /// The trail extended by `key`. A key already on it is a definition
    /// that refers back to itself.
    pub(super) fn enter(&self, key: String) -> Result<Vec<String>, Error> {
        if self.trail.contains(&key) {
            return Err(Error::RecursiveDefinition(self.pos.clone(), key));
        }
        let mut trail = self.trail.to_vec();
        trail.push(key);
        Ok(trail)
    }

    /// Lookup from `ns` following `trail`, as returned by `enter`.
    pub(super) fn within<'b>(&self, ns: &'b Namespace, trail: &'b [String]) -> Lookup<'b>
    where
        'a: 'b,
    {
        Lookup {
            trail,
            ..self.at(ns)
        }
    }

    /// Replaces every name in `expr` by what it stands for and folds the
    /// result. `Ok(None)` while some name is not known yet.
    pub fn bind(&self, expr: &Expr) -> Result<Option<Expr>, Error> {
        let bound = match expr {
            Expr::Number(_) | Expr::Ref(_) => Some(expr.clone()),
            Expr::Name(name) => self.name(name)?,
            Expr::Sizeof(name) => self.sizeof(name)?.map(|size| Expr::Number(size as i64)),
            Expr::Unary(op, e) => self.bind(e)?.map(|e| Expr::unary(*op, e)),
            Expr::Binary(op, l, r) => match (self.bind(l)?, self.bind(r)?) {
                (Some(l), Some(r)) => Some(Expr::binary(*op, l, r)),
                _ => None,
            },
        };
        bound
            .map(|e| e.fold().map_err(|err| Error::Eval(self.pos.clone(), err)))
            .transpose()
    }

    /// Like `bind`, for places that need a number.
    pub fn constant(&self, expr: &Expr) -> Result<Option<i64>, Error> {
        match self.bind(expr)? {
            Some(Expr::Number(n)) => Ok(Some(n)),
            Some(e) => Err(Error::NotAConstant(self.pos.clone(), e.to_string())),
            None => Ok(None),
        }
    }

    fn name(&self, name: &str) -> Result<Option<Expr>, Error> {
        if let Some((ns, symbol)) = self.scopes.lookup_entry(name, Some(self.ns)) {
            return self.value(&ns, symbol);
        }
        let Some((head, member)) = name.split_once('.') else {
            return Ok(None);
        };
        match self.scopes.lookup_entry(head, Some(self.ns)) {
            Some((_, Symbol::Enum(def))) => match def.members.get(member) {
                Some(value) => Ok(Some(Expr::Number(*value))),
                None => Err(Error::NoSuchMember(self.pos.clone(), head.to_string(), member.to_string())),
            },
            Some((ns, Symbol::Variable(var))) => {
                let Some(base) = self.variable(&ns, var)? else {
                    return Ok(None);
                };
                let Some(offset) = self.at(&ns).field_offset(&var.ty, member)? else {
                    return Ok(None);
                };
                Ok(Some(Expr::binary(BinaryOp::Add, base, Expr::Number(offset as i64))))
            }
            // `main.counter` names a local of function `main`
            Some((_, Symbol::Function(_))) => self
                .at(&Namespace::global().child(head))
                .name(member),
            Some(_) => Err(Error::NoSuchMember(self.pos.clone(), head.to_string(), member.to_string())),
            None => Ok(None),
        }
    }

    fn value(&self, ns: &Namespace, symbol: &Symbol) -> Result<Option<Expr>, Error> {
        match symbol {
            Symbol::Label(label) => Ok(Some(Expr::Ref(label.name.clone()))),
            Symbol::Variable(var) => self.variable(ns, var),
            Symbol::Function(func) if func.decl.is_macro() => {
                Err(Error::NotAValue(self.pos.clone(), func.decl.name.clone()))
            }
            Symbol::Function(func) => Ok(func.entry.clone().map(Expr::Ref)),
            Symbol::Enum(_) | Symbol::Struct(_) | Symbol::Typedef(_) => {
                Err(Error::NotAValue(self.pos.clone(), symbol.name().to_string()))
            }
        }
    }

    /// A variable stands for its fixed address, or for its layout key.
    fn variable(&self, ns: &Namespace, var: &Variable) -> Result<Option<Expr>, Error> {
        match &var.address {
            Some(address) => {
                let trail = self.enter(ns.qualify(&var.name))?;
                self.within(ns, &trail).bind(address)
            }
            None => Ok(Some(Expr::Ref(ns.qualify(&var.name)))),
        }
    }

    /// Size of a type or of a variable.
    fn sizeof(&self, name: &str) -> Result<Option<usize>, Error> {
        match self.scopes.lookup_entry(name, Some(self.ns)) {
            Some((ns, Symbol::Variable(var))) => self.at(&ns).variable_size(var),
            _ => self.type_size(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Dim, EnumDef, Field, Label, StructDef};
    use indexmap::IndexMap;

    fn var(name: &str, ty: &str, ns: &Namespace, address: Option<i64>) -> Symbol {
        Symbol::Variable(Variable {
            ty: ty.to_string(),
            name: name.to_string(),
            shared: false,
            dim: Dim::Scalar,
            address: address.map(Expr::Number),
            init: None,
            ns: ns.clone(),
            size: None,
            pos: Pos::default(),
        })
    }

    fn scopes() -> (ScopeTable, Namespace) {
        let mut scopes = ScopeTable::new();
        let global = Namespace::global();
        scopes.define(
            Symbol::Struct(StructDef {
                name: "point".into(),
                fields: vec![
                    Field {
                        ty: "byte".into(),
                        name: "x".into(),
                        dim: Dim::Scalar,
                    },
                    Field {
                        ty: "word".into(),
                        name: "y".into(),
                        dim: Dim::Scalar,
                    },
                ],
            }),
            None,
        );
        scopes.define(
            Symbol::Enum(EnumDef {
                name: "dir".into(),
                members: IndexMap::from([("up".to_string(), 0), ("down".to_string(), 1)]),
            }),
            None,
        );
        scopes.define(var("ppu", "byte", &global, Some(0x2000)), None);
        scopes.define(Symbol::Label(Label::new("loop", Pos::default())), None);
        let ns = scopes.push(Some("main")).clone();
        scopes.define(var("pos", "point", &ns, None), None);
        (scopes, ns)
    }

    #[test]
    fn names_bind_to_refs_and_numbers() {
        let (scopes, ns) = scopes();
        let pos = Pos::default();
        let lookup = Lookup::new(&scopes, &ns, &pos);
        assert_eq!(lookup.bind(&Expr::Name("loop".into())).unwrap(), Some(Expr::Ref("loop".into())));
        assert_eq!(lookup.bind(&Expr::Name("ppu".into())).unwrap(), Some(Expr::Number(0x2000)));
        assert_eq!(lookup.bind(&Expr::Name("dir.down".into())).unwrap(), Some(Expr::Number(1)));
        assert_eq!(lookup.bind(&Expr::Name("later".into())).unwrap(), None);
    }

    #[test]
    fn struct_members_add_offsets() {
        let (scopes, ns) = scopes();
        let pos = Pos::default();
        let lookup = Lookup::new(&scopes, &ns, &pos);
        assert_eq!(
            lookup.bind(&Expr::Name("pos.y".into())).unwrap(),
            Some(Expr::binary(BinaryOp::Add, Expr::Ref("main.pos".into()), Expr::Number(1)))
        );
        assert!(matches!(
            lookup.bind(&Expr::Name("pos.z".into())),
            Err(Error::NoSuchMember(..))
        ));
    }

    #[test]
    fn sizeof_types_and_variables() {
        let (scopes, ns) = scopes();
        let pos = Pos::default();
        let lookup = Lookup::new(&scopes, &ns, &pos);
        assert_eq!(lookup.constant(&Expr::Sizeof("point".into())).unwrap(), Some(3));
        assert_eq!(lookup.constant(&Expr::Sizeof("pos".into())).unwrap(), Some(3));
        assert!(matches!(
            lookup.constant(&Expr::Sizeof("nothing".into())),
            Err(Error::UnknownType(..))
        ));
    }

    #[test]
    fn self_referencing_address_is_an_error() {
        let mut scopes = ScopeTable::new();
        let global = Namespace::global();
        let mut x = var("x", "byte", &global, None);
        let mut y = var("y", "byte", &global, None);
        if let (Symbol::Variable(x), Symbol::Variable(y)) = (&mut x, &mut y) {
            x.address = Some(Expr::Name("y".into()));
            y.address = Some(Expr::binary(BinaryOp::Add, Expr::Name("x".into()), Expr::Number(1)));
        }
        scopes.define(x, None);
        scopes.define(y, None);
        let pos = Pos::default();
        let lookup = Lookup::new(&scopes, &global, &pos);
        assert!(matches!(
            lookup.bind(&Expr::Name("x".into())),
            Err(Error::RecursiveDefinition(_, name)) if name == "x"
        ));
    }

    #[test]
    fn types_are_not_values() {
        let (scopes, ns) = scopes();
        let pos = Pos::default();
        let lookup = Lookup::new(&scopes, &ns, &pos);
        assert!(matches!(
            lookup.bind(&Expr::Name("point".into())),
            Err(Error::NotAValue(..))
        ));
    }
}
